//! Per-value subscriber lists owned by the store worker.
//!
//! Callbacks only ever run on the worker task, one commit at a time, so a
//! subscriber sees values in commit order.

use tokio::sync::mpsc;

use crate::store::Command;

/// Identifier handed out at subscribe time
pub type SubscriptionId = u64;

pub(crate) type Callback<T> = Box<dyn FnMut(&T) + Send + 'static>;

/// The independently observable values of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Cities,
    Selection,
    Unit,
    Refresh,
}

/// Subscriber list for one channel
pub(crate) struct Topic<T> {
    channel: Channel,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Topic<T> {
    pub(crate) fn new(channel: Channel) -> Self {
        Self {
            channel,
            subscribers: Vec::new(),
        }
    }

    /// Register a callback, delivering `current` to it first when there is one
    pub(crate) fn attach(
        &mut self,
        id: SubscriptionId,
        mut callback: Callback<T>,
        current: Option<&T>,
    ) {
        if let Some(value) = current {
            callback(value);
        }
        self.subscribers.push((id, callback));
        tracing::debug!("Subscriber {} attached to {:?}", id, self.channel);
    }

    /// Returns false if the id was not attached (already removed)
    pub(crate) fn detach(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        let removed = self.subscribers.len() != before;
        if removed {
            tracing::debug!("Subscriber {} detached from {:?}", id, self.channel);
        }
        removed
    }

    pub(crate) fn publish(&mut self, value: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}

/// Handle returned by the `subscribe_*` methods.
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    channel: Channel,
    commands: mpsc::UnboundedSender<Command>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        channel: Channel,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            id,
            channel,
            commands,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Stop receiving values. Safe to call repeatedly and after the store shut down.
    pub fn unsubscribe(&self) {
        let _ = self.commands.send(Command::Unsubscribe {
            channel: self.channel,
            id: self.id,
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, Callback<i32>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, Box::new(move |v: &i32| sink.lock().unwrap().push(*v)))
    }

    #[test]
    fn test_attach_delivers_current_value_first() {
        let mut topic = Topic::new(Channel::Unit);
        let (seen, callback) = recorder();
        topic.attach(1, callback, Some(&7));
        topic.publish(&8);
        assert_eq!(*seen.lock().unwrap(), vec![7, 8]);
    }

    #[test]
    fn test_attach_without_current_value_waits_for_publish() {
        let mut topic = Topic::new(Channel::Refresh);
        let (seen, callback) = recorder();
        topic.attach(1, callback, None);
        assert!(seen.lock().unwrap().is_empty());
        topic.publish(&3);
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut topic = Topic::new(Channel::Cities);
        let (seen, callback) = recorder();
        topic.attach(5, callback, None);
        assert!(topic.detach(5));
        assert!(!topic.detach(5));
        topic.publish(&1);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(topic.len(), 0);
    }

    #[test]
    fn test_unsubscribe_after_receiver_dropped_is_harmless() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sub = Subscription::new(1, Channel::Selection, tx);
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(sub.channel(), Channel::Selection);
    }
}
