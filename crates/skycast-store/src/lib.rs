//! City/weather store for Skycast
//!
//! Owns the tracked cities, the selection, the latest observation per city
//! and the temperature unit preference. Mutations are queued to a single
//! owner task and reads return the latest committed snapshot. Each value can
//! be observed through its own subscription channel.

pub mod book;
pub mod channel;
pub mod error;
pub mod factory;
pub mod store;
pub mod unit;

pub use book::CityBook;
pub use channel::{Channel, Subscription, SubscriptionId};
pub use error::{StoreError, StoreResult};
pub use factory::{CityFactory, CityFactoryOptions};
pub use store::{
    AddCityTicket, CityStore, RefreshOutcome, RefreshTicket, Snapshot, StoreOptions,
};
pub use unit::UnitPreference;
