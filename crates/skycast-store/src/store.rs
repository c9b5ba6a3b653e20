//! City/weather store.
//!
//! A single worker task owns the [`CityBook`] and applies commands one at a
//! time, in the order they were submitted. After each commit it swaps in a
//! new [`Snapshot`] for synchronous readers, then notifies the subscribers of
//! the channels that changed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use skycast_weather::{
    City, CityId, MockWeatherSource, ObservationSource, TemperatureUnit, WeatherObservation,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::book::CityBook;
use crate::channel::{Callback, Channel, Subscription, SubscriptionId, Topic};
use crate::error::{StoreError, StoreResult};
use crate::factory::{CityFactory, CityFactoryOptions};
use crate::unit::UnitPreference;

/// Construction parameters for [`CityStore`]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Start with the eight preset cities (otherwise empty)
    pub load_presets: bool,
    pub temperature_unit: TemperatureUnit,
    /// Seed for the weather generator and the new-city factory
    pub rng_seed: Option<u64>,
    pub factory: CityFactoryOptions,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            load_presets: true,
            temperature_unit: TemperatureUnit::Celsius,
            rng_seed: None,
            factory: CityFactoryOptions::default(),
        }
    }
}

/// Immutable view of one commit
#[derive(Debug, Clone)]
pub struct Snapshot {
    cities: Arc<Vec<City>>,
    weather: Arc<HashMap<CityId, WeatherObservation>>,
    unit: TemperatureUnit,
}

impl Snapshot {
    fn capture(book: &CityBook, unit: TemperatureUnit) -> Self {
        Self {
            cities: Arc::new(book.cities().to_vec()),
            weather: Arc::new(book.weather_map().clone()),
            unit,
        }
    }

    pub fn cities(&self) -> &Arc<Vec<City>> {
        &self.cities
    }

    pub fn selected(&self) -> Option<&City> {
        self.cities.iter().find(|city| city.is_selected)
    }

    pub fn contains(&self, id: CityId) -> bool {
        self.cities.iter().any(|city| city.id == id)
    }

    pub fn weather(&self, id: CityId) -> Option<&WeatherObservation> {
        self.weather.get(&id)
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }
}

/// Published on the refresh channel after every refresh attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub city_id: CityId,
    pub success: bool,
    pub observation: Option<WeatherObservation>,
}

impl RefreshOutcome {
    fn succeeded(observation: WeatherObservation) -> Self {
        Self {
            city_id: observation.city_id,
            success: true,
            observation: Some(observation),
        }
    }

    fn failed(city_id: CityId) -> Self {
        Self {
            city_id,
            success: false,
            observation: None,
        }
    }
}

/// Resolves to the refreshed observation once the refresh has been applied.
///
/// Dropping the ticket does not cancel the refresh.
#[derive(Debug)]
pub struct RefreshTicket {
    reply: oneshot::Receiver<Option<WeatherObservation>>,
}

impl RefreshTicket {
    /// `None` if the refresh failed, there was nothing selected, or the store shut down first
    pub async fn wait(self) -> Option<WeatherObservation> {
        self.reply.await.ok().flatten()
    }
}

/// Resolves to the id of a city added by name once the add has been applied
#[derive(Debug)]
pub struct AddCityTicket {
    reply: oneshot::Receiver<StoreResult<CityId>>,
}

impl AddCityTicket {
    /// # Errors
    ///
    /// `DuplicateCityName` if a city with that name was listed when the add
    /// ran, the source's failure, or `Closed` if the store shut down first.
    pub async fn wait(self) -> StoreResult<CityId> {
        self.reply.await.map_err(|_| StoreError::Closed)?
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum RefreshTarget {
    City(CityId),
    Selected,
}

pub(crate) enum Registration {
    Cities(SubscriptionId, Callback<Arc<Vec<City>>>),
    Selection(SubscriptionId, Callback<Option<City>>),
    Unit(SubscriptionId, Callback<TemperatureUnit>),
    Refresh(SubscriptionId, Callback<RefreshOutcome>),
}

pub(crate) enum Command {
    AddCity(City),
    AddNamed {
        name: String,
        reply: oneshot::Sender<StoreResult<CityId>>,
    },
    SelectCity(CityId),
    RemoveCity(CityId),
    Refresh {
        target: RefreshTarget,
        reply: oneshot::Sender<Option<WeatherObservation>>,
    },
    SetUnit(TemperatureUnit),
    ToggleUnit,
    Subscribe(Registration),
    Unsubscribe {
        channel: Channel,
        id: SubscriptionId,
    },
    Sync(oneshot::Sender<()>),
    Shutdown,
}

/// Handle to the store. Writes are queued and never block; reads return the
/// latest committed snapshot.
pub struct CityStore {
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
    commands: mpsc::UnboundedSender<Command>,
    next_subscription: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CityStore {
    /// Start a store backed by the mock weather generator.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if initial observations for the presets cannot be generated.
    pub fn spawn(options: StoreOptions) -> StoreResult<Self> {
        let source = MockWeatherSource::from_seed(options.rng_seed);
        Self::spawn_with_source(options, Box::new(source))
    }

    /// Start a store that draws observations from `source`.
    ///
    /// # Errors
    ///
    /// Fails if initial observations for the presets cannot be generated.
    pub fn spawn_with_source(
        options: StoreOptions,
        mut source: Box<dyn ObservationSource>,
    ) -> StoreResult<Self> {
        let book = if options.load_presets {
            CityBook::with_presets(source.as_mut(), Utc::now())?
        } else {
            CityBook::new()
        };
        let unit = UnitPreference::new(options.temperature_unit);
        let snapshot = Arc::new(RwLock::new(Arc::new(Snapshot::capture(&book, unit.get()))));

        tracing::info!(
            "Starting city store with {} cities, unit {:?}",
            book.cities().len(),
            unit.get()
        );

        let factory_seed = options.rng_seed.map(|seed| seed.wrapping_add(1));
        let worker = Worker {
            book,
            unit,
            source,
            factory: CityFactory::new(options.factory, factory_seed),
            snapshot: snapshot.clone(),
            last_refresh: None,
            cities: Topic::new(Channel::Cities),
            selection: Topic::new(Channel::Selection),
            units: Topic::new(Channel::Unit),
            refreshes: Topic::new(Channel::Refresh),
        };

        let (commands, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(worker.run(receiver));

        Ok(Self {
            snapshot,
            commands,
            next_subscription: AtomicU64::new(1),
            worker: Mutex::new(Some(handle)),
        })
    }

    // ---- reads ----

    /// Latest committed state
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    pub fn list_cities(&self) -> Arc<Vec<City>> {
        self.snapshot().cities.clone()
    }

    pub fn selected_city(&self) -> Option<City> {
        self.snapshot().selected().cloned()
    }

    pub fn get_weather(&self, id: CityId) -> Option<WeatherObservation> {
        self.snapshot().weather(id).cloned()
    }

    /// Weather of the selected city
    pub fn current_weather(&self) -> Option<WeatherObservation> {
        let snapshot = self.snapshot();
        let selected = snapshot.selected()?;
        snapshot.weather(selected.id).cloned()
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.snapshot().unit
    }

    /// A city's temperature converted to the current unit
    pub fn temperature(&self, id: CityId) -> Option<f64> {
        let snapshot = self.snapshot();
        let observation = snapshot.weather(id)?;
        Some(snapshot.unit.convert(observation.temperature))
    }

    /// A city's temperature rendered for display, e.g. `77.0°F`
    pub fn display_temperature(&self, id: CityId) -> Option<String> {
        let snapshot = self.snapshot();
        let observation = snapshot.weather(id)?;
        Some(UnitPreference::new(snapshot.unit).display(observation.temperature))
    }

    // ---- writes ----

    fn submit(&self, command: Command) -> StoreResult<()> {
        self.commands.send(command).map_err(|_| StoreError::Closed)
    }

    /// Queue an add. A city whose id is already tracked is ignored.
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn add_city(&self, city: City) -> StoreResult<()> {
        self.submit(Command::AddCity(city))
    }

    /// Queue a selection change. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn select_city(&self, id: CityId) -> StoreResult<()> {
        self.submit(Command::SelectCity(id))
    }

    /// Queue a removal. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn remove_city(&self, id: CityId) -> StoreResult<()> {
        self.submit(Command::RemoveCity(id))
    }

    /// Queue a refresh for one city
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn refresh_weather(&self, id: CityId) -> StoreResult<RefreshTicket> {
        self.refresh(RefreshTarget::City(id))
    }

    /// Queue a refresh for whichever city is selected when the command runs
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn refresh_selected_weather(&self) -> StoreResult<RefreshTicket> {
        self.refresh(RefreshTarget::Selected)
    }

    fn refresh(&self, target: RefreshTarget) -> StoreResult<RefreshTicket> {
        let (reply, ticket) = oneshot::channel();
        self.submit(Command::Refresh { target, reply })?;
        Ok(RefreshTicket { reply: ticket })
    }

    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn set_unit(&self, unit: TemperatureUnit) -> StoreResult<()> {
        self.submit(Command::SetUnit(unit))
    }

    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn toggle_unit(&self) -> StoreResult<()> {
        self.submit(Command::ToggleUnit)
    }

    /// Queue creation of a city from a user-entered name; once applied it is
    /// added and selected.
    ///
    /// The duplicate-name check runs when the command is applied, so it sees
    /// every write queued before it.
    ///
    /// # Errors
    ///
    /// `InvalidCityName` for a blank name, `Closed` after shutdown.
    pub fn add_city_named(&self, name: &str) -> StoreResult<AddCityTicket> {
        let name = CityFactory::normalize_name(name)?.to_string();
        let (reply, ticket) = oneshot::channel();
        self.submit(Command::AddNamed { name, reply })?;
        Ok(AddCityTicket { reply: ticket })
    }

    /// Wait until every command submitted before this call has been applied
    ///
    /// # Errors
    ///
    /// `Closed` if the store shut down first.
    pub async fn sync(&self) -> StoreResult<()> {
        let (done, wait) = oneshot::channel();
        self.submit(Command::Sync(done))?;
        wait.await.map_err(|_| StoreError::Closed)
    }

    // ---- subscriptions ----

    fn subscribe(
        &self,
        channel: Channel,
        registration: impl FnOnce(SubscriptionId) -> Registration,
    ) -> StoreResult<Subscription> {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.submit(Command::Subscribe(registration(id)))?;
        Ok(Subscription::new(id, channel, self.commands.clone()))
    }

    /// Receive the current city list now and after every list change
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn subscribe_cities<F>(&self, mut callback: F) -> StoreResult<Subscription>
    where
        F: FnMut(&[City]) + Send + 'static,
    {
        self.subscribe(Channel::Cities, |id| {
            Registration::Cities(
                id,
                Box::new(move |cities: &Arc<Vec<City>>| callback(cities.as_slice())),
            )
        })
    }

    /// Receive the current selection now and after every selection change
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn subscribe_selection<F>(&self, mut callback: F) -> StoreResult<Subscription>
    where
        F: FnMut(Option<&City>) + Send + 'static,
    {
        self.subscribe(Channel::Selection, |id| {
            Registration::Selection(
                id,
                Box::new(move |selected: &Option<City>| callback(selected.as_ref())),
            )
        })
    }

    /// Receive the current unit now and after every `set_unit`/`toggle_unit`
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn subscribe_unit<F>(&self, mut callback: F) -> StoreResult<Subscription>
    where
        F: FnMut(TemperatureUnit) + Send + 'static,
    {
        self.subscribe(Channel::Unit, |id| {
            Registration::Unit(id, Box::new(move |unit: &TemperatureUnit| callback(*unit)))
        })
    }

    /// Receive the last refresh outcome (if any) now and every later one
    ///
    /// # Errors
    ///
    /// `Closed` after shutdown.
    pub fn subscribe_refresh<F>(&self, callback: F) -> StoreResult<Subscription>
    where
        F: FnMut(&RefreshOutcome) + Send + 'static,
    {
        self.subscribe(Channel::Refresh, |id| Registration::Refresh(id, Box::new(callback)))
    }

    // ---- lifecycle ----

    /// Apply everything queued so far, then stop the worker.
    ///
    /// Writes after shutdown fail with `Closed`. Calling it twice is harmless.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("City store worker ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for CityStore {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// State owned by the worker task
struct Worker {
    book: CityBook,
    unit: UnitPreference,
    source: Box<dyn ObservationSource>,
    factory: CityFactory,
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
    last_refresh: Option<RefreshOutcome>,
    cities: Topic<Arc<Vec<City>>>,
    selection: Topic<Option<City>>,
    units: Topic<TemperatureUnit>,
    refreshes: Topic<RefreshOutcome>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            if let Command::Shutdown = command {
                commands.close();
                break;
            }
            self.apply(command);
        }

        tracing::info!(
            "City store stopped ({} city, {} selection, {} unit, {} refresh subscribers dropped)",
            self.cities.len(),
            self.selection.len(),
            self.units.len(),
            self.refreshes.len()
        );
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::AddCity(city) => self.add_city(city),
            Command::AddNamed { name, reply } => {
                let result = self.add_named(&name);
                if let Err(e) = &result {
                    tracing::warn!("Could not add city {}: {}", name, e);
                }
                let _ = reply.send(result);
            }
            Command::SelectCity(id) => self.select_city(id),
            Command::RemoveCity(id) => self.remove_city(id),
            Command::Refresh { target, reply } => self.refresh(target, reply),
            Command::SetUnit(unit) => {
                self.unit.set(unit);
                self.publish_unit();
            }
            Command::ToggleUnit => {
                self.unit.toggle();
                self.publish_unit();
            }
            Command::Subscribe(registration) => self.attach(registration),
            Command::Unsubscribe { channel, id } => self.detach(channel, id),
            Command::Sync(done) => {
                let _ = done.send(());
            }
            Command::Shutdown => {}
        }
    }

    /// Swap in a snapshot of the current book
    fn commit(&mut self) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::capture(&self.book, self.unit.get()));
        *self.snapshot.write() = snapshot.clone();
        snapshot
    }

    fn add_city(&mut self, city: City) {
        let id = city.id;
        match self.book.add(city, self.source.as_mut()) {
            Ok(true) => {
                tracing::debug!("Added city {}", id);
                let snapshot = self.commit();
                self.cities.publish(&snapshot.cities);
            }
            Ok(false) => tracing::debug!("City {} already tracked, add ignored", id),
            Err(e) => tracing::warn!("Could not add city {}: {}", id, e),
        }
    }

    fn add_named(&mut self, name: &str) -> StoreResult<CityId> {
        if self.book.contains_name(name) {
            return Err(StoreError::DuplicateCityName(name.to_string()));
        }

        let book = &self.book;
        let city = self.factory.build(name, |id| book.contains(id));
        let id = city.id;
        self.book.add(city, self.source.as_mut())?;
        tracing::info!("Added city {} with id {}", name, id);

        let snapshot = self.commit();
        self.cities.publish(&snapshot.cities);
        self.select_city(id);
        Ok(id)
    }

    fn select_city(&mut self, id: CityId) {
        if !self.book.select(id) {
            tracing::debug!("Ignoring selection of unknown city {}", id);
            return;
        }
        tracing::debug!("Selected city {}", id);
        let snapshot = self.commit();
        self.cities.publish(&snapshot.cities);
        self.selection.publish(&snapshot.selected().cloned());
    }

    fn remove_city(&mut self, id: CityId) {
        let Some(removal) = self.book.remove(id) else {
            tracing::debug!("Ignoring removal of unknown city {}", id);
            return;
        };
        tracing::debug!("Removed city {} (selected: {})", id, removal.was_selected);
        let snapshot = self.commit();
        self.cities.publish(&snapshot.cities);
        self.selection.publish(&snapshot.selected().cloned());
    }

    fn refresh(
        &mut self,
        target: RefreshTarget,
        reply: oneshot::Sender<Option<WeatherObservation>>,
    ) {
        let city_id = match target {
            RefreshTarget::City(id) => id,
            RefreshTarget::Selected => match self.book.selected() {
                Some(city) => city.id,
                None => {
                    tracing::debug!("No city selected, nothing to refresh");
                    let _ = reply.send(None);
                    return;
                }
            },
        };

        let outcome = match self.book.refresh(city_id, self.source.as_mut()) {
            Ok(observation) => {
                tracing::debug!(
                    "Refreshed weather for {}: {}",
                    city_id,
                    observation.category.description()
                );
                self.commit();
                RefreshOutcome::succeeded(observation)
            }
            Err(e) => {
                tracing::warn!("Weather refresh for {} failed: {}", city_id, e);
                RefreshOutcome::failed(city_id)
            }
        };

        let _ = reply.send(outcome.observation.clone());
        self.refreshes.publish(&outcome);
        self.last_refresh = Some(outcome);
    }

    fn publish_unit(&mut self) {
        tracing::debug!("Temperature unit is now {:?}", self.unit.get());
        let snapshot = self.commit();
        self.units.publish(&snapshot.unit);
    }

    fn attach(&mut self, registration: Registration) {
        let snapshot = self.snapshot.read().clone();
        match registration {
            Registration::Cities(id, callback) => {
                self.cities.attach(id, callback, Some(&snapshot.cities));
            }
            Registration::Selection(id, callback) => {
                let selected = snapshot.selected().cloned();
                self.selection.attach(id, callback, Some(&selected));
            }
            Registration::Unit(id, callback) => {
                self.units.attach(id, callback, Some(&snapshot.unit));
            }
            Registration::Refresh(id, callback) => {
                self.refreshes.attach(id, callback, self.last_refresh.as_ref());
            }
        }
    }

    fn detach(&mut self, channel: Channel, id: SubscriptionId) {
        let removed = match channel {
            Channel::Cities => self.cities.detach(id),
            Channel::Selection => self.selection.detach(id),
            Channel::Unit => self.units.detach(id),
            Channel::Refresh => self.refreshes.detach(id),
        };
        if !removed {
            tracing::debug!("Subscription {} on {:?} was already gone", id, channel);
        }
    }
}
