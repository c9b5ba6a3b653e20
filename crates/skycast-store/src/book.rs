//! The city list, its selection and the observation map.
//!
//! Invariants kept by every mutation:
//! - at most one city has `is_selected`
//! - `order_index` equals list position
//! - every listed city has an observation

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use skycast_weather::{
    initial_observations, preset_cities, City, CityId, ObservationSource, WeatherObservation,
};

use crate::error::{StoreError, StoreResult};

/// What a removal changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub was_selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CityBook {
    cities: Vec<City>,
    weather: HashMap<CityId, WeatherObservation>,
}

impl CityBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The preset catalog; presets without a hand-written observation get a generated one.
    ///
    /// # Errors
    ///
    /// Fails if the source cannot produce an observation for a preset.
    pub fn with_presets(
        source: &mut dyn ObservationSource,
        now: DateTime<Utc>,
    ) -> StoreResult<Self> {
        let cities = preset_cities();
        let mut weather: HashMap<_, _> = initial_observations(now)
            .into_iter()
            .map(|observation| (observation.city_id, observation))
            .collect();

        for city in &cities {
            if !weather.contains_key(&city.id) {
                weather.insert(city.id, source.observe(city.id)?);
            }
        }

        Ok(Self { cities, weather })
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn weather_map(&self) -> &HashMap<CityId, WeatherObservation> {
        &self.weather
    }

    pub fn contains(&self, id: CityId) -> bool {
        self.cities.iter().any(|city| city.id == id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.cities.iter().any(|city| city.name == name)
    }

    pub fn selected(&self) -> Option<&City> {
        self.cities.iter().find(|city| city.is_selected)
    }

    pub fn weather(&self, id: CityId) -> Option<&WeatherObservation> {
        self.weather.get(&id)
    }

    /// Append a city with a fresh observation. Returns `Ok(false)` for a known id.
    ///
    /// The incoming selection flag is ignored; adding never changes the selection.
    ///
    /// # Errors
    ///
    /// Fails (leaving the book unchanged) if the source cannot produce an observation.
    pub fn add(
        &mut self,
        mut city: City,
        source: &mut dyn ObservationSource,
    ) -> StoreResult<bool> {
        if self.contains(city.id) {
            return Ok(false);
        }

        let observation = source.observe(city.id)?;
        city.order_index = self.cities.len();
        city.is_selected = false;
        self.weather.insert(city.id, observation);
        self.cities.push(city);
        Ok(true)
    }

    /// Mark `id` as the only selected city. Returns false for an unknown id.
    pub fn select(&mut self, id: CityId) -> bool {
        if !self.contains(id) {
            return false;
        }
        for city in &mut self.cities {
            city.is_selected = city.id == id;
        }
        true
    }

    /// Drop a city and its observation. When it was selected the new first
    /// city becomes selected (or nothing, if the list is now empty).
    pub fn remove(&mut self, id: CityId) -> Option<Removal> {
        let position = self.cities.iter().position(|city| city.id == id)?;
        let removed = self.cities.remove(position);
        self.weather.remove(&id);

        for (index, city) in self.cities.iter_mut().enumerate() {
            city.order_index = index;
        }
        if removed.is_selected {
            if let Some(first) = self.cities.first_mut() {
                first.is_selected = true;
            }
        }

        Some(Removal {
            was_selected: removed.is_selected,
        })
    }

    /// Replace the observation for a known city with a fresh draw.
    ///
    /// `last_updated` never moves backwards for a city.
    ///
    /// # Errors
    ///
    /// `UnknownCityId` if the city is not listed, or the source's failure.
    pub fn refresh(
        &mut self,
        id: CityId,
        source: &mut dyn ObservationSource,
    ) -> StoreResult<WeatherObservation> {
        if !self.contains(id) {
            return Err(StoreError::UnknownCityId(id));
        }

        let mut observation = source.observe(id)?;
        if let Some(previous) = self.weather.get(&id) {
            observation.last_updated = observation.last_updated.max(previous.last_updated);
        }
        self.weather.insert(id, observation.clone());
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use skycast_weather::presets::BEIJING;
    use skycast_weather::{MockWeatherSource, WeatherError};

    struct FailingSource;

    impl ObservationSource for FailingSource {
        fn observe(&mut self, _city_id: CityId) -> Result<WeatherObservation, WeatherError> {
            Err(WeatherError::GeneratorFailure("offline".into()))
        }
    }

    fn preset_book() -> (CityBook, MockWeatherSource) {
        let mut source = MockWeatherSource::seeded(1);
        let book = CityBook::with_presets(&mut source, Utc::now()).unwrap();
        (book, source)
    }

    fn assert_invariants(book: &CityBook) {
        assert!(book.cities().iter().filter(|c| c.is_selected).count() <= 1);
        for (index, city) in book.cities().iter().enumerate() {
            assert_eq!(city.order_index, index);
            assert!(book.weather(city.id).is_some(), "missing weather for {}", city.id);
        }
    }

    #[test]
    fn test_presets_have_weather_for_every_city() {
        let (book, _) = preset_book();
        assert_eq!(book.cities().len(), 8);
        assert_eq!(book.weather_map().len(), 8);
        assert_eq!(book.selected().unwrap().id, BEIJING);
        assert_eq!(book.weather(BEIJING).unwrap().temperature, 25.0);
        assert_invariants(&book);
    }

    #[test]
    fn test_add_appends_with_weather() {
        let (mut book, mut source) = preset_book();
        assert!(book.add(City::new(999, "Testville"), &mut source).unwrap());
        assert_eq!(book.cities().len(), 9);
        assert_eq!(book.cities()[8].order_index, 8);
        assert!(book.weather(999).is_some());
        assert_invariants(&book);
    }

    #[test]
    fn test_add_duplicate_id_is_noop() {
        let (mut book, mut source) = preset_book();
        book.add(City::new(999, "Testville"), &mut source).unwrap();
        let before = book.weather(999).cloned();
        assert!(!book.add(City::new(999, "Other"), &mut source).unwrap());
        assert_eq!(book.cities().len(), 9);
        assert_eq!(book.cities()[8].name, "Testville");
        assert_eq!(book.weather(999).cloned(), before);
    }

    #[test]
    fn test_add_does_not_change_selection() {
        let (mut book, mut source) = preset_book();
        let mut city = City::new(5, "Sneaky");
        city.is_selected = true;
        book.add(city, &mut source).unwrap();
        assert_eq!(book.selected().unwrap().id, BEIJING);
        assert_invariants(&book);
    }

    #[test]
    fn test_add_with_failing_source_leaves_book_unchanged() {
        let (mut book, _) = preset_book();
        assert!(book.add(City::new(5, "Nowhere"), &mut FailingSource).is_err());
        assert_eq!(book.cities().len(), 8);
        assert!(book.weather(5).is_none());
    }

    #[test]
    fn test_contains_name_tracks_adds_and_removals() {
        let (mut book, mut source) = preset_book();
        assert!(book.contains_name("北京市"));
        assert!(!book.contains_name("苏州市"));

        book.add(City::new(7, "苏州市"), &mut source).unwrap();
        assert!(book.contains_name("苏州市"));
        book.remove(7);
        assert!(!book.contains_name("苏州市"));
    }

    #[test]
    fn test_select_marks_exactly_one() {
        let (mut book, _) = preset_book();
        let target = book.cities()[3].id;
        assert!(book.select(target));
        let selected: Vec<_> = book.cities().iter().filter(|c| c.is_selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, target);
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let (mut book, _) = preset_book();
        assert!(!book.select(12345));
        assert_eq!(book.selected().unwrap().id, BEIJING);
    }

    #[test]
    fn test_remove_selected_reselects_first() {
        let (mut book, _) = preset_book();
        let removal = book.remove(BEIJING).unwrap();
        assert!(removal.was_selected);
        assert_eq!(book.selected().unwrap().id, book.cities()[0].id);
        assert!(book.weather(BEIJING).is_none());
        assert_invariants(&book);
    }

    #[test]
    fn test_remove_unselected_keeps_selection() {
        let (mut book, _) = preset_book();
        let target = book.cities()[4].id;
        assert!(!book.remove(target).unwrap().was_selected);
        assert_eq!(book.selected().unwrap().id, BEIJING);
        assert_eq!(book.cities().len(), 7);
        assert_invariants(&book);
    }

    #[test]
    fn test_remove_last_city_leaves_no_selection() {
        let mut source = MockWeatherSource::seeded(3);
        let mut book = CityBook::new();
        book.add(City::new(1, "Only"), &mut source).unwrap();
        book.select(1);
        book.remove(1).unwrap();
        assert!(book.cities().is_empty());
        assert!(book.selected().is_none());
    }

    #[test]
    fn test_remove_unknown_returns_none() {
        let (mut book, _) = preset_book();
        assert!(book.remove(42).is_none());
        assert_eq!(book.cities().len(), 8);
    }

    #[test]
    fn test_refresh_replaces_observation_in_range() {
        let (mut book, mut source) = preset_book();
        let before = book.weather(BEIJING).unwrap().last_updated;
        for _ in 0..50 {
            let fresh = book.refresh(BEIJING, &mut source).unwrap();
            assert!(fresh.last_updated >= before);
            assert!((15.0..=35.0).contains(&fresh.temperature));
            assert!((30..=90).contains(&fresh.humidity));
            assert_eq!(book.weather(BEIJING), Some(&fresh));
        }
    }

    #[test]
    fn test_refresh_unknown_city_stores_nothing() {
        let (mut book, mut source) = preset_book();
        assert!(matches!(
            book.refresh(777, &mut source),
            Err(StoreError::UnknownCityId(777))
        ));
        assert!(book.weather(777).is_none());
    }
}
