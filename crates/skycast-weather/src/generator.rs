//! Synthetic weather generation.
//!
//! Every draw is independent of earlier ones for the same city.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{CityId, WeatherCategory, WeatherError, WeatherObservation};

pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<i32> = 15..=35;
pub const FEELS_LIKE_OFFSET_RANGE: std::ops::RangeInclusive<i32> = 0..=3;
pub const HUMIDITY_RANGE: std::ops::RangeInclusive<u8> = 30..=90;
pub const WIND_SPEED_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
pub const PRESSURE_BASE: u16 = 1000;
pub const PRESSURE_OFFSET_RANGE: std::ops::RangeInclusive<u16> = 0..=30;
pub const VISIBILITY_RANGE: std::ops::RangeInclusive<u16> = 5..=20;

/// Draw one observation for `city_id`, stamped with `now`.
pub fn generate<R: Rng>(rng: &mut R, city_id: CityId, now: DateTime<Utc>) -> WeatherObservation {
    let temperature = rng.random_range(TEMPERATURE_RANGE);
    let offset = rng.random_range(FEELS_LIKE_OFFSET_RANGE);
    let category = WeatherCategory::ALL[rng.random_range(0..WeatherCategory::ALL.len())];

    WeatherObservation {
        city_id,
        temperature: f64::from(temperature),
        feels_like: f64::from(temperature + offset),
        humidity: rng.random_range(HUMIDITY_RANGE),
        wind_speed: f64::from(rng.random_range(WIND_SPEED_RANGE)),
        category,
        pressure: PRESSURE_BASE + rng.random_range(PRESSURE_OFFSET_RANGE),
        visibility: rng.random_range(VISIBILITY_RANGE),
        last_updated: now,
    }
}

/// Where the store gets fresh observations from
pub trait ObservationSource: Send {
    /// Produce a fresh observation for the given city
    ///
    /// # Errors
    ///
    /// Returns `WeatherError::GeneratorFailure` if no observation could be produced.
    fn observe(&mut self, city_id: CityId) -> Result<WeatherObservation, WeatherError>;
}

/// Uniform random weather, optionally seeded for reproducible sessions
#[derive(Debug)]
pub struct MockWeatherSource {
    rng: StdRng,
}

impl MockWeatherSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::seeded)
    }
}

impl Default for MockWeatherSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationSource for MockWeatherSource {
    fn observe(&mut self, city_id: CityId) -> Result<WeatherObservation, WeatherError> {
        let observation = generate(&mut self.rng, city_id, Utc::now());
        tracing::debug!(
            "Generated weather for {}: {} {}°C",
            city_id,
            observation.category.description(),
            observation.temperature
        );
        Ok(observation)
    }
}
