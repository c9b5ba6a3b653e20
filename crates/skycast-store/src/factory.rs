//! Builds cities the user adds by name.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skycast_weather::{City, CityId, DEFAULT_COUNTRY_CODE};

use crate::error::{StoreError, StoreResult};

/// Range user-added city ids are drawn from (9 digits)
pub const NEW_CITY_ID_RANGE: std::ops::RangeInclusive<CityId> = 100_000_000..=999_999_999;

/// Where new cities are placed on the map
#[derive(Debug, Clone, PartialEq)]
pub struct CityFactoryOptions {
    pub country_code: String,
    pub origin_latitude: f64,
    pub origin_longitude: f64,
    /// Maximum offset in degrees applied to each coordinate
    pub jitter_degrees: f64,
}

impl Default for CityFactoryOptions {
    fn default() -> Self {
        Self {
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            origin_latitude: 30.0,
            origin_longitude: 120.0,
            jitter_degrees: 5.0,
        }
    }
}

#[derive(Debug)]
pub struct CityFactory {
    options: CityFactoryOptions,
    rng: StdRng,
}

impl CityFactory {
    pub fn new(options: CityFactoryOptions, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { options, rng }
    }

    /// Trim and validate a user-entered name
    ///
    /// # Errors
    ///
    /// `InvalidCityName` if nothing is left after trimming.
    pub fn normalize_name(name: &str) -> StoreResult<&str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidCityName(name.to_string()));
        }
        Ok(trimmed)
    }

    /// Build a city with a random id for which `is_taken` is false
    pub fn build(&mut self, name: &str, is_taken: impl Fn(CityId) -> bool) -> City {
        let id = loop {
            let candidate = self.rng.random_range(NEW_CITY_ID_RANGE);
            if !is_taken(candidate) {
                break candidate;
            }
        };

        let latitude = self.options.origin_latitude + self.jitter();
        let longitude = self.options.origin_longitude + self.jitter();

        City::new(id, name)
            .with_country_code(self.options.country_code.clone())
            .with_coordinates(latitude, longitude)
    }

    fn jitter(&mut self) -> f64 {
        let spread = self.options.jitter_degrees;
        if spread > 0.0 {
            self.rng.random_range(-spread..=spread)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_normalize_trims() {
        assert_eq!(CityFactory::normalize_name("  苏州市 ").unwrap(), "苏州市");
    }

    #[test]
    fn test_normalize_rejects_blank() {
        assert!(matches!(
            CityFactory::normalize_name("   "),
            Err(StoreError::InvalidCityName(_))
        ));
    }

    #[test]
    fn test_build_stays_within_ranges() {
        let mut factory = CityFactory::new(CityFactoryOptions::default(), Some(5));
        for _ in 0..200 {
            let city = factory.build("Somewhere", |_| false);
            assert!(NEW_CITY_ID_RANGE.contains(&city.id));
            assert!((25.0..=35.0).contains(&city.latitude));
            assert!((115.0..=125.0).contains(&city.longitude));
            assert_eq!(city.country_code, "CN");
            assert!(!city.is_selected);
        }
    }

    #[test]
    fn test_build_skips_taken_ids() {
        let mut probe = CityFactory::new(CityFactoryOptions::default(), Some(9));
        let first = probe.build("a", |_| false).id;

        let mut factory = CityFactory::new(CityFactoryOptions::default(), Some(9));
        let city = factory.build("a", |id| id == first);
        assert_ne!(city.id, first);
    }

    #[test]
    fn test_zero_jitter_uses_origin() {
        let options = CityFactoryOptions {
            jitter_degrees: 0.0,
            ..CityFactoryOptions::default()
        };
        let city = CityFactory::new(options, Some(1)).build("x", |_| false);
        assert_eq!(city.latitude, 30.0);
        assert_eq!(city.longitude, 120.0);
    }
}
