//! Cities and observations every session starts with.

use chrono::{DateTime, Utc};

use crate::types::{City, CityId, WeatherCategory, WeatherObservation};

pub const BEIJING: CityId = 101010100;
pub const SHANGHAI: CityId = 101020100;
pub const GUANGZHOU: CityId = 101280101;

const PRESET_CITIES: [(CityId, &str, f64, f64); 8] = [
    (BEIJING, "北京市", 39.9042, 116.4074),
    (SHANGHAI, "上海市", 31.2304, 121.4737),
    (GUANGZHOU, "广州市", 23.1291, 113.2644),
    (101280601, "深圳市", 22.5431, 114.0579),
    (101210101, "杭州市", 30.2741, 120.1551),
    (101270101, "成都市", 30.5728, 104.0668),
    (101190101, "南京市", 32.0603, 118.7969),
    (101200101, "武汉市", 30.5928, 114.3052),
];

/// The eight preset cities in display order. Beijing starts selected.
pub fn preset_cities() -> Vec<City> {
    PRESET_CITIES
        .iter()
        .enumerate()
        .map(|(index, &(id, name, latitude, longitude))| City {
            order_index: index,
            is_selected: id == BEIJING,
            ..City::new(id, name).with_coordinates(latitude, longitude)
        })
        .collect()
}

/// Hand-written observations for the first three presets; the rest are generated.
pub fn initial_observations(now: DateTime<Utc>) -> Vec<WeatherObservation> {
    let fixed = |city_id, temperature, feels_like, humidity, wind_speed, category, pressure, visibility| {
        WeatherObservation {
            city_id,
            temperature,
            feels_like,
            humidity,
            wind_speed,
            category,
            pressure,
            visibility,
            last_updated: now,
        }
    };

    vec![
        fixed(BEIJING, 25.0, 26.0, 45, 3.0, WeatherCategory::Clear, 1013, 10),
        fixed(SHANGHAI, 22.0, 23.0, 85, 5.0, WeatherCategory::LightRain, 1012, 8),
        fixed(GUANGZHOU, 30.0, 31.0, 60, 2.0, WeatherCategory::Clear, 1011, 12),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered_and_unique() {
        let cities = preset_cities();
        assert_eq!(cities.len(), 8);
        for (index, city) in cities.iter().enumerate() {
            assert_eq!(city.order_index, index);
        }
        let mut ids: Vec<_> = cities.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_only_beijing_starts_selected() {
        let selected: Vec<_> = preset_cities().into_iter().filter(|c| c.is_selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, BEIJING);
    }

    #[test]
    fn test_initial_observations_cover_known_presets() {
        let observations = initial_observations(Utc::now());
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].temperature, 25.0);
        assert_eq!(observations[1].category, WeatherCategory::LightRain);
    }
}
