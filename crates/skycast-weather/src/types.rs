use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// City identifier. Presets use the regional code scheme (e.g. 101010100),
/// user-added cities get a random 9-digit value.
pub type CityId = u32;

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// The other unit
    pub fn toggled(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }

    /// Convert a canonical Celsius value into this unit
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => to_fahrenheit(celsius),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

pub fn to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Format a temperature with one decimal place (no unit symbol)
pub fn format_temperature(value: f64) -> String {
    format!("{:.1}", value)
}

/// Convert a Celsius value and render it with the unit symbol, e.g. `77.0°F`
pub fn display_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    format!("{}{}", format_temperature(unit.convert(celsius)), unit.symbol())
}

/// Weather condition categories produced by the generator.
///
/// The category is decided once when an observation is generated; label,
/// glyph and animation are all derived from it, never from display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCategory {
    #[default]
    Clear,
    Cloudy,
    LightRain,
    Overcast,
    ShowerRain,
}

impl WeatherCategory {
    pub const ALL: [WeatherCategory; 5] = [
        Self::Clear,
        Self::Cloudy,
        Self::LightRain,
        Self::Overcast,
        Self::ShowerRain,
    ];

    /// Condition text shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clear => "晴",
            Self::Cloudy => "多云",
            Self::LightRain => "小雨",
            Self::Overcast => "阴",
            Self::ShowerRain => "阵雨",
        }
    }

    /// English description, used in logs
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Cloudy => "Cloudy",
            Self::LightRain => "Light Rain",
            Self::Overcast => "Overcast",
            Self::ShowerRain => "Shower Rain",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::Cloudy => "⛅",
            Self::LightRain => "🌧",
            Self::Overcast => "☁️",
            Self::ShowerRain => "🌦",
        }
    }

    pub fn animation(&self) -> WeatherAnimation {
        match self {
            Self::Clear => WeatherAnimation::Sunny,
            Self::Cloudy | Self::Overcast => WeatherAnimation::Cloudy,
            Self::LightRain | Self::ShowerRain => WeatherAnimation::Rain,
        }
    }

    /// Playback speed multiplier for the condition animation
    pub fn animation_speed(&self) -> f32 {
        match self.animation() {
            WeatherAnimation::Rain => 1.5,
            WeatherAnimation::Sunny | WeatherAnimation::Cloudy => 1.0,
        }
    }
}

/// Animation resource selected for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherAnimation {
    Sunny,
    Cloudy,
    Rain,
}

impl WeatherAnimation {
    pub fn resource_name(&self) -> &'static str {
        match self {
            Self::Sunny => "weather_sunny",
            Self::Cloudy => "weather_cloudy",
            Self::Rain => "weather_rain",
        }
    }
}

/// A tracked city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_favorite: bool,
    pub order_index: usize,
    pub is_selected: bool,
}

pub const DEFAULT_COUNTRY_CODE: &str = "CN";

impl City {
    /// City with default country code, zeroed coordinates, favorite and unselected
    pub fn new(id: CityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            is_favorite: true,
            order_index: 0,
            is_selected: false,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }
}

/// One synthetic weather reading for a city. Temperatures are Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city_id: CityId,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub category: WeatherCategory,
    pub pressure: u16,
    pub visibility: u16,
    pub last_updated: DateTime<Utc>,
}

impl WeatherObservation {
    pub fn condition(&self) -> &'static str {
        self.category.label()
    }

    pub fn icon(&self) -> &'static str {
        self.category.icon()
    }

    /// `last_updated` as epoch milliseconds
    pub fn last_updated_millis(&self) -> i64 {
        self.last_updated.timestamp_millis()
    }
}

/// Weather domain errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Generator failure: {0}")]
    GeneratorFailure(String),
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_fahrenheit_conversion() {
        assert_eq!(to_fahrenheit(25.0), 77.0);
        assert_eq!(to_fahrenheit(0.0), 32.0);
        assert_eq!(to_fahrenheit(-40.0), -40.0);
    }

    #[test]
    fn test_celsius_passthrough() {
        assert_eq!(TemperatureUnit::Celsius.convert(21.5), 21.5);
    }

    #[test]
    fn test_conversion_round_trip() {
        for c in [-273.15_f64, -40.0, 0.0, 15.0, 22.2, 35.0, 1.0e6] {
            let back = to_celsius(to_fahrenheit(c));
            let tolerance = 1e-9 * c.abs().max(1.0);
            assert!((back - c).abs() < tolerance, "{} came back as {}", c, back);
        }
    }

    #[test]
    fn test_toggle_unit() {
        assert_eq!(TemperatureUnit::Celsius.toggled(), TemperatureUnit::Fahrenheit);
        assert_eq!(TemperatureUnit::Fahrenheit.toggled(), TemperatureUnit::Celsius);
    }

    #[test]
    fn test_display_temperature() {
        assert_eq!(display_temperature(25.0, TemperatureUnit::Fahrenheit), "77.0°F");
        assert_eq!(display_temperature(25.0, TemperatureUnit::Celsius), "25.0°C");
        assert_eq!(format_temperature(30.04), "30.0");
    }

    #[test]
    fn test_unit_serde_lowercase() {
        let json = serde_json::to_string(&TemperatureUnit::Fahrenheit).unwrap();
        assert_eq!(json, "\"fahrenheit\"");
    }

    #[test]
    fn test_category_labels_are_distinct() {
        let mut labels: Vec<_> = WeatherCategory::ALL.iter().map(|c| c.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), WeatherCategory::ALL.len());
    }

    #[test]
    fn test_category_animation() {
        assert_eq!(WeatherCategory::Clear.animation(), WeatherAnimation::Sunny);
        assert_eq!(WeatherCategory::Overcast.animation(), WeatherAnimation::Cloudy);
        assert_eq!(WeatherCategory::ShowerRain.animation(), WeatherAnimation::Rain);
        assert_eq!(WeatherCategory::LightRain.animation_speed(), 1.5);
        assert_eq!(WeatherCategory::Cloudy.animation_speed(), 1.0);
    }

    #[test]
    fn test_city_defaults() {
        let city = City::new(999, "Testville");
        assert_eq!(city.country_code, "CN");
        assert!(city.is_favorite);
        assert!(!city.is_selected);
    }
}
