use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use skycast_store::{CityFactoryOptions, StoreOptions};
use skycast_weather::{TemperatureUnit, DEFAULT_COUNTRY_CODE};

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather display settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Store start-up settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Placement of user-added cities
    #[serde(default)]
    pub cities: CitiesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Unit temperatures are displayed in at start-up
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Seed for reproducible sessions (random when unset)
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Start with the preset cities (default: true)
    #[serde(default = "default_load_presets")]
    pub load_presets: bool,
}

fn default_load_presets() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            load_presets: default_load_presets(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitiesConfig {
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_origin_latitude")]
    pub origin_latitude: f64,
    #[serde(default = "default_origin_longitude")]
    pub origin_longitude: f64,
    /// Maximum random offset from the origin, in degrees
    #[serde(default = "default_jitter_degrees")]
    pub jitter_degrees: f64,
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}

fn default_origin_latitude() -> f64 {
    30.0
}

fn default_origin_longitude() -> f64 {
    120.0
}

fn default_jitter_degrees() -> f64 {
    5.0
}

impl Default for CitiesConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            origin_latitude: default_origin_latitude(),
            origin_longitude: default_origin_longitude(),
            jitter_degrees: default_jitter_degrees(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            store: StoreConfig::default(),
            cities: CitiesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.cities.country_code.trim().is_empty() {
            result.add_error("cities.country_code", "Country code must not be empty");
        }

        if !(-90.0..=90.0).contains(&self.cities.origin_latitude) {
            result.add_error(
                "cities.origin_latitude",
                format!(
                    "Latitude must be within [-90, 90], got {}",
                    self.cities.origin_latitude
                ),
            );
        }

        if !(-180.0..=180.0).contains(&self.cities.origin_longitude) {
            result.add_error(
                "cities.origin_longitude",
                format!(
                    "Longitude must be within [-180, 180], got {}",
                    self.cities.origin_longitude
                ),
            );
        }

        let jitter = self.cities.jitter_degrees;
        if jitter.is_nan() || jitter < 0.0 {
            result.add_error("cities.jitter_degrees", "Jitter must be zero or positive");
        } else if jitter > 45.0 {
            result.add_warning(
                "cities.jitter_degrees",
                "Jitter is unusually large (>45 degrees)",
            );
        }

        if !self.store.load_presets {
            result.add_warning("store.load_presets", "Starting without preset cities");
        }

        result
    }

    /// Options for spawning the city store
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            load_presets: self.store.load_presets,
            temperature_unit: self.weather.temperature_unit,
            rng_seed: self.store.rng_seed,
            factory: CityFactoryOptions {
                country_code: self.cities.country_code.clone(),
                origin_latitude: self.cities.origin_latitude,
                origin_longitude: self.cities.origin_longitude,
                jitter_degrees: self.cities.jitter_degrees,
            },
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
