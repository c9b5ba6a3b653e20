//! Centralized error types for the Skycast application.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the codebase
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging

use skycast_store::StoreError;
use skycast_weather::WeatherError;
use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Store(e) => store_user_message(e),
            AppError::Weather(e) => weather_user_message(e),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

fn store_user_message(error: &StoreError) -> &'static str {
    match error {
        StoreError::UnknownCityId(_) => "That city is no longer in your list.",
        StoreError::DuplicateCityName(_) => "City already exists.",
        StoreError::InvalidCityName(_) => "Please enter a city name.",
        StoreError::Closed => "The app is shutting down.",
        StoreError::Weather(e) => weather_user_message(e),
    }
}

fn weather_user_message(error: &WeatherError) -> &'static str {
    match error {
        WeatherError::GeneratorFailure(_) => "Weather refresh failed. Please try again.",
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_conversion() {
        let app_err: AppError = StoreError::Closed.into();
        assert!(matches!(app_err, AppError::Store(StoreError::Closed)));
    }

    #[test]
    fn test_nested_weather_message() {
        let app_err = AppError::Store(StoreError::Weather(WeatherError::GeneratorFailure(
            "offline".into(),
        )));
        assert_eq!(app_err.user_message(), "Weather refresh failed. Please try again.");
    }

    #[test]
    fn test_duplicate_city_message() {
        let app_err = AppError::Store(StoreError::DuplicateCityName("北京市".into()));
        assert_eq!(app_err.user_message(), "City already exists.");
    }

    #[test]
    fn test_parse_error_message() {
        let app_err: AppError = ConfigError::ParseError("expected `=`".into()).into();
        assert_eq!(
            app_err.user_message(),
            "Configuration file is malformed. Check your settings."
        );
    }

    #[test]
    fn test_user_messages_are_non_empty() {
        let errors = [
            AppError::Store(StoreError::UnknownCityId(1)),
            AppError::Store(StoreError::InvalidCityName(String::new())),
            AppError::Config(ConfigError::Invalid("x".into())),
            AppError::Other(anyhow::anyhow!("boom")),
        ];
        for error in &errors {
            assert!(!error.user_message().is_empty());
        }
    }
}
