use skycast_weather::{CityId, WeatherError};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown city id: {0}")]
    UnknownCityId(CityId),
    #[error("City already exists: {0}")]
    DuplicateCityName(String),
    #[error("Invalid city name: {0:?}")]
    InvalidCityName(String),
    #[error("Store has been shut down")]
    Closed,
    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),
}

pub type StoreResult<T> = Result<T, StoreError>;
