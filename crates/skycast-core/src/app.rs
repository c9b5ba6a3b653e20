use std::sync::Arc;

use skycast_store::CityStore;

use crate::error::{AppError, ConfigError};
use crate::Config;

/// Main application state and lifecycle manager.
///
/// Owns the city store for the session. Consumers get it through
/// [`App::store`]; it is stopped by [`App::shutdown`].
pub struct App {
    config: Arc<Config>,
    store: Arc<CityStore>,
}

impl App {
    /// Create an application from the on-disk configuration.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be loaded or is invalid, or the store cannot start.
    pub fn new() -> Result<Self, AppError> {
        let (config, _) =
            Config::load_validated().map_err(|e| match e.downcast::<ConfigError>() {
                Ok(config_error) => AppError::Config(config_error),
                Err(other) => AppError::Other(other),
            })?;
        Self::with_config(config)
    }

    /// Create an application from an explicit configuration
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the store cannot start.
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        let store = CityStore::spawn(config.store_options())?;
        tracing::info!(
            "Application started with {} cities",
            store.list_cities().len()
        );

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
        })
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The session's city store
    pub fn store(&self) -> &Arc<CityStore> {
        &self.store
    }

    /// Apply all queued store writes and stop the store
    pub async fn shutdown(self) {
        tracing::info!("Shutting down application");
        self.store.shutdown().await;
        tracing::info!("Application shut down");
    }
}
