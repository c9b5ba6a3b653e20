//! Weather domain for Skycast
//!
//! City and observation types, unit conversion, the preset catalog and the
//! synthetic weather generator.

pub mod generator;
pub mod presets;
pub mod types;

pub use generator::{generate, MockWeatherSource, ObservationSource};
pub use presets::{initial_observations, preset_cities};
pub use types::*;
