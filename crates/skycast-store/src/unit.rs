use skycast_weather::{display_temperature, TemperatureUnit};

/// The user's chosen display unit. Observations stay in Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitPreference {
    unit: TemperatureUnit,
}

impl UnitPreference {
    pub fn new(unit: TemperatureUnit) -> Self {
        Self { unit }
    }

    pub fn get(&self) -> TemperatureUnit {
        self.unit
    }

    /// Returns the unit now in effect
    pub fn set(&mut self, unit: TemperatureUnit) -> TemperatureUnit {
        self.unit = unit;
        self.unit
    }

    pub fn toggle(&mut self) -> TemperatureUnit {
        self.set(self.unit.toggled())
    }

    pub fn convert(&self, celsius: f64) -> f64 {
        self.unit.convert(celsius)
    }

    pub fn display(&self, celsius: f64) -> String {
        display_temperature(celsius, self.unit)
    }
}
