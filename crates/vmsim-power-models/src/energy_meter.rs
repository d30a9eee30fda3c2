//! Energy meter calculates the host energy consumption.

const SECONDS_PER_HOUR: f64 = 3600.;

/// Energy meter structure.
///
/// Energy is stored in joules (watt-seconds) and never decreases.
#[derive(Debug, Clone, Default)]
pub struct EnergyMeter {
    energy_consumed: f64,
    current_power: f64,
}

impl EnergyMeter {
    /// Creates component.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the energy consumed at constant `power` (W) during `elapsed` seconds.
    ///
    /// Returns the added energy in joules.
    pub fn accumulate(&mut self, power: f64, elapsed: f64) -> f64 {
        let energy = power.max(0.) * elapsed.max(0.);
        self.energy_consumed += energy;
        self.current_power = power;
        energy
    }

    /// Returns the power used by the last accumulation.
    pub fn current_power(&self) -> f64 {
        self.current_power
    }

    /// Returns the total energy consumption in joules.
    pub fn energy_consumed(&self) -> f64 {
        self.energy_consumed
    }

    /// Returns the total energy consumption in watt-hours.
    pub fn energy_consumed_wh(&self) -> f64 {
        joules_to_wh(self.energy_consumed)
    }
}

/// Converts joules to watt-hours.
pub fn joules_to_wh(joules: f64) -> f64 {
    joules / SECONDS_PER_HOUR
}

/// Converts joules to kilowatt-hours.
pub fn joules_to_kwh(joules: f64) -> f64 {
    joules_to_wh(joules) / 1000.
}
