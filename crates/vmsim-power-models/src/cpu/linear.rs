//! Linear power model.

use crate::power_model::PowerModel;

/// Power grows proportionally to utilization: `P = P_idle + (P_max - P_idle) * u`.
///
/// Utilization outside of `[0, 1]` is clamped.
#[derive(Clone, Debug)]
pub struct LinearPowerModel {
    idle_power: f64,
    dynamic_power: f64,
}

impl LinearPowerModel {
    /// Creates model drawing `idle_power` W with no load and `max_power` W at full load.
    pub fn new(idle_power: f64, max_power: f64) -> Self {
        Self {
            idle_power,
            dynamic_power: max_power - idle_power,
        }
    }
}

impl PowerModel for LinearPowerModel {
    fn get_power(&self, _time: f64, utilization: f64) -> f64 {
        self.idle_power + self.dynamic_power * super::clamp_utilization(utilization)
    }
}
