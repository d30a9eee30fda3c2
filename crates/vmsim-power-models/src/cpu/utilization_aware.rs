//! Concave power model.

use crate::power_model::PowerModel;

/// Power grows faster at low utilization and flattens near full load:
/// `P = P_idle + (P_max - P_idle) * (2u - u^1.4)`.
///
/// The curve follows the survey by Priya, Pilli and Joshi,
/// "A survey on energy and power consumption models for Greener Cloud" (IACC 2013).
#[derive(Clone, Debug)]
pub struct UtilizationAwarePowerModel {
    idle_power: f64,
    dynamic_power: f64,
}

impl UtilizationAwarePowerModel {
    pub fn new(idle_power: f64, max_power: f64) -> Self {
        Self {
            idle_power,
            dynamic_power: max_power - idle_power,
        }
    }
}

impl PowerModel for UtilizationAwarePowerModel {
    fn get_power(&self, _time: f64, utilization: f64) -> f64 {
        let u = super::clamp_utilization(utilization);
        self.idle_power + self.dynamic_power * (2. * u - u.powf(1.4))
    }
}
