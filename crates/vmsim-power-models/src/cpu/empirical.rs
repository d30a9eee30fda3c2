//! Empirical (piecewise linear) power model.

use crate::power_model::PowerModel;

/// A power model based on measurements of actual power consumption at different utilization levels.
///
/// The model uses 11 measurements corresponding to power consumption in W at utilization levels from 0% to 100%
/// with step 10%, such as measurements reported by the [SPECpower benchmark](https://www.spec.org/power_ssj2008/results/).
///
/// The power consumption is computed using linear interpolation between the closest measurements.
#[derive(Clone)]
pub struct EmpiricalPowerModel {
    measurements: Vec<f64>,
}

impl EmpiricalPowerModel {
    /// Number of measurements expected by the model.
    pub const MEASUREMENTS: usize = 11;

    /// Creates an empirical power model.
    ///
    /// * `measurements` - Power consumption measurements for utilization levels from 0% to 100% with 10% step.
    ///
    /// Returns `None` if the number of measurements is not 11.
    pub fn new(measurements: Vec<f64>) -> Option<Self> {
        if measurements.len() != Self::MEASUREMENTS {
            return None;
        }
        Some(Self { measurements })
    }

    /// Empirical power model for IBM System x3550 M3 server with Intel Xeon X5675 CPU based on measurements
    /// from [SPECpower benchmark](http://www.spec.org/power_ssj2008/results/res2011q2/power_ssj2008-20110406-00368.html).
    pub fn system_x3550_m3_xeon_x5675() -> Self {
        Self {
            measurements: vec![58.4, 98., 109., 118., 128., 140., 153., 170., 189., 205., 222.],
        }
    }
}

impl PowerModel for EmpiricalPowerModel {
    fn get_power(&self, _time: f64, utilization: f64) -> f64 {
        let scaled = super::clamp_utilization(utilization) * 10.;
        let floor_idx = scaled.floor() as usize;
        if floor_idx >= Self::MEASUREMENTS - 1 {
            return self.measurements[Self::MEASUREMENTS - 1];
        }
        let floor_power = self.measurements[floor_idx];
        let ceil_power = self.measurements[floor_idx + 1];
        floor_power + (ceil_power - floor_power) * (scaled - floor_idx as f64)
    }
}
