//! Power consumption models.

use std::fmt::{Display, Formatter};

use dyn_clone::{clone_trait_object, DynClone};
use serde::Serialize;

use crate::cpu::linear::LinearPowerModel;

/// Model for computing power consumption of a physical host from its utilization.
pub trait PowerModel: DynClone {
    /// Computes the current power consumption in watts.
    ///
    /// * `time` - current simulation time.
    /// * `utilization` - current host utilization (0-1).
    fn get_power(&self, time: f64, utilization: f64) -> f64;
}

clone_trait_object!(PowerModel);

/// Power state of a physical host.
///
/// A host is `Off` until it receives its first VM. After the last VM leaves, the host stays `Idle`
/// and keeps drawing its idle power, since hosts are not powered off instantly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PowerState {
    Off,
    Idle,
    Active,
}

impl Display for PowerState {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PowerState::Off => write!(f, "off"),
            PowerState::Idle => write!(f, "idle"),
            PowerState::Active => write!(f, "active"),
        }
    }
}

/// A power model with constant power consumption value.
#[derive(Clone)]
pub struct ConstantPowerModel {
    power: f64,
}

impl ConstantPowerModel {
    /// Creates constant power model with specified parameters.
    ///
    /// * `power` - Power consumption value.
    pub fn new(power: f64) -> Self {
        Self { power }
    }
}

impl PowerModel for ConstantPowerModel {
    fn get_power(&self, _time: f64, _utilization: f64) -> f64 {
        self.power
    }
}

/// Computes the host power consumption using the provided power model.
///
/// The utilization passed to the model is the maximum of CPU and memory utilization,
/// so that whichever resource is the bottleneck drives the power draw.
/// A host in `Off` state consumes nothing, `Idle` and `Active` hosts consume according to the model.
#[derive(Clone)]
pub struct HostPowerModel {
    model: Box<dyn PowerModel>,
}

impl HostPowerModel {
    /// Creates host power model on top of the specified utilization model.
    pub fn new(model: Box<dyn PowerModel>) -> Self {
        Self { model }
    }

    /// Shortcut for the linear model `P = P_idle + (P_max - P_idle) * u`.
    pub fn linear(idle_power: f64, max_power: f64) -> Self {
        Self::new(Box::new(LinearPowerModel::new(idle_power, max_power)))
    }

    /// Returns the current power consumption of a physical host.
    pub fn get_power(&self, time: f64, state: PowerState, cpu_util: f64, memory_util: f64) -> f64 {
        match state {
            PowerState::Off => 0.,
            PowerState::Idle | PowerState::Active => self.model.get_power(time, cpu_util.max(memory_util)),
        }
    }

    /// Returns the power consumption of a powered on host with no load.
    pub fn idle_power(&self, time: f64) -> f64 {
        self.model.get_power(time, 0.)
    }
}

impl Default for HostPowerModel {
    fn default() -> Self {
        Self::linear(100., 200.)
    }
}
