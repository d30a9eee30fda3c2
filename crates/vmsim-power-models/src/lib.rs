//! Host power consumption models and energy accounting.

pub mod cpu;
pub mod energy_meter;
pub mod power_model;

pub use energy_meter::EnergyMeter;
pub use power_model::{ConstantPowerModel, HostPowerModel, PowerModel, PowerState};
