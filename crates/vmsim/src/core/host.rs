//! Physical host state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use vmsim_power_models::cpu::empirical::EmpiricalPowerModel;
use vmsim_power_models::cpu::utilization_aware::UtilizationAwarePowerModel;
use vmsim_power_models::{EnergyMeter, HostPowerModel, PowerState};

use crate::core::common::AllocationVerdict;
use crate::core::error::SimulationError;
use crate::core::vm::VirtualMachine;

/// Utilization to power model of a host.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub enum PowerModelKind {
    /// `P = P_idle + (P_max - P_idle) * u`.
    #[default]
    Linear,
    /// Concave model growing faster at low utilization.
    UtilizationAware,
    /// Interpolation of 11 power measurements taken at 0%, 10%, ..., 100% utilization.
    Empirical(Vec<f64>),
}

/// Immutable description of a physical host used to build the fleet.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostSpec {
    pub id: u32,
    pub name: String,
    pub cpu_capacity: u32,
    pub ram_capacity: u64,
    pub idle_power: f64,
    pub max_power: f64,
    #[serde(default)]
    pub power_model: PowerModelKind,
}

impl HostSpec {
    pub fn new(id: u32, cpu_capacity: u32, ram_capacity: u64, idle_power: f64, max_power: f64) -> Self {
        Self {
            id,
            name: format!("h{}", id),
            cpu_capacity,
            ram_capacity,
            idle_power,
            max_power,
            power_model: PowerModelKind::Linear,
        }
    }

    /// Checks the spec and builds its power model.
    pub fn build_power_model(&self) -> Result<HostPowerModel, SimulationError> {
        if self.cpu_capacity == 0 || self.ram_capacity == 0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "host {} has zero capacity",
                self.name
            )));
        }
        if !(self.idle_power >= 0. && self.max_power >= self.idle_power) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "host {} power range [{}, {}] is invalid",
                self.name, self.idle_power, self.max_power
            )));
        }
        let model = match &self.power_model {
            PowerModelKind::Linear => HostPowerModel::linear(self.idle_power, self.max_power),
            PowerModelKind::UtilizationAware => HostPowerModel::new(Box::new(UtilizationAwarePowerModel::new(
                self.idle_power,
                self.max_power,
            ))),
            PowerModelKind::Empirical(measurements) => match EmpiricalPowerModel::new(measurements.clone()) {
                Some(model) => HostPowerModel::new(Box::new(model)),
                None => {
                    return Err(SimulationError::InvalidConfiguration(format!(
                        "host {} needs 11 power measurements, got {}",
                        self.name,
                        measurements.len()
                    )))
                }
            },
        };
        Ok(model)
    }
}

/// Represents a physical host: fixed capacity, placed VMs and consumed energy.
///
/// Used resources are the sums of demands of placed VMs and never exceed the host capacity.
#[derive(Clone)]
pub struct Host {
    pub id: u32,
    pub name: String,

    cpu_total: u32,
    cpu_allocated: u32,

    memory_total: u64,
    memory_allocated: u64,

    vms: BTreeSet<u32>,
    was_active: bool,

    power_model: HostPowerModel,
    energy_meter: EnergyMeter,
}

impl Host {
    /// Creates host with the power model described by the spec.
    ///
    /// Fails with `InvalidConfiguration` if the spec has zero capacity or invalid power parameters.
    pub fn new(spec: &HostSpec) -> Result<Self, SimulationError> {
        Ok(Self::with_power_model(spec, spec.build_power_model()?))
    }

    /// Creates host with the specified power model.
    pub fn with_power_model(spec: &HostSpec, power_model: HostPowerModel) -> Self {
        Self {
            id: spec.id,
            name: spec.name.clone(),
            cpu_total: spec.cpu_capacity,
            cpu_allocated: 0,
            memory_total: spec.ram_capacity,
            memory_allocated: 0,
            vms: BTreeSet::new(),
            was_active: false,
            power_model,
            energy_meter: EnergyMeter::new(),
        }
    }

    /// Checks if a VM with the specified demand fits the currently available resources.
    pub fn can_allocate(&self, cpu_usage: u32, memory_usage: u64) -> AllocationVerdict {
        if self.cpu_available() < cpu_usage {
            return AllocationVerdict::NotEnoughCPU;
        }
        if self.memory_available() < memory_usage {
            return AllocationVerdict::NotEnoughMemory;
        }
        AllocationVerdict::Success
    }

    pub fn can_fit(&self, cpu_usage: u32, memory_usage: u64) -> bool {
        self.can_allocate(cpu_usage, memory_usage) == AllocationVerdict::Success
    }

    /// Checks if a VM with the specified demand fits the host when it is empty.
    pub fn could_ever_fit(&self, cpu_usage: u32, memory_usage: u64) -> bool {
        self.cpu_total >= cpu_usage && self.memory_total >= memory_usage
    }

    /// Places the VM on this host.
    ///
    /// Fails with `CapacityExceeded` without changing anything if CPU or memory would overflow.
    pub fn try_place(&mut self, vm: &mut VirtualMachine, time: f64) -> Result<(), SimulationError> {
        if self.vms.contains(&vm.id) {
            return Err(SimulationError::AlreadyPlaced {
                host_id: self.id,
                vm_id: vm.id,
            });
        }
        if self.can_allocate(vm.cpu_usage, vm.memory_usage) != AllocationVerdict::Success {
            return Err(SimulationError::CapacityExceeded {
                host_id: self.id,
                vm_id: vm.id,
            });
        }
        self.cpu_allocated += vm.cpu_usage;
        self.memory_allocated += vm.memory_usage;
        self.vms.insert(vm.id);
        self.was_active = true;
        vm.assign(self.id, time);
        Ok(())
    }

    /// Removes the VM from this host and frees its resources.
    ///
    /// The VM loses its host assignment, its status is left to the caller.
    pub fn remove(&mut self, vm: &mut VirtualMachine) -> Result<(), SimulationError> {
        if !self.vms.remove(&vm.id) {
            return Err(SimulationError::NotPlaced {
                host_id: self.id,
                vm_id: vm.id,
            });
        }
        self.cpu_allocated -= vm.cpu_usage;
        self.memory_allocated -= vm.memory_usage;
        vm.unassign();
        Ok(())
    }

    /// Returns CPU and memory utilization ratios.
    pub fn utilization(&self) -> (f64, f64) {
        (self.cpu_load(), self.memory_load())
    }

    /// Returns the allocated fraction of CPU.
    pub fn cpu_load(&self) -> f64 {
        self.cpu_allocated as f64 / self.cpu_total as f64
    }

    /// Returns the allocated fraction of memory.
    pub fn memory_load(&self) -> f64 {
        self.memory_allocated as f64 / self.memory_total as f64
    }

    pub fn power_state(&self) -> PowerState {
        if !self.vms.is_empty() {
            PowerState::Active
        } else if self.was_active {
            PowerState::Idle
        } else {
            PowerState::Off
        }
    }

    pub fn cpu_total(&self) -> u32 {
        self.cpu_total
    }

    pub fn memory_total(&self) -> u64 {
        self.memory_total
    }

    pub fn cpu_allocated(&self) -> u32 {
        self.cpu_allocated
    }

    pub fn memory_allocated(&self) -> u64 {
        self.memory_allocated
    }

    pub fn cpu_available(&self) -> u32 {
        self.cpu_total - self.cpu_allocated
    }

    pub fn memory_available(&self) -> u64 {
        self.memory_total - self.memory_allocated
    }

    /// Returns IDs of VMs placed on this host.
    pub fn vms(&self) -> &BTreeSet<u32> {
        &self.vms
    }

    pub fn power_model(&self) -> &HostPowerModel {
        &self.power_model
    }

    /// Returns the total energy consumption in joules.
    pub fn energy_consumed(&self) -> f64 {
        self.energy_meter.energy_consumed()
    }

    pub(crate) fn energy_meter_mut(&mut self) -> &mut EnergyMeter {
        &mut self.energy_meter
    }
}
