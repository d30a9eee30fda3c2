//! Error types of the simulation core.

use thiserror::Error;

use crate::simulation::SimulationState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Placing the VM would overflow host CPU or memory.
    #[error("not enough capacity for vm #{vm_id} on host #{host_id}")]
    CapacityExceeded { host_id: u32, vm_id: u32 },

    /// No host in the fleet can ever fit the VM.
    #[error("vm #{vm_id} does not fit any host")]
    Infeasible { vm_id: u32 },

    #[error("vm #{vm_id} is not placed on host #{host_id}")]
    NotPlaced { host_id: u32, vm_id: u32 },

    #[error("vm #{vm_id} is already placed on host #{host_id}")]
    AlreadyPlaced { host_id: u32, vm_id: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Retirement found a VM missing from its host. The run state is corrupted and the run is aborted.
    #[error("vm #{vm_id} expected on host #{host_id} during retirement")]
    WorkloadExhaustedPrematurely { host_id: u32, vm_id: u32 },

    #[error("cannot {operation} simulation in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SimulationState,
    },
}
