//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::common::Allocation;

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum VmStatus {
    Pending,
    Placed,
    Rejected,
    Completed,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Pending => write!(f, "pending"),
            VmStatus::Placed => write!(f, "placed"),
            VmStatus::Rejected => write!(f, "rejected"),
            VmStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Reason of VM rejection. Every rejection counts as a capacity shortfall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RejectionReason {
    /// VM demand exceeds the total capacity of every host.
    Infeasible,
    /// VM stayed pending for more than the allowed number of ticks.
    RetriesExhausted,
    /// VM departure time passed before it could be placed.
    Expired,
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            RejectionReason::Infeasible => write!(f, "infeasible"),
            RejectionReason::RetriesExhausted => write!(f, "retries_exhausted"),
            RejectionReason::Expired => write!(f, "expired"),
        }
    }
}

/// Workload entry describing a single VM: its resource demand, arrival time and duration in seconds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VmRequest {
    pub id: u32,
    pub cpu_usage: u32,
    pub memory_usage: u64,
    pub arrival_time: f64,
    pub duration: f64,
}

impl VmRequest {
    pub fn new(id: u32, cpu_usage: u32, memory_usage: u64, arrival_time: f64, duration: f64) -> Self {
        Self {
            id,
            cpu_usage,
            memory_usage,
            arrival_time,
            duration,
        }
    }
}

/// Represents virtual machine (VM).
///
// VM is characterized by its ID, resource requirements (vCPUs and memory), arrival time and duration.
// Host assignment and status are changed only through `Host::try_place` / `Host::remove` and the scheduler.
#[derive(Clone, Debug, Serialize)]
pub struct VirtualMachine {
    pub id: u32,
    pub cpu_usage: u32,
    pub memory_usage: u64,
    pub arrival_time: f64,
    pub duration: f64,
    status: VmStatus,
    host: Option<u32>,
    placement_time: Option<f64>,
    retry_ticks: u32,
    migration_count: u32,
    rejection_reason: Option<RejectionReason>,
}

impl VirtualMachine {
    /// Creates pending virtual machine from workload entry.
    pub fn new(request: &VmRequest) -> Self {
        Self {
            id: request.id,
            cpu_usage: request.cpu_usage,
            memory_usage: request.memory_usage,
            arrival_time: request.arrival_time,
            duration: request.duration,
            status: VmStatus::Pending,
            host: None,
            placement_time: None,
            retry_ticks: 0,
            migration_count: 0,
            rejection_reason: None,
        }
    }

    /// Returns the time when VM leaves the system.
    pub fn departure_time(&self) -> f64 {
        self.arrival_time + self.duration
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    /// Returns ID of host running the VM (only for placed VMs).
    pub fn host(&self) -> Option<u32> {
        self.host
    }

    /// Returns the time of the last successful placement.
    pub fn placement_time(&self) -> Option<f64> {
        self.placement_time
    }

    /// Returns the number of ticks the VM stayed pending after unsuccessful placement attempts.
    pub fn retry_ticks(&self) -> u32 {
        self.retry_ticks
    }

    pub fn migration_count(&self) -> u32 {
        self.migration_count
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        self.rejection_reason
    }

    /// Returns the resource request of the VM.
    pub fn allocation(&self) -> Allocation {
        Allocation {
            id: self.id,
            cpu_usage: self.cpu_usage,
            memory_usage: self.memory_usage,
            arrival_time: self.arrival_time,
        }
    }

    pub(crate) fn assign(&mut self, host_id: u32, time: f64) {
        self.host = Some(host_id);
        self.status = VmStatus::Placed;
        self.placement_time = Some(time);
    }

    pub(crate) fn unassign(&mut self) {
        self.host = None;
    }

    pub(crate) fn complete(&mut self) {
        self.host = None;
        self.status = VmStatus::Completed;
    }

    pub(crate) fn reject(&mut self, reason: RejectionReason) {
        self.host = None;
        self.status = VmStatus::Rejected;
        self.rejection_reason = Some(reason);
    }

    pub(crate) fn defer(&mut self) -> u32 {
        self.retry_ticks += 1;
        self.retry_ticks
    }

    pub(crate) fn record_migration(&mut self) {
        self.migration_count += 1;
    }
}
