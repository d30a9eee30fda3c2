use serde::Serialize;

/// Resource request of a single VM, as seen by placement algorithms.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Allocation {
    pub id: u32,
    pub cpu_usage: u32,
    pub memory_usage: u64,
    pub arrival_time: f64,
}

#[derive(Debug, PartialEq)]
pub enum AllocationVerdict {
    NotEnoughCPU,
    NotEnoughMemory,
    Success,
    HostNotFound,
}
