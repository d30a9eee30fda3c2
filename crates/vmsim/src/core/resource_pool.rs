//! Resource pool state.

use std::collections::BTreeMap;

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::host::Host;

/// Stores all hosts of the simulation indexed by host ID.
///
/// Placement algorithms get read-only access to the pool, the scheduler commits placements through it.
#[derive(Clone, Default)]
pub struct ResourcePoolState {
    hosts: BTreeMap<u32, Host>,
}

impl ResourcePoolState {
    /// Creates empty resource pool state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds host to resource pool.
    pub fn add_host(&mut self, host: Host) {
        self.hosts.insert(host.id, host);
    }

    /// Returns IDs of all hosts in ascending order.
    pub fn get_host_ids(&self) -> Vec<u32> {
        self.hosts.keys().cloned().collect()
    }

    /// Returns the number of hosts.
    pub fn get_host_count(&self) -> u32 {
        self.hosts.len() as u32
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(&host_id)
    }

    pub fn host_mut(&mut self, host_id: u32) -> Option<&mut Host> {
        self.hosts.get_mut(&host_id)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn hosts_mut(&mut self) -> impl Iterator<Item = &mut Host> {
        self.hosts.values_mut()
    }

    /// Checks if the specified allocation is currently possible on the specified host.
    pub fn can_allocate(&self, alloc: &Allocation, host_id: u32) -> AllocationVerdict {
        match self.hosts.get(&host_id) {
            Some(host) => host.can_allocate(alloc.cpu_usage, alloc.memory_usage),
            None => AllocationVerdict::HostNotFound,
        }
    }

    /// Returns IDs of hosts which can currently accommodate the allocation, in ascending order.
    pub fn suitable_hosts(&self, alloc: &Allocation) -> Vec<u32> {
        self.hosts
            .values()
            .filter(|host| host.can_allocate(alloc.cpu_usage, alloc.memory_usage) == AllocationVerdict::Success)
            .map(|host| host.id)
            .collect()
    }

    /// Checks if at least one host could accommodate the allocation when empty.
    pub fn is_feasible(&self, alloc: &Allocation) -> bool {
        self.hosts
            .values()
            .any(|host| host.could_ever_fit(alloc.cpu_usage, alloc.memory_usage))
    }

    /// Returns the amount of available vCPUs on the specified host.
    pub fn get_available_cpu(&self, host_id: u32) -> u32 {
        self.hosts[&host_id].cpu_available()
    }

    /// Returns the amount of available memory on the specified host.
    pub fn get_available_memory(&self, host_id: u32) -> u64 {
        self.hosts[&host_id].memory_available()
    }

    /// Returns the CPU allocation rate (ratio of allocated to total resources) of the specified host.
    pub fn get_cpu_load(&self, host_id: u32) -> f64 {
        self.hosts[&host_id].cpu_load()
    }

    /// Returns the memory allocation rate (ratio of allocated to total resources) of the specified host.
    pub fn get_memory_load(&self, host_id: u32) -> f64 {
        self.hosts[&host_id].memory_load()
    }
}
