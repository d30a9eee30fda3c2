//! Minimum Utilization algorithm.

use crate::core::common::Allocation;
use crate::core::resource_pool::ResourcePoolState;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Uses the least loaded (by allocated CPU, then memory) suitable host.
///
/// Spreads the load across hosts at the cost of keeping more of them powered on.
#[derive(Clone, Default)]
pub struct MinUtilization;

impl MinUtilization {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmPlacementAlgorithm for MinUtilization {
    fn name(&self) -> String {
        "MinUtilization".to_string()
    }

    fn rank_hosts(&mut self, alloc: &Allocation, pool_state: &ResourcePoolState) -> Vec<u32> {
        let mut hosts = pool_state.suitable_hosts(alloc);
        hosts.sort_by(|&a, &b| {
            pool_state
                .get_cpu_load(a)
                .total_cmp(&pool_state.get_cpu_load(b))
                .then(pool_state.get_memory_load(a).total_cmp(&pool_state.get_memory_load(b)))
                .then(a.cmp(&b))
        });
        hosts
    }
}
