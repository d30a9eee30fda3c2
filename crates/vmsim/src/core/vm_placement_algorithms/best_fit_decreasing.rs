//! Best Fit Decreasing algorithm.

use crate::core::common::Allocation;
use crate::core::resource_pool::ResourcePoolState;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Places the largest VMs first, each on the host with the least CPU left after placement.
///
/// The batch is sorted by CPU demand, then by memory demand (both descending), then by arrival time.
/// Hosts are ranked by remaining CPU after placement, then by remaining memory, then by ID.
/// Packing VMs tightly keeps the number of powered on hosts low.
#[derive(Clone, Default)]
pub struct BestFitDecreasing;

impl BestFitDecreasing {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmPlacementAlgorithm for BestFitDecreasing {
    fn name(&self) -> String {
        "BestFitDecreasing".to_string()
    }

    fn order_batch(&self, batch: &mut [Allocation]) {
        batch.sort_by(|a, b| {
            b.cpu_usage
                .cmp(&a.cpu_usage)
                .then(b.memory_usage.cmp(&a.memory_usage))
                .then(a.arrival_time.total_cmp(&b.arrival_time))
                .then(a.id.cmp(&b.id))
        });
    }

    fn rank_hosts(&mut self, alloc: &Allocation, pool_state: &ResourcePoolState) -> Vec<u32> {
        let mut hosts = pool_state.suitable_hosts(alloc);
        hosts.sort_by_key(|&host| {
            (
                pool_state.get_available_cpu(host) - alloc.cpu_usage,
                pool_state.get_available_memory(host) - alloc.memory_usage,
                host,
            )
        });
        hosts
    }
}
