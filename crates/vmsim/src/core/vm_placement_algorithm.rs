//! Virtual machine placement algorithms.

use dyn_clone::{clone_trait_object, DynClone};

use crate::core::common::Allocation;
use crate::core::config::{parse_config_value, parse_options, ConfigError};
use crate::core::resource_pool::ResourcePoolState;
use crate::core::vm_placement_algorithms::best_fit_decreasing::BestFitDecreasing;
use crate::core::vm_placement_algorithms::min_utilization::MinUtilization;
use crate::core::vm_placement_algorithms::random_fit::RandomFit;

/// Trait for implementation of VM placement algorithms.
///
/// The algorithm receives the batch of VMs pending in the current tick and may reorder it before placement.
/// Then, for each VM, it ranks the hosts which can accommodate the VM from the most to the least preferred one,
/// based on a read-only view of the resource pool. The scheduler commits the placement on the first host of the
/// ranking that accepts the VM and falls back to the next ones otherwise.
///
/// It is possible to implement arbitrary placement algorithm and use it in scheduler.
pub trait VmPlacementAlgorithm: DynClone {
    /// Returns the algorithm name used in logs and reports.
    fn name(&self) -> String;

    /// Orders the batch of pending VMs before placement. Keeps the arrival order by default.
    fn order_batch(&self, batch: &mut [Allocation]) {
        batch.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time).then(a.id.cmp(&b.id)));
    }

    /// Returns IDs of suitable hosts in order of preference. Empty result means that no host fits now.
    fn rank_hosts(&mut self, alloc: &Allocation, pool_state: &ResourcePoolState) -> Vec<u32>;

    /// Returns the most preferred suitable host.
    fn select_host(&mut self, alloc: &Allocation, pool_state: &ResourcePoolState) -> Option<u32> {
        self.rank_hosts(alloc, pool_state).first().copied()
    }
}

clone_trait_object!(VmPlacementAlgorithm);

/// Creates placement algorithm from its config string, e.g. `BestFitDecreasing` or `Random[seed=42]`.
///
/// `default_seed` is used by randomized algorithms if the seed is not set in options.
pub fn placement_algorithm_resolver(
    config_str: &str,
    default_seed: u64,
) -> Result<Box<dyn VmPlacementAlgorithm>, ConfigError> {
    let (algorithm_name, options) = parse_config_value(config_str);
    match algorithm_name.trim() {
        "BestFitDecreasing" | "BFD" => Ok(Box::new(BestFitDecreasing::new())),
        "MinUtilization" | "MinimumUtilization" => Ok(Box::new(MinUtilization::new())),
        "Random" | "RandomFit" => {
            let seed = match options.as_deref().map(parse_options) {
                Some(options) => match options.get("seed") {
                    Some(value) => value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::UnknownAlgorithm(config_str.to_string()))?,
                    None => default_seed,
                },
                None => default_seed,
            };
            Ok(Box::new(RandomFit::new(seed)))
        }
        _ => Err(ConfigError::UnknownAlgorithm(config_str.to_string())),
    }
}
