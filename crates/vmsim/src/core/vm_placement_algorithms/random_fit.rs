//! Random Fit algorithm.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::core::common::Allocation;
use crate::core::resource_pool::ResourcePoolState;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Uses a suitable host chosen uniformly at random.
///
/// Fallback hosts are also drawn uniformly from the remaining suitable ones.
/// Runs with the same random generator state produce the same placements.
#[derive(Clone)]
pub struct RandomFit<R = Pcg64> {
    rng: R,
}

impl RandomFit<Pcg64> {
    /// Creates algorithm using PCG generator with the specified seed.
    pub fn new(seed: u64) -> Self {
        Self::with_rng(Pcg64::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomFit<R> {
    /// Creates algorithm using the provided random generator.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Clone> VmPlacementAlgorithm for RandomFit<R> {
    fn name(&self) -> String {
        "Random".to_string()
    }

    fn rank_hosts(&mut self, alloc: &Allocation, pool_state: &ResourcePoolState) -> Vec<u32> {
        let mut hosts = pool_state.suitable_hosts(alloc);
        hosts.shuffle(&mut self.rng);
        hosts
    }
}
