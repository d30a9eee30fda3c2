//! Component performing placement of pending VMs.

use std::collections::BTreeMap;

use crate::context::SimulationContext;
use crate::core::common::Allocation;
use crate::core::error::SimulationError;
use crate::core::resource_pool::ResourcePoolState;
use crate::core::vm::{RejectionReason, VirtualMachine};
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;
use crate::{log_debug, log_trace};

/// Result of processing a batch of pending VMs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlacementOutcome {
    /// Placed VMs with their hosts, in placement order.
    pub placed: Vec<(u32, u32)>,
    /// VMs left pending until the next tick.
    pub deferred: Vec<u32>,
    /// Rejected VMs with rejection reasons.
    pub rejected: Vec<(u32, RejectionReason)>,
}

/// Scheduler processes batches of pending VMs by selecting hosts for running them.
///
/// The placement decision is delegated to the configured VM placement algorithm, which ranks the suitable hosts
/// using a read-only view of the resource pool. The scheduler then commits the placement on the first ranked host
/// accepting the VM. If the host refuses the VM because of insufficient capacity, the next ranked host is tried.
///
/// VMs which do not fit any host even when it is empty are rejected immediately. VMs which could not be placed
/// stay pending and are retried on the next tick, until the retry limit is exceeded or their departure time passes
/// before a retry.
pub struct Scheduler {
    algorithm: Box<dyn VmPlacementAlgorithm>,
    max_retry_ticks: Option<u32>,
    ctx: SimulationContext,
}

impl Scheduler {
    /// Creates scheduler with specified VM placement algorithm.
    pub fn new(algorithm: Box<dyn VmPlacementAlgorithm>, max_retry_ticks: Option<u32>, ctx: SimulationContext) -> Self {
        Self {
            algorithm,
            max_retry_ticks,
            ctx,
        }
    }

    pub fn algorithm_name(&self) -> String {
        self.algorithm.name()
    }

    /// Tries to place the batch of pending VMs at the current simulation time.
    ///
    /// Only unexpected host errors are returned, capacity conflicts are resolved by trying the next candidate.
    pub fn schedule(
        &mut self,
        batch: &[u32],
        pool: &mut ResourcePoolState,
        vms: &mut BTreeMap<u32, VirtualMachine>,
    ) -> Result<PlacementOutcome, SimulationError> {
        let time = self.ctx.time();
        let mut allocs: Vec<Allocation> = batch
            .iter()
            .filter_map(|vm_id| vms.get(vm_id).map(|vm| vm.allocation()))
            .collect();
        self.algorithm.order_batch(&mut allocs);

        let mut outcome = PlacementOutcome::default();
        for alloc in allocs {
            let vm = match vms.get_mut(&alloc.id) {
                Some(vm) => vm,
                None => continue,
            };

            if !pool.is_feasible(&alloc) {
                let err = SimulationError::Infeasible { vm_id: vm.id };
                log_debug!(self.ctx, "rejected: {}", err);
                vm.reject(RejectionReason::Infeasible);
                outcome.rejected.push((vm.id, RejectionReason::Infeasible));
                continue;
            }

            // A first attempt is always made, the VM is retired on the next tick if already departed.
            if vm.retry_ticks() > 0 && vm.departure_time() <= time {
                log_debug!(self.ctx, "vm {} expired before placement", vm.id);
                vm.reject(RejectionReason::Expired);
                outcome.rejected.push((vm.id, RejectionReason::Expired));
                continue;
            }

            let mut placed_on = None;
            for host_id in self.algorithm.rank_hosts(&alloc, pool) {
                let host = match pool.host_mut(host_id) {
                    Some(host) => host,
                    None => continue,
                };
                match host.try_place(vm, time) {
                    Ok(()) => {
                        placed_on = Some(host_id);
                        break;
                    }
                    Err(err @ SimulationError::CapacityExceeded { .. }) => {
                        log_trace!(self.ctx, "{}, trying next host", err);
                    }
                    Err(err) => return Err(err),
                }
            }

            match placed_on {
                Some(host_id) => {
                    log_debug!(self.ctx, "placed vm {} on host {}", vm.id, host_id);
                    outcome.placed.push((vm.id, host_id));
                }
                None => {
                    let retries = vm.defer();
                    if self.max_retry_ticks.map_or(false, |max| retries > max) {
                        log_debug!(self.ctx, "vm {} rejected after {} retries", vm.id, retries);
                        vm.reject(RejectionReason::RetriesExhausted);
                        outcome.rejected.push((vm.id, RejectionReason::RetriesExhausted));
                    } else {
                        outcome.deferred.push(vm.id);
                    }
                }
            }
        }

        if !outcome.deferred.is_empty() {
            log_debug!(self.ctx, "failed to place {} vms", outcome.deferred.len());
        }
        Ok(outcome)
    }
}
