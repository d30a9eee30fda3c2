//! Threshold-based VM migration.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::context::SimulationContext;
use crate::core::config::MigrationConfig;
use crate::core::error::SimulationError;
use crate::core::resource_pool::ResourcePoolState;
use crate::core::vm::VirtualMachine;
use crate::{log_debug, log_trace, log_warn};

/// Relocation of a VM between hosts.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MigrationRecord {
    pub time: f64,
    pub vm_id: u32,
    pub source: u32,
    pub target: u32,
}

/// Relocates VMs from overloaded hosts to underloaded ones.
///
/// A host is overloaded if its CPU load exceeds the overload threshold and underloaded if its CPU load is below
/// `overload_threshold * underload_factor`. VMs of an overloaded host are moved in ID order to the first
/// underloaded host which can accommodate them, until the host is no longer overloaded.
/// Each VM can be migrated at most `max_migrations_per_vm` times. Migration is instant.
pub struct VmMigrator {
    overload_threshold: f64,
    underload_threshold: f64,
    max_migrations_per_vm: u32,
    history: Vec<MigrationRecord>,
    ctx: SimulationContext,
}

impl VmMigrator {
    pub fn new(config: &MigrationConfig, ctx: SimulationContext) -> Self {
        Self {
            overload_threshold: config.overload_threshold,
            underload_threshold: config.overload_threshold * config.underload_factor,
            max_migrations_per_vm: config.max_migrations_per_vm,
            history: Vec::new(),
            ctx,
        }
    }

    /// Performs migrations and returns their number.
    pub fn perform_migrations(
        &mut self,
        pool: &mut ResourcePoolState,
        vms: &mut BTreeMap<u32, VirtualMachine>,
    ) -> Result<u32, SimulationError> {
        log_trace!(self.ctx, "perform migrations");
        let overloaded: Vec<u32> = pool
            .hosts()
            .filter(|host| host.cpu_load() > self.overload_threshold)
            .map(|host| host.id)
            .collect();
        let underloaded: Vec<u32> = pool
            .hosts()
            .filter(|host| host.cpu_load() < self.underload_threshold)
            .map(|host| host.id)
            .collect();
        if overloaded.is_empty() || underloaded.is_empty() {
            return Ok(0);
        }

        let time = self.ctx.time();
        let mut migrations = 0;
        for source_id in overloaded {
            let source_vms: Vec<u32> = match pool.host(source_id) {
                Some(host) => host.vms().iter().copied().collect(),
                None => continue,
            };
            log_debug!(self.ctx, "host {} is overloaded ({} vms)", source_id, source_vms.len());

            for vm_id in source_vms {
                if pool.get_cpu_load(source_id) <= self.overload_threshold {
                    break;
                }
                let vm = match vms.get_mut(&vm_id) {
                    Some(vm) => vm,
                    None => continue,
                };
                if vm.migration_count() >= self.max_migrations_per_vm {
                    continue;
                }
                let target = underloaded.iter().copied().find(|&target_id| {
                    target_id != source_id
                        && pool.host(target_id).map_or(false, |host| {
                            host.cpu_load() < self.underload_threshold && host.can_fit(vm.cpu_usage, vm.memory_usage)
                        })
                });
                let target_id = match target {
                    Some(target_id) => target_id,
                    None => continue,
                };

                if let Some(source) = pool.host_mut(source_id) {
                    source.remove(vm)?;
                }
                let placed = match pool.host_mut(target_id) {
                    Some(target) => target.try_place(vm, time),
                    None => Err(SimulationError::NotPlaced {
                        host_id: target_id,
                        vm_id,
                    }),
                };
                if let Err(err) = placed {
                    log_warn!(self.ctx, "migration of vm {} failed: {}", vm_id, err);
                    if let Some(source) = pool.host_mut(source_id) {
                        source.try_place(vm, time)?;
                    }
                    continue;
                }

                vm.record_migration();
                migrations += 1;
                self.history.push(MigrationRecord {
                    time,
                    vm_id,
                    source: source_id,
                    target: target_id,
                });
                log_debug!(self.ctx, "migrated vm {} from host {} to host {}", vm_id, source_id, target_id);
            }
        }
        Ok(migrations)
    }

    pub fn history(&self) -> &[MigrationRecord] {
        &self.history
    }
}
