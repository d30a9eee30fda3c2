//! Main entry point for simulation configuration and execution.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::Serialize;

use vmsim_power_models::PowerState;

use crate::context::{SimulationClock, SimulationContext};
use crate::core::config::{MigrationConfig, SimulationConfig};
use crate::core::error::SimulationError;
use crate::core::host::{Host, HostSpec};
use crate::core::monitoring::{HostSnapshot, MetricsSample, MetricsSeries, SimulationReport, VmCounts};
use crate::core::power;
use crate::core::resource_pool::ResourcePoolState;
use crate::core::scheduler::Scheduler;
use crate::core::vm::{VirtualMachine, VmRequest, VmStatus};
use crate::core::vm_placement_algorithm::{placement_algorithm_resolver, VmPlacementAlgorithm};
use crate::experiment::{SimulationCallbacks, StepControl};
use crate::extensions::vm_migrator::{MigrationRecord, VmMigrator};
use crate::{log_debug, log_error, log_info, log_warn};

/// State of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SimulationState {
    Unconfigured,
    Configured,
    Running,
    Paused,
    Completed,
}

impl Display for SimulationState {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SimulationState::Unconfigured => write!(f, "unconfigured"),
            SimulationState::Configured => write!(f, "configured"),
            SimulationState::Running => write!(f, "running"),
            SimulationState::Paused => write!(f, "paused"),
            SimulationState::Completed => write!(f, "completed"),
        }
    }
}

/// Optional settings of a simulation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationOptions {
    /// Pending VM is rejected after this number of unsuccessful ticks (never if not set).
    pub max_retry_ticks: Option<u32>,
    /// Run is completed once the simulation time reaches this value (only by workload exhaustion if not set).
    pub simulation_length: Option<f64>,
    /// Enables VM migration.
    pub migration: Option<MigrationConfig>,
}

impl From<&SimulationConfig> for SimulationOptions {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            max_retry_ticks: config.max_retry_ticks,
            simulation_length: config.simulation_length,
            migration: config.migration.clone(),
        }
    }
}

/// Represents a simulation of VM placement on a fixed set of hosts with energy accounting.
///
/// The simulation advances in ticks of fixed length. Each tick is applied atomically in the following order:
/// VMs whose departure time has come are removed from hosts, arrived pending VMs are placed by the scheduler,
/// VMs are migrated from overloaded hosts (if enabled), host energy consumption is accumulated for the tick,
/// a metrics sample is recorded and the clock is advanced. The run is completed when there are no pending or
/// placed VMs left and no future arrivals, or when the simulation length is reached.
pub struct CloudSimulation {
    state: SimulationState,
    clock: SimulationClock,
    ctx: SimulationContext,
    tick_length: f64,
    ticks: u64,
    options: SimulationOptions,
    pool: ResourcePoolState,
    vms: BTreeMap<u32, VirtualMachine>,
    scheduler: Option<Scheduler>,
    migrator: Option<VmMigrator>,
    metrics: MetricsSeries,
    shortfall: u32,
    migrations: u32,
}

impl Default for CloudSimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudSimulation {
    /// Creates unconfigured simulation.
    pub fn new() -> Self {
        let clock = SimulationClock::new();
        let ctx = clock.create_context("simulation");
        Self {
            state: SimulationState::Unconfigured,
            clock,
            ctx,
            tick_length: 0.,
            ticks: 0,
            options: SimulationOptions::default(),
            pool: ResourcePoolState::new(),
            vms: BTreeMap::new(),
            scheduler: None,
            migrator: None,
            metrics: MetricsSeries::new(),
            shortfall: 0,
            migrations: 0,
        }
    }

    /// Creates configured simulation from the config: hosts, workload, placement algorithm and options.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let workload = config
            .load_workload()
            .map_err(|e| SimulationError::InvalidConfiguration(e.to_string()))?;
        let algorithm = placement_algorithm_resolver(&config.algorithm, config.seed)
            .map_err(|e| SimulationError::InvalidConfiguration(e.to_string()))?;
        let mut sim = Self::new();
        sim.configure_with(
            config.host_specs(),
            workload,
            algorithm,
            config.tick_length,
            SimulationOptions::from(config),
        )?;
        Ok(sim)
    }

    /// Configures the run with default options, see [`configure_with`](Self::configure_with).
    pub fn configure(
        &mut self,
        hosts: Vec<HostSpec>,
        workload: Vec<VmRequest>,
        algorithm: Box<dyn VmPlacementAlgorithm>,
        tick_length: f64,
    ) -> Result<(), SimulationError> {
        self.configure_with(hosts, workload, algorithm, tick_length, SimulationOptions::default())
    }

    /// Validates and applies the run configuration, resetting any previous run.
    ///
    /// Allowed in `Unconfigured`, `Configured` and `Completed` states. On error the simulation is left unchanged.
    pub fn configure_with(
        &mut self,
        hosts: Vec<HostSpec>,
        workload: Vec<VmRequest>,
        algorithm: Box<dyn VmPlacementAlgorithm>,
        tick_length: f64,
        options: SimulationOptions,
    ) -> Result<(), SimulationError> {
        self.check_state(
            "configure",
            &[
                SimulationState::Unconfigured,
                SimulationState::Configured,
                SimulationState::Completed,
            ],
        )?;
        validate_run(tick_length, &workload, &options)?;
        let pool = build_pool(&hosts)?;

        let min_duration = workload.iter().map(|vm| vm.duration).fold(f64::INFINITY, f64::min);
        if tick_length > min_duration {
            log_warn!(
                self.ctx,
                "tick length {} exceeds the shortest vm duration {}, departures will be delayed",
                tick_length,
                min_duration
            );
        }

        self.clock.reset();
        self.tick_length = tick_length;
        self.ticks = 0;
        self.pool = pool;
        self.vms = workload.iter().map(|request| (request.id, VirtualMachine::new(request))).collect();
        self.scheduler = Some(Scheduler::new(
            algorithm,
            options.max_retry_ticks,
            self.clock.create_context("scheduler"),
        ));
        self.migrator = options
            .migration
            .as_ref()
            .map(|config| VmMigrator::new(config, self.clock.create_context("migrator")));
        self.options = options;
        self.metrics.clear();
        self.shortfall = 0;
        self.migrations = 0;
        self.state = SimulationState::Configured;

        log_info!(
            self.ctx,
            "configured {} hosts, {} vms, algorithm {}, tick {}",
            self.pool.get_host_count(),
            self.vms.len(),
            self.algorithm_name(),
            tick_length
        );
        Ok(())
    }

    /// Starts the configured run.
    pub fn start(&mut self) -> Result<(), SimulationError> {
        self.check_state("start", &[SimulationState::Configured])?;
        self.state = SimulationState::Running;
        log_info!(self.ctx, "started");
        Ok(())
    }

    /// Suspends tick advancement keeping the state.
    pub fn pause(&mut self) -> Result<(), SimulationError> {
        self.check_state("pause", &[SimulationState::Running])?;
        self.state = SimulationState::Paused;
        log_info!(self.ctx, "paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SimulationError> {
        self.check_state("resume", &[SimulationState::Paused])?;
        self.state = SimulationState::Running;
        log_info!(self.ctx, "resumed");
        Ok(())
    }

    /// Completes the run immediately, discarding the remaining ticks.
    pub fn stop(&mut self) -> Result<(), SimulationError> {
        self.check_state("stop", &[SimulationState::Running, SimulationState::Paused])?;
        self.state = SimulationState::Completed;
        log_info!(self.ctx, "stopped");
        Ok(())
    }

    /// Performs a single tick and returns the resulting state.
    ///
    /// A configured run is started implicitly.
    /// An internal error aborts the run, leaving the simulation in `Completed` state.
    pub fn tick(&mut self) -> Result<SimulationState, SimulationError> {
        match self.state {
            SimulationState::Configured => self.start()?,
            SimulationState::Running => {}
            state => {
                return Err(SimulationError::InvalidState {
                    operation: "tick",
                    state,
                })
            }
        }
        if let Err(err) = self.process_tick() {
            log_error!(self.ctx, "run aborted: {}", err);
            self.state = SimulationState::Completed;
            return Err(err);
        }
        Ok(self.state)
    }

    /// Performs ticks until the run is completed or paused.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        self.check_state("run", &[SimulationState::Configured, SimulationState::Running])?;
        while self.tick()? == SimulationState::Running {}
        Ok(())
    }

    /// Performs up to `step_count` ticks, returns true if the run is not completed.
    pub fn steps(&mut self, step_count: u64) -> Result<bool, SimulationError> {
        self.check_state("steps", &[SimulationState::Configured, SimulationState::Running])?;
        for _ in 0..step_count {
            if self.tick()? != SimulationState::Running {
                break;
            }
        }
        Ok(self.state != SimulationState::Completed)
    }

    /// Runs the simulation invoking the callbacks, which decide after each tick whether to continue.
    ///
    /// A paused run can be continued by calling this method again.
    /// Returns the results produced by the callbacks upon completion, or empty results if the run was paused.
    pub fn run_with(
        &mut self,
        callbacks: &mut dyn SimulationCallbacks,
    ) -> Result<IndexMap<String, String>, SimulationError> {
        match self.state {
            SimulationState::Configured => {
                callbacks.on_simulation_start(self);
                self.start()?;
            }
            SimulationState::Paused => self.resume()?,
            SimulationState::Running => {}
            state => {
                return Err(SimulationError::InvalidState {
                    operation: "run",
                    state,
                })
            }
        }
        while self.state == SimulationState::Running {
            self.tick()?;
            match callbacks.on_step(self) {
                StepControl::Continue => {}
                StepControl::Pause if self.state == SimulationState::Running => {
                    self.pause()?;
                    return Ok(IndexMap::new());
                }
                StepControl::Stop if self.state == SimulationState::Running => self.stop()?,
                _ => {}
            }
        }
        Ok(callbacks.on_simulation_finish(self))
    }

    fn check_state(&self, operation: &'static str, allowed: &[SimulationState]) -> Result<(), SimulationError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SimulationError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn process_tick(&mut self) -> Result<(), SimulationError> {
        let time = self.clock.time();
        self.retire(time)?;
        self.admit(time)?;
        if let Some(migrator) = self.migrator.as_mut() {
            self.migrations += migrator.perform_migrations(&mut self.pool, &mut self.vms)?;
        }
        for host in self.pool.hosts_mut() {
            power::accumulate(host, time, self.tick_length);
        }
        self.sample(time);

        self.clock.advance(self.tick_length);
        self.ticks += 1;
        let exhausted = self
            .vms
            .values()
            .all(|vm| matches!(vm.status(), VmStatus::Rejected | VmStatus::Completed));
        let timed_out = self
            .options
            .simulation_length
            .map_or(false, |length| self.clock.time() >= length);
        if exhausted || timed_out {
            self.state = SimulationState::Completed;
            log_info!(
                self.ctx,
                "completed after {} ticks, total energy {:.3} J",
                self.ticks,
                self.total_energy()
            );
        }
        Ok(())
    }

    fn retire(&mut self, time: f64) -> Result<(), SimulationError> {
        let departing: Vec<(u32, u32)> = self
            .vms
            .values()
            .filter(|vm| vm.status() == VmStatus::Placed && vm.departure_time() <= time)
            .map(|vm| (vm.id, vm.host().unwrap_or(u32::MAX)))
            .collect();
        for (vm_id, host_id) in departing {
            let corrupted = SimulationError::WorkloadExhaustedPrematurely { host_id, vm_id };
            let (host, vm) = match (self.pool.host_mut(host_id), self.vms.get_mut(&vm_id)) {
                (Some(host), Some(vm)) => (host, vm),
                _ => return Err(corrupted),
            };
            host.remove(vm).map_err(|_| corrupted)?;
            vm.complete();
            log_debug!(self.ctx, "vm {} completed on host {}", vm_id, host_id);
        }
        Ok(())
    }

    fn admit(&mut self, time: f64) -> Result<(), SimulationError> {
        let batch: Vec<u32> = self
            .vms
            .values()
            .filter(|vm| vm.status() == VmStatus::Pending && vm.arrival_time <= time)
            .map(|vm| vm.id)
            .collect();
        if batch.is_empty() {
            return Ok(());
        }
        if let Some(scheduler) = self.scheduler.as_mut() {
            let outcome = scheduler.schedule(&batch, &mut self.pool, &mut self.vms)?;
            self.shortfall += outcome.rejected.len() as u32;
        }
        Ok(())
    }

    fn sample(&mut self, time: f64) {
        let hosts: Vec<HostSnapshot> = self
            .pool
            .hosts()
            .map(|host| HostSnapshot::new(host, power::instantaneous_power(host, time)))
            .collect();
        let total_power: f64 = hosts.iter().map(|host| host.power).sum();
        let active_hosts = self.pool.hosts().filter(|host| !host.vms().is_empty()).count() as u32;
        let idle_hosts = self
            .pool
            .hosts()
            .filter(|host| host.power_state() == PowerState::Idle)
            .count() as u32;
        self.metrics.push(MetricsSample {
            time,
            total_power,
            hosts,
            active_hosts,
            idle_hosts,
            vms: self.vm_counts(),
            shortfall: self.shortfall,
            migrations: self.migrations,
        });
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Returns the current simulation time.
    pub fn current_time(&self) -> f64 {
        self.clock.time()
    }

    pub fn tick_length(&self) -> f64 {
        self.tick_length
    }

    /// Returns the number of performed ticks.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn algorithm_name(&self) -> String {
        self.scheduler
            .as_ref()
            .map_or_else(|| "none".to_string(), |scheduler| scheduler.algorithm_name())
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.pool.host(host_id)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.pool.hosts()
    }

    pub fn resource_pool(&self) -> &ResourcePoolState {
        &self.pool
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.get(&vm_id)
    }

    pub fn vm_status(&self, vm_id: u32) -> Option<VmStatus> {
        self.vms.get(&vm_id).map(|vm| vm.status())
    }

    pub fn vms(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.values()
    }

    /// Returns IDs of VMs with the specified status.
    pub fn vms_with_status(&self, status: VmStatus) -> BTreeSet<u32> {
        self.vms
            .values()
            .filter(|vm| vm.status() == status)
            .map(|vm| vm.id)
            .collect()
    }

    pub fn vm_counts(&self) -> VmCounts {
        let mut counts = VmCounts::default();
        for vm in self.vms.values() {
            match vm.status() {
                VmStatus::Pending => counts.pending += 1,
                VmStatus::Placed => counts.placed += 1,
                VmStatus::Rejected => counts.rejected += 1,
                VmStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }

    /// Returns the number of rejected VMs.
    pub fn shortfall(&self) -> u32 {
        self.shortfall
    }

    pub fn total_migrations(&self) -> u32 {
        self.migrations
    }

    pub fn migration_history(&self) -> &[MigrationRecord] {
        match &self.migrator {
            Some(migrator) => migrator.history(),
            None => &[],
        }
    }

    /// Returns the current summary power consumption of all hosts in W.
    pub fn total_power(&self) -> f64 {
        power::total_power(self.pool.hosts(), self.clock.time())
    }

    /// Returns the total energy consumption of all hosts in J.
    pub fn total_energy(&self) -> f64 {
        self.pool.hosts().map(|host| host.energy_consumed()).sum()
    }

    pub fn metrics(&self) -> &MetricsSeries {
        &self.metrics
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport::new(
            self.algorithm_name(),
            self.clock.time(),
            &self.metrics,
            self.pool.hosts(),
            self.vm_counts(),
        )
    }

    /// Returns the context used by the simulation for logging.
    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }
}

fn invalid(message: String) -> SimulationError {
    SimulationError::InvalidConfiguration(message)
}

fn validate_run(tick_length: f64, workload: &[VmRequest], options: &SimulationOptions) -> Result<(), SimulationError> {
    if !(tick_length.is_finite() && tick_length > 0.) {
        return Err(invalid(format!("tick length must be positive, got {}", tick_length)));
    }
    let mut ids = BTreeSet::new();
    for vm in workload {
        if !ids.insert(vm.id) {
            return Err(invalid(format!("duplicate vm id {}", vm.id)));
        }
        if vm.cpu_usage == 0 || vm.memory_usage == 0 {
            return Err(invalid(format!("vm {} has zero demand", vm.id)));
        }
        if !(vm.duration.is_finite() && vm.duration > 0.) {
            return Err(invalid(format!("vm {} has invalid duration {}", vm.id, vm.duration)));
        }
        if !(vm.arrival_time.is_finite() && vm.arrival_time >= 0.) {
            return Err(invalid(format!("vm {} has invalid arrival time {}", vm.id, vm.arrival_time)));
        }
    }
    if let Some(length) = options.simulation_length {
        if !(length > 0.) {
            return Err(invalid(format!("simulation length must be positive, got {}", length)));
        }
    }
    if let Some(migration) = &options.migration {
        if !(migration.overload_threshold > 0. && migration.overload_threshold <= 1.) {
            return Err(invalid(format!(
                "overload threshold must be in (0, 1], got {}",
                migration.overload_threshold
            )));
        }
        if !(0. ..1.).contains(&migration.underload_factor) {
            return Err(invalid(format!(
                "underload factor must be in [0, 1), got {}",
                migration.underload_factor
            )));
        }
    }
    Ok(())
}

fn build_pool(hosts: &[HostSpec]) -> Result<ResourcePoolState, SimulationError> {
    if hosts.is_empty() {
        return Err(invalid("host list is empty".to_string()));
    }
    let mut pool = ResourcePoolState::new();
    for spec in hosts {
        if pool.host(spec.id).is_some() {
            return Err(invalid(format!("duplicate host id {}", spec.id)));
        }
        pool.add_host(Host::new(spec)?);
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vm_placement_algorithms::best_fit_decreasing::BestFitDecreasing;

    #[test]
    fn test_missing_vm_on_retirement_aborts_run() {
        let mut sim = CloudSimulation::new();
        sim.configure(
            vec![HostSpec::new(0, 4, 8, 100., 200.)],
            vec![VmRequest::new(0, 2, 2, 0., 60.)],
            Box::new(BestFitDecreasing::new()),
            60.,
        )
        .unwrap();
        assert_eq!(sim.tick().unwrap(), SimulationState::Running);

        // host forgets the VM while the VM still points at the host
        let vm = sim.vms.get_mut(&0).unwrap();
        sim.pool.host_mut(0).unwrap().remove(vm).unwrap();
        vm.assign(0, 0.);
        assert_eq!(vm.status(), VmStatus::Placed);

        assert_eq!(
            sim.tick(),
            Err(SimulationError::WorkloadExhaustedPrematurely { host_id: 0, vm_id: 0 })
        );
        assert_eq!(sim.state(), SimulationState::Completed);
        assert!(matches!(sim.tick(), Err(SimulationError::InvalidState { .. })));
    }
}
