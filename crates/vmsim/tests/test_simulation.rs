use indexmap::IndexMap;

use vmsim::core::config::{MigrationConfig, SimulationConfig};
use vmsim::core::error::SimulationError;
use vmsim::core::host::HostSpec;
use vmsim::core::vm::{RejectionReason, VmRequest, VmStatus};
use vmsim::core::vm_placement_algorithms::best_fit_decreasing::BestFitDecreasing;
use vmsim::core::vm_placement_algorithms::min_utilization::MinUtilization;
use vmsim::experiment::{SimulationCallbacks, StepControl};
use vmsim::extensions::vm_migrator::MigrationRecord;
use vmsim::simulation::{CloudSimulation, SimulationOptions, SimulationState};
use vmsim_power_models::PowerState;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn hosts(specs: &[(u32, u64)]) -> Vec<HostSpec> {
    specs
        .iter()
        .enumerate()
        .map(|(id, (cpu, memory))| HostSpec::new(id as u32, *cpu, *memory, 100., 200.))
        .collect()
}

fn configured(host_specs: &[(u32, u64)], workload: Vec<VmRequest>, options: SimulationOptions) -> CloudSimulation {
    let mut sim = CloudSimulation::new();
    sim.configure_with(hosts(host_specs), workload, Box::new(BestFitDecreasing::new()), 60., options)
        .unwrap();
    sim
}

#[test]
// Two equal hosts, one VM running for two ticks: the VM goes to host 0, which is active for two ticks
// and idle for the tick of VM completion.
fn test_end_to_end() {
    let mut sim = configured(
        &[(4, 8), (4, 8)],
        vec![VmRequest::new(0, 2, 4, 0., 120.)],
        SimulationOptions::default(),
    );

    assert_eq!(sim.tick().unwrap(), SimulationState::Running);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Placed));
    assert_eq!(sim.vm(0).unwrap().host(), Some(0));
    assert_eq!(sim.host(0).unwrap().energy_consumed(), 9000.);

    assert_eq!(sim.tick().unwrap(), SimulationState::Running);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Placed));

    assert_eq!(sim.tick().unwrap(), SimulationState::Completed);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Completed));
    assert_eq!(sim.vm(0).unwrap().host(), None);
    assert!(sim.host(0).unwrap().vms().is_empty());
    assert_eq!(sim.host(0).unwrap().power_state(), PowerState::Idle);

    assert_eq!(sim.host(0).unwrap().energy_consumed(), 2. * 150. * 60. + 100. * 60.);
    assert_eq!(sim.host(1).unwrap().energy_consumed(), 0.);
    assert_eq!(sim.total_energy(), 24000.);
    assert_eq!(sim.current_time(), 180.);

    let samples = sim.metrics().samples();
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].time, 0.);
    assert_eq!(samples[0].total_power, 150.);
    assert_eq!(samples[0].active_hosts, 1);
    assert_eq!(samples[2].time, 120.);
    assert_eq!(samples[2].total_power, 100.);
    assert_eq!(samples[2].active_hosts, 0);
    assert_eq!(samples[2].idle_hosts, 1);
    assert_eq!(samples[2].hosts[1].power_state, PowerState::Off);

    let report = sim.report();
    assert_eq!(report.total_energy, 24000.);
    assert_eq!(report.ticks, 3);
    assert_eq!(report.peak_power, 150.);
    assert_eq!(report.shortfall, 0);
    assert_eq!(report.vms.completed, 1);
}

#[test]
fn test_infeasible_rejection() {
    let mut sim = configured(
        &[(8, 16), (8, 16)],
        vec![VmRequest::new(0, 10, 4, 0., 600.)],
        SimulationOptions::default(),
    );

    assert_eq!(sim.tick().unwrap(), SimulationState::Completed);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Rejected));
    assert_eq!(sim.vm(0).unwrap().rejection_reason(), Some(RejectionReason::Infeasible));
    assert_eq!(sim.vm(0).unwrap().placement_time(), None);
    assert_eq!(sim.shortfall(), 1);
    assert_eq!(sim.metrics().last().unwrap().shortfall, 1);
    assert_eq!(sim.total_energy(), 0.);
}

#[test]
fn test_retries_exhausted() {
    let options = SimulationOptions {
        max_retry_ticks: Some(2),
        ..Default::default()
    };
    let mut sim = configured(
        &[(4, 8)],
        vec![VmRequest::new(0, 4, 4, 0., 600.), VmRequest::new(1, 2, 2, 0., 600.)],
        options,
    );

    sim.steps(2).unwrap();
    assert_eq!(sim.vm_status(1), Some(VmStatus::Pending));
    assert_eq!(sim.vm(1).unwrap().retry_ticks(), 2);

    sim.tick().unwrap();
    assert_eq!(sim.vm_status(1), Some(VmStatus::Rejected));
    assert_eq!(sim.vm(1).unwrap().rejection_reason(), Some(RejectionReason::RetriesExhausted));
    assert_eq!(sim.shortfall(), 1);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Placed));
}

#[test]
fn test_pending_vm_expires() {
    let mut sim = configured(
        &[(4, 8)],
        vec![VmRequest::new(0, 4, 4, 0., 300.), VmRequest::new(1, 2, 2, 0., 120.)],
        SimulationOptions::default(),
    );

    sim.steps(2).unwrap();
    assert_eq!(sim.vm_status(1), Some(VmStatus::Pending));
    sim.tick().unwrap();
    assert_eq!(sim.vm(1).unwrap().rejection_reason(), Some(RejectionReason::Expired));

    sim.run().unwrap();
    assert_eq!(sim.state(), SimulationState::Completed);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Completed));
    assert_eq!(sim.report().shortfall, 1);
}

#[test]
// VM arriving at 30 departs at 50, before the tick at 60 admits it: it is still placed once and
// completed on the next tick instead of being rejected.
fn test_short_vm_between_ticks() {
    let mut sim = configured(&[(8, 8)], vec![VmRequest::new(0, 4, 4, 30., 20.)], SimulationOptions::default());

    sim.tick().unwrap();
    assert_eq!(sim.vm_status(0), Some(VmStatus::Pending));
    sim.tick().unwrap();
    assert_eq!(sim.vm_status(0), Some(VmStatus::Placed));
    assert_eq!(sim.vm(0).unwrap().placement_time(), Some(60.));

    sim.run().unwrap();
    assert_eq!(sim.state(), SimulationState::Completed);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Completed));
    assert_eq!(sim.vm(0).unwrap().rejection_reason(), None);
    assert_eq!(sim.shortfall(), 0);
    assert_eq!(sim.host(0).unwrap().cpu_available(), 8);
    assert_eq!(sim.total_energy(), 150. * 60. + 100. * 60.);
    assert_eq!(sim.current_time(), 180.);
}

#[test]
// A VM that never fits is reported as infeasible even if its departure time has already passed.
fn test_infeasible_wins_over_expiry() {
    let mut sim = configured(
        &[(8, 8)],
        vec![VmRequest::new(0, 10, 1, 30., 20.), VmRequest::new(1, 1, 1, 0., 600.)],
        SimulationOptions::default(),
    );

    sim.steps(2).unwrap();
    assert_eq!(sim.vm_status(0), Some(VmStatus::Rejected));
    assert_eq!(sim.vm(0).unwrap().rejection_reason(), Some(RejectionReason::Infeasible));
    assert_eq!(sim.shortfall(), 1);
}

#[test]
// Retried VM is placed once the host is freed.
fn test_pending_vm_placed_later() {
    let mut sim = configured(
        &[(4, 8)],
        vec![VmRequest::new(0, 4, 4, 0., 120.), VmRequest::new(1, 2, 2, 60., 600.)],
        SimulationOptions::default(),
    );

    sim.steps(2).unwrap();
    assert_eq!(sim.vm_status(1), Some(VmStatus::Pending));
    sim.tick().unwrap();
    assert_eq!(sim.vm_status(0), Some(VmStatus::Completed));
    assert_eq!(sim.vm_status(1), Some(VmStatus::Placed));
    assert_eq!(sim.vm(1).unwrap().placement_time(), Some(120.));
}

#[test]
fn test_state_transitions() {
    let mut sim = CloudSimulation::new();
    assert_eq!(sim.state(), SimulationState::Unconfigured);
    assert_eq!(
        sim.tick(),
        Err(SimulationError::InvalidState {
            operation: "tick",
            state: SimulationState::Unconfigured,
        })
    );
    assert!(sim.start().is_err());

    sim.configure(
        hosts(&[(4, 8)]),
        vec![VmRequest::new(0, 1, 1, 0., 6000.)],
        Box::new(BestFitDecreasing::new()),
        60.,
    )
    .unwrap();
    assert_eq!(sim.state(), SimulationState::Configured);
    assert!(sim.pause().is_err());

    sim.start().unwrap();
    assert_eq!(
        sim.start(),
        Err(SimulationError::InvalidState {
            operation: "start",
            state: SimulationState::Running,
        })
    );
    sim.tick().unwrap();
    assert!(sim
        .configure(hosts(&[(4, 8)]), vec![], Box::new(BestFitDecreasing::new()), 60.)
        .is_err());

    sim.pause().unwrap();
    assert_eq!(
        sim.tick(),
        Err(SimulationError::InvalidState {
            operation: "tick",
            state: SimulationState::Paused,
        })
    );
    assert!(sim.run().is_err());
    assert_eq!(sim.current_time(), 60.);

    sim.resume().unwrap();
    sim.tick().unwrap();
    assert_eq!(sim.tick_count(), 2);

    sim.stop().unwrap();
    assert_eq!(sim.state(), SimulationState::Completed);
    assert!(sim.tick().is_err());
    assert!(sim.resume().is_err());
    assert!(sim.stop().is_err());
    assert_eq!(sim.metrics().len(), 2);

    // completed run can be reconfigured
    sim.configure(
        hosts(&[(4, 8)]),
        vec![VmRequest::new(0, 1, 1, 0., 60.)],
        Box::new(MinUtilization::new()),
        60.,
    )
    .unwrap();
    assert_eq!(sim.state(), SimulationState::Configured);
    assert_eq!(sim.current_time(), 0.);
    assert!(sim.metrics().is_empty());
    sim.run().unwrap();
    assert_eq!(sim.state(), SimulationState::Completed);
}

#[test]
fn test_tick_starts_configured_run() {
    let mut sim = configured(
        &[(4, 8)],
        vec![VmRequest::new(0, 1, 1, 0., 600.)],
        SimulationOptions::default(),
    );
    assert_eq!(sim.tick().unwrap(), SimulationState::Running);
    assert_eq!(sim.state(), SimulationState::Running);
}

fn configure_error(host_specs: Vec<HostSpec>, workload: Vec<VmRequest>, tick_length: f64) -> SimulationError {
    let mut sim = CloudSimulation::new();
    let err = sim
        .configure(host_specs, workload, Box::new(BestFitDecreasing::new()), tick_length)
        .unwrap_err();
    assert_eq!(sim.state(), SimulationState::Unconfigured);
    err
}

#[test]
fn test_invalid_configuration() {
    let vm = || vec![VmRequest::new(0, 1, 1, 0., 60.)];
    let cases = vec![
        configure_error(vec![], vm(), 60.),
        configure_error(hosts(&[(0, 8)]), vm(), 60.),
        configure_error(hosts(&[(4, 0)]), vm(), 60.),
        configure_error(hosts(&[(4, 8)]), vm(), 0.),
        configure_error(hosts(&[(4, 8)]), vm(), -60.),
        configure_error(hosts(&[(4, 8)]), vm(), f64::NAN),
        configure_error(vec![HostSpec::new(0, 4, 8, 300., 200.)], vm(), 60.),
        configure_error(
            vec![HostSpec::new(0, 4, 8, 100., 200.), HostSpec::new(0, 4, 8, 100., 200.)],
            vm(),
            60.,
        ),
        configure_error(hosts(&[(4, 8)]), vec![VmRequest::new(0, 0, 1, 0., 60.)], 60.),
        configure_error(hosts(&[(4, 8)]), vec![VmRequest::new(0, 1, 0, 0., 60.)], 60.),
        configure_error(hosts(&[(4, 8)]), vec![VmRequest::new(0, 1, 1, 0., 0.)], 60.),
        configure_error(
            hosts(&[(4, 8)]),
            vec![VmRequest::new(0, 1, 1, 0., 60.), VmRequest::new(0, 1, 1, 0., 60.)],
            60.,
        ),
    ];
    for err in cases {
        assert!(matches!(err, SimulationError::InvalidConfiguration(_)), "{:?}", err);
    }

    let mut sim = CloudSimulation::new();
    let options = SimulationOptions {
        migration: Some(MigrationConfig {
            overload_threshold: 1.5,
            ..Default::default()
        }),
        ..Default::default()
    };
    assert!(matches!(
        sim.configure_with(hosts(&[(4, 8)]), vm(), Box::new(BestFitDecreasing::new()), 60., options),
        Err(SimulationError::InvalidConfiguration(_))
    ));
}

fn mixed_simulation(algorithm: &str) -> CloudSimulation {
    let mut config = SimulationConfig::from_file(&name_wrapper("config_mixed.yaml")).unwrap();
    config.algorithm = algorithm.to_string();
    config.migration = None;
    CloudSimulation::from_config(&config).unwrap()
}

#[test]
// Capacity is never exceeded, every VM is in exactly one status and host energy never decreases.
fn test_invariants() {
    let mut sim = mixed_simulation("MinUtilization");
    let mut last_energy = vec![0.; 4];
    loop {
        let state = sim.tick().unwrap();
        for host in sim.hosts() {
            assert!(host.cpu_allocated() <= host.cpu_total());
            assert!(host.memory_allocated() <= host.memory_total());
            let energy = host.energy_consumed();
            assert!(energy >= last_energy[host.id as usize]);
            last_energy[host.id as usize] = energy;
        }
        for vm in sim.vms() {
            let placed_on = sim.hosts().filter(|host| host.vms().contains(&vm.id)).count();
            if vm.status() == VmStatus::Placed {
                assert_eq!(placed_on, 1);
                assert!(vm.host().is_some());
            } else {
                assert_eq!(placed_on, 0);
                assert_eq!(vm.host(), None);
            }
        }
        let counts = sim.vm_counts();
        assert_eq!(counts.total(), 20);
        assert_eq!(sim.vms_with_status(VmStatus::Placed).len(), counts.placed as usize);
        assert_eq!(sim.vms_with_status(VmStatus::Pending).len(), counts.pending as usize);
        if state != SimulationState::Running {
            break;
        }
    }
    assert_eq!(sim.state(), SimulationState::Completed);
    assert_eq!(sim.current_time(), 14400.);
    for sample in sim.metrics().samples() {
        assert_eq!(sample.vms.total(), 20);
    }
}

#[test]
fn test_determinism() {
    for algorithm in ["BestFitDecreasing", "MinUtilization", "Random[seed=7]"] {
        let mut first = mixed_simulation(algorithm);
        let mut second = mixed_simulation(algorithm);
        first.run().unwrap();
        second.run().unwrap();
        assert_eq!(first.metrics().samples(), second.metrics().samples());
        assert_eq!(first.report(), second.report());
    }
}

#[test]
// Two VMs packed on one host overload it, one of them moves to the empty host.
fn test_migration() {
    let options = SimulationOptions {
        migration: Some(MigrationConfig::default()),
        ..Default::default()
    };
    let mut sim = configured(
        &[(4, 16), (4, 16)],
        vec![VmRequest::new(0, 2, 2, 0., 600.), VmRequest::new(1, 2, 2, 0., 600.)],
        options,
    );

    sim.tick().unwrap();
    assert_eq!(sim.total_migrations(), 1);
    assert_eq!(
        sim.migration_history(),
        &[MigrationRecord {
            time: 0.,
            vm_id: 0,
            source: 0,
            target: 1,
        }]
    );
    assert_eq!(sim.vm(0).unwrap().host(), Some(1));
    assert_eq!(sim.vm(0).unwrap().migration_count(), 1);
    assert_eq!(sim.vm(1).unwrap().host(), Some(0));
    assert_eq!(sim.host(0).unwrap().cpu_load(), 0.5);

    sim.tick().unwrap();
    assert_eq!(sim.total_migrations(), 1);
    assert_eq!(sim.metrics().last().unwrap().migrations, 1);
}

#[test]
fn test_migration_limit() {
    let options = SimulationOptions {
        migration: Some(MigrationConfig {
            max_migrations_per_vm: 0,
            ..Default::default()
        }),
        ..Default::default()
    };
    let mut sim = configured(
        &[(4, 16), (4, 16)],
        vec![VmRequest::new(0, 2, 2, 0., 600.), VmRequest::new(1, 2, 2, 0., 600.)],
        options,
    );
    sim.tick().unwrap();
    assert_eq!(sim.total_migrations(), 0);
    assert_eq!(sim.host(0).unwrap().cpu_load(), 1.);
}

#[derive(Clone)]
struct PauseAt {
    tick: u64,
    steps: u64,
}

impl SimulationCallbacks for PauseAt {
    fn on_step(&mut self, sim: &CloudSimulation) -> StepControl {
        self.steps += 1;
        if sim.tick_count() == self.tick {
            StepControl::Pause
        } else {
            StepControl::Continue
        }
    }

    fn on_simulation_finish(&mut self, sim: &CloudSimulation) -> IndexMap<String, String> {
        let mut results = IndexMap::new();
        results.insert("steps".to_string(), self.steps.to_string());
        results.insert("energy".to_string(), sim.total_energy().to_string());
        results
    }
}

#[test]
fn test_run_with_callbacks() {
    let mut sim = configured(
        &[(4, 8)],
        vec![VmRequest::new(0, 2, 4, 0., 300.)],
        SimulationOptions::default(),
    );
    let mut callbacks = PauseAt { tick: 2, steps: 0 };

    let results = sim.run_with(&mut callbacks).unwrap();
    assert!(results.is_empty());
    assert_eq!(sim.state(), SimulationState::Paused);
    assert_eq!(sim.tick_count(), 2);

    let results = sim.run_with(&mut callbacks).unwrap();
    assert_eq!(sim.state(), SimulationState::Completed);
    assert_eq!(sim.tick_count(), 6);
    assert_eq!(results["steps"], "6");
    assert_eq!(results["energy"], sim.total_energy().to_string());
}

#[derive(Clone)]
struct StopImmediately;

impl SimulationCallbacks for StopImmediately {
    fn on_step(&mut self, _sim: &CloudSimulation) -> StepControl {
        StepControl::Stop
    }
}

#[test]
fn test_run_with_stop() {
    let mut sim = configured(
        &[(4, 8)],
        vec![VmRequest::new(0, 2, 4, 0., 3000.)],
        SimulationOptions::default(),
    );
    sim.run_with(&mut StopImmediately).unwrap();
    assert_eq!(sim.state(), SimulationState::Completed);
    assert_eq!(sim.tick_count(), 1);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Placed));
}

#[test]
fn test_simulation_length() {
    let options = SimulationOptions {
        simulation_length: Some(300.),
        ..Default::default()
    };
    let mut sim = configured(&[(4, 8)], vec![VmRequest::new(0, 2, 4, 0., 3000.)], options);
    sim.run().unwrap();
    assert_eq!(sim.tick_count(), 5);
    assert_eq!(sim.vm_status(0), Some(VmStatus::Placed));
}

#[test]
fn test_metrics_export() {
    let mut sim = configured(
        &[(4, 8), (4, 8)],
        vec![VmRequest::new(0, 2, 4, 0., 120.)],
        SimulationOptions::default(),
    );
    sim.run().unwrap();

    let mut buffer = Vec::new();
    sim.metrics().write_csv(&mut buffer).unwrap();
    let csv = String::from_utf8(buffer).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "time,total_power,active_hosts,idle_hosts,pending_vms,placed_vms,rejected_vms,completed_vms,shortfall,migrations"
    );
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "0.0,150.0,1,0,0,1,0,0,0,0");
    assert_eq!(lines[3], "120.0,100.0,0,1,0,0,0,1,0,0");

    let mut buffer = Vec::new();
    sim.metrics().write_hosts_csv(&mut buffer).unwrap();
    assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 1 + 3 * 2);

    let json: serde_json::Value = serde_json::from_str(&sim.metrics().to_json().unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[0]["hosts"][0]["power_state"], "Active");
}
