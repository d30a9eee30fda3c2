use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use indexmap::IndexMap;

use vmsim::core::config::SimulationConfig;
use vmsim::core::monitoring::SimulationReport;
use vmsim::experiment::{Experiment, SimulationCallbacks, StepControl};
use vmsim::simulation::CloudSimulation;

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to simulation config
    #[clap(short, long)]
    config: String,

    /// Placement policy overriding the one from config
    #[clap(short, long)]
    policy: Option<String>,

    /// Run all built-in policies on the same workload and compare them
    #[clap(long, default_value_t = false)]
    compare: bool,

    /// Save per-tick metrics of a single run to CSV file
    #[clap(long)]
    metrics_csv: Option<String>,

    /// Save final report (or comparison results) to JSON file
    #[clap(long)]
    report_json: Option<String>,

    /// Number of threads used in comparison mode
    #[clap(short, long, default_value_t = 1)]
    threads: usize,
}

/// Logs the progress of a run every `period` ticks.
#[derive(Clone)]
struct ProgressCallbacks {
    period: u64,
    step: u64,
}

impl ProgressCallbacks {
    fn new(period: u64) -> Self {
        Self { period, step: 0 }
    }
}

impl SimulationCallbacks for ProgressCallbacks {
    fn on_simulation_start(&mut self, _sim: &CloudSimulation) {
        self.step = 0;
    }

    fn on_step(&mut self, sim: &CloudSimulation) -> StepControl {
        self.step += 1;
        if self.step % self.period == 0 {
            let counts = sim.vm_counts();
            log::info!(
                "[{}] {:.0}s: power {:.2} W, placed {}, pending {}",
                sim.algorithm_name(),
                sim.current_time(),
                sim.total_power(),
                counts.placed,
                counts.pending
            );
        }
        StepControl::Continue
    }

    fn on_simulation_finish(&mut self, sim: &CloudSimulation) -> IndexMap<String, String> {
        let mut results = IndexMap::new();
        results.insert("ticks".to_string(), sim.tick_count().to_string());
        results.insert("energy_kwh".to_string(), format!("{:.4}", sim.report().total_energy_kwh));
        results
    }
}

fn print_report(report: &SimulationReport) {
    println!("Policy: {}", report.algorithm);
    println!("  ticks: {}, simulated time: {:.0} s", report.ticks, report.duration);
    println!(
        "  energy: {:.2} J ({:.4} kWh), average power: {:.2} W, peak power: {:.2} W",
        report.total_energy, report.total_energy_kwh, report.average_power, report.peak_power
    );
    println!(
        "  vms: {} completed, {} placed, {} pending, {} rejected",
        report.vms.completed, report.vms.placed, report.vms.pending, report.vms.rejected
    );
    println!("  shortfall: {}, migrations: {}", report.shortfall, report.migrations);
}

fn run_single(args: &Args, mut config: SimulationConfig) -> Result<(), String> {
    if let Some(policy) = &args.policy {
        config.algorithm = policy.clone();
    }
    let mut sim = CloudSimulation::from_config(&config).map_err(|e| e.to_string())?;
    let mut callbacks = ProgressCallbacks::new(1000);
    sim.run_with(&mut callbacks).map_err(|e| e.to_string())?;

    let report = sim.report();
    print_report(&report);
    if let Some(path) = &args.metrics_csv {
        sim.metrics().save_csv(path).map_err(|e| e.to_string())?;
    }
    if let Some(path) = &args.report_json {
        let file = std::fs::File::create(path).map_err(|e| format!("{}: {}", path, e))?;
        serde_json::to_writer_pretty(file, &report).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn run_comparison(args: &Args, config: SimulationConfig) -> Result<(), String> {
    let experiment = Experiment::compare_all(config).with_callbacks(Box::new(ProgressCallbacks::new(1000)));
    let results = experiment.run(args.threads).map_err(|e| e.to_string())?;

    for run in results.runs.values() {
        match (&run.report, &run.error) {
            (Some(report), _) => print_report(report),
            (None, Some(error)) => println!("Policy: {}\n  failed: {}", run.policy, error),
            (None, None) => {}
        }
    }
    if let Some(best) = results.best_policy() {
        println!("Most energy efficient policy: {}", best);
    }
    if let Some(path) = &args.report_json {
        results.save_json(path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logger();

    let args = Args::parse();
    let simulation_start = Instant::now();

    let outcome = SimulationConfig::from_file(&args.config)
        .map_err(|e| e.to_string())
        .and_then(|config| {
            if args.compare {
                run_comparison(&args, config)
            } else {
                run_single(&args, config)
            }
        });

    println!("Simulation process time {:.2?}", simulation_start.elapsed());
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
