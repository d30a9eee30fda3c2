//! Tools for running experiments with multiple simulation runs.

use std::fs::File;
use std::sync::{Arc, Mutex};

use dyn_clone::{clone_trait_object, DynClone};
use indexmap::map::IndexMap;
use serde::Serialize;
use threadpool::ThreadPool;

use crate::core::config::{ConfigError, SimulationConfig, WorkloadConfig};
use crate::core::monitoring::SimulationReport;
use crate::simulation::CloudSimulation;

/// Decision made by callbacks after each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepControl {
    Continue,
    Pause,
    Stop,
}

/// Trait for implementing custom callbacks for simulation runs.
pub trait SimulationCallbacks: DynClone + Send {
    /// Runs before starting a simulation run.
    fn on_simulation_start(&mut self, _sim: &CloudSimulation) {}

    /// Runs after each tick of a simulation run, decides whether the run continues.
    fn on_step(&mut self, _sim: &CloudSimulation) -> StepControl {
        StepControl::Continue
    }

    /// Runs upon the completion of a simulation run, returns results of this run.
    fn on_simulation_finish(&mut self, _sim: &CloudSimulation) -> IndexMap<String, String> {
        IndexMap::new()
    }
}

clone_trait_object!(SimulationCallbacks);

/// Callbacks which never interrupt the run.
#[derive(Clone, Default)]
pub struct NoCallbacks;

impl SimulationCallbacks for NoCallbacks {}

/// Outcome of a single run within an experiment.
#[derive(Serialize, Clone, Debug)]
pub struct RunResult {
    pub policy: String,
    pub report: Option<SimulationReport>,
    pub error: Option<String>,
    pub results: IndexMap<String, String>,
}

/// Results of all runs, in the order of policies.
#[derive(Serialize, Clone, Debug, Default)]
pub struct ExperimentResults {
    pub runs: IndexMap<String, RunResult>,
}

impl ExperimentResults {
    /// Returns the successful policy with the lowest total energy consumption.
    pub fn best_policy(&self) -> Option<&str> {
        self.runs
            .values()
            .filter_map(|run| run.report.as_ref().map(|report| (run.policy.as_str(), report.total_energy)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(policy, _)| policy)
    }

    pub fn report(&self, policy: &str) -> Option<&SimulationReport> {
        self.runs.get(policy).and_then(|run| run.report.as_ref())
    }

    pub fn save_json(&self, path: &str) -> Result<(), ConfigError> {
        let file = File::create(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Runs the same workload with several placement policies.
///
/// The workload is materialized once and each run gets its own copy, so that all policies see identical input.
pub struct Experiment {
    pub config: SimulationConfig,
    pub policies: Vec<String>,
    pub callbacks: Box<dyn SimulationCallbacks>,
}

impl Experiment {
    pub fn new(config: SimulationConfig, policies: Vec<String>) -> Self {
        Self {
            config,
            policies,
            callbacks: Box::new(NoCallbacks),
        }
    }

    /// Creates experiment comparing all built-in policies.
    pub fn compare_all(config: SimulationConfig) -> Self {
        Self::new(config, Self::default_policies())
    }

    pub fn default_policies() -> Vec<String> {
        vec![
            "BestFitDecreasing".to_string(),
            "MinUtilization".to_string(),
            "Random".to_string(),
        ]
    }

    pub fn with_callbacks(mut self, callbacks: Box<dyn SimulationCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Runs the experiment using the specified number of threads.
    pub fn run(&self, num_threads: usize) -> Result<ExperimentResults, ConfigError> {
        let workload = self.config.load_workload()?;
        let results = Arc::new(Mutex::new(Vec::new()));
        let pool = ThreadPool::new(num_threads.max(1));

        for (run_id, policy) in self.policies.iter().enumerate() {
            let mut config = self.config.clone();
            config.algorithm = policy.clone();
            config.workload = Some(WorkloadConfig::Inline { vms: workload.clone() });
            let mut callbacks = self.callbacks.clone();
            let policy = policy.clone();
            let results = results.clone();

            pool.execute(move || {
                log::info!("RUN {}: {}", run_id + 1, policy);
                let run_result = run_simulation(policy, &config, callbacks.as_mut());
                if let Ok(mut results) = results.lock() {
                    results.push((run_id, run_result));
                }
            });
        }

        pool.join();
        let mut runs = match results.lock() {
            Ok(mut results) => std::mem::take(&mut *results),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        runs.sort_by_key(|(run_id, _)| *run_id);

        let mut experiment_results = ExperimentResults::default();
        for (_, run) in runs {
            experiment_results.runs.insert(run.policy.clone(), run);
        }
        Ok(experiment_results)
    }
}

fn run_simulation(policy: String, config: &SimulationConfig, callbacks: &mut dyn SimulationCallbacks) -> RunResult {
    let outcome = CloudSimulation::from_config(config).and_then(|mut sim| {
        let results = sim.run_with(callbacks)?;
        Ok((sim.report(), results))
    });
    match outcome {
        Ok((report, results)) => RunResult {
            policy,
            report: Some(report),
            error: None,
            results,
        },
        Err(e) => {
            log::error!("run of {} failed: {}", policy, e);
            RunResult {
                policy,
                report: None,
                error: Some(e.to_string()),
                results: IndexMap::new(),
            }
        }
    }
}
