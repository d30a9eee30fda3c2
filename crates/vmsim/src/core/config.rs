//! Simulation configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::host::{HostSpec, PowerModelKind};
use crate::core::vm::VmRequest;
use crate::extensions::csv_dataset_reader::CsvDatasetReader;
use crate::extensions::dataset_reader::read_all;
use crate::extensions::workload_generator::{WorkloadGenerator, WorkloadPattern};

/// Errors of loading configuration and workload files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("can't read file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("can't parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("can't write JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("can't resolve placement algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("unknown workload pattern: {0}")]
    UnknownPattern(String),
}

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
struct RawSimulationConfig {
    pub tick_length: Option<f64>,
    pub max_retry_ticks: Option<u32>,
    pub simulation_length: Option<f64>,
    pub seed: Option<u64>,
    pub algorithm: Option<String>,
    pub hosts: Option<Vec<HostConfig>>,
    pub workload: Option<WorkloadConfig>,
    pub migration: Option<MigrationConfig>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Host name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Host name prefix.
    /// Full name is produced by appending host instance number to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// Host CPU capacity.
    pub cpus: u32,
    /// Host memory capacity in GB.
    pub memory: u64,
    /// Power consumption in W of a powered on host without load.
    pub idle_power: Option<f64>,
    /// Power consumption in W of a fully loaded host.
    pub max_power: Option<f64>,
    /// Utilization to power model (linear if not set).
    pub power_model: Option<PowerModelKind>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: None,
            name_prefix: Some("h".to_string()),
            cpus: 16,
            memory: 32,
            idle_power: None,
            max_power: None,
            power_model: None,
            count: Some(3),
        }
    }
}

/// Describes where the workload comes from.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkloadConfig {
    /// Synthetic VMs following one of the predefined patterns or their mix.
    Synthetic {
        /// `web_server`, `database`, `batch_job`, `development` or `mixed`.
        pattern: String,
        count: u32,
        /// Time in seconds between consecutive arrivals, all VMs arrive at zero if not set.
        arrival_interval: Option<f64>,
    },
    /// VMs read from CSV file.
    Csv { path: String },
    /// VMs listed directly in the config.
    Inline { vms: Vec<VmRequest> },
}

/// Settings of threshold-based VM migration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct MigrationConfig {
    /// Hosts with utilization above this value are considered overloaded.
    pub overload_threshold: f64,
    /// Hosts with utilization below `overload_threshold * underload_factor` can receive migrated VMs.
    #[serde(default = "default_underload_factor")]
    pub underload_factor: f64,
    /// Maximum number of migrations of a single VM.
    #[serde(default = "default_max_migrations_per_vm")]
    pub max_migrations_per_vm: u32,
}

fn default_underload_factor() -> f64 {
    0.5
}

fn default_max_migrations_per_vm() -> u32 {
    3
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            overload_threshold: 0.8,
            underload_factor: default_underload_factor(),
            max_migrations_per_vm: default_max_migrations_per_vm(),
        }
    }
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Duration of a single tick in seconds.
    pub tick_length: f64,
    /// Number of unsuccessful placement ticks after which pending VM is rejected (unlimited if not set).
    pub max_retry_ticks: Option<u32>,
    /// Simulation stops after this time in seconds even if some VMs are still running (unlimited if not set).
    pub simulation_length: Option<f64>,
    /// Seed for randomized placement algorithms and synthetic workloads.
    pub seed: u64,
    /// VM placement algorithm.
    pub algorithm: String,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
    /// Workload source.
    pub workload: Option<WorkloadConfig>,
    /// Threshold-based VM migration, disabled if not set.
    pub migration: Option<MigrationConfig>,
}

pub const DEFAULT_IDLE_POWER: f64 = 100.;
pub const DEFAULT_MAX_POWER: f64 = 200.;

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(RawSimulationConfig::default())
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(file_name).map_err(|source| ConfigError::Io {
            path: file_name.to_string(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    /// Creates simulation config from YAML string.
    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        let raw: RawSimulationConfig = serde_yaml::from_str(data)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawSimulationConfig) -> Self {
        Self {
            tick_length: raw.tick_length.unwrap_or(60.),
            max_retry_ticks: raw.max_retry_ticks,
            simulation_length: raw.simulation_length,
            seed: raw.seed.unwrap_or(123),
            algorithm: raw.algorithm.unwrap_or_else(|| "BestFitDecreasing".to_string()),
            hosts: raw.hosts.unwrap_or_else(|| vec![HostConfig::default()]),
            workload: raw.workload,
            migration: raw.migration,
        }
    }

    /// Expands host configs into specs of individual hosts with IDs assigned in config order.
    pub fn host_specs(&self) -> Vec<HostSpec> {
        let mut specs = Vec::new();
        for host in &self.hosts {
            let count = host.count.unwrap_or(1);
            for i in 0..count {
                let id = specs.len() as u32;
                let name = match (&host.name, &host.name_prefix) {
                    (Some(name), _) if count == 1 => name.clone(),
                    (_, Some(prefix)) => format!("{}{}", prefix, i + 1),
                    _ => format!("h{}", id),
                };
                specs.push(HostSpec {
                    id,
                    name,
                    cpu_capacity: host.cpus,
                    ram_capacity: host.memory,
                    idle_power: host.idle_power.unwrap_or(DEFAULT_IDLE_POWER),
                    max_power: host.max_power.unwrap_or(DEFAULT_MAX_POWER),
                    power_model: host.power_model.clone().unwrap_or_default(),
                });
            }
        }
        specs
    }

    /// Materializes the configured workload (empty if not set).
    pub fn load_workload(&self) -> Result<Vec<VmRequest>, ConfigError> {
        match &self.workload {
            None => Ok(Vec::new()),
            Some(WorkloadConfig::Inline { vms }) => Ok(vms.clone()),
            Some(WorkloadConfig::Csv { path }) => {
                let mut reader = CsvDatasetReader::new();
                reader.parse(path)?;
                Ok(read_all(&mut reader))
            }
            Some(WorkloadConfig::Synthetic {
                pattern,
                count,
                arrival_interval,
            }) => {
                let mut generator = WorkloadGenerator::new(self.seed).arrival_interval(arrival_interval.unwrap_or(0.));
                if pattern == "mixed" {
                    Ok(generator.generate_mixed(*count, &WorkloadGenerator::default_distribution()))
                } else {
                    let pattern = pattern
                        .parse::<WorkloadPattern>()
                        .map_err(|_| ConfigError::UnknownPattern(pattern.clone()))?;
                    Ok(generator.generate(pattern, *count))
                }
            }
        }
    }
}

/// Parses config value string, which consists of two parts - name and options.
///
/// Example: `Random[seed=42]` parses to `("Random", Some("seed=42"))`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.to_string(), Some(r.to_string().replace(']', ""))),
        None => (config_str.to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}
