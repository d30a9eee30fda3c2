//! Metrics time series and simulation report.

use std::io::Write;

use serde::Serialize;

use vmsim_power_models::energy_meter::joules_to_kwh;
use vmsim_power_models::PowerState;

use crate::core::config::ConfigError;
use crate::core::host::Host;

/// State of a single host at the moment of sampling.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HostSnapshot {
    pub host_id: u32,
    pub cpu_load: f64,
    pub memory_load: f64,
    pub power_state: PowerState,
    /// Current power consumption in W.
    pub power: f64,
    /// Cumulative energy consumption in J.
    pub energy: f64,
}

impl HostSnapshot {
    pub fn new(host: &Host, power: f64) -> Self {
        Self {
            host_id: host.id,
            cpu_load: host.cpu_load(),
            memory_load: host.memory_load(),
            power_state: host.power_state(),
            power,
            energy: host.energy_consumed(),
        }
    }
}

/// Numbers of VMs in each status.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VmCounts {
    pub pending: u32,
    pub placed: u32,
    pub rejected: u32,
    pub completed: u32,
}

impl VmCounts {
    pub fn total(&self) -> u32 {
        self.pending + self.placed + self.rejected + self.completed
    }
}

/// One record of the metrics time series, produced once per tick.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MetricsSample {
    pub time: f64,
    /// Summary power consumption of all hosts in W.
    pub total_power: f64,
    pub hosts: Vec<HostSnapshot>,
    pub active_hosts: u32,
    pub idle_hosts: u32,
    pub vms: VmCounts,
    /// Cumulative number of rejected VMs.
    pub shortfall: u32,
    /// Cumulative number of VM migrations.
    pub migrations: u32,
}

// Flat row of the CSV export, hosts are exported separately.
#[derive(Serialize)]
struct SampleRecord {
    time: f64,
    total_power: f64,
    active_hosts: u32,
    idle_hosts: u32,
    pending_vms: u32,
    placed_vms: u32,
    rejected_vms: u32,
    completed_vms: u32,
    shortfall: u32,
    migrations: u32,
}

#[derive(Serialize)]
struct HostRecord {
    time: f64,
    host_id: u32,
    cpu_load: f64,
    memory_load: f64,
    power_state: PowerState,
    power: f64,
    energy: f64,
}

/// Append-only sequence of metrics samples.
#[derive(Serialize, Clone, Debug, Default)]
pub struct MetricsSeries {
    samples: Vec<MetricsSample>,
}

impl MetricsSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, sample: MetricsSample) {
        self.samples.push(sample);
    }

    pub(crate) fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &[MetricsSample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&MetricsSample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Writes one CSV row per sample with summary values.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ConfigError> {
        let mut writer = csv::Writer::from_writer(writer);
        for sample in &self.samples {
            writer.serialize(SampleRecord {
                time: sample.time,
                total_power: sample.total_power,
                active_hosts: sample.active_hosts,
                idle_hosts: sample.idle_hosts,
                pending_vms: sample.vms.pending,
                placed_vms: sample.vms.placed,
                rejected_vms: sample.vms.rejected,
                completed_vms: sample.vms.completed,
                shortfall: sample.shortfall,
                migrations: sample.migrations,
            })?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Writes one CSV row per sample and host with host snapshot values.
    pub fn write_hosts_csv<W: Write>(&self, writer: W) -> Result<(), ConfigError> {
        let mut writer = csv::Writer::from_writer(writer);
        for sample in &self.samples {
            for host in &sample.hosts {
                writer.serialize(HostRecord {
                    time: sample.time,
                    host_id: host.host_id,
                    cpu_load: host.cpu_load,
                    memory_load: host.memory_load,
                    power_state: host.power_state,
                    power: host.power,
                    energy: host.energy,
                })?;
            }
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Saves summary CSV to the file.
    pub fn save_csv(&self, path: &str) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        self.write_csv(file)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.samples)
    }
}

/// Final state of a host.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HostSummary {
    pub host_id: u32,
    pub name: String,
    pub cpu_load: f64,
    pub memory_load: f64,
    pub power_state: PowerState,
    pub energy: f64,
}

/// Summary of a simulation run.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SimulationReport {
    pub algorithm: String,
    pub ticks: u64,
    /// Simulation time in seconds at the end of the run.
    pub duration: f64,
    /// Total energy consumption of all hosts in J.
    pub total_energy: f64,
    pub total_energy_kwh: f64,
    /// Mean of total power over samples in W.
    pub average_power: f64,
    pub peak_power: f64,
    pub migrations: u32,
    pub shortfall: u32,
    pub vms: VmCounts,
    pub hosts: Vec<HostSummary>,
}

impl SimulationReport {
    pub fn new<'a>(
        algorithm: String,
        duration: f64,
        metrics: &MetricsSeries,
        hosts: impl IntoIterator<Item = &'a Host>,
        vms: VmCounts,
    ) -> Self {
        let hosts: Vec<HostSummary> = hosts
            .into_iter()
            .map(|host| HostSummary {
                host_id: host.id,
                name: host.name.clone(),
                cpu_load: host.cpu_load(),
                memory_load: host.memory_load(),
                power_state: host.power_state(),
                energy: host.energy_consumed(),
            })
            .collect();
        let total_energy: f64 = hosts.iter().map(|host| host.energy).sum();
        let samples = metrics.samples();
        let average_power = if samples.is_empty() {
            0.
        } else {
            samples.iter().map(|s| s.total_power).sum::<f64>() / samples.len() as f64
        };
        let peak_power = samples.iter().map(|s| s.total_power).fold(0., f64::max);
        let (shortfall, migrations) = metrics.last().map_or((0, 0), |s| (s.shortfall, s.migrations));
        Self {
            algorithm,
            ticks: samples.len() as u64,
            duration,
            total_energy,
            total_energy_kwh: joules_to_kwh(total_energy),
            average_power,
            peak_power,
            migrations,
            shortfall,
            vms,
            hosts,
        }
    }
}
