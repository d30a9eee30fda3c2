//! Synthetic workload generator.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::core::vm::VmRequest;
use crate::extensions::dataset_reader::DatasetReader;

/// Typical VM kind with its own ranges of demand and duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadPattern {
    WebServer,
    Database,
    BatchJob,
    Development,
}

/// Ranges used to draw VM parameters, bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatternProfile {
    pub cpu_range: (u32, u32),
    pub memory_per_cpu: u64,
    pub duration_range: (u64, u64),
}

impl WorkloadPattern {
    pub fn all() -> [WorkloadPattern; 4] {
        [
            WorkloadPattern::WebServer,
            WorkloadPattern::Database,
            WorkloadPattern::BatchJob,
            WorkloadPattern::Development,
        ]
    }

    pub fn profile(&self) -> PatternProfile {
        match self {
            // 1 to 24 hours
            WorkloadPattern::WebServer => PatternProfile {
                cpu_range: (1, 4),
                memory_per_cpu: 2,
                duration_range: (3600, 86400),
            },
            // 1 day to 1 week
            WorkloadPattern::Database => PatternProfile {
                cpu_range: (2, 8),
                memory_per_cpu: 4,
                duration_range: (86400, 604800),
            },
            // 30 minutes to 2 hours
            WorkloadPattern::BatchJob => PatternProfile {
                cpu_range: (4, 16),
                memory_per_cpu: 2,
                duration_range: (1800, 7200),
            },
            // 30 minutes to 8 hours
            WorkloadPattern::Development => PatternProfile {
                cpu_range: (1, 2),
                memory_per_cpu: 2,
                duration_range: (1800, 28800),
            },
        }
    }
}

impl Display for WorkloadPattern {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            WorkloadPattern::WebServer => write!(f, "web_server"),
            WorkloadPattern::Database => write!(f, "database"),
            WorkloadPattern::BatchJob => write!(f, "batch_job"),
            WorkloadPattern::Development => write!(f, "development"),
        }
    }
}

impl FromStr for WorkloadPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web_server" => Ok(WorkloadPattern::WebServer),
            "database" => Ok(WorkloadPattern::Database),
            "batch_job" => Ok(WorkloadPattern::BatchJob),
            "development" => Ok(WorkloadPattern::Development),
            _ => Err(format!("unknown workload pattern: {}", s)),
        }
    }
}

/// Generates VMs with parameters drawn uniformly from the pattern ranges.
///
/// The memory demand is proportional to the CPU demand. IDs are assigned sequentially across all generated VMs,
/// arrival times grow by the configured interval. The same seed always produces the same workload.
pub struct WorkloadGenerator {
    rng: Pcg64,
    arrival_interval: f64,
    next_id: u32,
    next_arrival: f64,
}

impl WorkloadGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
            arrival_interval: 0.,
            next_id: 0,
            next_arrival: 0.,
        }
    }

    /// Sets the time between consecutive arrivals.
    pub fn arrival_interval(mut self, interval: f64) -> Self {
        self.arrival_interval = interval;
        self
    }

    /// Typical workload mix: 40% web servers, 20% databases, 30% batch jobs and 10% development VMs.
    pub fn default_distribution() -> Vec<(WorkloadPattern, f64)> {
        vec![
            (WorkloadPattern::WebServer, 0.4),
            (WorkloadPattern::Database, 0.2),
            (WorkloadPattern::BatchJob, 0.3),
            (WorkloadPattern::Development, 0.1),
        ]
    }

    /// Generates a single VM of the pattern.
    pub fn next_vm(&mut self, pattern: WorkloadPattern) -> VmRequest {
        let profile = pattern.profile();
        let cpu = self.rng.gen_range(profile.cpu_range.0..=profile.cpu_range.1);
        let duration = self.rng.gen_range(profile.duration_range.0..=profile.duration_range.1);
        let request = VmRequest::new(
            self.next_id,
            cpu,
            cpu as u64 * profile.memory_per_cpu,
            self.next_arrival,
            duration as f64,
        );
        self.next_id += 1;
        self.next_arrival += self.arrival_interval;
        request
    }

    pub fn generate(&mut self, pattern: WorkloadPattern, count: u32) -> Vec<VmRequest> {
        (0..count).map(|_| self.next_vm(pattern)).collect()
    }

    /// Generates `count` VMs split between patterns according to their weights.
    ///
    /// Counts are rounded down, the remaining VMs are added one per pattern in distribution order.
    /// VMs are generated pattern by pattern.
    pub fn generate_mixed(&mut self, count: u32, distribution: &[(WorkloadPattern, f64)]) -> Vec<VmRequest> {
        let mut workload = Vec::with_capacity(count as usize);
        for (pattern, pattern_count) in Self::split_counts(count, distribution) {
            workload.extend(self.generate(pattern, pattern_count));
        }
        workload
    }

    pub fn split_counts(count: u32, distribution: &[(WorkloadPattern, f64)]) -> Vec<(WorkloadPattern, u32)> {
        let weight_sum: f64 = distribution.iter().map(|(_, weight)| weight.max(0.)).sum();
        if distribution.is_empty() || weight_sum <= 0. {
            return Vec::new();
        }
        let mut counts: Vec<(WorkloadPattern, u32)> = distribution
            .iter()
            .map(|(pattern, weight)| {
                let share = count as f64 * weight.max(0.) / weight_sum;
                (*pattern, (share + 1e-9).floor() as u32)
            })
            .collect();
        let assigned: u32 = counts.iter().map(|(_, c)| c).sum();
        let mut remaining = count.saturating_sub(assigned);
        let n = counts.len();
        let mut i = 0;
        while remaining > 0 {
            counts[i % n].1 += 1;
            remaining -= 1;
            i += 1;
        }
        counts
    }
}

/// Reader producing a fixed number of synthetic VMs of the given mix.
pub struct GeneratedDatasetReader {
    generator: WorkloadGenerator,
    patterns: Vec<WorkloadPattern>,
    limit: u32,
    produced: u32,
}

impl GeneratedDatasetReader {
    /// Creates reader producing `limit` VMs of the given mix.
    pub fn new(generator: WorkloadGenerator, distribution: &[(WorkloadPattern, f64)], limit: u32) -> Self {
        let mut patterns = Vec::new();
        for (pattern, count) in WorkloadGenerator::split_counts(limit, distribution) {
            patterns.extend(std::iter::repeat(pattern).take(count as usize));
        }
        Self {
            generator,
            patterns,
            limit,
            produced: 0,
        }
    }
}

impl DatasetReader for GeneratedDatasetReader {
    fn get_next_vm(&mut self) -> Option<VmRequest> {
        if self.produced >= self.limit {
            return None;
        }
        let pattern = *self.patterns.get(self.produced as usize)?;
        self.produced += 1;
        Some(self.generator.next_vm(pattern))
    }
}
