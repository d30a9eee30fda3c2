//! Dataset reader for CSV files with VM demands.

use std::io::Read;

use serde::Deserialize;

use crate::core::config::ConfigError;
use crate::core::vm::VmRequest;
use crate::extensions::dataset_reader::DatasetReader;

/// Row of the dataset. Missing values are replaced with defaults.
#[derive(Deserialize, Debug)]
struct CsvRecord {
    id: Option<u32>,
    cpu: Option<u32>,
    memory: Option<u64>,
    duration: Option<f64>,
    arrival_time: Option<f64>,
}

const DEFAULT_CPU: u32 = 1;
const DEFAULT_MEMORY: u64 = 2;
const DEFAULT_DURATION: f64 = 3600.;

/// Dataset reader for CSV files with header and columns `cpu`, `memory` (GB) and `duration` (seconds).
///
/// Optional columns are `id` (row number is used if absent) and `arrival_time` (zero if absent).
/// Empty values are replaced with 1 CPU, 2 GB of memory and 1 hour of duration respectively.
/// Other columns are ignored.
///
/// Pass the CSV file to [`parse()`](CsvDatasetReader::parse) method.
pub struct CsvDatasetReader {
    vm_requests: Vec<VmRequest>,
    current_vm: usize,
}

impl CsvDatasetReader {
    /// Creates dataset reader.
    pub fn new() -> Self {
        Self {
            vm_requests: Vec::new(),
            current_vm: 0,
        }
    }

    /// Loads the dataset from CSV file.
    pub fn parse(&mut self, file_name: &str) -> Result<(), ConfigError> {
        let reader = csv::Reader::from_path(file_name)?;
        self.load(reader)
    }

    /// Loads the dataset from any CSV source.
    pub fn parse_reader<R: Read>(&mut self, reader: R) -> Result<(), ConfigError> {
        self.load(csv::Reader::from_reader(reader))
    }

    fn load<R: Read>(&mut self, mut reader: csv::Reader<R>) -> Result<(), ConfigError> {
        let mut requests = Vec::new();
        for (row, record) in reader.deserialize::<CsvRecord>().enumerate() {
            let record = record?;
            requests.push(VmRequest {
                id: record.id.unwrap_or(row as u32),
                cpu_usage: record.cpu.unwrap_or(DEFAULT_CPU),
                memory_usage: record.memory.unwrap_or(DEFAULT_MEMORY),
                arrival_time: record.arrival_time.unwrap_or(0.),
                duration: record.duration.unwrap_or(DEFAULT_DURATION),
            });
        }
        requests.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time).then(a.id.cmp(&b.id)));
        self.vm_requests = requests;
        self.current_vm = 0;
        Ok(())
    }
}

impl Default for CsvDatasetReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetReader for CsvDatasetReader {
    fn get_next_vm(&mut self) -> Option<VmRequest> {
        let request = self.vm_requests.get(self.current_vm).cloned();
        if request.is_some() {
            self.current_vm += 1;
        }
        request
    }
}
