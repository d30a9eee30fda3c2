//! Optional components: workload sources and VM migration.

pub mod csv_dataset_reader;
pub mod dataset_reader;
pub mod vm_migrator;
pub mod workload_generator;
