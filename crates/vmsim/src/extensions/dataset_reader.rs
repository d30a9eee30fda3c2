//! Trait for dataset readers.

use crate::core::vm::VmRequest;

pub trait DatasetReader {
    /// Returns the next VM from dataset (if any).
    ///
    /// VMs should be returned in non-decreasing order of their arrival times.
    fn get_next_vm(&mut self) -> Option<VmRequest>;
}

/// Drains the reader into a workload.
pub fn read_all(reader: &mut dyn DatasetReader) -> Vec<VmRequest> {
    let mut workload = Vec::new();
    while let Some(request) = reader.get_next_vm() {
        workload.push(request);
    }
    workload
}
