//! Core simulation components.

pub mod common;
pub mod config;
pub mod error;
pub mod host;
pub mod monitoring;
pub mod power;
pub mod resource_pool;
pub mod scheduler;
pub mod vm;
pub mod vm_placement_algorithm;
pub mod vm_placement_algorithms;
