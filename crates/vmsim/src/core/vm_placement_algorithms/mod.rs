//! Implementations of VM placement algorithms.

pub mod best_fit_decreasing;
pub mod min_utilization;
pub mod random_fit;
