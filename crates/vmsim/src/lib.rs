//! Simulation of virtual machine placement on physical hosts with energy accounting.
//!
//! The simulation advances in discrete ticks. On every tick finished VMs are released, newly arrived VMs are
//! placed by the configured placement algorithm, host energy consumption is accumulated and a metrics sample
//! is recorded. See [`simulation::CloudSimulation`] for the control surface.

pub mod context;
pub mod core;
pub mod experiment;
pub mod extensions;
pub mod log;
pub mod simulation;

pub use colored;
pub use context::SimulationContext;
pub use simulation::CloudSimulation;
