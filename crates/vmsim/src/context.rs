//! Accessing simulation time from components.

use std::cell::Cell;
use std::rc::Rc;

use sugars::rc;

/// Simulated clock shared by all components of a single simulation run.
#[derive(Clone, Debug, Default)]
pub struct SimulationClock {
    time: Rc<Cell<f64>>,
}

impl SimulationClock {
    /// Creates clock starting at zero.
    pub fn new() -> Self {
        Self { time: rc!(Cell::new(0.)) }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.time.get()
    }

    pub(crate) fn advance(&self, delta: f64) {
        self.time.set(self.time.get() + delta);
    }

    pub(crate) fn reset(&self) {
        self.time.set(0.);
    }

    /// Creates a named context bound to this clock.
    pub fn create_context(&self, name: &str) -> SimulationContext {
        SimulationContext {
            name: name.to_owned(),
            clock: self.clone(),
        }
    }
}

/// A facade for reading the simulation time and logging from simulation components.
#[derive(Clone, Debug)]
pub struct SimulationContext {
    name: String,
    clock: SimulationClock,
}

impl SimulationContext {
    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.clock.time()
    }
}
