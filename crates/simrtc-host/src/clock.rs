//! [`SimulationClock`] – the simulator's notion of time as seen by
//! synchronized components.

use crate::simulator::SimulatorApi;

/// Default step used before the simulator has been queried.
pub const DEFAULT_TIME_STEP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    time: f64,
    time_step: f64,
}

impl SimulationClock {
    pub fn new(time_step: f64) -> Self {
        Self {
            time: 0.0,
            time_step,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn set_time_step(&mut self, time_step: f64) {
        self.time_step = time_step;
    }

    /// Copy time and step from the simulator.
    pub fn refresh(&mut self, simulator: &dyn SimulatorApi) {
        self.time = simulator.simulation_time();
        self.time_step = simulator.simulation_time_step();
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP)
    }
}
