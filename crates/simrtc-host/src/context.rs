//! [`HostContext`] – everything a command handler may touch.

use crate::clock::SimulationClock;
use crate::components::ComponentManager;
use crate::simulator::SimulatorApi;

/// The host-side collaborators, owned by the executor thread.
pub struct HostContext {
    pub simulator: Box<dyn SimulatorApi>,
    pub components: Box<dyn ComponentManager>,
    pub clock: SimulationClock,
}

impl HostContext {
    /// Build a context whose clock starts at the simulator's current time.
    pub fn new(simulator: Box<dyn SimulatorApi>, components: Box<dyn ComponentManager>) -> Self {
        let mut clock = SimulationClock::default();
        clock.refresh(simulator.as_ref());
        Self {
            simulator,
            components,
            clock,
        }
    }
}
