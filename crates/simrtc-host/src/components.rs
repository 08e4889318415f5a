//! `ComponentManager` trait – the middleware side of the bridge.
//!
//! A manager creates data-flow components bound to simulated robots and
//! sensors, tears them down, and keeps the *synchronized* ones in lock-step
//! with the simulation clock.

use simrtc_types::{BridgeError, ComponentKind};

use crate::clock::SimulationClock;

/// Lifecycle of middleware components exposed by the bridge.
pub trait ComponentManager: Send {
    /// Create a component of `kind` bound to the scene object `model`.
    ///
    /// `arg` is passed verbatim to the middleware's component factory.
    /// Returns the new component's instance name.
    fn spawn(&mut self, kind: ComponentKind, model: &str, arg: &str) -> Result<String, BridgeError>;

    /// Destroy the named component.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnknownComponent`] when no active component has that name.
    fn kill(&mut self, name: &str) -> Result<(), BridgeError>;

    /// Destroy every component, returning how many were removed.
    fn kill_all(&mut self) -> Result<usize, BridgeError>;

    /// Attach the named component to the simulation clock so it is stepped
    /// with every simulation tick.
    fn sync(&mut self, name: &str) -> Result<(), BridgeError>;

    /// Names of all synchronized components.
    fn synchronized(&self) -> Result<Vec<String>, BridgeError>;

    /// Simulation is about to start: activate synchronized components.
    fn on_simulation_start(&mut self, _clock: &SimulationClock) {}

    /// One simulation step is about to run.
    fn on_step(&mut self, _clock: &SimulationClock) {}

    /// Simulation ended: deactivate synchronized components.
    fn on_simulation_end(&mut self) {}
}
