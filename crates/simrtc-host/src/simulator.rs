//! `SimulatorApi` trait – the simulator's non-reentrant plugin API.
//!
//! Implementations wrap the host simulator's C entry points.  Every method
//! must only ever be called from the executor thread; the
//! [`Executor`][crate::executor::Executor] guarantees that.

use simrtc_types::{BridgeError, Pose};

/// Operations the bridge performs on the host simulator.
pub trait SimulatorApi: Send {
    /// Start (or resume) the simulation.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Refused`] when the simulator declines (e.g. already
    /// running), [`BridgeError::HostFault`] on an API error.
    fn start_simulation(&mut self) -> Result<(), BridgeError>;

    /// Stop the simulation and reset it to its initial state.
    fn stop_simulation(&mut self) -> Result<(), BridgeError>;

    /// Pause a running simulation.
    fn pause_simulation(&mut self) -> Result<(), BridgeError>;

    /// Load a scene file, replacing the current scene.
    fn load_scene(&mut self, path: &str) -> Result<(), BridgeError>;

    /// Current simulation time in seconds.
    fn simulation_time(&self) -> f64;

    /// Simulation time step in seconds.
    fn simulation_time_step(&self) -> f64;

    /// Pose of the named scene object.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnknownComponent`] when no object has that name.
    fn object_pose(&self, name: &str) -> Result<Pose, BridgeError>;

    /// Move the named scene object.
    fn set_object_pose(&mut self, name: &str, pose: Pose) -> Result<(), BridgeError>;
}

/// Interpret a raw simulator return code.
///
/// The plugin API reports success with a positive value, a refusal with
/// `0`, and an error with a negative value.
pub fn check_status(operation: &str, code: i32) -> Result<(), BridgeError> {
    match code {
        c if c > 0 => Ok(()),
        0 => Err(BridgeError::Refused(format!("{operation} was refused"))),
        c => Err(BridgeError::HostFault(format!("{operation} failed with code {c}"))),
    }
}
