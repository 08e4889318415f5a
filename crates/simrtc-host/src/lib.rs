//! `simrtc-host` – the executor side of the bridge
//!
//! Everything here runs on the simulator's main thread.
//!
//! # Modules
//!
//! - [`simulator`] – [`SimulatorApi`]: the host simulator's non-reentrant
//!   plugin API, plus [`check_status`][simulator::check_status] for its raw
//!   return codes.
//! - [`components`] – [`ComponentManager`]: creates, destroys and steps the
//!   middleware components bound to simulated robots and sensors.
//! - [`handlers`] – one function per command kind.
//! - [`dispatcher`] – [`Dispatcher`]: the kind → handler table.
//! - [`executor`] – [`Executor`]: drains at most a fixed number of commands
//!   per host tick and publishes one result for each.
//! - [`clock`] – [`SimulationClock`].
//! - [`watchdog`] – [`Watchdog`]: detects a host that stopped ticking.
//! - [`sim`] – in-process stubs of both collaborators for tests and the
//!   `simrtc` shell.

pub mod clock;
pub mod components;
pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod handlers;
pub mod sim;
pub mod simulator;
pub mod watchdog;

pub use clock::SimulationClock;
pub use components::ComponentManager;
pub use context::HostContext;
pub use dispatcher::Dispatcher;
pub use executor::{Executor, ExecutorStats};
pub use handlers::Handler;
pub use simulator::SimulatorApi;
pub use watchdog::{ComponentHealth, Watchdog};
