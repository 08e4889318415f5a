//! Stand-in for the simulator's main thread.
//!
//! Ticks the stub simulator at the configured rate and forwards the plugin
//! messages a real host would send around each step.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use simrtc_bridge::{Bridge, PluginEvent};
use simrtc_host::sim::{RunState, SimSimulator};
use tracing::{debug, info};

/// Which message the host sends this tick, given whether the simulation was
/// active on the previous tick.
pub fn next_event(was_active: bool, state: RunState) -> PluginEvent {
    match (was_active, state) {
        (false, RunState::Running | RunState::Paused) => PluginEvent::SimulationAboutToStart,
        (true, RunState::Stopped) => PluginEvent::SimulationEnded,
        (true, RunState::Running) => PluginEvent::MainScriptAboutToBeCalled,
        _ => PluginEvent::Idle,
    }
}

/// Run the host loop on its own thread until `shutdown` is raised.  The
/// bridge is shut down before the thread exits.
pub fn spawn(
    mut bridge: Bridge,
    mut sim: SimSimulator,
    shutdown: Arc<AtomicBool>,
    period: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!(?period, "host loop started");
        let mut was_active = false;
        while !shutdown.load(Ordering::SeqCst) {
            let state = sim.run_state();
            let event = next_event(was_active, state);
            if event == PluginEvent::MainScriptAboutToBeCalled {
                sim.advance();
            }
            was_active = state != RunState::Stopped;

            let served = bridge.on_message(event);
            if served > 0 {
                debug!(served, ?event, "host tick");
            }
            thread::sleep(period);
        }
        bridge.shutdown();
        info!(stats = ?bridge.stats(), "host loop stopped");
    })
}
