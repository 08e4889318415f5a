//! [`Bridge`] – the plugin object the host simulator owns.
//!
//! The host forwards every plugin message to [`Bridge::on_message`] from its
//! main thread.  The bridge keeps synchronized components in step with the
//! simulation lifecycle and then serves pending commands.  Service handlers
//! on other threads talk to it through [`Bridge::client`].

use simrtc_host::{
    ComponentHealth, ComponentManager, Dispatcher, Executor, ExecutorStats, Handler, HostContext,
    SimulatorApi, Watchdog,
};
use simrtc_queue::{BridgeChannels, ServiceClient};
use simrtc_types::CommandKind;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;

/// Host messages the bridge reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginEvent {
    SimulationAboutToStart,
    /// Sent once per simulation step, before the main script runs.
    MainScriptAboutToBeCalled,
    SimulationEnded,
    /// Any other message.  Still serves pending commands.
    Idle,
}

pub struct Bridge {
    channels: BridgeChannels,
    client: ServiceClient,
    executor: Executor,
    config: BridgeConfig,
    shut_down: bool,
}

impl Bridge {
    /// Build a bridge with the default dispatch table.
    pub fn new(
        config: BridgeConfig,
        simulator: Box<dyn SimulatorApi>,
        components: Box<dyn ComponentManager>,
    ) -> Self {
        Self::with_dispatcher(config, Dispatcher::default(), simulator, components)
    }

    pub fn with_dispatcher(
        config: BridgeConfig,
        dispatcher: Dispatcher,
        simulator: Box<dyn SimulatorApi>,
        components: Box<dyn ComponentManager>,
    ) -> Self {
        let channels = BridgeChannels::new();
        let client = channels.client(config.result_timeout());
        let executor = Executor::new(
            channels.clone(),
            dispatcher,
            HostContext::new(simulator, components),
            config.commands_per_tick,
            Watchdog::new(config.executor_stall()),
        );
        info!(
            commands_per_tick = config.commands_per_tick,
            result_timeout_ms = config.result_timeout_ms,
            "bridge initialised"
        );
        Self {
            channels,
            client,
            executor,
            config,
            shut_down: false,
        }
    }

    /// A handle for service threads.  Every client on these channels shares
    /// one serialization lock.
    pub fn client(&self) -> ServiceClient {
        self.client.clone()
    }

    pub fn channels(&self) -> &BridgeChannels {
        &self.channels
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Replace the handler for one command kind.
    pub fn register(&mut self, kind: CommandKind, handler: Handler) -> Option<Handler> {
        self.executor.dispatcher_mut().register(kind, handler)
    }

    /// A watchdog clone that any thread can poll.
    pub fn watchdog(&self) -> Watchdog {
        self.executor.watchdog().clone()
    }

    pub fn executor_health(&self) -> ComponentHealth {
        self.executor.watchdog().health()
    }

    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut Executor {
        &mut self.executor
    }

    /// Serve pending commands without touching the component lifecycle.
    pub fn pump(&mut self) -> usize {
        self.executor.pump()
    }

    /// Handle one host message.  Returns how many commands were served.
    ///
    /// Ignored once the bridge is shut down.
    pub fn on_message(&mut self, event: PluginEvent) -> usize {
        if self.shut_down {
            debug!(?event, "bridge shut down; ignoring host message");
            return 0;
        }
        let context = self.executor.context_mut();
        let time = context.simulator.simulation_time();
        context.clock.set_time(time);

        match event {
            PluginEvent::SimulationAboutToStart => {
                let step = context.simulator.simulation_time_step();
                context.clock.set_time_step(step);
                info!(time_step = step, "simulation about to start");
                context.components.on_simulation_start(&context.clock);
            }
            PluginEvent::MainScriptAboutToBeCalled => {
                context.components.on_step(&context.clock);
            }
            PluginEvent::SimulationEnded => {
                info!(time, "simulation ended");
                context.components.on_simulation_end();
            }
            PluginEvent::Idle => {}
        }

        self.executor.pump()
    }

    /// Close the channels and destroy every component.
    ///
    /// Blocked callers wake with `Closed`.  Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.channels.close();
        match self.executor.context_mut().components.kill_all() {
            Ok(removed) => info!(removed, "bridge shut down"),
            Err(e) => warn!(error = %e, "failed to destroy components on shutdown"),
        }
        debug!(stats = ?self.executor.stats(), "final executor counters");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simrtc_host::sim::{RunState, SimComponents, SimSimulator};
    use simrtc_types::{BridgeError, Command, ComponentKind, ReturnCode};
    use std::time::Duration;

    fn bridge() -> (Bridge, SimSimulator, SimComponents) {
        let sim = SimSimulator::builder().with_time_step(0.005).build();
        let components = SimComponents::new();
        let bridge = Bridge::new(
            BridgeConfig::default(),
            Box::new(sim.clone()),
            Box::new(components.clone()),
        );
        (bridge, sim, components)
    }

    #[test]
    fn idle_message_serves_one_command() {
        let (mut bridge, sim, _) = bridge();
        bridge.channels().commands().push(Command::bare(CommandKind::Start)).unwrap();
        bridge.channels().commands().push(Command::bare(CommandKind::Stop)).unwrap();

        assert_eq!(bridge.on_message(PluginEvent::Idle), 1);
        assert_eq!(sim.run_state(), RunState::Running);
        assert_eq!(bridge.channels().commands().len(), 1);
        assert_eq!(bridge.channels().results().len(), 1);
    }

    #[test]
    fn lifecycle_drives_synchronized_components() {
        let (mut bridge, mut sim, components) = bridge();
        let mut ctl = components.clone();
        let name = ctl.spawn(ComponentKind::Robot, "robot", "").unwrap();
        ctl.sync(&name).unwrap();
        let idle = ctl.spawn(ComponentKind::Camera, "cam", "").unwrap();

        sim.start_simulation().unwrap();
        bridge.on_message(PluginEvent::SimulationAboutToStart);
        assert!(components.get(&name).unwrap().active);
        assert!(!components.get(&idle).unwrap().active);

        for _ in 0..3 {
            sim.advance();
            bridge.on_message(PluginEvent::MainScriptAboutToBeCalled);
        }
        let robot = components.get(&name).unwrap();
        assert_eq!(robot.steps, 3);
        assert!((robot.last_time - 0.015).abs() < 1e-9);
        assert_eq!(components.get(&idle).unwrap().steps, 0);

        bridge.on_message(PluginEvent::SimulationEnded);
        assert!(!components.get(&name).unwrap().active);
    }

    #[test]
    fn start_message_adopts_simulator_step() {
        let (mut bridge, _, _) = bridge();
        bridge.on_message(PluginEvent::SimulationAboutToStart);
        assert!((bridge.executor().context().clock.time_step() - 0.005).abs() < f64::EPSILON);
    }

    #[test]
    fn health_follows_ticks() {
        let config = BridgeConfig {
            executor_stall_ms: 20,
            ..BridgeConfig::default()
        };
        let mut bridge = Bridge::new(
            config,
            Box::new(SimSimulator::builder().build()),
            Box::new(SimComponents::new()),
        );
        assert_eq!(bridge.executor_health(), ComponentHealth::Healthy);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(bridge.executor_health(), ComponentHealth::TimedOut);
        bridge.on_message(PluginEvent::Idle);
        assert_eq!(bridge.executor_health(), ComponentHealth::Healthy);
    }

    #[test]
    fn registered_handler_overrides_default() {
        fn refuse(_: &mut HostContext, cmd: &Command) -> simrtc_types::CommandResult {
            simrtc_types::CommandResult::from_error(cmd.id, &BridgeError::Refused("locked".into()))
        }

        let (mut bridge, _, _) = bridge();
        bridge.register(CommandKind::Start, refuse);
        bridge.channels().commands().push(Command::bare(CommandKind::Start)).unwrap();
        bridge.pump();
        assert_eq!(bridge.channels().results().pop().unwrap().status, ReturnCode::Failed);
    }

    #[test]
    fn shutdown_closes_channels_and_kills_components() {
        let (mut bridge, _, components) = bridge();
        let mut ctl = components.clone();
        ctl.spawn(ComponentKind::Range, "ranger", "").unwrap();
        let client = bridge.client();

        bridge.shutdown();
        assert!(bridge.is_shut_down());
        assert!(components.is_empty());
        assert_eq!(
            client.call(CommandKind::GetSimTime, "", ""),
            Err(BridgeError::Closed)
        );
        bridge.shutdown();
    }

    #[test]
    fn messages_after_shutdown_are_ignored() {
        let (mut bridge, mut sim, components) = bridge();
        let mut ctl = components.clone();
        let name = ctl.spawn(ComponentKind::Robot, "robot", "").unwrap();
        ctl.sync(&name).unwrap();

        bridge.shutdown();
        // Recreated after shutdown; the bridge must not touch it.
        let name = ctl.spawn(ComponentKind::Robot, "robot", "").unwrap();
        ctl.sync(&name).unwrap();
        sim.start_simulation().unwrap();

        assert_eq!(bridge.on_message(PluginEvent::SimulationAboutToStart), 0);
        assert_eq!(bridge.on_message(PluginEvent::MainScriptAboutToBeCalled), 0);
        let component = components.get(&name).unwrap();
        assert!(!component.active);
        assert_eq!(component.steps, 0);
    }

    #[test]
    fn dropping_bridge_wakes_blocked_caller() {
        let (bridge, _, _) = bridge();
        let client = bridge.client();
        let handle = client.enqueue_command(CommandKind::GetSimTime, "", "").unwrap();

        let waiter = std::thread::spawn(move || client.await_result(&handle));
        std::thread::sleep(Duration::from_millis(20));
        drop(bridge);
        assert_eq!(waiter.join().unwrap(), Err(BridgeError::Closed));
    }
}
