//! In-process stand-ins for the simulator and the middleware.
//!
//! [`SimSimulator`] and [`SimComponents`] keep their state in memory so the
//! full bridge (queues, executor, plugin event routing) can run in tests and
//! from the `simrtc` shell without a simulator or a middleware name server.
//!
//! Both are cheap to clone and every clone shares the same state, so a test
//! can hand one clone to the executor and inspect another.
//!
//! # Example
//!
//! ```rust
//! use simrtc_host::sim::{SimComponents, SimSimulator};
//! use simrtc_host::{ComponentManager, SimulatorApi};
//! use simrtc_types::ComponentKind;
//!
//! let mut sim = SimSimulator::builder().with_time_step(0.005).build();
//! sim.start_simulation().expect("stub start must succeed");
//!
//! let mut components = SimComponents::new();
//! let name = components.spawn(ComponentKind::Robot, "robot", "").unwrap();
//! assert_eq!(name, "robot0");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use simrtc_types::{BridgeError, ComponentKind, Pose};
use tracing::debug;

use crate::clock::{DEFAULT_TIME_STEP, SimulationClock};
use crate::components::ComponentManager;
use crate::simulator::{SimulatorApi, check_status};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// Stub simulator
// ────────────────────────────────────────────────────────────────────────────

/// Run state of the stub simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug)]
struct SimulatorState {
    run_state: RunState,
    time: f64,
    time_step: f64,
    scene: Option<String>,
    objects: HashMap<String, Pose>,
    faulted: bool,
}

/// A simulator stub that follows the host's return-code conventions: a
/// refused transition reports `0`, a faulted simulator reports `-1`.
#[derive(Debug, Clone)]
pub struct SimSimulator {
    state: Arc<Mutex<SimulatorState>>,
}

impl SimSimulator {
    pub fn builder() -> SimSimulatorBuilder {
        SimSimulatorBuilder::default()
    }

    pub fn run_state(&self) -> RunState {
        lock(&self.state).run_state
    }

    pub fn scene(&self) -> Option<String> {
        lock(&self.state).scene.clone()
    }

    /// Make every subsequent state-changing call fail with a host fault.
    pub fn set_faulted(&self, faulted: bool) {
        lock(&self.state).faulted = faulted;
    }

    /// Run one physics step.  No-op unless running.
    pub fn advance(&mut self) {
        let mut state = lock(&self.state);
        if state.run_state == RunState::Running {
            state.time += state.time_step;
        }
    }

    fn transition(&self, operation: &str, allowed: &[RunState], next: RunState) -> Result<(), BridgeError> {
        let mut state = lock(&self.state);
        let code = if state.faulted {
            -1
        } else if allowed.contains(&state.run_state) {
            state.run_state = next;
            if next == RunState::Stopped {
                state.time = 0.0;
            }
            1
        } else {
            0
        };
        debug!(operation, code, run_state = ?state.run_state, "sim transition");
        check_status(operation, code)
    }
}

impl SimulatorApi for SimSimulator {
    fn start_simulation(&mut self) -> Result<(), BridgeError> {
        self.transition(
            "start simulation",
            &[RunState::Stopped, RunState::Paused],
            RunState::Running,
        )
    }

    fn stop_simulation(&mut self) -> Result<(), BridgeError> {
        self.transition(
            "stop simulation",
            &[RunState::Running, RunState::Paused],
            RunState::Stopped,
        )
    }

    fn pause_simulation(&mut self) -> Result<(), BridgeError> {
        self.transition("pause simulation", &[RunState::Running], RunState::Paused)
    }

    fn load_scene(&mut self, path: &str) -> Result<(), BridgeError> {
        let mut state = lock(&self.state);
        let code = if state.faulted || path.trim().is_empty() || state.run_state != RunState::Stopped {
            -1
        } else {
            state.scene = Some(path.to_string());
            1
        };
        check_status(&format!("load scene '{path}'"), code)
    }

    fn simulation_time(&self) -> f64 {
        lock(&self.state).time
    }

    fn simulation_time_step(&self) -> f64 {
        lock(&self.state).time_step
    }

    fn object_pose(&self, name: &str) -> Result<Pose, BridgeError> {
        lock(&self.state)
            .objects
            .get(name)
            .copied()
            .ok_or_else(|| BridgeError::UnknownComponent(name.to_string()))
    }

    fn set_object_pose(&mut self, name: &str, pose: Pose) -> Result<(), BridgeError> {
        match lock(&self.state).objects.get_mut(name) {
            Some(slot) => {
                *slot = pose;
                Ok(())
            }
            None => Err(BridgeError::UnknownComponent(name.to_string())),
        }
    }
}

/// Builder for [`SimSimulator`].
#[derive(Debug)]
pub struct SimSimulatorBuilder {
    time_step: f64,
    objects: HashMap<String, Pose>,
}

impl Default for SimSimulatorBuilder {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            objects: HashMap::new(),
        }
    }
}

impl SimSimulatorBuilder {
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Add a scene object at `pose`.
    pub fn with_object(mut self, name: impl Into<String>, pose: Pose) -> Self {
        self.objects.insert(name.into(), pose);
        self
    }

    pub fn build(self) -> SimSimulator {
        SimSimulator {
            state: Arc::new(Mutex::new(SimulatorState {
                run_state: RunState::Stopped,
                time: 0.0,
                time_step: self.time_step,
                scene: None,
                objects: self.objects,
                faulted: false,
            })),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub component manager
// ────────────────────────────────────────────────────────────────────────────

/// What the stub knows about one spawned component.
#[derive(Debug, Clone, PartialEq)]
pub struct SimComponent {
    pub kind: ComponentKind,
    pub model: String,
    pub arg: String,
    pub synchronized: bool,
    pub active: bool,
    /// Number of simulation steps this component has been driven through.
    pub steps: u64,
    /// Simulation time seen at the last step.
    pub last_time: f64,
}

#[derive(Debug, Default)]
struct ComponentsState {
    components: BTreeMap<String, SimComponent>,
    next_index: HashMap<String, u32>,
}

/// Component manager stub.  Instance names follow the middleware's
/// `<model><n>` convention, e.g. `robot0`, `robot1`.
#[derive(Debug, Clone, Default)]
pub struct SimComponents {
    state: Arc<Mutex<ComponentsState>>,
}

impl SimComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<SimComponent> {
        lock(&self.state).components.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.state).components.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).components.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).components.is_empty()
    }
}

impl ComponentManager for SimComponents {
    fn spawn(&mut self, kind: ComponentKind, model: &str, arg: &str) -> Result<String, BridgeError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(BridgeError::InvalidArgument(format!(
                "{kind} component needs a model name"
            )));
        }
        let mut state = lock(&self.state);
        let index = state.next_index.entry(model.to_string()).or_insert(0);
        let name = format!("{model}{index}");
        *index += 1;
        state.components.insert(
            name.clone(),
            SimComponent {
                kind,
                model: model.to_string(),
                arg: arg.to_string(),
                synchronized: false,
                active: false,
                steps: 0,
                last_time: 0.0,
            },
        );
        Ok(name)
    }

    fn kill(&mut self, name: &str) -> Result<(), BridgeError> {
        lock(&self.state)
            .components
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BridgeError::UnknownComponent(name.to_string()))
    }

    fn kill_all(&mut self) -> Result<usize, BridgeError> {
        let mut state = lock(&self.state);
        let removed = state.components.len();
        state.components.clear();
        Ok(removed)
    }

    fn sync(&mut self, name: &str) -> Result<(), BridgeError> {
        match lock(&self.state).components.get_mut(name) {
            Some(component) => {
                component.synchronized = true;
                Ok(())
            }
            None => Err(BridgeError::UnknownComponent(name.to_string())),
        }
    }

    fn synchronized(&self) -> Result<Vec<String>, BridgeError> {
        Ok(lock(&self.state)
            .components
            .iter()
            .filter(|(_, c)| c.synchronized)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn on_simulation_start(&mut self, clock: &SimulationClock) {
        for component in lock(&self.state).components.values_mut() {
            if component.synchronized {
                component.active = true;
                component.last_time = clock.time();
            }
        }
    }

    fn on_step(&mut self, clock: &SimulationClock) {
        for component in lock(&self.state).components.values_mut() {
            if component.synchronized && component.active {
                component.steps += 1;
                component.last_time = clock.time();
            }
        }
    }

    fn on_simulation_end(&mut self) {
        for component in lock(&self.state).components.values_mut() {
            component.active = false;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_twice_is_refused() {
        let mut sim = SimSimulator::builder().build();
        sim.start_simulation().unwrap();
        assert!(matches!(sim.start_simulation(), Err(BridgeError::Refused(_))));
        assert_eq!(sim.run_state(), RunState::Running);
    }

    #[test]
    fn faulted_simulator_reports_host_fault() {
        let mut sim = SimSimulator::builder().build();
        sim.set_faulted(true);
        assert!(matches!(sim.start_simulation(), Err(BridgeError::HostFault(_))));
    }

    #[test]
    fn pause_then_resume_keeps_time() {
        let mut sim = SimSimulator::builder().with_time_step(0.1).build();
        sim.start_simulation().unwrap();
        sim.advance();
        sim.pause_simulation().unwrap();
        sim.advance();
        assert!((sim.simulation_time() - 0.1).abs() < 1e-12);
        sim.start_simulation().unwrap();
        assert_eq!(sim.run_state(), RunState::Running);
    }

    #[test]
    fn stop_resets_time() {
        let mut sim = SimSimulator::builder().build();
        sim.start_simulation().unwrap();
        sim.advance();
        sim.stop_simulation().unwrap();
        assert_eq!(sim.simulation_time(), 0.0);
        assert!(matches!(sim.stop_simulation(), Err(BridgeError::Refused(_))));
    }

    #[test]
    fn load_scene_only_while_stopped() {
        let mut sim = SimSimulator::builder().build();
        sim.load_scene("scenes/arm.ttt").unwrap();
        assert_eq!(sim.scene().as_deref(), Some("scenes/arm.ttt"));

        sim.start_simulation().unwrap();
        assert!(matches!(sim.load_scene("other.ttt"), Err(BridgeError::HostFault(_))));
        assert!(matches!(
            SimSimulator::builder().build().load_scene("  "),
            Err(BridgeError::HostFault(_))
        ));
    }

    #[test]
    fn object_pose_roundtrip_and_unknown_object() {
        let mut sim = SimSimulator::builder()
            .with_object("box", Pose::default())
            .build();
        let target = Pose {
            x: 1.0,
            ..Pose::default()
        };
        sim.set_object_pose("box", target).unwrap();
        assert_eq!(sim.object_pose("box").unwrap(), target);
        assert!(matches!(sim.object_pose("ghost"), Err(BridgeError::UnknownComponent(_))));
    }

    #[test]
    fn spawn_names_instances_per_model() {
        let mut comps = SimComponents::new();
        assert_eq!(comps.spawn(ComponentKind::Robot, "robot", "").unwrap(), "robot0");
        assert_eq!(comps.spawn(ComponentKind::Robot, "robot", "").unwrap(), "robot1");
        assert_eq!(comps.spawn(ComponentKind::Camera, "cam", "fps=30").unwrap(), "cam0");
        assert_eq!(comps.get("cam0").unwrap().arg, "fps=30");
        assert!(comps.spawn(ComponentKind::Gyro, " ", "").is_err());
    }

    #[test]
    fn kill_unknown_component_fails() {
        let mut comps = SimComponents::new();
        assert!(matches!(comps.kill("robot1"), Err(BridgeError::UnknownComponent(_))));
    }

    #[test]
    fn kill_all_reports_count() {
        let mut comps = SimComponents::new();
        comps.spawn(ComponentKind::Range, "lidar", "").unwrap();
        comps.spawn(ComponentKind::Depth, "kinect", "").unwrap();
        assert_eq!(comps.kill_all().unwrap(), 2);
        assert!(comps.is_empty());
    }

    #[test]
    fn only_synchronized_components_are_stepped() {
        let mut comps = SimComponents::new();
        let synced = comps.spawn(ComponentKind::Robot, "arm", "").unwrap();
        let free = comps.spawn(ComponentKind::Object, "box", "").unwrap();
        comps.sync(&synced).unwrap();
        assert_eq!(comps.synchronized().unwrap(), vec![synced.clone()]);

        let mut clock = SimulationClock::new(0.01);
        comps.on_simulation_start(&clock);
        clock.set_time(0.01);
        comps.on_step(&clock);
        comps.on_step(&clock);
        comps.on_simulation_end();

        let synced = comps.get(&synced).unwrap();
        assert_eq!(synced.steps, 2);
        assert!(!synced.active);
        assert_eq!(comps.get(&free).unwrap().steps, 0);
    }
}
