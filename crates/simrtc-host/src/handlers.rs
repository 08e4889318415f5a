//! One handler per [`CommandKind`][simrtc_types::CommandKind].
//!
//! Handlers are plain functions so they can be exercised directly against a
//! [`HostContext`] without any queue machinery.  Each returns exactly one
//! [`CommandResult`] and never panics on bad input; a malformed `key` or
//! `arg` becomes an `Error` result.

use simrtc_types::{BridgeError, Command, CommandKind, CommandResult, Pose, ResultPayload};
use tracing::{info, warn};

use crate::context::HostContext;

/// Signature shared by every entry of the dispatch table.
pub type Handler = fn(&mut HostContext, &Command) -> CommandResult;

pub fn start(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    info!(id = %cmd.id, "starting simulation");
    CommandResult::from_outcome(cmd.id, ctx.simulator.start_simulation())
}

pub fn stop(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    info!(id = %cmd.id, "stopping simulation");
    CommandResult::from_outcome(cmd.id, ctx.simulator.stop_simulation())
}

pub fn pause(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    info!(id = %cmd.id, "pausing simulation");
    CommandResult::from_outcome(cmd.id, ctx.simulator.pause_simulation())
}

/// Any load failure is an `Error`, never `Failed`.
pub fn load_project(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    info!(id = %cmd.id, scene = %cmd.key, "loading project");
    match ctx.simulator.load_scene(&cmd.key) {
        Ok(()) => CommandResult::ok(cmd.id),
        Err(e) => as_error(cmd, e),
    }
}

pub fn spawn(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    let CommandKind::Spawn(kind) = cmd.kind else {
        return CommandResult::error(cmd.id, format!("{:?} is not a spawn command", cmd.kind));
    };
    info!(id = %cmd.id, %kind, model = %cmd.key, arg = %cmd.arg, "spawning component");
    match ctx.components.spawn(kind, &cmd.key, &cmd.arg) {
        Ok(name) => {
            info!(id = %cmd.id, %name, "component spawned");
            CommandResult::ok(cmd.id)
        }
        Err(e) => as_error(cmd, e),
    }
}

pub fn kill_rtc(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    info!(id = %cmd.id, name = %cmd.key, "killing component");
    match ctx.components.kill(&cmd.key) {
        Ok(()) => CommandResult::ok(cmd.id),
        Err(e) => as_error(cmd, e),
    }
}

pub fn kill_all_rtc(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    match ctx.components.kill_all() {
        Ok(removed) => {
            info!(id = %cmd.id, removed, "killed all components");
            CommandResult::ok(cmd.id)
        }
        Err(e) => as_error(cmd, e),
    }
}

pub fn sync_rtc(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    info!(id = %cmd.id, name = %cmd.key, "synchronizing component");
    match ctx.components.sync(&cmd.key) {
        Ok(()) => CommandResult::ok(cmd.id),
        Err(e) => as_error(cmd, e),
    }
}

pub fn get_sync_rtc(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    match ctx.components.synchronized() {
        Ok(names) => {
            info!(id = %cmd.id, count = names.len(), "listing synchronized components");
            CommandResult::with_payload(cmd.id, ResultPayload::Names(names))
        }
        Err(e) => as_error(cmd, e),
    }
}

pub fn get_sim_time(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    CommandResult::with_payload(cmd.id, ResultPayload::Float(ctx.simulator.simulation_time()))
}

pub fn get_sim_step(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    CommandResult::with_payload(
        cmd.id,
        ResultPayload::Float(ctx.simulator.simulation_time_step()),
    )
}

pub fn get_obj_pose(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    match ctx.simulator.object_pose(&cmd.key) {
        Ok(pose) => CommandResult::with_payload(cmd.id, ResultPayload::Pose(pose)),
        Err(e) => as_error(cmd, e),
    }
}

/// `arg` carries `"x,y,z,roll,pitch,yaw"`.
pub fn set_obj_pose(ctx: &mut HostContext, cmd: &Command) -> CommandResult {
    let outcome = cmd
        .arg
        .parse::<Pose>()
        .and_then(|pose| ctx.simulator.set_object_pose(&cmd.key, pose));
    match outcome {
        Ok(()) => CommandResult::ok(cmd.id),
        Err(e) => as_error(cmd, e),
    }
}

/// Component and scene operations report every failure as `Error`.
fn as_error(cmd: &Command, err: BridgeError) -> CommandResult {
    warn!(id = %cmd.id, kind = ?cmd.kind, key = %cmd.key, error = %err, "command failed");
    CommandResult::error(cmd.id, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimComponents, SimSimulator};
    use simrtc_types::{ComponentKind, ReturnCode};

    fn context() -> (HostContext, SimSimulator, SimComponents) {
        let sim = SimSimulator::builder()
            .with_time_step(0.005)
            .with_object("box", Pose::default())
            .build();
        let comps = SimComponents::new();
        let ctx = HostContext::new(Box::new(sim.clone()), Box::new(comps.clone()));
        (ctx, sim, comps)
    }

    #[test]
    fn start_refused_is_failed_and_fault_is_error() {
        let (mut ctx, sim, _) = context();
        assert_eq!(start(&mut ctx, &Command::bare(CommandKind::Start)).status, ReturnCode::Ok);
        assert_eq!(
            start(&mut ctx, &Command::bare(CommandKind::Start)).status,
            ReturnCode::Failed
        );
        sim.set_faulted(true);
        assert_eq!(stop(&mut ctx, &Command::bare(CommandKind::Stop)).status, ReturnCode::Error);
    }

    #[test]
    fn pause_when_stopped_is_failed() {
        let (mut ctx, _, _) = context();
        let res = pause(&mut ctx, &Command::bare(CommandKind::Pause));
        assert_eq!(res.status, ReturnCode::Failed);
        assert!(res.detail.is_some());
    }

    #[test]
    fn load_project_failure_is_error() {
        let (mut ctx, sim, _) = context();
        let ok = load_project(&mut ctx, &Command::new(CommandKind::LoadProject, "a.ttt", ""));
        assert!(ok.is_ok());
        assert_eq!(sim.scene().as_deref(), Some("a.ttt"));

        let bad = load_project(&mut ctx, &Command::new(CommandKind::LoadProject, "", ""));
        assert_eq!(bad.status, ReturnCode::Error);
    }

    #[test]
    fn spawn_uses_component_kind_from_command() {
        let (mut ctx, _, comps) = context();
        let cmd = Command::new(CommandKind::Spawn(ComponentKind::Accelerometer), "imu", "rate=100");
        assert!(spawn(&mut ctx, &cmd).is_ok());
        let spawned = comps.get("imu0").unwrap();
        assert_eq!(spawned.kind, ComponentKind::Accelerometer);
        assert_eq!(spawned.arg, "rate=100");
    }

    #[test]
    fn spawn_rejects_non_spawn_kind() {
        let (mut ctx, _, comps) = context();
        let res = spawn(&mut ctx, &Command::new(CommandKind::Start, "robot", ""));
        assert_eq!(res.status, ReturnCode::Error);
        assert!(comps.is_empty());
    }

    #[test]
    fn kill_unknown_component_is_error() {
        let (mut ctx, _, _) = context();
        let res = kill_rtc(&mut ctx, &Command::new(CommandKind::KillRtc, "robot1", ""));
        assert_eq!(res.status, ReturnCode::Error);
        assert!(res.detail.unwrap().contains("robot1"));
    }

    #[test]
    fn sync_then_list() {
        let (mut ctx, _, _) = context();
        spawn(
            &mut ctx,
            &Command::new(CommandKind::Spawn(ComponentKind::Robot), "robot", ""),
        );
        assert!(sync_rtc(&mut ctx, &Command::new(CommandKind::SyncRtc, "robot0", "")).is_ok());
        let listed = get_sync_rtc(&mut ctx, &Command::bare(CommandKind::GetSyncRtc));
        assert_eq!(listed.names().unwrap(), ["robot0".to_string()]);
    }

    #[test]
    fn get_sim_step_reports_time_step() {
        let (mut ctx, _, _) = context();
        let res = get_sim_step(&mut ctx, &Command::bare(CommandKind::GetSimStep));
        assert_eq!(res.status, ReturnCode::Ok);
        assert_eq!(res.float_value(), Some(0.005));
    }

    #[test]
    fn set_then_get_object_pose() {
        let (mut ctx, _, _) = context();
        let set = set_obj_pose(
            &mut ctx,
            &Command::new(CommandKind::SetObjPose, "box", "1,2,3,0,0,1.57"),
        );
        assert!(set.is_ok());

        let got = get_obj_pose(&mut ctx, &Command::new(CommandKind::GetObjPose, "box", ""));
        match got.payload {
            ResultPayload::Pose(pose) => {
                assert!((pose.y - 2.0).abs() < f64::EPSILON);
                assert!((pose.yaw - 1.57).abs() < f64::EPSILON);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn set_object_pose_with_bad_arg_is_error() {
        let (mut ctx, _, _) = context();
        let res = set_obj_pose(&mut ctx, &Command::new(CommandKind::SetObjPose, "box", "1,2"));
        assert_eq!(res.status, ReturnCode::Error);
    }
}
