//! [`Dispatcher`] – the command dispatch table.
//!
//! Maps each [`CommandKind`] to a [`Handler`].  The default table wires every
//! kind to its function in [`handlers`][crate::handlers]; individual entries
//! can be replaced with [`Dispatcher::register`], e.g. to bind a real
//! simulator call or to inject a failing handler in tests.

use std::collections::HashMap;

use simrtc_types::{Command, CommandKind, CommandResult, ComponentKind};

use crate::context::HostContext;
use crate::handlers::{self, Handler};

pub struct Dispatcher {
    table: HashMap<CommandKind, Handler>,
}

impl Dispatcher {
    /// A table with no handlers.  Every dispatch yields an `Error` result
    /// until kinds are registered.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// A table with the standard handler for every [`CommandKind`].
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register(CommandKind::Start, handlers::start);
        dispatcher.register(CommandKind::Stop, handlers::stop);
        dispatcher.register(CommandKind::Pause, handlers::pause);
        dispatcher.register(CommandKind::LoadProject, handlers::load_project);
        for kind in ComponentKind::ALL {
            dispatcher.register(CommandKind::Spawn(kind), handlers::spawn);
        }
        dispatcher.register(CommandKind::KillRtc, handlers::kill_rtc);
        dispatcher.register(CommandKind::KillAllRtc, handlers::kill_all_rtc);
        dispatcher.register(CommandKind::SyncRtc, handlers::sync_rtc);
        dispatcher.register(CommandKind::GetSyncRtc, handlers::get_sync_rtc);
        dispatcher.register(CommandKind::GetSimTime, handlers::get_sim_time);
        dispatcher.register(CommandKind::GetSimStep, handlers::get_sim_step);
        dispatcher.register(CommandKind::GetObjPose, handlers::get_obj_pose);
        dispatcher.register(CommandKind::SetObjPose, handlers::set_obj_pose);
        dispatcher
    }

    /// Install `handler` for `kind`, returning the handler it replaced.
    pub fn register(&mut self, kind: CommandKind, handler: Handler) -> Option<Handler> {
        self.table.insert(kind, handler)
    }

    pub fn handles(&self, kind: CommandKind) -> bool {
        self.table.contains_key(&kind)
    }

    /// Run the handler for `cmd.kind`.
    ///
    /// A kind without a handler yields an `Error` result, so the caller still
    /// has exactly one result to publish.
    pub fn dispatch(&self, ctx: &mut HostContext, cmd: &Command) -> CommandResult {
        match self.table.get(&cmd.kind) {
            Some(handler) => handler(ctx, cmd),
            None => CommandResult::error(cmd.id, format!("no handler registered for {:?}", cmd.kind)),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}
