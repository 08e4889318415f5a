//! [`Executor`] – the single-threaded consumer of the command queue.
//!
//! The host calls [`Executor::pump`] from its periodic callback.  Each pump
//! takes at most `commands_per_tick` commands (one by default) without ever
//! blocking, runs each through the [`Dispatcher`], and publishes exactly one
//! result per command before returning.  Bounding the work per tick keeps the
//! callback inside the host's frame budget and serializes every host API call
//! against the simulation step.
//!
//! A handler that panics is contained: the caller receives an `Error` result
//! and the executor keeps serving.

use std::panic::{self, AssertUnwindSafe};

use simrtc_queue::BridgeChannels;
use simrtc_types::{BridgeError, Command, CommandResult};
use tracing::{debug, error, warn};

use crate::context::HostContext;
use crate::dispatcher::Dispatcher;
use crate::watchdog::Watchdog;

/// Counters kept by the executor.
///
/// `commands_popped == results_published + results_dropped` holds after
/// every pump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub commands_popped: u64,
    pub results_published: u64,
    /// Results that could not be published because the channels closed
    /// while the command was running.
    pub results_dropped: u64,
    pub handler_panics: u64,
}

pub struct Executor {
    channels: BridgeChannels,
    dispatcher: Dispatcher,
    context: HostContext,
    commands_per_tick: usize,
    watchdog: Watchdog,
    stats: ExecutorStats,
}

impl Executor {
    pub fn new(
        channels: BridgeChannels,
        dispatcher: Dispatcher,
        context: HostContext,
        commands_per_tick: usize,
        watchdog: Watchdog,
    ) -> Self {
        Self {
            channels,
            dispatcher,
            context,
            commands_per_tick: commands_per_tick.max(1),
            watchdog,
            stats: ExecutorStats::default(),
        }
    }

    /// Serve up to `commands_per_tick` pending commands.
    ///
    /// Returns how many were served.  Never blocks.
    pub fn pump(&mut self) -> usize {
        self.watchdog.heartbeat();
        if self.channels.is_closed() {
            return 0;
        }

        let mut served = 0;
        while served < self.commands_per_tick {
            let Some(command) = self.channels.commands().try_pop() else {
                break;
            };
            self.stats.commands_popped += 1;
            served += 1;

            let result = self.execute(&command);
            debug!(id = %command.id, kind = ?command.kind, status = %result.status, "command served");
            match self.channels.results().push(result) {
                Ok(()) => self.stats.results_published += 1,
                Err(BridgeError::Closed) => {
                    warn!(id = %command.id, "channels closed before result could be published");
                    self.stats.results_dropped += 1;
                }
                Err(e) => {
                    error!(id = %command.id, error = %e, "failed to publish result");
                    self.stats.results_dropped += 1;
                }
            }
        }
        served
    }

    /// Run one command through the dispatch table, turning a handler panic
    /// into an `Error` result.
    pub fn execute(&mut self, command: &Command) -> CommandResult {
        let dispatcher = &self.dispatcher;
        let context = &mut self.context;
        match panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(context, command))) {
            Ok(result) => result,
            Err(payload) => {
                self.stats.handler_panics += 1;
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(id = %command.id, kind = ?command.kind, %reason, "command handler panicked");
                CommandResult::error(command.id, format!("handler panicked: {reason}"))
            }
        }
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut HostContext {
        &mut self.context
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn channels(&self) -> &BridgeChannels {
        &self.channels
    }
}
