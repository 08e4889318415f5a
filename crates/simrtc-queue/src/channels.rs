//! [`BridgeChannels`] – the explicitly owned command/result queue pair.
//!
//! Created once when the bridge starts and closed when it shuts down.
//! Clone it cheaply – all clones share the same two queues.  The executor
//! side and every [`ServiceClient`] hold a clone; nothing else touches the
//! queues.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::client::ServiceClient;
use crate::command_queue::CommandQueue;
use crate::result_queue::ResultQueue;

/// Default time a caller waits for its result before giving up.
pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Default)]
pub struct BridgeChannels {
    commands: Arc<CommandQueue>,
    results: Arc<ResultQueue>,
    /// Serializes push + pop pairs of every client on these channels.
    serial: Arc<Mutex<()>>,
}

impl BridgeChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    pub fn results(&self) -> &ResultQueue {
        &self.results
    }

    /// A client whose awaits give up after `result_timeout`.
    pub fn client(&self, result_timeout: Duration) -> ServiceClient {
        ServiceClient::new(self.clone(), result_timeout)
    }

    /// Take the turn for one uncorrelated push + pop pair.
    pub(crate) fn serial_turn(&self) -> MutexGuard<'_, ()> {
        self.serial.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close both queues, waking every blocked caller with
    /// [`BridgeError::Closed`][simrtc_types::BridgeError::Closed].
    pub fn close(&self) {
        self.commands.close();
        self.results.close();
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

impl std::fmt::Debug for BridgeChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeChannels")
            .field("pending_commands", &self.commands.len())
            .field("pending_results", &self.results.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
