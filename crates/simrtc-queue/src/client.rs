//! [`ServiceClient`] – the caller side of the rendezvous.
//!
//! Middleware service handlers run on threads the simulator knows nothing
//! about.  They hold a `ServiceClient`, enqueue a [`Command`], and block until
//! the executor publishes the matching [`CommandResult`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use simrtc_queue::BridgeChannels;
//! use simrtc_types::{CommandKind, CommandResult, ResultPayload};
//!
//! let channels = BridgeChannels::new();
//! let client = channels.client(Duration::from_secs(1));
//!
//! let handle = client.enqueue_command(CommandKind::GetSimStep, "", "").unwrap();
//!
//! // Executor side (normally the simulator's tick callback).
//! let cmd = channels.commands().try_pop().unwrap();
//! channels
//!     .results()
//!     .push(CommandResult::with_payload(cmd.id, ResultPayload::Float(0.005)))
//!     .unwrap();
//!
//! let result = client.await_result(&handle).unwrap();
//! assert_eq!(result.float_value(), Some(0.005));
//! ```

use std::time::Duration;

use simrtc_types::{BridgeError, Command, CommandKind, CommandResult, RequestId};
use tracing::{debug, warn};

use crate::channels::BridgeChannels;

/// Receipt for an enqueued command; pass it back to
/// [`ServiceClient::await_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHandle {
    id: RequestId,
    kind: CommandKind,
}

impl RequestHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }
}

/// Cloneable, thread-safe handle for issuing commands to the executor.
#[derive(Clone)]
pub struct ServiceClient {
    channels: BridgeChannels,
    default_timeout: Duration,
}

impl ServiceClient {
    pub fn new(channels: BridgeChannels, default_timeout: Duration) -> Self {
        Self {
            channels,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Queue a command for the executor and return its handle.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Closed`] when the bridge has shut down.
    pub fn enqueue_command(
        &self,
        kind: CommandKind,
        key: impl Into<String>,
        arg: impl Into<String>,
    ) -> Result<RequestHandle, BridgeError> {
        let command = Command::new(kind, key, arg);
        let handle = RequestHandle {
            id: command.id,
            kind,
        };
        debug!(id = %handle.id, ?kind, key = %command.key, "enqueue command");
        self.channels.commands().push(command)?;
        Ok(handle)
    }

    /// Wait for the result of `handle` using the client's default timeout.
    pub fn await_result(&self, handle: &RequestHandle) -> Result<CommandResult, BridgeError> {
        self.await_result_timeout(handle, self.default_timeout)
    }

    /// Wait up to `timeout` for the result of `handle`.
    ///
    /// On timeout the request is cancelled, so a late result never reaches
    /// another caller.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::Timeout`] – the executor did not answer in time.
    /// * [`BridgeError::Closed`] – the bridge shut down while waiting.
    pub fn await_result_timeout(
        &self,
        handle: &RequestHandle,
        timeout: Duration,
    ) -> Result<CommandResult, BridgeError> {
        match self.channels.results().pop_for(handle.id, timeout) {
            Ok(result) => {
                debug!(id = %handle.id, status = %result.status, "result received");
                Ok(result)
            }
            Err(BridgeError::Timeout(id)) => {
                let withdrawn = self.cancel(handle);
                warn!(%id, kind = ?handle.kind, ?timeout, withdrawn, "executor did not answer in time");
                Err(BridgeError::Timeout(id))
            }
            Err(e) => Err(e),
        }
    }

    /// Enqueue a command and wait for its own result.
    pub fn call(
        &self,
        kind: CommandKind,
        key: impl Into<String>,
        arg: impl Into<String>,
    ) -> Result<CommandResult, BridgeError> {
        let handle = self.enqueue_command(kind, key, arg)?;
        self.await_result(&handle)
    }

    /// Enqueue a command and take the *next* result off the queue.
    ///
    /// No correlation is done by the queue; instead the whole push/pop pair
    /// runs under a lock owned by the channels and shared by every client
    /// built on them, so two callers never interleave.  Do not mix with [`call`][Self::call] on the
    /// same channels.
    pub fn call_serialized(
        &self,
        kind: CommandKind,
        key: impl Into<String>,
        arg: impl Into<String>,
    ) -> Result<CommandResult, BridgeError> {
        let _turn = self.channels.serial_turn();
        let handle = self.enqueue_command(kind, key, arg)?;

        match self.channels.results().pop_timeout(self.default_timeout) {
            Some(result) => {
                if result.request_id != handle.id {
                    warn!(expected = %handle.id, got = %result.request_id, "serialized call received a foreign result");
                }
                Ok(result)
            }
            None if self.channels.results().is_closed() => Err(BridgeError::Closed),
            None => {
                self.cancel(&handle);
                Err(BridgeError::Timeout(handle.id))
            }
        }
    }

    /// Async variant of [`call`][Self::call] for handlers running on Tokio.
    ///
    /// The blocking wait runs on the blocking thread pool.
    pub async fn call_async(
        &self,
        kind: CommandKind,
        key: impl Into<String>,
        arg: impl Into<String>,
    ) -> Result<CommandResult, BridgeError> {
        let client = self.clone();
        let key = key.into();
        let arg = arg.into();
        tokio::task::spawn_blocking(move || client.call(kind, key, arg))
            .await
            .map_err(|e| BridgeError::HostFault(format!("blocking call task failed: {e}")))?
    }

    /// Give up on `handle`.
    ///
    /// Returns `true` if the command was withdrawn before the executor saw
    /// it.  Otherwise its result is discarded when it arrives.
    pub fn cancel(&self, handle: &RequestHandle) -> bool {
        if self.channels.commands().remove(handle.id) {
            debug!(id = %handle.id, "withdrew pending command");
            return true;
        }
        self.channels.results().abandon(handle.id);
        false
    }
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("channels", &self.channels)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
