//! [`ResultQueue`] – results travelling back from the executor.
//!
//! The executor is the only producer.  Consumers are the foreign threads that
//! issued commands, and two consumption styles are supported:
//!
//! * **Uncorrelated** ([`pop`][ResultQueue::pop],
//!   [`pop_timeout`][ResultQueue::pop_timeout]) – take whatever result is at
//!   the head.  Only safe when callers serialize their push/await pairs, see
//!   [`ServiceClient::call_serialized`][crate::ServiceClient::call_serialized].
//! * **Correlated** ([`pop_for`][ResultQueue::pop_for]) – wait for the result
//!   carrying a specific [`RequestId`] and take exactly that one.
//!
//! Mixing both styles on one queue lets an uncorrelated popper take a result
//! a correlated waiter is expecting.
//!
//! Every pushed result is handed to exactly one consumer.  Results whose
//! caller gave up are [`abandon`][ResultQueue::abandon]ed and dropped instead
//! of lingering at the head.  At most [`ABANDONED_CAPACITY`] abandoned ids are
//! remembered; the oldest is forgotten first.

use std::collections::{HashSet, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use simrtc_types::{BridgeError, CommandResult, RequestId};
use tracing::debug;

/// Abandoned ids remembered while their result has not arrived.
pub const ABANDONED_CAPACITY: usize = 1024;

#[derive(Default)]
struct State {
    items: VecDeque<CommandResult>,
    abandoned: HashSet<RequestId>,
    /// `abandoned` in insertion order, for eviction.
    abandoned_order: VecDeque<RequestId>,
    /// Threads currently blocked in `pop_for`.
    correlated_waiters: usize,
    closed: bool,
}

/// Thread-safe result queue with optional per-request matching.
#[derive(Default)]
pub struct ResultQueue {
    state: Mutex<State>,
    available: Condvar,
}

impl ResultQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `result` and wake its consumer.
    ///
    /// A result for an abandoned request is discarded here.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Closed`] once the queue has been closed.
    pub fn push(&self, result: CommandResult) -> Result<(), BridgeError> {
        let mut state = self.lock();
        if state.closed {
            return Err(BridgeError::Closed);
        }
        if state.forget_abandoned(result.request_id) {
            debug!(id = %result.request_id, status = %result.status, "discarding result of abandoned request");
            return Ok(());
        }
        state.items.push_back(result);
        let wake_all = state.correlated_waiters > 0;
        drop(state);

        // Correlated waiters filter by id, so any of them may be the owner.
        if wake_all {
            self.available.notify_all();
        } else {
            self.available.notify_one();
        }
        Ok(())
    }

    /// Block until a result is available and remove the head.
    ///
    /// Returns `None` only when the queue is closed and drained.
    pub fn pop(&self) -> Option<CommandResult> {
        let state = self.lock();
        let mut state = self
            .available
            .wait_while(state, |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.items.pop_front()
    }

    /// Like [`pop`][Self::pop] but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<CommandResult> {
        let state = self.lock();
        let (mut state, _) = self
            .available
            .wait_timeout_while(state, timeout, |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.items.pop_front()
    }

    /// Wait up to `timeout` for the result answering `id`.
    ///
    /// A timeout too large to represent as a deadline (e.g. `Duration::MAX`)
    /// waits without one.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::Timeout`] – no matching result arrived in time.
    /// * [`BridgeError::Cancelled`] – `id` was abandoned before its result
    ///   arrived.
    /// * [`BridgeError::Closed`] – the queue was closed while waiting.
    pub fn pop_for(&self, id: RequestId, timeout: Duration) -> Result<CommandResult, BridgeError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if let Some(pos) = state.items.iter().position(|r| r.request_id == id) {
                if let Some(result) = state.items.remove(pos) {
                    return Ok(result);
                }
            }
            if state.abandoned.contains(&id) {
                return Err(BridgeError::Cancelled(id));
            }
            if state.closed {
                return Err(BridgeError::Closed);
            }

            state.correlated_waiters += 1;
            state = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        state.correlated_waiters -= 1;
                        return Err(BridgeError::Timeout(id));
                    }
                    self.available
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
            state.correlated_waiters -= 1;
        }
    }

    /// Give up on `id`: drop its result if already queued, otherwise drop it
    /// on arrival.
    ///
    /// Returns `true` if a queued result was dropped.
    pub fn abandon(&self, id: RequestId) -> bool {
        let mut state = self.lock();
        let dropped = match state.items.iter().position(|r| r.request_id == id) {
            Some(pos) => {
                state.items.remove(pos);
                true
            }
            None => {
                state.remember_abandoned(id);
                false
            }
        };
        drop(state);
        // A correlated waiter on `id` must see the cancellation.
        self.available.notify_all();
        dropped
    }

    /// Number of abandoned ids still waiting for their result.
    pub fn abandoned_len(&self) -> usize {
        self.lock().abandoned.len()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Refuse further pushes and wake every waiter.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn remember_abandoned(&mut self, id: RequestId) {
        if !self.abandoned.insert(id) {
            return;
        }
        self.abandoned_order.push_back(id);
        while self.abandoned_order.len() > ABANDONED_CAPACITY {
            if let Some(oldest) = self.abandoned_order.pop_front() {
                self.abandoned.remove(&oldest);
                debug!(id = %oldest, "forgetting oldest abandoned request");
            }
        }
    }

    /// Returns `true` if `id` was abandoned.
    fn forget_abandoned(&mut self, id: RequestId) -> bool {
        if !self.abandoned.remove(&id) {
            return false;
        }
        if let Some(pos) = self.abandoned_order.iter().position(|a| *a == id) {
            self.abandoned_order.remove(pos);
        }
        true
    }
}
