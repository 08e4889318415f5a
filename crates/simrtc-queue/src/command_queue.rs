//! [`CommandQueue`] – FIFO of [`Command`]s waiting for the executor.
//!
//! Any number of threads may [`push`][CommandQueue::push] concurrently; a
//! push never blocks.  Exactly one executor drains the queue, either with
//! the blocking [`pop`][CommandQueue::pop] or, from inside a host tick, with
//! [`try_pop`][CommandQueue::try_pop] so the tick never stalls.
//!
//! Order is insertion order as observed by the internal lock.  There is no
//! fairness between producer threads beyond that.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use simrtc_types::{BridgeError, Command, RequestId};
use tracing::trace;

#[derive(Default)]
struct State {
    items: VecDeque<Command>,
    closed: bool,
}

/// Thread-safe, strictly ordered command queue.
#[derive(Default)]
pub struct CommandQueue {
    state: Mutex<State>,
    available: Condvar,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `command` to the tail and wake one blocked popper.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Closed`] once [`close`][Self::close] has been called.
    pub fn push(&self, command: Command) -> Result<(), BridgeError> {
        let mut state = self.lock();
        if state.closed {
            return Err(BridgeError::Closed);
        }
        trace!(id = %command.id, kind = ?command.kind, depth = state.items.len() + 1, "command queued");
        state.items.push_back(command);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Block until a command is available and remove the head.
    ///
    /// Returns `None` only when the queue is closed and fully drained.
    pub fn pop(&self) -> Option<Command> {
        let state = self.lock();
        let mut state = self
            .available
            .wait_while(state, |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.items.pop_front()
    }

    /// Remove the head if there is one, without waiting.
    pub fn try_pop(&self) -> Option<Command> {
        self.lock().items.pop_front()
    }

    /// Like [`pop`][Self::pop] but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Command> {
        let state = self.lock();
        let (mut state, _) = self
            .available
            .wait_timeout_while(state, timeout, |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.items.pop_front()
    }

    /// Withdraw the pending command with the given id.
    ///
    /// Returns `false` if the executor already took it (or it never existed).
    pub fn remove(&self, id: RequestId) -> bool {
        let mut state = self.lock();
        match state.items.iter().position(|c| c.id == id) {
            Some(pos) => {
                state.items.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Refuse further pushes and wake every blocked popper.
    ///
    /// Commands already queued can still be drained.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simrtc_types::CommandKind;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn cmd(key: &str) -> Command {
        Command::new(CommandKind::LoadProject, key, "")
    }

    #[test]
    fn pops_in_push_order() {
        let queue = CommandQueue::new();
        for i in 0..10 {
            queue.push(cmd(&format!("scene{i}"))).unwrap();
        }
        let keys: Vec<String> = std::iter::from_fn(|| queue.try_pop()).map(|c| c.key).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("scene{i}")).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn try_pop_on_empty_returns_none() {
        let queue = CommandQueue::new();
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(CommandQueue::new());
        let popper = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!popper.is_finished(), "pop must not return on an empty queue");

        queue.push(cmd("late")).unwrap();
        let got = popper.join().unwrap().expect("popper must receive the command");
        assert_eq!(got.key, "late");
    }

    #[test]
    fn woken_popper_shrinks_queue_by_one() {
        let queue = CommandQueue::new();
        queue.push(cmd("a")).unwrap();
        queue.push(cmd("b")).unwrap();
        queue.push(cmd("c")).unwrap();
        assert_eq!(queue.len(), 3);
        queue.pop().unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn pop_timeout_elapses_on_empty_queue() {
        let queue = CommandQueue::new();
        let start = Instant::now();
        assert!(queue.pop_timeout(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn remove_withdraws_only_the_matching_command() {
        let queue = CommandQueue::new();
        let first = cmd("first");
        let second = cmd("second");
        let second_id = second.id;
        queue.push(first).unwrap();
        queue.push(second).unwrap();

        assert!(queue.remove(second_id));
        assert!(!queue.remove(second_id));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_pop().unwrap().key, "first");
    }

    #[test]
    fn close_wakes_blocked_popper_and_rejects_pushes() {
        let queue = Arc::new(CommandQueue::new());
        let popper = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(popper.join().unwrap().is_none());
        assert!(matches!(queue.push(cmd("x")), Err(BridgeError::Closed)));
        assert!(queue.is_closed());
    }

    #[test]
    fn close_still_drains_pending_commands() {
        let queue = CommandQueue::new();
        queue.push(cmd("pending")).unwrap();
        queue.close();
        assert_eq!(queue.pop().unwrap().key, "pending");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(CommandQueue::new());
        let producers: Vec<_> = (0..8)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..100 {
                        queue.push(cmd(&format!("{t}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        assert_eq!(queue.len(), 800);

        // Per-producer order survives interleaving.
        let mut last_seen = [-1i32; 8];
        while let Some(c) = queue.try_pop() {
            let (t, i) = c.key.split_once('-').unwrap();
            let (t, i): (usize, i32) = (t.parse().unwrap(), i.parse().unwrap());
            assert!(i > last_seen[t]);
            last_seen[t] = i;
        }
    }
}
