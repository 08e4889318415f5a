//! [`Watchdog`] – executor liveness monitor.
//!
//! The executor calls [`Watchdog::heartbeat`] every time the host ticks it.
//! Any thread holding a clone can ask for [`Watchdog::health`]; a caller
//! about to block on a result can use it to fail fast when the simulator has
//! stopped ticking.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Health state reported for the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    /// Ticked within the deadline.
    Healthy,
    /// No tick within the deadline.
    TimedOut,
}

/// Shared heartbeat record.  Clones observe the same heartbeat.
#[derive(Debug, Clone)]
pub struct Watchdog {
    last_heartbeat: Arc<Mutex<Instant>>,
    timeout: Duration,
}

impl Watchdog {
    /// Start watching with the deadline `timeout`.  A fresh watchdog is
    /// healthy.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_heartbeat: Arc::new(Mutex::new(Instant::now())),
            timeout,
        }
    }

    pub fn heartbeat(&self) {
        *self.last_heartbeat.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the last heartbeat.
    pub fn silence(&self) -> Duration {
        self.last_heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    pub fn health(&self) -> ComponentHealth {
        if self.silence() <= self.timeout {
            ComponentHealth::Healthy
        } else {
            ComponentHealth::TimedOut
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
