//! `simrtc-queue` – the command/result rendezvous
//!
//! Marshals requests from arbitrary middleware threads into the simulator's
//! single-threaded main loop and carries typed results back.
//!
//! # Modules
//!
//! - [`command_queue`] – [`CommandQueue`]: many producers, one executor.
//! - [`result_queue`] – [`ResultQueue`]: one executor, many waiting callers.
//!   Supports both the uncorrelated "pop the next result" protocol and
//!   per-request waits keyed by [`RequestId`][simrtc_types::RequestId].
//! - [`channels`] – [`BridgeChannels`]: the explicitly owned queue pair.
//! - [`client`] – [`ServiceClient`]: what service handlers hold to issue
//!   commands and await their results.

pub mod channels;
pub mod client;
pub mod command_queue;
pub mod result_queue;

pub use channels::BridgeChannels;
pub use client::{RequestHandle, ServiceClient};
pub use command_queue::CommandQueue;
pub use result_queue::ResultQueue;
