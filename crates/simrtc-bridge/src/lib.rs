//! `simrtc-bridge` – the plugin facade
//!
//! Wires the command/result channels, the executor and the host
//! collaborators into a single [`Bridge`] with an explicit lifecycle.
//!
//! # Modules
//!
//! - [`bridge`] – [`Bridge`] and [`PluginEvent`] routing.
//! - [`config`] – [`BridgeConfig`] loaded from `~/.simrtc/config.toml`.
//! - [`telemetry`] – `tracing` subscriber setup with optional OTLP export.

pub mod bridge;
pub mod config;
pub mod telemetry;

pub use bridge::{Bridge, PluginEvent};
pub use config::BridgeConfig;
pub use telemetry::{TracerProviderGuard, init_tracing};
