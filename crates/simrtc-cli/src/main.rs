//! `simrtc` – interactive shell around an in-process bridge
//!
//! This binary plays both sides of the bridge so it can be explored without
//! a simulator.  It:
//!
//! 1. Loads `~/.simrtc/config.toml`, writing the defaults on first run.
//! 2. Starts a host thread that ticks a stub simulator and forwards plugin
//!    messages to the [`Bridge`].
//! 3. Drops the user into a REPL whose commands are bridge service calls.
//! 4. Intercepts **Ctrl-C** to close the bridge and wake any blocked call.

mod host;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use simrtc_bridge::config::{self, BridgeConfig};
use simrtc_bridge::{Bridge, init_tracing};
use simrtc_host::sim::{SimComponents, SimSimulator};
use simrtc_types::Pose;

fn main() {
    let _telemetry = init_tracing("simrtc");

    print_banner();

    let cfg = load_config();

    let sim = SimSimulator::builder()
        .with_object("robot", Pose::default())
        .with_object(
            "box",
            Pose {
                x: 1.0,
                z: 0.25,
                ..Pose::default()
            },
        )
        .build();
    let bridge = Bridge::new(cfg.clone(), Box::new(sim.clone()), Box::new(SimComponents::new()));
    let client = bridge.client();
    let watchdog = bridge.watchdog();
    let channels = bridge.channels().clone();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – closing the bridge …".yellow().bold());
        channels.close();
        shutdown_clone.store(true, Ordering::SeqCst);
        println!("{}", "  ✓ Pending calls released.".green());
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let host = host::spawn(bridge, sim, shutdown.clone(), cfg.tick_period());
    info!(tick_hz = cfg.tick_hz, "host thread running");

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(client, watchdog, shutdown.clone());

    shutdown.store(true, Ordering::SeqCst);
    if host.join().is_err() {
        warn!("host thread panicked");
    }
}

/// Load the config, saving the defaults when none exists yet.
fn load_config() -> BridgeConfig {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            match config::save(&BridgeConfig::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::load_or_default().unwrap_or_default()
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            BridgeConfig::default()
        }
    }
}

fn print_banner() {
    println!();
    println!("  {} {}",
        "simrtc".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Simulator ↔ middleware command bridge");
    println!();
}
