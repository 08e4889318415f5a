//! REPL – Read-Eval-Print Loop for the `simrtc` shell.
//!
//! Every command except `/health`, `/help` and `/quit` becomes one bridge
//! call.  The call blocks until the host thread serves it.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use simrtc_host::{ComponentHealth, Watchdog};
use simrtc_queue::ServiceClient;
use simrtc_types::{
    BridgeError, CommandKind, CommandResult, ComponentKind, Pose, ResultPayload, ReturnCode,
};

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Call {
        kind: CommandKind,
        key: String,
        arg: String,
    },
    Health,
    Help,
    Quit,
}

impl Action {
    fn call(kind: CommandKind, key: &str, arg: &str) -> Self {
        Action::Call {
            kind,
            key: key.to_string(),
            arg: arg.to_string(),
        }
    }
}

/// Parse a slash-command.  The error is a message for the user.
pub fn parse(line: &str) -> Result<Action, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let rest: Vec<&str> = words.collect();

    let action = match (head, rest.as_slice()) {
        ("/start", []) => Action::call(CommandKind::Start, "", ""),
        ("/stop", []) => Action::call(CommandKind::Stop, "", ""),
        ("/pause", []) => Action::call(CommandKind::Pause, "", ""),
        ("/load", [path]) => Action::call(CommandKind::LoadProject, path, ""),
        ("/spawn", [kind, model, arg @ ..]) => {
            let kind: ComponentKind = kind.parse().map_err(|e: BridgeError| e.to_string())?;
            Action::call(CommandKind::Spawn(kind), model, &arg.join(" "))
        }
        ("/kill", [name]) => Action::call(CommandKind::KillRtc, name, ""),
        ("/killall", []) => Action::call(CommandKind::KillAllRtc, "", ""),
        ("/sync", [name]) => Action::call(CommandKind::SyncRtc, name, ""),
        ("/synced", []) => Action::call(CommandKind::GetSyncRtc, "", ""),
        ("/time", []) => Action::call(CommandKind::GetSimTime, "", ""),
        ("/step", []) => Action::call(CommandKind::GetSimStep, "", ""),
        ("/pose", [object]) => Action::call(CommandKind::GetObjPose, object, ""),
        ("/setpose", [object, pose @ ..]) if !pose.is_empty() => {
            let pose = pose.join("");
            pose.parse::<Pose>().map_err(|e| e.to_string())?;
            Action::call(CommandKind::SetObjPose, object, &pose)
        }
        ("/health", []) => Action::Health,
        ("/help", []) => Action::Help,
        ("/quit" | "/exit", []) => Action::Quit,
        (
            "/start" | "/stop" | "/pause" | "/load" | "/spawn" | "/kill" | "/killall" | "/sync"
            | "/synced" | "/time" | "/step" | "/pose" | "/setpose" | "/health" | "/help" | "/quit"
            | "/exit",
            _,
        ) => return Err(format!("wrong arguments for {head}; see /help")),
        (other, _) => return Err(format!("unknown command '{other}'")),
    };
    Ok(action)
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(client: ServiceClient, watchdog: Watchdog, shutdown: Arc<AtomicBool>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}: {}", "Terminal error".red(), e);
            return;
        }
    };

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let line = match editor.readline("simrtc> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        match parse(line) {
            Ok(Action::Call { kind, key, arg }) => {
                if watchdog.health() == ComponentHealth::TimedOut {
                    println!(
                        "{}",
                        "⚠  host has not ticked recently; the call may time out".yellow()
                    );
                }
                match client.call(kind, key, arg) {
                    Ok(result) => print_result(&result),
                    Err(BridgeError::Closed) => {
                        println!("{}", "Bridge is shut down.".red());
                        break;
                    }
                    Err(e) => println!("{}: {}", "Call failed".red(), e),
                }
            }
            Ok(Action::Health) => cmd_health(&watchdog),
            Ok(Action::Help) => cmd_help(),
            Ok(Action::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(msg) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                msg.yellow(),
                "/help".bold()
            ),
        }
    }
}

fn print_result(result: &CommandResult) {
    let status = match result.status {
        ReturnCode::Ok => result.status.to_string().green().bold(),
        ReturnCode::Failed => result.status.to_string().yellow().bold(),
        ReturnCode::Error => result.status.to_string().red().bold(),
    };
    print!("  {status}");
    match &result.payload {
        ResultPayload::None => {}
        ResultPayload::Float(v) => print!("  {v}"),
        ResultPayload::Names(names) if names.is_empty() => print!("  {}", "(none)".dimmed()),
        ResultPayload::Names(names) => print!("  {}", names.join(", ").bold()),
        ResultPayload::Pose(p) => print!(
            "  xyz=({:.3}, {:.3}, {:.3}) rpy=({:.3}, {:.3}, {:.3})",
            p.x, p.y, p.z, p.roll, p.pitch, p.yaw
        ),
    }
    if let Some(detail) = &result.detail {
        print!("  {}", detail.dimmed());
    }
    println!();
}

fn cmd_health(watchdog: &Watchdog) {
    let silence = watchdog.silence();
    match watchdog.health() {
        ComponentHealth::Healthy => println!(
            "  executor {} (last tick {:?} ago)",
            "healthy".green(),
            silence
        ),
        ComponentHealth::TimedOut => println!(
            "  executor {} (no tick for {:?}, limit {:?})",
            "stalled".red(),
            silence,
            watchdog.timeout()
        ),
    }
}

fn cmd_help() {
    println!();
    println!("{}", "simrtc Commands".bold().underline());
    println!("  {}            – start / stop / pause the simulation", "/start /stop /pause".bold().cyan());
    println!("  {}                     – load a scene", "/load <path>".bold().cyan());
    println!("  {}   – create a component", "/spawn <kind> <model> [arg]".bold().cyan());
    println!("  {}         – destroy components", "/kill <name>  /killall".bold().cyan());
    println!("  {}          – step a component with the simulation", "/sync <name>  /synced".bold().cyan());
    println!("  {}                     – simulation time / step", "/time /step".bold().cyan());
    println!("  {}    – read / write an object pose", "/pose <obj>  /setpose <obj> x,y,z,r,p,y".bold().cyan());
    println!("  {}                         – executor liveness", "/health".bold().cyan());
    println!("  {}                    – exit the shell", "/quit  /exit".bold().cyan());
    println!();
    println!(
        "  Component kinds: {}",
        ComponentKind::ALL.map(|k| k.as_str()).join(", ").dimmed()
    );
    println!();
}
