//! Caspar Countdown - countdown overlay widget
//!
//! This binary is a line-oriented harness standing in for the playout host:
//! it reads `play` / `update <payload>` / `stop` / `next` commands from
//! stdin and writes the rendered countdown to stdout whenever the timer is
//! visible.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use caspar_countdown::{
    config::Config,
    decode::Payload,
    state::{AppState, ControlState, TimerState},
    tasks::spawn_widget,
    utils::shutdown_signal,
    CommandBridge,
};

/// Host-side status report, printed to stderr on request.
#[derive(Debug, Serialize)]
struct StatusReport {
    control: ControlState,
    timer: TimerState,
    uptime: String,
    last_command: Option<String>,
    last_command_time: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!("caspar_countdown={}", config.log_level()))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting caspar-countdown v1.0.0");
    info!(
        "Configuration: time={}, interval={}ms, show_minutes={}, show_hours={}",
        config.time, config.interval, config.show_minutes, config.show_hours
    );

    let initial = ControlState {
        duration_spec: config.time.clone(),
        ..ControlState::new()
    };
    let state = Arc::new(AppState::new(initial));
    let bridge = Arc::new(CommandBridge::new());

    let tasks = spawn_widget(&state, &bridge, config.scheduler_options());

    // Overlay output: print the display value whenever it changes while the
    // timer is visible. Nothing else ever reaches stdout.
    let render_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut control_rx = render_state.subscribe_control();
        let mut timer_rx = render_state.subscribe_timer();
        loop {
            tokio::select! {
                changed = timer_rx.changed() => if changed.is_err() { break; },
                changed = control_rx.changed() => if changed.is_err() { break; },
            }
            let visible = control_rx.borrow_and_update().visible;
            let display = timer_rx.borrow_and_update().display.clone();
            if visible {
                println!("{}", display);
            }
        }
    });

    if config.demo {
        // Browser-mode default: push an update and a play shortly after
        // startup, the way the original template behaves outside the host.
        let demo_bridge = Arc::clone(&bridge);
        let demo_time = config.time.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            info!("Demo mode: injecting default update and play");
            demo_bridge.update(demo_payload(&demo_time));
            demo_bridge.play();
        });
    }

    info!("Reading host commands from stdin: play | update <payload> | stop | next | status");

    let command_state = Arc::clone(&state);
    let command_bridge = Arc::clone(&bridge);
    let stdin_loop = async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            match line {
                "" => {}
                "play" => command_bridge.play(),
                "stop" => command_bridge.stop(),
                "next" => command_bridge.next(),
                "status" => print_status(&command_state),
                other => {
                    if let Some(payload) = other.strip_prefix("update") {
                        command_bridge.update(Payload::from(payload.trim_start()));
                    } else {
                        warn!("Unrecognized input line: {}", other);
                    }
                }
            }
        }
        info!("Stdin closed");
    };

    tokio::select! {
        _ = stdin_loop => {}
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    for task in tasks {
        task.abort();
    }
    info!("Widget shutdown complete");
    Ok(())
}

/// Build the browser-mode default payload. Goes through serde so a time
/// spec containing quotes or backslashes still yields valid JSON.
fn demo_payload(time: &str) -> Payload {
    Payload::Text(serde_json::json!({ "time": time }).to_string())
}

fn print_status(state: &Arc<AppState>) {
    let control = match state.get_control_state() {
        Ok(control) => control,
        Err(e) => {
            warn!("Failed to read control state: {}", e);
            return;
        }
    };
    let (last_command, last_command_time) = state.get_last_command();
    let report = StatusReport {
        control,
        timer: state.get_timer_state(),
        uptime: state.get_uptime(),
        last_command,
        last_command_time,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => eprintln!("{}", json),
        Err(e) => warn!("Failed to serialize status report: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caspar_countdown::decode::{decode, FieldValue};

    #[test]
    fn demo_payload_survives_awkward_time_specs() {
        for time in ["3:00", "a\"b", "back\\slash"] {
            let decoded = decode(&demo_payload(time));
            assert_eq!(decoded.get("time"), Some(&FieldValue::Text(time.to_string())));
        }
    }
}
