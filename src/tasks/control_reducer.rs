//! Control state reducer background task

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::{
    bridge::Command,
    state::{AppState, ControlState},
    tasks::countdown::ArmRequest,
};

/// Background task that reduces bridged host commands into control state and
/// keeps the countdown scheduler armed to match.
///
/// play/stop always re-arm (the running flag is derived from visibility);
/// an update re-arms only when it actually replaced the duration spec. On a
/// completion signal the timer is hidden if the hide-on-complete policy says
/// so.
pub async fn control_reducer_task(
    state: Arc<AppState>,
    mut commands: broadcast::Receiver<Command>,
    arm_tx: mpsc::Sender<ArmRequest>,
    mut complete_rx: mpsc::Receiver<()>,
) {
    info!("Starting control reducer task");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Ok(Command::Play) => {
                    match state.set_visible("play", true) {
                        Ok(new_state) => rearm(&arm_tx, &new_state).await,
                        Err(e) => error!("Failed to apply play: {}", e),
                    }
                }
                Ok(Command::Stop) => {
                    match state.set_visible("stop", false) {
                        Ok(new_state) => rearm(&arm_tx, &new_state).await,
                        Err(e) => error!("Failed to apply stop: {}", e),
                    }
                }
                Ok(Command::Update(data)) => {
                    match state.apply_update(&data) {
                        Ok((new_state, outcome)) => {
                            if outcome.duration_changed {
                                rearm(&arm_tx, &new_state).await;
                            }
                        }
                        Err(e) => error!("Failed to apply update: {}", e),
                    }
                }
                Ok(Command::Next) => {
                    // next carries no control semantics for the countdown.
                    debug!("Ignoring next command");
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Control reducer lagged, missed {} commands", missed);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Command bridge closed, stopping control reducer task");
                    break;
                }
            },
            completion = complete_rx.recv() => match completion {
                Some(()) => {
                    let hide = state
                        .get_control_state()
                        .map(|control| control.hide_on_complete)
                        .unwrap_or_else(|e| {
                            error!("Failed to read control state: {}", e);
                            false
                        });
                    if hide {
                        debug!("Countdown complete, hiding timer");
                        match state.set_visible("complete", false) {
                            Ok(new_state) => rearm(&arm_tx, &new_state).await,
                            Err(e) => error!("Failed to hide on completion: {}", e),
                        }
                    }
                }
                None => {
                    info!("Completion channel closed, stopping control reducer task");
                    break;
                }
            }
        }
    }
}

async fn rearm(arm_tx: &mpsc::Sender<ArmRequest>, control: &ControlState) {
    let request = ArmRequest {
        spec: control.duration_spec.clone(),
        running: control.visible,
    };
    if arm_tx.send(request).await.is_err() {
        error!("Countdown scheduler is gone, cannot re-arm");
    }
}
