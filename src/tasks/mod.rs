//! Background tasks module
//!
//! This module contains the two background tasks that drive the widget: the
//! control reducer and the countdown scheduler.

pub mod control_reducer;
pub mod countdown;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{bridge::CommandBridge, state::AppState};

// Re-export main types
pub use control_reducer::control_reducer_task;
pub use countdown::{countdown_task, ArmRequest, SchedulerOptions};

/// Wire up and spawn the widget's background tasks.
///
/// Connects the bridge's command stream to the reducer and the reducer to
/// the scheduler, then arms the scheduler with the initial control state so
/// the display value is valid before the first host command arrives.
pub fn spawn_widget(
    state: &Arc<AppState>,
    bridge: &CommandBridge,
    options: SchedulerOptions,
) -> Vec<JoinHandle<()>> {
    let (arm_tx, arm_rx) = mpsc::channel(16);
    let (complete_tx, complete_rx) = mpsc::channel(16);

    let initial = state.control_update_tx.borrow().clone();
    let initial_arm = ArmRequest {
        spec: initial.duration_spec,
        running: initial.visible,
    };
    // Capacity 16 on a fresh channel; this cannot fail.
    let _ = arm_tx.try_send(initial_arm);

    let reducer = tokio::spawn(control_reducer_task(
        Arc::clone(state),
        bridge.subscribe(),
        arm_tx,
        complete_rx,
    ));
    let scheduler = tokio::spawn(countdown_task(
        Arc::clone(state),
        arm_rx,
        complete_tx,
        options,
    ));
    vec![reducer, scheduler]
}
