//! Main widget state management

use std::{sync::Mutex, time::Instant};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::decode::TemplateData;

use super::{ControlState, TimerState, UpdateOutcome};

/// Owns the widget's two state records and the channels their snapshots are
/// published on. ControlState is mutated only by the control reducer task;
/// TimerState only by the countdown task.
#[derive(Debug)]
pub struct AppState {
    control_state: Mutex<ControlState>,
    /// Channel for control state snapshots
    pub control_update_tx: watch::Sender<ControlState>,
    /// Channel for timer snapshots
    pub timer_update_tx: watch::Sender<TimerState>,
    /// Widget start time, for status reporting
    pub start_time: Instant,
    /// Last command tracking
    last_command: Mutex<Option<String>>,
    last_command_time: Mutex<Option<DateTime<Utc>>>,
    /// Keep the receivers alive to prevent channel closure
    _control_update_rx: watch::Receiver<ControlState>,
    _timer_update_rx: watch::Receiver<TimerState>,
}

impl AppState {
    pub fn new(initial: ControlState) -> Self {
        let (control_update_tx, control_update_rx) = watch::channel(initial.clone());
        let (timer_update_tx, timer_update_rx) = watch::channel(TimerState::new());

        Self {
            control_state: Mutex::new(initial),
            control_update_tx,
            timer_update_tx,
            start_time: Instant::now(),
            last_command: Mutex::new(None),
            last_command_time: Mutex::new(None),
            _control_update_rx: control_update_rx,
            _timer_update_rx: timer_update_rx,
        }
    }

    /// Apply a mutation to the control state and publish the new snapshot.
    pub fn update_control<F>(&self, command: &str, updater: F) -> Result<ControlState, String>
    where
        F: FnOnce(&mut ControlState),
    {
        let mut state = self
            .control_state
            .lock()
            .map_err(|e| format!("Failed to lock control state: {}", e))?;

        updater(&mut state);
        let new_state = state.clone();
        drop(state);

        self.record_command(command);
        self.control_update_tx.send_replace(new_state.clone());
        Ok(new_state)
    }

    /// Set the visibility flag (play/stop commands).
    pub fn set_visible(&self, command: &str, visible: bool) -> Result<ControlState, String> {
        debug!("Setting visible to {} for command {}", visible, command);
        self.update_control(command, |state| state.visible = visible)
    }

    /// Reduce a decoded template-data update into the control state.
    ///
    /// A payload that sets nothing emits no snapshot at all, so downstream
    /// consumers never see a spurious transition.
    pub fn apply_update(&self, data: &TemplateData) -> Result<(ControlState, UpdateOutcome), String> {
        let mut state = self
            .control_state
            .lock()
            .map_err(|e| format!("Failed to lock control state: {}", e))?;

        let outcome = state.apply_update(data);
        let new_state = state.clone();
        drop(state);

        if outcome.changed {
            self.record_command("update");
            self.control_update_tx.send_replace(new_state.clone());
        } else {
            debug!("Update carried no recognized keys, skipping state transition");
        }
        Ok((new_state, outcome))
    }

    /// Get the current control state
    pub fn get_control_state(&self) -> Result<ControlState, String> {
        self.control_state
            .lock()
            .map(|state| state.clone())
            .map_err(|e| format!("Failed to lock control state: {}", e))
    }

    /// Publish a timer snapshot (countdown task only).
    pub fn publish_timer_state(&self, snapshot: TimerState) {
        self.timer_update_tx.send_replace(snapshot);
    }

    /// Get the latest published timer snapshot
    pub fn get_timer_state(&self) -> TimerState {
        self.timer_update_tx.borrow().clone()
    }

    pub fn subscribe_control(&self) -> watch::Receiver<ControlState> {
        self.control_update_tx.subscribe()
    }

    pub fn subscribe_timer(&self) -> watch::Receiver<TimerState> {
        self.timer_update_tx.subscribe()
    }

    fn record_command(&self, command: &str) {
        match self.last_command.lock() {
            Ok(mut last) => *last = Some(command.to_string()),
            Err(e) => warn!("Failed to lock last command: {}", e),
        }
        match self.last_command_time.lock() {
            Ok(mut last) => *last = Some(Utc::now()),
            Err(e) => warn!("Failed to lock last command time: {}", e),
        }
    }

    /// Get last command information
    pub fn get_last_command(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_command = self.last_command.lock().ok().and_then(|c| c.clone());
        let last_command_time = self.last_command_time.lock().ok().and_then(|t| *t);
        (last_command, last_command_time)
    }

    /// Calculate widget uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
