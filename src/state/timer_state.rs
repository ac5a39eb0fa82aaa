//! Timer state snapshots published by the countdown scheduler

use serde::{Deserialize, Serialize};

/// A point-in-time view of the countdown, published over a watch channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_ms: u64,
    pub running: bool,
    /// The formatted `[hh:][mm:]ss` display value for this snapshot.
    pub display: String,
}

impl TimerState {
    /// The idle state a widget starts in before anything is armed.
    pub fn new() -> Self {
        Self {
            remaining_ms: 0,
            running: false,
            display: "00:00".to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}
