//! Control state structure and reduction rules

use serde::{Deserialize, Serialize};

use crate::decode::{FieldValue, TemplateData};

/// Display-relevant state reduced from the host's command stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    /// Countdown duration spec, seconds or `[hh:][mm:]ss`.
    pub duration_spec: String,
    /// Whether the timer is shown (and therefore running).
    pub visible: bool,
    /// Whether the timer hides itself when the countdown completes.
    pub hide_on_complete: bool,
}

/// What an update actually touched, so callers can skip no-op transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// At least one recognized key was adopted.
    pub changed: bool,
    /// The duration spec was replaced with a different value.
    pub duration_changed: bool,
}

impl ControlState {
    pub fn new() -> Self {
        Self {
            duration_spec: "3:00".to_string(),
            visible: false,
            hide_on_complete: true,
        }
    }

    /// Apply a decoded template-data update.
    ///
    /// Duration comes from `f0` with `time` as fallback, taking whichever is
    /// truthy first. The hide-on-complete flag comes from `f1` with
    /// `hideOnEnd` as fallback and is adopted whenever the key is present,
    /// falsy values included. String flags coerce to true only for a
    /// case-insensitive "true"; non-string flags keep their plain truth
    /// value. That table reproduces the host's historical behavior exactly,
    /// quirks included.
    pub fn apply_update(&mut self, data: &TemplateData) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();

        let duration = data
            .get("f0")
            .filter(|value| value.is_truthy())
            .or_else(|| data.get("time").filter(|value| value.is_truthy()));
        if let Some(value) = duration {
            let spec = value.as_text();
            outcome.duration_changed = spec != self.duration_spec;
            outcome.changed = true;
            self.duration_spec = spec;
        }

        let hide = data.get("f1").or_else(|| data.get("hideOnEnd"));
        if let Some(value) = hide {
            self.hide_on_complete = match value {
                FieldValue::Text(s) => s.to_lowercase() == "true",
                FieldValue::Flag(b) => *b,
            };
            outcome.changed = true;
        }

        outcome
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}
