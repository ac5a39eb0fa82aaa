//! Caspar Countdown - a countdown overlay widget for video playout hosts
//!
//! This library implements the widget core: decoding of host template data
//! (JSON or XML), the play/update/stop/next command bridge, the control
//! state reducer, and the drift-corrected countdown scheduler.

pub mod bridge;
pub mod config;
pub mod decode;
pub mod state;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use bridge::{Command, CommandBridge};
pub use config::Config;
pub use decode::{decode, FieldValue, Payload, TemplateData};
pub use state::{AppState, ControlState, TimerState};
pub use tasks::{spawn_widget, SchedulerOptions};
pub use utils::shutdown_signal;
