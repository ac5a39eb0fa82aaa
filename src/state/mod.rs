//! State management module
//!
//! This module contains the widget's two owned state records and their
//! management logic.

pub mod app_state;
pub mod control_state;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use control_state::{ControlState, UpdateOutcome};
pub use timer_state::TimerState;
