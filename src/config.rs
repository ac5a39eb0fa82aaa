//! Configuration and CLI argument handling

use clap::{ArgAction, Parser};

use crate::tasks::SchedulerOptions;
use crate::timer::DEFAULT_INTERVAL_MS;

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "caspar-countdown")]
#[command(about = "A drift-corrected countdown overlay driven by CasparCG-style template data")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Initial countdown duration, in seconds or [hh:][mm:]ss
    #[arg(short, long, default_value = "3:00")]
    pub time: String,

    /// Tick interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval: u64,

    /// Show the minutes segment of the display
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub show_minutes: bool,

    /// Show the hours segment of the display
    #[arg(long)]
    pub show_hours: bool,

    /// Emulate a browser host: inject a default update and play after 500ms
    #[arg(long)]
    pub demo: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Scheduler tuning derived from the CLI flags
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            interval_ms: self.interval,
            show_minutes: self.show_minutes,
            show_hours: self.show_hours,
        }
    }
}
