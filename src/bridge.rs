//! Command bridge between the host's command surface and the widget
//!
//! The host knows exactly four entry points: play, update, stop, next. The
//! bridge owns those names and fans each invocation out to any number of
//! subscribers over a broadcast channel, so several consumers can observe
//! the same command stream without clobbering each other.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::decode::{decode, Payload, TemplateData};

/// A host command, with update payloads already decoded to canonical form.
#[derive(Debug, Clone)]
pub enum Command {
    Play,
    Update(TemplateData),
    Stop,
    Next,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Play => "play",
            Command::Update(_) => "update",
            Command::Stop => "stop",
            Command::Next => "next",
        }
    }
}

/// A handler that occupied one of the command slots before the bridge took
/// them over. Chained as the first observer of every command.
pub type PriorHandler = Box<dyn Fn(&Command) + Send + Sync>;

/// The sole occupant of the play/update/stop/next command names.
pub struct CommandBridge {
    command_tx: broadcast::Sender<Command>,
    prior: Option<PriorHandler>,
}

impl CommandBridge {
    pub fn new() -> Self {
        let (command_tx, _) = broadcast::channel(100);
        Self {
            command_tx,
            prior: None,
        }
    }

    /// Build a bridge that chains a pre-existing command handler.
    ///
    /// `already_bridged` is the capability flag the host passes when the
    /// handler in that slot is its own placeholder rather than a real
    /// consumer; in that case nothing is chained.
    pub fn with_prior_handler(handler: PriorHandler, already_bridged: bool) -> Self {
        let mut bridge = Self::new();
        if already_bridged {
            debug!("Command slots already bridged, not chaining prior handler");
        } else {
            bridge.prior = Some(handler);
        }
        bridge
    }

    /// Subscribe to the command stream. Delivery is in dispatch order; a
    /// dropped or lagging receiver never affects the others.
    pub fn subscribe(&self) -> broadcast::Receiver<Command> {
        self.command_tx.subscribe()
    }

    /// Called by the host.
    pub fn play(&self) {
        self.dispatch(Command::Play);
    }

    /// Called by the host.
    pub fn stop(&self) {
        self.dispatch(Command::Stop);
    }

    /// Called by the host.
    pub fn next(&self) {
        self.dispatch(Command::Next);
    }

    /// Called by the host with template data in any supported encoding.
    pub fn update(&self, payload: Payload) {
        self.dispatch(Command::Update(decode(&payload)));
    }

    fn dispatch(&self, command: Command) {
        debug!("Dispatching host command: {}", command.name());
        if let Some(prior) = &self.prior {
            // A panicking prior handler must not reach the host or block
            // delivery to the channel subscribers.
            if catch_unwind(AssertUnwindSafe(|| prior(&command))).is_err() {
                warn!("Prior {} handler panicked, continuing dispatch", command.name());
            }
        }
        if let Err(e) = self.command_tx.send(command) {
            debug!("No command subscribers: {}", e);
        }
    }
}

impl Default for CommandBridge {
    fn default() -> Self {
        Self::new()
    }
}
