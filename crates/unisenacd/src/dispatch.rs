//! Command dispatcher.
//!
//! Maps a parsed [`Command`] to its reply text. Every non-quit command is
//! counted in the registry before its reply is rendered, so `whoami` and
//! `status` already include the command that asked for them. Quit is not
//! counted; it only renders the goodbye.
//!
//! The dispatcher never appends the prompt. The connection handler does.

use std::ops::RangeInclusive;

use chrono::Local;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use unisenac_core::SessionId;
use unisenac_protocol::{reply, Command};

use crate::registry::{RegistryError, RegistryHandle};

/// Range of the simulated `ping` latency in milliseconds.
///
/// No packet is sent; the value is drawn uniformly from this range.
pub const PING_LATENCY_MS: RangeInclusive<u32> = 10..=100;

/// Errors raised while producing a reply.
///
/// These are reported to the client as an error line; they never close
/// the connection on their own.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("registry unavailable: {0}")]
    Registry(#[from] RegistryError),
}

/// Turns commands into reply text using the shared registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: RegistryHandle,
}

impl Dispatcher {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// Produces the reply for `command` issued by `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Registry` if the session is unknown or the
    /// registry has shut down.
    pub async fn dispatch(
        &self,
        command: &Command,
        session_id: SessionId,
    ) -> Result<String, DispatchError> {
        let session = if command.is_quit() {
            self.registry
                .get_session(session_id)
                .await
                .ok_or(RegistryError::SessionNotFound(session_id))?
        } else {
            self.registry.record_command(session_id).await?
        };
        debug!(
            session_id = %session_id,
            user = %session.username,
            command = %command,
            count = session.commands_count,
            "Dispatching command"
        );

        let now = Local::now();
        let text = match command {
            Command::Help => reply::help(),
            Command::Status => reply::status(&self.registry.stats().await?, now),
            Command::Users => reply::users(&self.registry.list_sessions().await, now),
            Command::Ping { host } => reply::ping(host.as_deref(), simulated_latency()),
            Command::Time => reply::time(now),
            Command::Whoami => reply::whoami(&session, now),
            Command::Uptime => reply::uptime(&self.registry.stats().await?, now),
            Command::Unrecognized(keyword) => reply::unrecognized(keyword),
            Command::Quit => reply::goodbye(&session, now),
        };

        Ok(text)
    }

    /// Parses and dispatches one line.
    ///
    /// Returns `Ok(None)` for a blank line, which is skipped without
    /// counting.
    pub async fn dispatch_line(
        &self,
        line: &str,
        session_id: SessionId,
    ) -> Result<Option<String>, DispatchError> {
        match Command::parse(line) {
            Some(command) => self.dispatch(&command, session_id).await.map(Some),
            None => Ok(None),
        }
    }
}

fn simulated_latency() -> u32 {
    rand::rng().random_range(PING_LATENCY_MS)
}
