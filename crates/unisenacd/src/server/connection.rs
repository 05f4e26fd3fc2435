//! Connection handler for individual client connections.
//!
//! Each accepted TCP connection gets its own `ConnectionHandler` that:
//! - Registers the session and sends the welcome banner
//! - Reassembles incoming bytes into command lines
//! - Routes each command through the dispatcher
//! - Writes replies followed by the prompt
//! - Removes the session on every exit path
//!
//! # State machine
//!
//! ```text
//! AwaitingCommand ──welcome──▶ Welcomed ──▶ AwaitingCommand ⇄ Dispatching
//!                                                  │              │
//!                                           EOF / I/O error      quit
//!                                                  ▼              ▼
//!                                                Closed ◀─────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Connection errors are logged and result in graceful disconnect

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use unisenac_core::{LineReassembler, ReassemblyError, SessionId};
use unisenac_protocol::{reply, Command, PROMPT};

use crate::dispatch::Dispatcher;
use crate::registry::{RegistryError, RegistryHandle, RemovalReason};

/// Size of a single socket read
const READ_BUFFER_SIZE: usize = 1024;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the next complete line
    AwaitingCommand,

    /// Session registered, banner and first prompt sent
    Welcomed,

    /// A command is being answered
    Dispatching,

    /// Terminal; no further I/O
    Closed,
}

/// Whether the read loop keeps going after a line.
enum Flow {
    Continue,
    Quit,
}

/// Connection handler for a single client.
pub struct ConnectionHandler {
    /// Read half of the TCP stream
    reader: OwnedReadHalf,

    /// Buffered write half; flushed after every reply
    writer: BufWriter<OwnedWriteHalf>,

    /// Remote endpoint, also the registry key
    session_id: SessionId,

    registry: RegistryHandle,
    dispatcher: Dispatcher,

    /// Per-connection line buffer
    reassembler: LineReassembler,

    /// Elapsed reads are retried
    read_timeout: Duration,

    state: ConnectionState,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `reader` - Read half of the TCP stream
    /// * `writer` - Write half of the TCP stream
    /// * `session_id` - Remote endpoint of the connection
    /// * `registry` - Handle to the session registry
    /// * `read_timeout` - Per-read timeout
    /// * `max_line_bytes` - Optional cap on an unterminated line
    pub fn new(
        reader: OwnedReadHalf,
        writer: OwnedWriteHalf,
        session_id: SessionId,
        registry: RegistryHandle,
        read_timeout: Duration,
        max_line_bytes: Option<usize>,
    ) -> Self {
        Self {
            reader,
            writer: BufWriter::new(writer),
            session_id,
            dispatcher: Dispatcher::new(registry.clone()),
            registry,
            reassembler: LineReassembler::with_optional_limit(max_line_bytes),
            read_timeout,
            state: ConnectionState::AwaitingCommand,
        }
    }

    /// Runs the connection until quit, end-of-stream or an I/O failure.
    ///
    /// The session is always removed from the registry before this
    /// returns. The returned reason is the one recorded on removal.
    pub async fn run(mut self) -> RemovalReason {
        debug!(peer = %self.session_id, "New client connected");

        let result = match self.welcome().await {
            Ok(()) => self.process_lines().await,
            Err(e) => Err(e),
        };

        let reason = match &result {
            Ok(()) => RemovalReason::Quit,
            Err(ConnectionError::Eof) => RemovalReason::PeerClosed,
            Err(e) => {
                warn!(peer = %self.session_id, error = %e, "Connection failed");
                RemovalReason::ConnectionError
            }
        };

        self.close(reason).await;
        reason
    }

    /// Registers the session and sends the banner plus the first prompt.
    async fn welcome(&mut self) -> Result<(), ConnectionError> {
        let session = self.registry.register(self.session_id).await?;

        info!(
            peer = %self.session_id,
            user = %session.username,
            "Client connected"
        );

        self.send(&reply::welcome(&session)).await?;
        self.send(PROMPT).await?;
        self.transition(ConnectionState::Welcomed);
        Ok(())
    }

    /// Main read loop.
    ///
    /// Returns `Ok(())` after a quit and an error for every other way the
    /// connection can end.
    async fn process_lines(&mut self) -> Result<(), ConnectionError> {
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            self.transition(ConnectionState::AwaitingCommand);

            let n = match timeout(self.read_timeout, self.reader.read(&mut buf)).await {
                Err(_) => continue,
                Ok(Ok(0)) => return Err(ConnectionError::Eof),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(ConnectionError::Io(e.to_string())),
            };

            let chunk = buf.get(..n).unwrap_or_default();
            let lines = match self.reassembler.feed(chunk) {
                Ok(lines) => lines,
                Err(e) => {
                    // Best effort; the connection is closing either way
                    let _ = self.send(&reply::error(&e.to_string())).await;
                    return Err(e.into());
                }
            };

            for line in lines {
                if let Flow::Quit = self.handle_line(&line).await? {
                    return Ok(());
                }
            }
        }
    }

    /// Answers one complete line.
    async fn handle_line(&mut self, line: &str) -> Result<Flow, ConnectionError> {
        let Some(command) = Command::parse(line) else {
            return Ok(Flow::Continue);
        };

        self.transition(ConnectionState::Dispatching);
        let result = self.dispatcher.dispatch(&command, self.session_id).await;

        if command.is_quit() {
            match result {
                Ok(goodbye) => self.send(&goodbye).await?,
                Err(e) => warn!(peer = %self.session_id, error = %e, "Goodbye failed"),
            }
            return Ok(Flow::Quit);
        }

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    peer = %self.session_id,
                    command = %command,
                    error = %e,
                    "Command failed"
                );
                reply::error(&e.to_string())
            }
        };

        self.send(&text).await?;
        self.send(PROMPT).await?;
        Ok(Flow::Continue)
    }

    /// Writes and flushes text.
    async fn send(&mut self, text: &str) -> Result<(), ConnectionError> {
        self.writer
            .write_all(text.as_bytes())
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;
        Ok(())
    }

    /// Removes the session and shuts the socket down.
    ///
    /// Secondary failures are logged and swallowed.
    async fn close(&mut self, reason: RemovalReason) {
        self.transition(ConnectionState::Closed);

        match self.registry.remove(self.session_id, reason).await {
            Ok(session) => info!(
                peer = %self.session_id,
                user = %session.username,
                commands = session.commands_count,
                reason = %reason,
                "Client disconnected"
            ),
            Err(RegistryError::SessionNotFound(_)) => {
                debug!(peer = %self.session_id, "Session was never registered")
            }
            Err(e) => warn!(peer = %self.session_id, error = %e, "Failed to remove session"),
        }

        if let Err(e) = self.writer.shutdown().await {
            debug!(peer = %self.session_id, error = %e, "Socket shutdown failed");
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(peer = %self.session_id, from = ?self.state, to = ?next, "State transition");
            self.state = next;
        }
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Eof,

    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    LineTooLong(#[from] ReassemblyError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        assert_eq!(ConnectionError::Eof.to_string(), "Connection closed");
        assert_eq!(
            ConnectionError::Io("broken pipe".to_string()).to_string(),
            "I/O error: broken pipe"
        );

        let err: ConnectionError = ReassemblyError::LineTooLong { len: 9, max: 8 }.into();
        assert!(err.to_string().contains("max: 8"));

        let err: ConnectionError = RegistryError::ChannelClosed.into();
        assert_eq!(err.to_string(), "Registry error: response channel closed");
    }
}
