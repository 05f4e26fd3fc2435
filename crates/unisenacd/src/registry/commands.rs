//! Registry actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `SessionEvent`: Events published by the registry for subscribers

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::oneshot;

use unisenac_core::{ServerStats, SessionId, SessionView};

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command carries a oneshot channel for the reply. The actor handles
/// commands one at a time, so every read-modify-write is atomic with
/// respect to every other handler.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Register a freshly accepted connection.
    ///
    /// Bumps the total-connections counter and derives the display name
    /// from its new value.
    ///
    /// # Errors
    /// - `RegistryError::SessionAlreadyExists` if the identity is registered
    Register {
        session_id: SessionId,
        connected_at: DateTime<Local>,
        respond_to: oneshot::Sender<Result<SessionView, RegistryError>>,
    },

    /// Count one dispatched command against a session and the server.
    ///
    /// # Errors
    /// - `RegistryError::SessionNotFound` if the session doesn't exist
    RecordCommand {
        session_id: SessionId,
        respond_to: oneshot::Sender<Result<SessionView, RegistryError>>,
    },

    /// Get a single session.
    ///
    /// Returns `None` if the session doesn't exist.
    GetSession {
        session_id: SessionId,
        respond_to: oneshot::Sender<Option<SessionView>>,
    },

    /// Snapshot all sessions in accept order.
    ListSessions {
        respond_to: oneshot::Sender<Vec<SessionView>>,
    },

    /// Remove a session when its connection closes.
    ///
    /// # Errors
    /// - `RegistryError::SessionNotFound` if the session doesn't exist
    Remove {
        session_id: SessionId,
        reason: RemovalReason,
        respond_to: oneshot::Sender<Result<SessionView, RegistryError>>,
    },

    /// Snapshot the server counters.
    GetStats {
        respond_to: oneshot::Sender<ServerStats>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested session was not found.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// A session with this identity already exists.
    #[error("session already exists: {0}")]
    SessionAlreadyExists(SessionId),

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events published by the registry to subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A connection was accepted and registered.
    Registered { session: SessionView },

    /// A connection closed and its session was removed.
    Removed {
        session: SessionView,
        reason: RemovalReason,
    },
}

/// Why a session was removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Client sent a quit synonym.
    Quit,

    /// Peer closed the connection (read returned end-of-stream).
    PeerClosed,

    /// Read or write failed, or the client overflowed the line buffer.
    ConnectionError,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quit => write!(f, "client quit"),
            Self::PeerClosed => write!(f, "peer closed connection"),
            Self::ConnectionError => write!(f, "connection error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(port: u16) -> SessionId {
        SessionId::new(format!("127.0.0.1:{port}").parse().unwrap())
    }

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::SessionNotFound(id(4000));
        assert_eq!(err.to_string(), "session not found: 127.0.0.1:4000");

        let err = RegistryError::SessionAlreadyExists(id(4001));
        assert_eq!(err.to_string(), "session already exists: 127.0.0.1:4001");

        let err = RegistryError::ChannelClosed;
        assert_eq!(err.to_string(), "response channel closed");
    }

    #[test]
    fn test_removal_reason_display() {
        assert_eq!(RemovalReason::Quit.to_string(), "client quit");
        assert_eq!(
            RemovalReason::PeerClosed.to_string(),
            "peer closed connection"
        );
        assert_eq!(
            RemovalReason::ConnectionError.to_string(),
            "connection error"
        );
    }

    #[tokio::test]
    async fn test_command_channel_closed_error() {
        let (tx, rx) = oneshot::channel::<Result<SessionView, RegistryError>>();

        // Drop sender without sending
        drop(tx);

        assert!(rx.await.is_err());
    }
}
