//! Error types for the UniSenac client.
//!
//! All error types use `thiserror` and carry enough context to be shown to
//! the user as-is.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()`.

use thiserror::Error;

use unisenac_core::ConfigError;

// ============================================================================
// Client Error Type
// ============================================================================

/// Client session errors.
///
/// None of these are fatal to the client process. After `ConnectionLost`
/// the session stays disconnected until `connect` or `reconnect` is called.
#[derive(Error, Debug)]
pub enum ClientError {
    /// `connect` was called on a live session.
    #[error("Already connected")]
    AlreadyConnected,

    /// The operation needs a live connection.
    #[error("Not connected")]
    NotConnected,

    /// Dialing the server failed or timed out.
    #[error("Failed to connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// The server closed the connection or a write failed.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Other socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A note was empty or all whitespace.
    #[error("Empty note ignored")]
    EmptyNote,

    /// Invalid host or port.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Creates a connect error.
    pub fn connect(addr: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Connect {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    /// True if the session ended up disconnected because of this error.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::NotConnected | Self::ConnectionLost(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        assert_eq!(ClientError::AlreadyConnected.to_string(), "Already connected");
        assert_eq!(ClientError::NotConnected.to_string(), "Not connected");
        assert_eq!(ClientError::EmptyNote.to_string(), "Empty note ignored");
        assert_eq!(
            ClientError::connect("127.0.0.1:2323", "connection refused").to_string(),
            "Failed to connect to 127.0.0.1:2323: connection refused"
        );
        assert_eq!(
            ClientError::ConnectionLost("broken pipe".to_string()).to_string(),
            "Connection lost: broken pipe"
        );
    }

    #[test]
    fn test_from_io_error() {
        let err: ClientError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, ClientError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: boom");
    }

    #[test]
    fn test_from_config_error() {
        let err: ClientError = ConfigError::InvalidPort {
            value: "0".to_string(),
        }
        .into();
        assert!(err.to_string().contains("Invalid port"));
    }

    #[test]
    fn test_is_disconnect() {
        assert!(ClientError::NotConnected.is_disconnect());
        assert!(ClientError::ConnectionLost(String::new()).is_disconnect());
        assert!(!ClientError::EmptyNote.is_disconnect());
    }
}
