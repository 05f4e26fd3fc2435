//! Domain-specific error types following panic-free policy.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving configuration.
///
/// These are reported before any socket is opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Port was not a number in `1..=65535`
    #[error("Invalid port: {value} (expected a number between 1 and 65535)")]
    InvalidPort { value: String },

    /// Host was empty or contained whitespace
    #[error("Invalid host: '{value}'")]
    InvalidHost { value: String },

    /// A numeric setting was out of range
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    /// Configuration file could not be read or parsed
    #[error("Failed to load config file {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },
}

/// Errors raised by the line reassembler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyError {
    /// Pending bytes without a delimiter exceeded the configured cap
    #[error("Line too long: {len} bytes without a line terminator (max: {max})")]
    LineTooLong { len: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidPort {
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("65535"));

        let err = ConfigError::InvalidHost {
            value: String::new(),
        };
        assert_eq!(err.to_string(), "Invalid host: ''");
    }

    #[test]
    fn test_line_too_long_display() {
        let err = ReassemblyError::LineTooLong { len: 70, max: 64 };
        assert!(err.to_string().contains("70 bytes"));
        assert!(err.to_string().contains("max: 64"));
    }
}
