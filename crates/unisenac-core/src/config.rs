//! Endpoints and layered configuration.
//!
//! Settings resolve in three layers, later layers winning:
//! 1. Built-in defaults (`127.0.0.1:2323`, 10s read timeout, 50 messages)
//! 2. Optional TOML file with `[server]` and `[client]` tables
//! 3. Host and port given on the command line
//!
//! Every value is validated here so that a bad port or host fails before
//! any socket is opened.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Default bind/connect host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port
pub const DEFAULT_PORT: u16 = 2323;

/// Socket read timeout; a timeout is retried, never surfaced
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Client connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client message log capacity
pub const DEFAULT_MAX_MESSAGES: usize = 50;

/// How long a quitting client waits for the server's goodbye
const DEFAULT_QUIT_GRACE: Duration = Duration::from_millis(500);

/// Config directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "unisenac";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.toml";

// ============================================================================
// Endpoint
// ============================================================================

/// A validated host and port pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint, validating both parts.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidHost` if `host` is empty or contains whitespace
    /// - `ConfigError::InvalidPort` if `port` is 0
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConfigError> {
        let host = host.into();
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidHost { value: host });
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort {
                value: port.to_string(),
            });
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form accepted by `TcpListener::bind` and `TcpStream::connect`.
    pub fn address(&self) -> String {
        self.to_string()
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parses a port argument.
///
/// # Errors
///
/// Returns `ConfigError::InvalidPort` unless `value` is a number in `1..=65535`.
pub fn parse_port(value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort {
            value: value.to_string(),
        }),
    }
}

/// Applies file and CLI overrides on top of `base`.
fn resolve_endpoint(
    base: &Endpoint,
    file_host: Option<&str>,
    file_port: Option<u16>,
    cli_host: Option<&str>,
    cli_port: Option<&str>,
) -> Result<Endpoint, ConfigError> {
    let host = cli_host.or(file_host).unwrap_or(base.host());
    let port = match cli_port {
        Some(p) => parse_port(p)?,
        None => file_port.unwrap_or(base.port()),
    };
    Endpoint::new(host, port)
}

// ============================================================================
// Config File
// ============================================================================

/// `[server]` table of the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub read_timeout_secs: Option<u64>,
    pub max_line_bytes: Option<usize>,
}

/// `[client]` table of the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub read_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_messages: Option<usize>,
    pub quit_grace_ms: Option<u64>,
}

/// Parsed contents of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub client: ClientSection,
}

impl ConfigFile {
    /// Returns `$XDG_CONFIG_HOME/unisenac/config.toml` (or the platform
    /// equivalent), if a config directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigFile` if the file cannot be read or is not
    /// valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&contents, path)
    }

    /// Loads the file at `path`, or the default path if `None`.
    ///
    /// A missing default file yields the empty config. An explicitly given
    /// path must exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigFile` on read or parse failure.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading config file");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// Resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind
    pub endpoint: Endpoint,

    /// Per-read timeout; elapsed reads are retried
    pub read_timeout: Duration,

    /// Cap on an unterminated line; `None` keeps the buffer unbounded
    pub max_line_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_line_bytes: None,
        }
    }
}

impl ServerConfig {
    /// Resolves defaults, the `[server]` table and CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an invalid host, port, timeout or cap.
    pub fn resolve(
        file: &ConfigFile,
        host: Option<&str>,
        port: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let section = &file.server;

        let endpoint = resolve_endpoint(
            &defaults.endpoint,
            section.host.as_deref(),
            section.port,
            host,
            port,
        )?;

        let read_timeout = match section.read_timeout_secs {
            Some(secs) => positive_secs("read_timeout_secs", secs)?,
            None => defaults.read_timeout,
        };

        if section.max_line_bytes == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_line_bytes".to_string(),
                value: "0".to_string(),
                expected: "a positive number of bytes".to_string(),
            });
        }

        Ok(Self {
            endpoint,
            read_timeout,
            max_line_bytes: section.max_line_bytes,
        })
    }
}

// ============================================================================
// Client Config
// ============================================================================

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server to dial
    pub endpoint: Endpoint,

    /// Per-read timeout for the receive flow; elapsed reads are retried
    pub read_timeout: Duration,

    /// Dial timeout
    pub connect_timeout: Duration,

    /// Message log capacity (oldest entries evicted first)
    pub max_messages: usize,

    /// Wait after sending a quit line before closing
    pub quit_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_messages: DEFAULT_MAX_MESSAGES,
            quit_grace: DEFAULT_QUIT_GRACE,
        }
    }
}

impl ClientConfig {
    /// Resolves defaults, the `[client]` table and CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an invalid host, port, timeout or capacity.
    pub fn resolve(
        file: &ConfigFile,
        host: Option<&str>,
        port: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let section = &file.client;

        let endpoint = resolve_endpoint(
            &defaults.endpoint,
            section.host.as_deref(),
            section.port,
            host,
            port,
        )?;

        let read_timeout = match section.read_timeout_secs {
            Some(secs) => positive_secs("read_timeout_secs", secs)?,
            None => defaults.read_timeout,
        };

        let connect_timeout = match section.connect_timeout_secs {
            Some(secs) => positive_secs("connect_timeout_secs", secs)?,
            None => defaults.connect_timeout,
        };

        let max_messages = match section.max_messages {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    field: "max_messages".to_string(),
                    value: "0".to_string(),
                    expected: "at least 1".to_string(),
                })
            }
            Some(n) => n,
            None => defaults.max_messages,
        };

        let quit_grace = section
            .quit_grace_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.quit_grace);

        Ok(Self {
            endpoint,
            read_timeout,
            connect_timeout,
            max_messages,
            quit_grace,
        })
    }
}

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: secs.to_string(),
            expected: "at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
