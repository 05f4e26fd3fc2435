//! UniSenac Core - Shared types for the line-protocol server and client
//!
//! This crate provides the pieces shared between the server (unisenacd)
//! and the interactive client (unisenac):
//! - `reassembly` - byte stream to line reassembly
//! - `session` - session identity and read-only views
//! - `config` - endpoints and layered configuration
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod duration;
pub mod error;
pub mod reassembly;
pub mod session;

// Re-exports for convenience
pub use config::{
    parse_port, ClientConfig, ClientSection, ConfigFile, Endpoint, ServerConfig, ServerSection,
    DEFAULT_HOST, DEFAULT_MAX_MESSAGES, DEFAULT_PORT,
};
pub use duration::{elapsed_since, format_duration};
pub use error::{ConfigError, ReassemblyError};
pub use reassembly::LineReassembler;
pub use session::{ServerStats, SessionId, SessionView};
