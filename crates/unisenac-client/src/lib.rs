//! UniSenac Client - Session driver for the line-protocol client
//!
//! This crate provides everything the interactive client needs below the
//! presentation layer:
//! - `session` - `ClientSession`: connect, submit, disconnect, reconnect
//! - `state` - shared client state: bounded message log, history, notes
//! - `error` - `ClientError`
//!
//! A presentation layer either polls `ClientSession::messages()` or
//! subscribes to [`ClientEvent`]s. Every operation returns a `Result`
//! rather than panicking into the UI.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()` outside tests.

pub mod error;
pub mod session;
pub mod state;

pub use error::{ClientError, Result};
pub use session::{ClientEvent, ClientSession, SubmitOutcome};
pub use state::{
    AttemptKind, AttemptOutcome, ClientState, ClientStats, ConnectionAttempt, Direction,
    HistoryEntry, LogEntry, MessageLog, Note, SearchHit, SearchSource,
};
