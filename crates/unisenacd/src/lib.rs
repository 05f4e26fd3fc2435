//! UniSenac Daemon - Line-protocol command server
//!
//! This crate provides the server side of the line protocol:
//! - `registry` - Session registry actor tracking every open connection
//! - `dispatch` - Command dispatcher producing reply text
//! - `server` - TCP accept loop and per-connection handlers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        unisenacd                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │     Server      │     │      RegistryActor          │   │
//! │  │ (TcpListener)   │     │ (sessions + server stats)   │   │
//! │  └────────┬────────┘     └──────────────▲──────────────┘   │
//! │           │ accept()                    │ RegistryHandle    │
//! │           ▼                             │                   │
//! │  ┌─────────────────┐     ┌──────────────┴──────────────┐   │
//! │  │ConnectionHandler│────▶│        Dispatcher           │   │
//! │  │ (one task each) │     │  (Command -> reply text)    │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod dispatch;
pub mod registry;
pub mod server;
