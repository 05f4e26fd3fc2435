//! TCP server for the UniSenac daemon.
//!
//! The server:
//! - Listens on a TCP endpoint for client connections
//! - Spawns a ConnectionHandler task for each client
//! - Supports graceful shutdown via CancellationToken
//!
//! There is no cap on concurrent connections. Shutdown stops the accept
//! loop; handlers already running are not drained.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │     Server      │
//! │                 │
//! │  TcpListener    │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│  RegistryHandle │
//! │   (per client)  │     │                 │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Accept errors are logged and allow continued operation

mod connection;

pub use connection::{ConnectionError, ConnectionHandler, ConnectionState};

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use unisenac_core::{ConfigError, ServerConfig, SessionId};

use crate::registry::RegistryHandle;

/// TCP server accepting line-protocol clients.
pub struct Server {
    /// Bind address, timeouts and line cap
    config: ServerConfig,

    /// Handle to the session registry
    registry: RegistryHandle,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,
}

impl Server {
    /// Creates a new server.
    ///
    /// # Arguments
    ///
    /// * `config` - Resolved server settings
    /// * `registry` - Handle to the session registry
    /// * `cancel_token` - Token for graceful shutdown
    pub fn new(
        config: ServerConfig,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            registry,
            cancel_token,
        }
    }

    /// Binds the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address is unavailable.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.config.endpoint.address();
        TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr,
                error: e.to_string(),
            })
    }

    /// Binds and runs the server until the cancellation token fires.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accepts connections on an already bound listener until cancelled.
    ///
    /// Tests bind `127.0.0.1:0` themselves and hand the listener in.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        match listener.local_addr() {
            Ok(addr) => info!(addr = %addr, "Server listening"),
            Err(e) => debug!(error = %e, "Listener has no local address"),
        }

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.handle_connection(stream, addr),
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawns a handler task for an accepted connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        debug!(peer = %addr, "Accepted connection");

        let (reader, writer) = stream.into_split();
        let handler = ConnectionHandler::new(
            reader,
            writer,
            SessionId::new(addr),
            self.registry.clone(),
            self.config.read_timeout,
            self.config.max_line_bytes,
        );

        tokio::spawn(async move {
            let reason = handler.run().await;
            debug!(peer = %addr, reason = %reason, "Connection task finished");
        });
    }
}

/// Errors that can occur in the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
