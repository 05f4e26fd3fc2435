//! UniSenac Daemon - Line-protocol command server
//!
//! Accepts TCP clients, greets each with a banner and answers text
//! commands until the client quits or disconnects.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default 127.0.0.1:2323
//! unisenacd
//!
//! # Listen on all interfaces, port 2424
//! unisenacd 0.0.0.0 2424
//!
//! # Use a specific config file
//! unisenacd --config ./config.toml
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use unisenac_core::{ConfigFile, ServerConfig};
use unisenacd::registry::spawn_registry;
use unisenacd::server::Server;

/// UniSenac server - Telnet-style command server
#[derive(Parser, Debug)]
#[command(name = "unisenacd", version, about)]
struct Args {
    /// Address to bind (default 127.0.0.1)
    host: Option<String>,

    /// Port to bind (default 2323)
    port: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/unisenac/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration errors abort before any socket is opened
    let file = ConfigFile::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    let config = ServerConfig::resolve(&file, args.host.as_deref(), args.port.as_deref())
        .context("Invalid server configuration")?;

    run_server(config)
}

#[tokio::main]
async fn run_server(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("unisenacd=info".parse()?)
                .add_directive("unisenac_core=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        endpoint = %config.endpoint,
        max_line_bytes = ?config.max_line_bytes,
        "UniSenac server starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry = spawn_registry();
    info!("Session registry started");

    let server = Server::new(config, registry.clone(), cancel_token);

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    let stats = registry.stats().await?;
    info!(
        total_connections = stats.total_connections,
        commands_executed = stats.commands_executed,
        open_sessions = stats.active_sessions,
        "UniSenac server stopped"
    );
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
