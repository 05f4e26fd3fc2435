//! UniSenac - interactive line-protocol client
//!
//! Connects to a UniSenac server, prints everything it sends and forwards
//! each typed line as a command. Lines starting with `:` are handled
//! locally and never sent.
//!
//! # Usage
//!
//! ```text
//! unisenac                    # connect to 127.0.0.1:2323
//! unisenac 10.0.0.5 2424      # connect elsewhere
//! ```
//!
//! # Local commands
//!
//! ```text
//! :history         command history
//! :info            connection and traffic summary
//! :note TEXT       add a session note
//! :search TERM     search messages, commands and notes
//! :reconnect       drop the socket and dial again
//! :clear           empty the message log
//! :quit            disconnect and exit
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use unisenac_client::{ClientEvent, ClientSession, SubmitOutcome};
use unisenac_core::{format_duration, ClientConfig, ConfigFile};

// ============================================================================
// CLI Arguments
// ============================================================================

/// UniSenac client - Telnet-style interactive client
#[derive(Parser, Debug)]
#[command(name = "unisenac", version, about)]
struct Args {
    /// Server host (default 127.0.0.1)
    host: Option<String>,

    /// Server port (default 2323)
    port: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/unisenac/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file = ConfigFile::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    let config = ClientConfig::resolve(&file, args.host.as_deref(), args.port.as_deref())
        .context("Invalid client configuration")?;

    run_client(config)
}

#[tokio::main]
async fn run_client(config: ClientConfig) -> Result<()> {
    // Logs go to stderr so they don't interleave with server output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("unisenac=warn".parse()?)
                .add_directive("unisenac_client=warn".parse()?),
        )
        .init();

    let mut session = ClientSession::new(config);
    let printer = tokio::spawn(print_events(session.subscribe()));

    println!("Conectando a {}...", session.endpoint());
    session
        .connect()
        .await
        .with_context(|| format!("Could not connect to {}", session.endpoint()))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();

        if let Some(local) = line.strip_prefix(':') {
            match handle_local(&mut session, local).await {
                Local::Continue => continue,
                Local::Exit => break,
            }
        }

        match session.submit(line).await {
            Ok(SubmitOutcome::Quit) => break,
            Ok(SubmitOutcome::Sent | SubmitOutcome::Skipped) => {}
            Err(e) if e.is_disconnect() => {
                println!("[!] {e}. Use :reconnect para reconectar.");
            }
            Err(e) => println!("[!] {e}"),
        }
    }

    if session.is_connected().await {
        if let Err(e) = session.disconnect().await {
            debug!(error = %e, "Disconnect failed");
        }
    }
    printer.abort();

    print_summary(&session).await;
    Ok(())
}

// ============================================================================
// Local Commands
// ============================================================================

enum Local {
    Continue,
    Exit,
}

async fn handle_local(session: &mut ClientSession, input: &str) -> Local {
    let (name, rest) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };

    match name.to_lowercase().as_str() {
        "quit" => return Local::Exit,
        "history" => {
            let history = session.history().await;
            if history.is_empty() {
                println!("Nenhum comando no histórico.");
            }
            for (i, entry) in history.iter().enumerate() {
                println!("{:>3}. {} - {}", i + 1, entry.time.format("%H:%M:%S"), entry.command);
            }
        }
        "info" => print_info(session).await,
        "note" => match session.add_note(rest).await {
            Ok(note) => println!("Nota adicionada ({}): {}", note.context, note.note),
            Err(e) => println!("[!] {e}"),
        },
        "search" => {
            if rest.is_empty() {
                println!("Digite um termo para buscar.");
                return Local::Continue;
            }
            let hits = session.search(rest).await;
            if hits.is_empty() {
                println!("Nenhum resultado encontrado para: '{rest}'");
            }
            for hit in hits {
                println!("{:<9} #{:<3} {}", hit.source.to_string(), hit.index, hit.text);
            }
        }
        "reconnect" => match session.reconnect().await {
            Ok(()) => println!("Reconectado a {}.", session.endpoint()),
            Err(e) => println!("[!] {e}"),
        },
        "clear" => {
            session.clear_messages().await;
            println!("Mensagens limpas.");
        }
        _ => println!("Comando desconhecido: :{name}"),
    }

    Local::Continue
}

async fn print_info(session: &ClientSession) {
    let stats = session.stats().await;
    let connected = session.is_connected().await;

    println!("Servidor: {}", session.endpoint());
    println!("Status: {}", if connected { "conectado" } else { "desconectado" });
    if let Some(uptime) = session.uptime().await {
        println!("Conectado há: {}", format_duration(uptime));
        println!("Comandos/minuto: {:.1}", session.commands_per_minute().await);
    }
    println!("Comandos enviados: {}", stats.commands_sent);
    println!("Mensagens recebidas: {}", stats.messages_received);
    println!("Bytes enviados: {}", stats.bytes_sent);
    println!("Bytes recebidos: {}", stats.bytes_received);
    println!("Notas: {}", session.notes().await.len());

    for attempt in session.connection_history().await.iter().rev().take(5) {
        println!("  {attempt}");
    }
}

async fn print_summary(session: &ClientSession) {
    let stats = session.stats().await;
    println!(
        "Sessão encerrada: {} comandos enviados, {} mensagens recebidas.",
        stats.commands_sent, stats.messages_received
    );
}

// ============================================================================
// Output
// ============================================================================

async fn print_events(mut events: broadcast::Receiver<ClientEvent>) {
    loop {
        match events.recv().await {
            Ok(ClientEvent::MessageReceived(entry)) => println!("{}", entry.text),
            Ok(ClientEvent::Disconnected) => {
                println!("[!] Conexão encerrada pelo servidor. Use :reconnect para reconectar.");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Output fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

