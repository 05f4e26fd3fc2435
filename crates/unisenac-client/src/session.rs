//! Client session driver.
//!
//! `ClientSession` owns the outbound connection. While connected, a
//! background receive task reads the socket, reassembles lines and records
//! them in the shared [`ClientState`]; the interactive side calls
//! [`ClientSession::submit`] for every typed line.
//!
//! # Connection Lifecycle
//!
//! 1. `connect` dials with a timeout and spawns the receive task
//! 2. `submit` records and sends typed commands
//! 3. The receive task records server lines, dropping the prompt sentinel
//! 4. A typed quit synonym, `disconnect`, or the server closing ends it
//! 5. `reconnect` discards the old socket and dials again, keeping history
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use unisenac_core::{ClientConfig, Endpoint, LineReassembler};
use unisenac_protocol::{is_prompt_fragment, is_quit};

use crate::error::{ClientError, Result};
use crate::state::{
    AttemptKind, AttemptOutcome, ClientState, ClientStats, ConnectionAttempt, HistoryEntry,
    LogEntry, Note, SearchHit,
};

/// Size of a single socket read
const READ_BUFFER_SIZE: usize = 4096;

/// Capacity of the client event channel
const EVENT_BUFFER: usize = 256;

/// Line sent by `disconnect` before closing
const QUIT_LINE: &str = "quit\n";

/// How long to wait for the receive task after cancelling it
const RECEIVE_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Events and Outcomes
// ============================================================================

/// Events published to subscribers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A server line was recorded in the message log.
    MessageReceived(LogEntry),

    /// The server closed the connection or a read failed.
    ///
    /// Not published when the user quits or disconnects.
    Disconnected,
}

/// What `submit` did with a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank line; nothing recorded or sent
    Skipped,

    /// Recorded and sent
    Sent,

    /// A quit synonym was sent and the session is now closed
    Quit,
}

// ============================================================================
// Client Session
// ============================================================================

/// A live socket and the task reading it.
struct Connection {
    writer: OwnedWriteHalf,
    cancel_token: CancellationToken,
    receive_task: JoinHandle<()>,
}

/// Client session driver.
///
/// Mutating operations take `&mut self`; read accessors only lock the
/// shared state briefly.
pub struct ClientSession {
    config: ClientConfig,
    state: Arc<Mutex<ClientState>>,
    connection: Option<Connection>,
    events: broadcast::Sender<ClientEvent>,
}

impl ClientSession {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Arc::new(Mutex::new(ClientState::new(config.max_messages))),
            config,
            connection: None,
            events,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// Points future dials at another server.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.config.endpoint = endpoint;
    }

    /// Subscribe to received messages and disconnects.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------------
    // Connection management
    // ------------------------------------------------------------------------

    /// Dials the configured endpoint and starts the receive flow.
    ///
    /// Every attempt is recorded in the connection history.
    ///
    /// # Errors
    ///
    /// - `ClientError::AlreadyConnected` if a connection is live
    /// - `ClientError::Connect` if dialing fails or times out
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected().await {
            return Err(ClientError::AlreadyConnected);
        }
        self.teardown().await;
        self.dial(AttemptKind::Connect).await
    }

    /// Sends `quit`, waits for the goodbye to arrive, then closes.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotConnected` if there is no live connection.
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.is_connected().await {
            self.teardown().await;
            return Err(ClientError::NotConnected);
        }

        self.begin_quit().await;
        if let Some(connection) = self.connection.as_mut() {
            if let Err(e) = write_line(&mut connection.writer, QUIT_LINE).await {
                debug!(error = %e, "Failed to send quit on disconnect");
            }
        }
        sleep(self.config.quit_grace).await;

        self.close().await;
        info!(endpoint = %self.config.endpoint, "Disconnected");
        Ok(())
    }

    /// Discards the current socket, if any, and dials again.
    ///
    /// History, notes and counters are kept.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Connect` if dialing fails. The session is
    /// left disconnected.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.close().await;
        self.dial(AttemptKind::Reconnect).await
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connected
    }

    // ------------------------------------------------------------------------
    // Interactive flow
    // ------------------------------------------------------------------------

    /// Records and sends one typed line.
    ///
    /// The line is added to command history and the message log before it
    /// is written. A quit synonym is sent, then the session waits
    /// `quit_grace` for the goodbye and closes.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` if there is no live connection
    /// - `ClientError::ConnectionLost` if the write fails; the session is
    ///   then disconnected
    pub async fn submit(&mut self, line: &str) -> Result<SubmitOutcome> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(SubmitOutcome::Skipped);
        }
        if !self.is_connected().await || self.connection.is_none() {
            return Err(ClientError::NotConnected);
        }

        let wire = format!("{line}\n");
        let quitting = is_quit(line);
        {
            let mut state = self.state.lock().await;
            state.record_outgoing(line, Local::now());
            state.record_bytes_sent(wire.len());
        }
        if quitting {
            self.begin_quit().await;
        }

        let Some(connection) = self.connection.as_mut() else {
            return Err(ClientError::NotConnected);
        };

        if let Err(e) = write_line(&mut connection.writer, &wire).await {
            warn!(error = %e, "Write failed");
            self.close().await;
            return Err(ClientError::ConnectionLost(e.to_string()));
        }
        debug!(command = %line, "Command sent");

        if quitting {
            sleep(self.config.quit_grace).await;
            self.close().await;
            info!(endpoint = %self.config.endpoint, "Session ended by quit");
            return Ok(SubmitOutcome::Quit);
        }

        Ok(SubmitOutcome::Sent)
    }

    // ------------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------------

    /// Snapshot of the message log, oldest first.
    pub async fn messages(&self) -> Vec<LogEntry> {
        self.state.lock().await.log.iter().cloned().collect()
    }

    /// The newest `n` log entries, oldest first.
    pub async fn recent_messages(&self, n: usize) -> Vec<LogEntry> {
        self.state.lock().await.log.recent(n)
    }

    pub async fn stats(&self) -> ClientStats {
        self.state.lock().await.stats
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.history.clone()
    }

    pub async fn notes(&self) -> Vec<Note> {
        self.state.lock().await.notes.clone()
    }

    pub async fn connection_history(&self) -> Vec<ConnectionAttempt> {
        self.state.lock().await.connections.clone()
    }

    /// Adds a session note.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EmptyNote` for blank text.
    pub async fn add_note(&self, text: &str) -> Result<Note> {
        self.state.lock().await.add_note(text, Local::now())
    }

    pub async fn search(&self, term: &str) -> Vec<SearchHit> {
        self.state.lock().await.search(term)
    }

    /// Empties the message log. History, notes and counters are kept.
    pub async fn clear_messages(&self) {
        self.state.lock().await.log.clear();
    }

    pub async fn connected_at(&self) -> Option<DateTime<Local>> {
        self.state.lock().await.connected_at
    }

    /// Time since the current connection was made.
    pub async fn uptime(&self) -> Option<Duration> {
        self.state.lock().await.uptime(Local::now())
    }

    pub async fn commands_per_minute(&self) -> f64 {
        self.state.lock().await.commands_per_minute(Local::now())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn dial(&mut self, kind: AttemptKind) -> Result<()> {
        let endpoint = self.config.endpoint.clone();
        let addr = endpoint.address();
        debug!(addr = %addr, ?kind, "Dialing");

        let result = match timeout(self.config.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(ClientError::connect(&addr, e)),
            Err(_) => Err(ClientError::connect(
                &addr,
                format!("timed out after {:?}", self.config.connect_timeout),
            )),
        };

        let now = Local::now();
        let mut state = self.state.lock().await;
        state.record_attempt(ConnectionAttempt {
            host: endpoint.host().to_string(),
            port: endpoint.port(),
            time: now,
            kind,
            outcome: match &result {
                Ok(_) => AttemptOutcome::Success,
                Err(e) => AttemptOutcome::Failed(e.to_string()),
            },
        });

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                warn!(addr = %addr, error = %e, "Connection failed");
                return Err(e);
            }
        };

        let generation = state.mark_connected(now);
        drop(state);

        let (reader, writer) = stream.into_split();
        let cancel_token = CancellationToken::new();
        let receive = ReceiveFlow {
            reader,
            reassembler: LineReassembler::new(),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            cancel_token: cancel_token.clone(),
            read_timeout: self.config.read_timeout,
            generation,
        };
        let receive_task = tokio::spawn(receive.run());

        self.connection = Some(Connection {
            writer,
            cancel_token,
            receive_task,
        });

        info!(addr = %addr, ?kind, "Connected");
        Ok(())
    }

    /// Marks the session disconnected and tears the socket down.
    async fn close(&mut self) {
        self.begin_quit().await;
        self.teardown().await;
    }

    /// Marks the current connection closed before the socket goes away.
    ///
    /// The receive flow keeps recording until it is cancelled, but a peer
    /// close it sees afterwards no longer publishes `Disconnected`.
    async fn begin_quit(&self) {
        let mut state = self.state.lock().await;
        let generation = state.generation;
        state.mark_disconnected(generation);
    }

    /// Cancels the receive task and shuts the socket down.
    async fn teardown(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };

        connection.cancel_token.cancel();
        if let Err(e) = connection.writer.shutdown().await {
            debug!(error = %e, "Socket shutdown failed");
        }
        if timeout(RECEIVE_JOIN_TIMEOUT, &mut connection.receive_task)
            .await
            .is_err()
        {
            connection.receive_task.abort();
        }
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

// ============================================================================
// Receive Flow
// ============================================================================

/// Background reader for one connection.
struct ReceiveFlow {
    reader: OwnedReadHalf,
    reassembler: LineReassembler,
    state: Arc<Mutex<ClientState>>,
    events: broadcast::Sender<ClientEvent>,
    cancel_token: CancellationToken,
    read_timeout: Duration,
    generation: u64,
}

impl ReceiveFlow {
    async fn run(mut self) {
        debug!(generation = self.generation, "Receive flow starting");
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let read = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!(generation = self.generation, "Receive flow cancelled");
                    return;
                }
                read = timeout(self.read_timeout, self.reader.read(&mut buf)) => read,
            };

            let n = match read {
                Err(_) => continue,
                Ok(Ok(0)) => {
                    info!("Server closed the connection");
                    self.flush_tail().await;
                    break;
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    warn!(error = %e, "Read failed");
                    self.flush_tail().await;
                    break;
                }
            };

            self.process(buf.get(..n).unwrap_or_default()).await;
        }

        let disconnected = self.state.lock().await.mark_disconnected(self.generation);
        if disconnected {
            let _ = self.events.send(ClientEvent::Disconnected);
        }
    }

    /// Records every complete line, then drops a trailing prompt.
    ///
    /// Any other unterminated tail stays buffered until its terminator
    /// arrives.
    async fn process(&mut self, chunk: &[u8]) {
        let lines = match self.reassembler.feed(chunk) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "Discarding oversized line");
                Vec::new()
            }
        };

        if is_prompt_fragment(&self.reassembler.pending_text()) {
            self.reassembler.clear();
        }

        self.record(lines.iter().map(String::as_str)).await;
    }

    /// Records whatever the server left unterminated before closing.
    async fn flush_tail(&mut self) {
        let tail = self.reassembler.pending_text().into_owned();
        self.reassembler.clear();
        self.record(std::iter::once(tail.as_str())).await;
    }

    async fn record<'a>(&self, lines: impl Iterator<Item = &'a str>) {
        let now = Local::now();
        let mut recorded = Vec::new();
        {
            let mut state = self.state.lock().await;
            for line in lines {
                if let Some(entry) = state.record_incoming(line, now) {
                    recorded.push(entry);
                }
            }
        }

        for entry in recorded {
            let _ = self.events.send(ClientEvent::MessageReceived(entry));
        }
    }
}
