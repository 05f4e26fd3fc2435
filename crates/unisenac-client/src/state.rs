//! Client-side session state.
//!
//! `ClientState` is shared between the receive flow and the interactive
//! flow behind a single mutex. Every method here is one read-modify-write
//! and is meant to be called with the lock held for just that call.
//!
//! History, notes, connection attempts and counters live for the whole
//! client process; reconnecting does not reset them.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

use unisenac_core::elapsed_since;
pub use unisenac_core::DEFAULT_MAX_MESSAGES;

use crate::error::{ClientError, Result};

// ============================================================================
// Message Log
// ============================================================================

/// Which way a logged line travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Typed by the user and sent to the server
    Outgoing,

    /// Received from the server
    Incoming,
}

/// One line in the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub time: DateTime<Local>,
    pub direction: Direction,
    pub text: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            Direction::Outgoing => '>',
            Direction::Incoming => '<',
        };
        write!(f, "{} {arrow} {}", self.time.format("%H:%M:%S"), self.text)
    }
}

/// Bounded log with FIFO eviction.
///
/// `len()` never exceeds the capacity: pushing onto a full log drops the
/// oldest entry first.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl MessageLog {
    /// Creates an empty log. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

// ============================================================================
// History, Notes, Connection Attempts
// ============================================================================

/// A command typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub command: String,
    pub time: DateTime<Local>,
}

/// A free-form note taken during the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub time: DateTime<Local>,
    pub note: String,

    /// Where in the session the note was taken, e.g. `3 comandos executados`
    pub context: String,
}

/// Whether an attempt was a first connect or a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Connect,
    Reconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failed(String),
}

/// One dial attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionAttempt {
    pub host: String,
    pub port: u16,
    pub time: DateTime<Local>,
    pub kind: AttemptKind,
    pub outcome: AttemptOutcome,
}

impl ConnectionAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

impl fmt::Display for ConnectionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            AttemptKind::Connect => "conexão",
            AttemptKind::Reconnect => "reconexão",
        };
        write!(
            f,
            "{} {}:{} {kind} ",
            self.time.format("%d/%m/%Y %H:%M:%S"),
            self.host,
            self.port
        )?;
        match &self.outcome {
            AttemptOutcome::Success => write!(f, "bem-sucedida"),
            AttemptOutcome::Failed(reason) => write!(f, "falhou: {reason}"),
        }
    }
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Message,
    Command,
    Note,
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "Mensagem"),
            Self::Command => write!(f, "Comando"),
            Self::Note => write!(f, "Nota"),
        }
    }
}

/// A search match. `index` is 1-based within its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub source: SearchSource,
    pub index: usize,
    pub text: String,
}

// ============================================================================
// Statistics
// ============================================================================

/// Traffic counters for the client process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub commands_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,

    /// UTF-8 length of recorded incoming lines
    pub bytes_received: u64,
}

// ============================================================================
// Client State
// ============================================================================

/// Everything both client flows read or write.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    /// Set by a successful dial, cleared by disconnect or the receive flow
    pub connected: bool,

    /// Start of the current connection
    pub connected_at: Option<DateTime<Local>>,

    /// Bumped on every dial; a receive flow only clears `connected` for
    /// its own generation
    pub generation: u64,

    pub log: MessageLog,
    pub history: Vec<HistoryEntry>,
    pub notes: Vec<Note>,
    pub connections: Vec<ConnectionAttempt>,
    pub stats: ClientStats,
}

impl ClientState {
    pub fn new(max_messages: usize) -> Self {
        Self {
            log: MessageLog::new(max_messages),
            ..Self::default()
        }
    }

    /// Marks a new connection live and returns its generation.
    pub fn mark_connected(&mut self, now: DateTime<Local>) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.connected = true;
        self.connected_at = Some(now);
        self.generation
    }

    /// Marks the connection of `generation` closed.
    ///
    /// Returns false if a newer connection has replaced it, in which case
    /// nothing changes.
    pub fn mark_disconnected(&mut self, generation: u64) -> bool {
        if self.generation != generation || !self.connected {
            return false;
        }
        self.connected = false;
        self.connected_at = None;
        true
    }

    /// Records a typed command in history and as an outgoing log entry.
    pub fn record_outgoing(&mut self, command: &str, now: DateTime<Local>) -> LogEntry {
        self.history.push(HistoryEntry {
            command: command.to_string(),
            time: now,
        });
        self.stats.commands_sent = self.stats.commands_sent.saturating_add(1);

        let entry = LogEntry {
            time: now,
            direction: Direction::Outgoing,
            text: command.to_string(),
        };
        self.log.push(entry.clone());
        entry
    }

    pub fn record_bytes_sent(&mut self, bytes: usize) {
        self.stats.bytes_sent = self.stats.bytes_sent.saturating_add(bytes as u64);
    }

    /// Records a line from the server.
    ///
    /// Blank lines are ignored and return `None`.
    pub fn record_incoming(&mut self, line: &str, now: DateTime<Local>) -> Option<LogEntry> {
        let text = line.trim();
        if text.is_empty() {
            return None;
        }

        self.stats.messages_received = self.stats.messages_received.saturating_add(1);
        self.stats.bytes_received = self.stats.bytes_received.saturating_add(text.len() as u64);

        let entry = LogEntry {
            time: now,
            direction: Direction::Incoming,
            text: text.to_string(),
        };
        self.log.push(entry.clone());
        Some(entry)
    }

    pub fn record_attempt(&mut self, attempt: ConnectionAttempt) {
        self.connections.push(attempt);
    }

    /// Adds a note tagged with the number of commands typed so far.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EmptyNote` for blank text.
    pub fn add_note(&mut self, text: &str, now: DateTime<Local>) -> Result<Note> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyNote);
        }

        let note = Note {
            time: now,
            note: text.to_string(),
            context: format!("{} comandos executados", self.history.len()),
        };
        self.notes.push(note.clone());
        Ok(note)
    }

    /// Case-insensitive search across the log, command history and notes.
    ///
    /// An empty term matches nothing.
    pub fn search(&self, term: &str) -> Vec<SearchHit> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        let messages = self.log.iter().enumerate().filter_map(|(i, entry)| {
            entry.text.to_lowercase().contains(&term).then(|| SearchHit {
                source: SearchSource::Message,
                index: i + 1,
                text: entry.to_string(),
            })
        });

        let commands = self.history.iter().enumerate().filter_map(|(i, cmd)| {
            cmd.command.to_lowercase().contains(&term).then(|| SearchHit {
                source: SearchSource::Command,
                index: i + 1,
                text: format!("{} - {}", cmd.time.format("%H:%M:%S"), cmd.command),
            })
        });

        let notes = self.notes.iter().enumerate().filter_map(|(i, note)| {
            note.note.to_lowercase().contains(&term).then(|| SearchHit {
                source: SearchSource::Note,
                index: i + 1,
                text: format!("{} - {}", note.time.format("%H:%M:%S"), note.note),
            })
        });

        messages.chain(commands).chain(notes).collect()
    }

    /// Time since the current connection was made.
    pub fn uptime(&self, now: DateTime<Local>) -> Option<Duration> {
        self.connected_at.map(|start| elapsed_since(start, now))
    }

    /// Commands typed per minute of the current connection.
    ///
    /// Connections younger than a minute count as one minute.
    pub fn commands_per_minute(&self, now: DateTime<Local>) -> f64 {
        let minutes = self
            .uptime(now)
            .map(|uptime| uptime.as_secs_f64() / 60.0)
            .unwrap_or(0.0)
            .max(1.0);
        self.history.len() as f64 / minutes
    }
}
