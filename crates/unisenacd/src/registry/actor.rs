//! Registry actor - owns all session state and the server counters.
//!
//! The RegistryActor is the single owner of session state in the server.
//! It receives commands via an mpsc channel and publishes events via broadcast.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel send failures are ignored, never unwrapped

use std::collections::HashMap;

use chrono::{DateTime, Local};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use unisenac_core::{ServerStats, SessionId, SessionView};

use super::commands::{RegistryCommand, RegistryError, RemovalReason, SessionEvent};

/// Prefix of assigned display names (`user_1`, `user_2`, ...)
pub const USERNAME_PREFIX: &str = "user_";

/// One registered session.
#[derive(Debug, Clone)]
struct Session {
    username: String,
    connected_at: DateTime<Local>,
    commands_count: u64,

    /// Value of the total-connections counter at accept time; gives
    /// `list()` its accept order
    ordinal: u64,
}

impl Session {
    fn view(&self, id: SessionId) -> SessionView {
        SessionView {
            id,
            username: self.username.clone(),
            connected_at: self.connected_at,
            commands_count: self.commands_count,
        }
    }
}

/// The registry actor - owns all session state.
///
/// # Ownership
///
/// The actor owns:
/// - `sessions`: one entry per open connection, keyed by remote endpoint
/// - the process-wide counters (`total_connections`, `commands_executed`)
///
/// # Thread Safety
///
/// The actor runs in a single task and processes commands sequentially.
/// All state mutations happen within this single task, so a `ListSessions`
/// reply is always a consistent snapshot.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Open sessions
    sessions: HashMap<SessionId, Session>,

    /// Server start time, reported by `status` and `uptime`
    started_at: DateTime<Local>,

    /// Connections accepted since start
    total_connections: u64,

    /// Commands dispatched since start
    commands_executed: u64,

    /// Event publisher
    event_publisher: broadcast::Sender<SessionEvent>,
}

impl RegistryActor {
    /// Creates a new registry actor.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `event_publisher` - Broadcast channel for publishing events
    /// * `started_at` - Server start time
    pub fn new(
        receiver: mpsc::Receiver<RegistryCommand>,
        event_publisher: broadcast::Sender<SessionEvent>,
        started_at: DateTime<Local>,
    ) -> Self {
        Self {
            receiver,
            sessions: HashMap::new(),
            started_at,
            total_connections: 0,
            commands_executed: 0,
            event_publisher,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    pub async fn run(mut self) {
        info!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(
            sessions = self.sessions.len(),
            total_connections = self.total_connections,
            commands_executed = self.commands_executed,
            "Registry actor stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                session_id,
                connected_at,
                respond_to,
            } => {
                let result = self.handle_register(session_id, connected_at);
                // Ignore send error - caller may have dropped the receiver
                let _ = respond_to.send(result);
            }
            RegistryCommand::RecordCommand {
                session_id,
                respond_to,
            } => {
                let result = self.handle_record_command(session_id);
                let _ = respond_to.send(result);
            }
            RegistryCommand::GetSession {
                session_id,
                respond_to,
            } => {
                let result = self
                    .sessions
                    .get(&session_id)
                    .map(|session| session.view(session_id));
                let _ = respond_to.send(result);
            }
            RegistryCommand::ListSessions { respond_to } => {
                let _ = respond_to.send(self.handle_list());
            }
            RegistryCommand::Remove {
                session_id,
                reason,
                respond_to,
            } => {
                let result = self.handle_remove(session_id, reason);
                let _ = respond_to.send(result);
            }
            RegistryCommand::GetStats { respond_to } => {
                let _ = respond_to.send(self.stats());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_register(
        &mut self,
        session_id: SessionId,
        connected_at: DateTime<Local>,
    ) -> Result<SessionView, RegistryError> {
        if self.sessions.contains_key(&session_id) {
            warn!(session_id = %session_id, "Session already registered");
            return Err(RegistryError::SessionAlreadyExists(session_id));
        }

        self.total_connections = self.total_connections.saturating_add(1);
        let session = Session {
            username: format!("{USERNAME_PREFIX}{}", self.total_connections),
            connected_at,
            commands_count: 0,
            ordinal: self.total_connections,
        };
        let view = session.view(session_id);
        self.sessions.insert(session_id, session);

        debug!(
            session_id = %session_id,
            username = %view.username,
            active = self.sessions.len(),
            "Session registered"
        );

        let _ = self.event_publisher.send(SessionEvent::Registered {
            session: view.clone(),
        });

        Ok(view)
    }

    fn handle_record_command(
        &mut self,
        session_id: SessionId,
    ) -> Result<SessionView, RegistryError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(RegistryError::SessionNotFound(session_id))?;

        session.commands_count = session.commands_count.saturating_add(1);
        self.commands_executed = self.commands_executed.saturating_add(1);

        Ok(session.view(session_id))
    }

    fn handle_list(&self) -> Vec<SessionView> {
        let mut sessions: Vec<(&SessionId, &Session)> = self.sessions.iter().collect();
        sessions.sort_by_key(|(_, session)| session.ordinal);
        sessions
            .into_iter()
            .map(|(id, session)| session.view(*id))
            .collect()
    }

    fn handle_remove(
        &mut self,
        session_id: SessionId,
        reason: RemovalReason,
    ) -> Result<SessionView, RegistryError> {
        let session = self
            .sessions
            .remove(&session_id)
            .ok_or(RegistryError::SessionNotFound(session_id))?;
        let view = session.view(session_id);

        debug!(
            session_id = %session_id,
            username = %view.username,
            reason = %reason,
            active = self.sessions.len(),
            "Session removed"
        );

        let _ = self.event_publisher.send(SessionEvent::Removed {
            session: view.clone(),
            reason,
        });

        Ok(view)
    }

    fn stats(&self) -> ServerStats {
        ServerStats {
            started_at: self.started_at,
            total_connections: self.total_connections,
            commands_executed: self.commands_executed,
            active_sessions: self.sessions.len(),
        }
    }
}
