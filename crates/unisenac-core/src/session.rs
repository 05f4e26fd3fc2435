//! Session identity and read-only views.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::duration::elapsed_since;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Identity of a server-side session: the peer's remote endpoint.
///
/// The TCP stack guarantees no two open connections share a remote
/// address and port, so this is unique for as long as the connection lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(SocketAddr);

impl SessionId {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }

    pub fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SocketAddr> for SessionId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

// ============================================================================
// Views
// ============================================================================

/// Snapshot of one session as seen through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub id: SessionId,

    /// Display name assigned at accept time (`user_N`)
    pub username: String,

    pub connected_at: DateTime<Local>,

    /// Commands dispatched on this connection
    pub commands_count: u64,
}

impl SessionView {
    /// Time connected as of `now`.
    pub fn connected_for(&self, now: DateTime<Local>) -> Duration {
        elapsed_since(self.connected_at, now)
    }
}

/// Process-wide server counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStats {
    pub started_at: DateTime<Local>,

    /// Connections accepted since start
    pub total_connections: u64,

    /// Commands dispatched across all sessions since start
    pub commands_executed: u64,

    /// Sessions currently registered
    pub active_sessions: usize,
}

impl ServerStats {
    pub fn uptime(&self, now: DateTime<Local>) -> Duration {
        elapsed_since(self.started_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_display() {
        let addr: SocketAddr = "127.0.0.1:54321".parse().unwrap();
        let id = SessionId::from(addr);
        assert_eq!(id.to_string(), "127.0.0.1:54321");
        assert_eq!(id.port(), 54321);
        assert_eq!(id.ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_session_ids_distinguish_ports() {
        let a = SessionId::new("127.0.0.1:1000".parse().unwrap());
        let b = SessionId::new("127.0.0.1:1001".parse().unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn test_connected_for() {
        let connected_at = Local::now();
        let view = SessionView {
            id: SessionId::new("10.0.0.1:4000".parse().unwrap()),
            username: "user_1".to_string(),
            connected_at,
            commands_count: 0,
        };
        let now = connected_at + chrono::Duration::seconds(90);
        assert_eq!(view.connected_for(now), Duration::from_secs(90));
    }

    #[test]
    fn test_uptime() {
        let started_at = Local::now();
        let stats = ServerStats {
            started_at,
            total_connections: 3,
            commands_executed: 7,
            active_sessions: 1,
        };
        let now = started_at + chrono::Duration::seconds(3_600);
        assert_eq!(stats.uptime(now), Duration::from_secs(3_600));
    }
}
