//! Integration tests for the TCP server.
//!
//! These tests run a real server on an ephemeral loopback port and talk to
//! it with raw TCP clients, checking the welcome/prompt handshake, command
//! replies, quit handling and registry bookkeeping.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Local;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use unisenac_core::{Endpoint, ServerConfig};
use unisenac_protocol::PROMPT;
use unisenacd::registry::{spawn_registry, RegistryHandle, RemovalReason};
use unisenacd::server::Server;

// ============================================================================
// Constants
// ============================================================================

/// Short read timeout so retried timeouts are exercised during tests
const TEST_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Maximum time to wait for any expected reply
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between registry polls
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const GOODBYE_TAIL: &str = "Desconectando...\n";

// ============================================================================
// Test Helpers
// ============================================================================

/// Test server context that manages server lifecycle.
struct TestServer {
    addr: std::net::SocketAddr,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(None).await
    }

    async fn spawn_with(max_line_bytes: Option<usize>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let registry = spawn_registry();
        let cancel_token = CancellationToken::new();
        let config = ServerConfig {
            endpoint: Endpoint::new("127.0.0.1", addr.port()).unwrap(),
            read_timeout: TEST_READ_TIMEOUT,
            max_line_bytes,
        };

        let server = Server::new(config, registry.clone(), cancel_token.clone());
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        Self {
            addr,
            registry,
            cancel_token,
        }
    }

    /// Connects and consumes the welcome banner and first prompt.
    async fn connect(&self) -> TestClient {
        let mut client = self.connect_raw().await;
        let welcome = client.read_until(PROMPT).await;
        assert!(welcome.contains("BEM-VINDO"), "unexpected banner: {welcome}");
        client
    }

    async fn connect_raw(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.expect("connect");
        TestClient::new(stream)
    }

    /// Polls the registry until it holds `expected` sessions.
    async fn wait_for_sessions(&self, expected: usize) {
        let result = timeout(REPLY_TIMEOUT, async {
            loop {
                if self.registry.list_sessions().await.len() == expected {
                    return;
                }
                sleep(POLL_INTERVAL).await;
            }
        })
        .await;
        assert!(
            result.is_ok(),
            "registry never reached {expected} sessions (has {})",
            self.registry.list_sessions().await.len()
        );
    }

    fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

/// Raw line-protocol client.
struct TestClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    pending: String,
}

impl TestClient {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader,
            writer,
            pending: String::new(),
        }
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn send_line(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    /// Reads until `needle` has arrived; returns everything up to and
    /// including it and keeps the rest buffered.
    async fn read_until(&mut self, needle: &str) -> String {
        let result = timeout(REPLY_TIMEOUT, async {
            loop {
                if let Some(pos) = self.pending.find(needle) {
                    let end = pos + needle.len();
                    let rest = self.pending.split_off(end);
                    return std::mem::replace(&mut self.pending, rest);
                }
                let mut buf = [0u8; 1024];
                let n = self.reader.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed while waiting for {needle:?}");
                self.pending.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        })
        .await;
        result.unwrap_or_else(|_| panic!("timed out waiting for {needle:?}: {}", self.pending))
    }

    /// Sends a command and returns its reply, prompt included.
    async fn command(&mut self, line: &str) -> String {
        self.send_line(line).await;
        self.read_until(PROMPT).await
    }

    /// Asserts the server closes the connection with nothing more to say.
    async fn expect_eof(&mut self) {
        assert!(self.pending.is_empty(), "unexpected data: {}", self.pending);
        let mut buf = [0u8; 64];
        let n = timeout(REPLY_TIMEOUT, self.reader.read(&mut buf))
            .await
            .expect("server should close the connection")
            .unwrap_or(0);
        assert_eq!(n, 0, "unexpected data after goodbye: {:?}", &buf[..n]);
    }
}

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_welcome_then_prompt() {
    let server = TestServer::spawn().await;
    let mut client = server.connect_raw().await;

    let welcome = client.read_until(PROMPT).await;
    assert!(welcome.contains("user_1"));
    assert!(welcome.ends_with(PROMPT));

    server.wait_for_sessions(1).await;
    server.shutdown();
}

#[tokio::test]
async fn test_display_names_follow_accept_order() {
    let server = TestServer::spawn().await;

    let mut first = server.connect().await;
    let mut second = server.connect().await;

    assert!(first.command("whoami").await.contains("user_1"));
    assert!(second.command("whoami").await.contains("user_2"));

    server.shutdown();
}

// ============================================================================
// Command Tests
// ============================================================================

#[tokio::test]
async fn test_help_lists_seven_commands() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    let reply = client.command("help").await;
    for keyword in ["help", "status", "users", "ping", "time", "whoami", "uptime"] {
        assert!(reply.contains(keyword), "help reply is missing {keyword}");
    }
    assert!(reply.ends_with(PROMPT));

    server.shutdown();
}

#[tokio::test]
async fn test_unrecognized_keeps_connection_open() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    let reply = client.command("foobar").await;
    assert!(reply.contains("foobar"));

    let reply = client.command("uptime").await;
    assert!(reply.contains("[UPTIME]"));

    server.shutdown();
}

#[tokio::test]
async fn test_reply_failure_reported_and_connection_kept() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;
    server.wait_for_sessions(1).await;

    // Drop the session behind the handler's back so dispatch fails
    let session_id = server.registry.list_sessions().await[0].id;
    server
        .registry
        .remove(session_id, RemovalReason::ConnectionError)
        .await
        .unwrap();

    let reply = client.command("help").await;
    assert!(reply.starts_with("[ERRO]"), "unexpected reply: {reply}");
    assert!(reply.contains("session not found"));
    assert!(reply.ends_with(PROMPT));

    let reply = client.command("time").await;
    assert!(reply.starts_with("[ERRO]"), "unexpected reply: {reply}");
    assert!(reply.ends_with(PROMPT));

    server.shutdown();
}

#[tokio::test]
async fn test_commands_are_case_insensitive() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    assert!(client.command("STATUS").await.contains("OPERACIONAL"));

    server.shutdown();
}

#[tokio::test]
async fn test_ping_is_simulated() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    let reply = client.command("ping").await;
    assert!(reply.contains("Host: google.com"));

    let reply = client.command("ping example.org").await;
    assert!(reply.contains("Host: example.org"));

    server.shutdown();
}

#[tokio::test]
async fn test_time_matches_local_date() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    let before = Local::now().format("%d/%m/%Y").to_string();
    let reply = client.command("time").await;
    let after = Local::now().format("%d/%m/%Y").to_string();

    assert!(
        reply.contains(&format!("Data: {before}")) || reply.contains(&format!("Data: {after}")),
        "unexpected time reply: {reply}"
    );

    server.shutdown();
}

#[tokio::test]
async fn test_users_lists_every_connection() {
    let server = TestServer::spawn().await;
    let mut first = server.connect().await;
    let _second = server.connect().await;

    let reply = first.command("users").await;
    assert!(reply.contains("1. user_1"));
    assert!(reply.contains("2. user_2"));
    assert!(reply.contains("Total: 2"));

    server.shutdown();
}

// ============================================================================
// Quit Tests
// ============================================================================

#[tokio::test]
async fn test_quit_sends_one_goodbye_then_closes() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.command("help").await;
    client.send_line("quit").await;

    let goodbye = client.read_until(GOODBYE_TAIL).await;
    assert_eq!(goodbye.matches("ATE LOGO!").count(), 1);
    assert!(goodbye.contains("user_1"));
    assert!(!goodbye.contains(PROMPT));

    client.expect_eof().await;
    server.wait_for_sessions(0).await;

    server.shutdown();
}

#[tokio::test]
async fn test_every_quit_synonym_closes() {
    let server = TestServer::spawn().await;

    for synonym in ["quit", "EXIT", "Sair", "bye"] {
        let mut client = server.connect().await;
        client.send_line(synonym).await;
        client.read_until(GOODBYE_TAIL).await;
        client.expect_eof().await;
    }

    server.wait_for_sessions(0).await;
    server.shutdown();
}

#[tokio::test]
async fn test_quit_with_argument_is_not_a_quit() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    let reply = client.command("quit now").await;
    assert!(reply.contains("não reconhecido"));
    assert_eq!(server.registry.list_sessions().await.len(), 1);

    server.shutdown();
}

// ============================================================================
// Registry Bookkeeping Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_connections_tracked() {
    const N: usize = 8;
    let server = TestServer::spawn().await;

    let mut clients = Vec::new();
    for _ in 0..N {
        clients.push(server.connect().await);
    }

    let sessions = server.registry.list_sessions().await;
    assert_eq!(sessions.len(), N);
    let ids: HashSet<_> = sessions.iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), N);

    drop(clients);
    server.wait_for_sessions(0).await;

    server.shutdown();
}

#[tokio::test]
async fn test_command_counter_is_exact() {
    let server = TestServer::spawn().await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;

    for _ in 0..3 {
        a.command("time").await;
    }
    for _ in 0..4 {
        b.command("foobar").await;
    }
    b.send_line("quit").await;
    b.read_until(GOODBYE_TAIL).await;

    let stats = server.registry.stats().await.unwrap();
    assert_eq!(stats.commands_executed, 7);
    assert_eq!(stats.total_connections, 2);

    server.shutdown();
}

#[tokio::test]
async fn test_whoami_counts_itself() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.command("help").await;
    let reply = client.command("whoami").await;
    assert!(reply.contains("Comandos executados: 2"));

    server.shutdown();
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let cancel_token = CancellationToken::new();
    let server = Server::new(
        ServerConfig::default(),
        spawn_registry(),
        cancel_token.clone(),
    );

    let task = tokio::spawn(async move { server.serve(listener).await });
    cancel_token.cancel();

    let result = timeout(REPLY_TIMEOUT, task).await.expect("serve returns");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_bind_failure_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = ServerConfig {
        endpoint: Endpoint::new("127.0.0.1", port).unwrap(),
        ..ServerConfig::default()
    };
    let server = Server::new(config, spawn_registry(), CancellationToken::new());

    let err = server.run().await.unwrap_err();
    assert!(err.to_string().contains(&port.to_string()));
}
