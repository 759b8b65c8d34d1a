//! Shared harness for the chat server integration tests.
//!
//! Tests CAN use `.unwrap()` and `.expect()`; the panic-free policy applies
//! to production code only.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use netchatd::config::ServerConfig;
use netchatd::registry::{spawn_registry, RegistryHandle};
use netchatd::server::ChatServer;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for expected output
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// How long "nothing arrives" is observed for
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Banner asset written for every test server
pub const BANNER: &str = "WELCOME TO THE TEST CHAT";

pub const NAME_PROMPT: &str = "[ENTER YOUR NAME]: ";
pub const INVALID_NOTICE: &str = "Username must be alphanumeric and max 20 characters!\n";
pub const TAKEN_NOTICE: &str = "This username is already taken!\n";
pub const FULL_NOTICE: &str = "Server is full. Please try again later.\n";

// ============================================================================
// Test Server
// ============================================================================

/// Chat server running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: RegistryHandle,
    pub history_path: PathBuf,
    cancel_token: CancellationToken,
    _temp_dir: TempDir, // Keep alive for RAII cleanup
}

impl TestServer {
    /// Spawns a server with the default ceiling.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns a server after letting the caller adjust its configuration.
    pub async fn spawn_with(adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let banner_path = temp_dir.path().join("pingoin.txt");
        std::fs::write(&banner_path, BANNER).expect("write banner");

        let mut config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            history_path: temp_dir.path().join("savedChat.txt"),
            banner_path,
            ..ServerConfig::default()
        };
        adjust(&mut config);

        let registry = spawn_registry(config.max_clients);
        let cancel_token = CancellationToken::new();
        let server = ChatServer::bind(&config, registry.clone(), cancel_token.clone())
            .await
            .expect("bind test server");
        let addr = server.local_addr();

        tokio::spawn(async move {
            let _ = server.run().await;
        });

        Self {
            addr,
            registry,
            history_path: config.history_path,
            cancel_token,
            _temp_dir: temp_dir,
        }
    }

    /// Opens a raw connection.
    pub async fn connect(&self) -> TestClient {
        TestClient::new(TcpStream::connect(self.addr).await.expect("connect"))
    }

    /// Connects and claims `name`, returning once the first live prompt arrives.
    pub async fn join(&self, name: &str) -> TestClient {
        let mut client = self.connect().await;
        client.claim(name).await;
        client
    }

    /// Reads the transcript file.
    pub fn history(&self) -> Vec<String> {
        std::fs::read_to_string(&self.history_path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

// ============================================================================
// Test Client
// ============================================================================

/// Line-chat client that reads by substring, since prompts carry no newline.
pub struct TestClient {
    stream: TcpStream,
    pending: String,
}

impl TestClient {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            pending: String::new(),
        }
    }

    /// Sends `line` followed by `\n`.
    pub async fn send_line(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    pub async fn send_raw(&mut self, data: &[u8]) {
        self.stream.write_all(data).await.expect("write to server");
        self.stream.flush().await.expect("flush to server");
    }

    /// Reads until `needle` has arrived and returns everything up to and
    /// including it. Output after the needle stays buffered.
    pub async fn expect(&mut self, needle: &str) -> String {
        self.expect_any(&[needle]).await.1
    }

    /// Reads until any of `needles` arrives; returns which one and the text
    /// consumed through it.
    pub async fn expect_any(&mut self, needles: &[&str]) -> (usize, String) {
        loop {
            let hit = needles
                .iter()
                .enumerate()
                .filter_map(|(i, n)| self.pending.find(n).map(|at| (at + n.len(), i)))
                .min();

            if let Some((end, which)) = hit {
                let consumed: String = self.pending.drain(..end).collect();
                return (which, consumed);
            }

            let n = self.fill().await;
            assert!(
                n > 0,
                "connection closed while waiting for {needles:?}; got {:?}",
                self.pending
            );
        }
    }

    /// Answers the name prompt with `name` and waits for the live prompt.
    pub async fn claim(&mut self, name: &str) -> String {
        self.expect(NAME_PROMPT).await;
        self.send_line(name).await;
        self.expect(&format!("][{name}]: ")).await
    }

    /// Reads until the server closes the connection.
    pub async fn read_to_close(&mut self) -> String {
        while self.fill().await > 0 {}
        std::mem::take(&mut self.pending)
    }

    /// Asserts that nothing more arrives for a short while.
    pub async fn assert_silent(&mut self) {
        let mut buf = [0u8; 1024];
        match tokio::time::timeout(QUIET_PERIOD, self.stream.read(&mut buf)).await {
            Err(_) => {}
            Ok(Ok(n)) => panic!(
                "unexpected output: {:?}",
                String::from_utf8_lossy(&buf[..n])
            ),
            Ok(Err(e)) => panic!("read failed: {e}"),
        }
        assert!(self.pending.is_empty(), "unexpected output: {:?}", self.pending);
    }

    async fn fill(&mut self) -> usize {
        let mut buf = [0u8; 4096];
        let n = tokio::time::timeout(READ_TIMEOUT, self.stream.read(&mut buf))
            .await
            .unwrap_or_else(|_| panic!("timed out; buffered so far: {:?}", self.pending))
            .expect("read from server");
        self.pending.push_str(&String::from_utf8_lossy(&buf[..n]));
        n
    }
}

/// Polls `check` until it holds or the read timeout passes.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < READ_TIMEOUT {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within {READ_TIMEOUT:?}");
}
