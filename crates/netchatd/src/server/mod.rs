//! TCP listener for the chat server.
//!
//! The server:
//! - Binds `host:port` and clears the chat history once bound
//! - Spawns a `ChatSession` for each accepted connection
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │   ChatSession   │────▶│  RegistryHandle │
//! │ (per connection)│     │                 │
//! └───────┬─────────┘     └─────────────────┘
//!         │
//!         │ broadcast / append / replay
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │   Broadcaster   │     │  HistoryStore   │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Accept errors are logged and allow continued operation

mod connection;
mod session;

pub use connection::{
    client_reader, client_writer, read_line, shutdown, write_bytes, write_lines, BoxedRead,
    BoxedWrite, ClientReader, ClientSink, ClientWriter, ConnectionError,
};
pub use session::{ChatSession, SessionContext, SessionSummary};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use netchat_core::ConnectionId;

use crate::banner::Banner;
use crate::config::ServerConfig;
use crate::history::HistoryStore;
use crate::registry::RegistryHandle;

/// Chat server bound to a TCP address.
pub struct ChatServer {
    /// Bound listener
    listener: TcpListener,

    /// Address actually bound (resolves port 0)
    local_addr: SocketAddr,

    /// Collaborators cloned into every session
    ctx: SessionContext,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating connection IDs
    connection_counter: AtomicU64,
}

impl ChatServer {
    /// Binds the listener and prepares shared state.
    ///
    /// On a successful bind the chat history is cleared and the welcome
    /// banner is loaded. Neither step is fatal: a history file that cannot
    /// be cleared and a missing banner are logged and the server carries on.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated server configuration
    /// * `registry` - Handle to the client registry
    /// * `cancel_token` - Token for graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address cannot be bound.
    pub async fn bind(
        config: &ServerConfig,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                error: e.to_string(),
            })?;

        let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr,
            error: e.to_string(),
        })?;

        let history = HistoryStore::new(config.history_path.clone());
        if let Err(e) = history.truncate().await {
            warn!(error = %e, "Could not clear chat history");
        }

        let banner = Banner::load_or_default(&config.banner_path);

        let ctx = SessionContext::new(
            registry,
            history,
            banner,
            config.max_clients,
            config.write_timeout(),
            config.idle_timeout(),
        );

        Ok(Self {
            listener,
            local_addr,
            ctx,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop.
    ///
    /// Listens for connections until the cancellation token is triggered.
    /// This method does not return until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        info!(
            addr = %self.local_addr,
            max_clients = self.ctx.max_clients,
            history = %self.ctx.history.path().display(),
            "Chat server listening"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            self.handle_connection(stream, peer, ConnectionId::new(conn_num));
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        info!("Server stopped accepting connections");
        Ok(())
    }

    /// Spawns a session task for an accepted connection.
    fn handle_connection(&self, stream: TcpStream, peer: SocketAddr, conn_id: ConnectionId) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(conn = %conn_id, error = %e, "Could not disable Nagle");
        }

        let (reader, writer) = stream.into_split();
        let session = ChatSession::new(
            conn_id,
            peer.to_string(),
            client_reader(reader),
            client_writer(writer),
            self.ctx.clone(),
        );

        tokio::spawn(async move {
            let summary = session.run().await;
            debug!(
                conn = %summary.conn_id,
                joined = summary.joined,
                messages = summary.messages,
                "Session task finished"
            );
        });
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },
}
