//! Per-connection session state machine.
//!
//! Each accepted connection is driven by one `ChatSession` on its own task:
//!
//! ```text
//! Connecting ──▶ AwaitingUsername ──▶ Active ──▶ Disconnected
//!   capacity        prompt / read        join        unregister
//!   check,          validate / claim     replay      shutdown
//!   banner                               chat loop   leave (if joined)
//! ```
//!
//! Every edge goes through `SessionState::transition`, and teardown runs
//! exactly once after the machine reaches `Disconnected`.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Connection failures move the session to `Disconnected`
//! - Registry, history and delivery failures are logged, never propagated

use std::time::Duration;

use tracing::{debug, error, info, warn};

use netchat_core::{ChatMessage, ConnectionId, SessionState, Timestamp, Username};
use netchat_protocol::{ClientLine, ServerLine};

use super::connection::{
    read_line, shutdown, write_bytes, write_lines, ClientReader, ClientWriter, ConnectionError,
};
use crate::banner::Banner;
use crate::broadcast::Broadcaster;
use crate::history::{HistoryError, HistoryStore};
use crate::registry::{RegistryError, RegistryHandle};

// ============================================================================
// Shared Context
// ============================================================================

/// Process-wide collaborators handed to every session.
///
/// Built once at startup and cloned per connection.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: RegistryHandle,
    pub broadcaster: Broadcaster,
    pub history: HistoryStore,
    pub banner: Banner,
    pub max_clients: usize,
    pub write_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl SessionContext {
    /// Builds a context whose broadcaster shares `registry`.
    pub fn new(
        registry: RegistryHandle,
        history: HistoryStore,
        banner: Banner,
        max_clients: usize,
        write_timeout: Duration,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            broadcaster: Broadcaster::new(registry.clone(), write_timeout),
            registry,
            history,
            banner,
            max_clients,
            write_timeout,
            idle_timeout,
        }
    }
}

/// What a finished session did, for access logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub conn_id: ConnectionId,
    /// Name claimed during negotiation, if any
    pub username: Option<Username>,
    /// Whether the session reached `Active`
    pub joined: bool,
    /// Messages accepted and broadcast
    pub messages: u64,
}

// ============================================================================
// Chat Session
// ============================================================================

/// Drives one client connection from accept to teardown.
pub struct ChatSession {
    conn_id: ConnectionId,
    peer: String,
    reader: ClientReader,
    writer: ClientWriter,
    ctx: SessionContext,
    state: SessionState,
    username: Option<Username>,
    joined_at: Option<Timestamp>,
    message_count: u64,
}

impl ChatSession {
    /// Creates a session in the `Connecting` state.
    ///
    /// # Arguments
    ///
    /// * `conn_id` - Identity assigned by the listener
    /// * `peer` - Remote address, for logging
    /// * `reader` - Read half, owned by this session
    /// * `writer` - Shared write half
    /// * `ctx` - Registry, broadcaster, history and limits
    pub fn new(
        conn_id: ConnectionId,
        peer: impl Into<String>,
        reader: ClientReader,
        writer: ClientWriter,
        ctx: SessionContext,
    ) -> Self {
        Self {
            conn_id,
            peer: peer.into(),
            reader,
            writer,
            ctx,
            state: SessionState::Connecting,
            username: None,
            joined_at: None,
            message_count: 0,
        }
    }

    /// Runs the session to completion.
    pub async fn run(mut self) -> SessionSummary {
        info!(conn = %self.conn_id, peer = %self.peer, "Client connected");

        while !self.state.is_terminal() {
            let next = match self.state {
                SessionState::Connecting => self.on_connecting().await,
                SessionState::AwaitingUsername => self.on_awaiting_username().await,
                SessionState::Active => self.on_active().await,
                SessionState::Disconnected => break,
            };
            self.advance(next);
        }

        self.teardown().await
    }

    fn advance(&mut self, next: SessionState) {
        match self.state.transition(next) {
            Ok(state) => {
                debug!(conn = %self.conn_id, from = %self.state, to = %state, "Session transition");
                self.state = state;
            }
            Err(e) => {
                error!(conn = %self.conn_id, error = %e, "Illegal session transition");
                self.state = SessionState::Disconnected;
            }
        }
    }

    // ------------------------------------------------------------------------
    // States
    // ------------------------------------------------------------------------

    async fn on_connecting(&mut self) -> SessionState {
        let online = self.ctx.registry.count().await;
        if online >= self.ctx.max_clients {
            info!(
                conn = %self.conn_id,
                online,
                max = self.ctx.max_clients,
                "Server full, rejecting connection"
            );
            if let Err(e) = self.send(&[ServerLine::ServerFull]).await {
                self.note_connection_error(&e);
            }
            return SessionState::Disconnected;
        }

        let banner = self.ctx.banner.to_wire();
        match write_bytes(&self.writer, &banner, self.ctx.write_timeout).await {
            Ok(()) => SessionState::AwaitingUsername,
            Err(e) => {
                self.note_connection_error(&e);
                SessionState::Disconnected
            }
        }
    }

    async fn on_awaiting_username(&mut self) -> SessionState {
        loop {
            if let Err(e) = self.send(&[ServerLine::NamePrompt]).await {
                self.note_connection_error(&e);
                return SessionState::Disconnected;
            }

            let line = match read_line(&mut self.reader, self.ctx.idle_timeout).await {
                Ok(line) => line,
                Err(e) => {
                    self.note_connection_error(&e);
                    return SessionState::Disconnected;
                }
            };

            let username = match Username::parse(line.text().unwrap_or_default()) {
                Ok(username) => username,
                Err(e) => {
                    debug!(conn = %self.conn_id, error = %e, "Rejected username");
                    if let Err(e) = self.send(&[ServerLine::InvalidUsername]).await {
                        self.note_connection_error(&e);
                        return SessionState::Disconnected;
                    }
                    continue;
                }
            };

            if self.ctx.registry.is_taken(&username).await {
                debug!(conn = %self.conn_id, username = %username, "Username already claimed");
                if let Err(e) = self.send(&[ServerLine::UsernameTaken]).await {
                    self.note_connection_error(&e);
                    return SessionState::Disconnected;
                }
                continue;
            }

            let claimed = self
                .ctx
                .registry
                .register(self.conn_id, username.clone(), self.writer.clone())
                .await;

            match claimed {
                Ok(()) => {
                    self.username = Some(username);
                    return SessionState::Active;
                }
                Err(RegistryError::UsernameTaken(_)) => {
                    debug!(conn = %self.conn_id, username = %username, "Lost username race");
                    if let Err(e) = self.send(&[ServerLine::UsernameTaken]).await {
                        self.note_connection_error(&e);
                        return SessionState::Disconnected;
                    }
                }
                Err(RegistryError::RegistryFull { max }) => {
                    info!(conn = %self.conn_id, max, "Server filled up during negotiation");
                    if let Err(e) = self.send(&[ServerLine::ServerFull]).await {
                        self.note_connection_error(&e);
                    }
                    return SessionState::Disconnected;
                }
                Err(e) => {
                    error!(conn = %self.conn_id, error = %e, "Failed to register client");
                    return SessionState::Disconnected;
                }
            }
        }
    }

    async fn on_active(&mut self) -> SessionState {
        let Some(username) = self.username.clone() else {
            error!(conn = %self.conn_id, "Active session without a username");
            return SessionState::Disconnected;
        };

        self.joined_at = Some(Timestamp::now());
        info!(conn = %self.conn_id, username = %username, peer = %self.peer, "Client joined");

        self.ctx.broadcaster.announce_join(self.conn_id, &username).await;

        match self.ctx.history.replay(&self.writer, self.ctx.write_timeout).await {
            Ok(lines) => debug!(conn = %self.conn_id, lines, "History replayed"),
            Err(HistoryError::Delivery(e)) => {
                self.note_connection_error(&e);
                return SessionState::Disconnected;
            }
            Err(e) => warn!(conn = %self.conn_id, error = %e, "Could not replay chat history"),
        }

        loop {
            let prompted_at = Timestamp::now();
            if let Err(e) = self.send(&[ServerLine::prompt(prompted_at, &username)]).await {
                self.note_connection_error(&e);
                return SessionState::Disconnected;
            }

            let text = match read_line(&mut self.reader, self.ctx.idle_timeout).await {
                Ok(ClientLine::Blank) => continue,
                Ok(ClientLine::Text(text)) => text,
                Err(e) => {
                    self.note_connection_error(&e);
                    return SessionState::Disconnected;
                }
            };

            let message = match ChatMessage::new(username.clone(), prompted_at, text) {
                Ok(message) => message,
                Err(e) => {
                    debug!(conn = %self.conn_id, error = %e, "Dropped unsendable message");
                    continue;
                }
            };

            let rendered = message.render();
            let report = self.ctx.broadcaster.broadcast(self.conn_id, &rendered).await;

            if let Err(e) = self.ctx.history.append(&rendered).await {
                warn!(conn = %self.conn_id, error = %e, "Message not recorded in history");
            }

            self.message_count += 1;
            debug!(
                conn = %self.conn_id,
                username = %username,
                recipients = report.attempted(),
                delivered = report.delivered,
                failed = report.failed,
                "Message relayed"
            );
        }
    }

    async fn teardown(self) -> SessionSummary {
        let freed = self.ctx.registry.unregister(self.conn_id).await;

        if let Err(e) = shutdown(&self.writer, self.ctx.write_timeout).await {
            debug!(conn = %self.conn_id, error = %e, "Connection shutdown failed");
        }

        let joined = self.joined_at.is_some();
        if joined {
            if let Some(username) = freed.as_ref().or(self.username.as_ref()) {
                self.ctx.broadcaster.announce_leave(self.conn_id, username).await;
                info!(
                    conn = %self.conn_id,
                    username = %username,
                    messages = self.message_count,
                    "Client left"
                );
            }
        }

        info!(conn = %self.conn_id, peer = %self.peer, "Client disconnected");

        SessionSummary {
            conn_id: self.conn_id,
            username: self.username,
            joined,
            messages: self.message_count,
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn send(&self, lines: &[ServerLine]) -> Result<(), ConnectionError> {
        write_lines(&self.writer, lines, self.ctx.write_timeout).await
    }

    fn note_connection_error(&self, e: &ConnectionError) {
        if e.is_disconnect() {
            debug!(conn = %self.conn_id, "Peer closed connection");
            return;
        }
        match e {
            ConnectionError::Timeout => info!(conn = %self.conn_id, "Idle timeout"),
            ConnectionError::Closed => {
                info!(conn = %self.conn_id, "Connection dropped after a failed delivery")
            }
            _ => warn!(conn = %self.conn_id, error = %e, "Connection error"),
        }
    }
}
