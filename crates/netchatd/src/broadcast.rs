//! Fan-out of messages to every registered client except the sender.
//!
//! Each call takes one registry snapshot and then writes to every
//! recipient concurrently, one task per recipient, each bounded by the
//! write deadline. A failed delivery is logged and counted; it never stops
//! delivery to the others and never touches the recipient's registry entry
//! (that recipient's own session notices the broken connection on its next
//! read or write and tears itself down).
//!
//! `broadcast` returns only after every delivery has finished, so a session
//! that awaits it before reading its next line gets per-sender ordering for
//! free.

use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use netchat_core::{ConnectionId, Timestamp, Username};
use netchat_protocol::{join_announcement, leave_announcement, ServerLine};

use crate::registry::RegistryHandle;
use crate::server::write_lines;

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients that received the message and their refreshed prompt
    pub delivered: usize,
    /// Recipients whose write failed or timed out
    pub failed: usize,
}

impl BroadcastReport {
    /// Total recipients attempted.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Delivers text to all registered clients but one.
#[derive(Clone)]
pub struct Broadcaster {
    registry: RegistryHandle,
    write_timeout: Duration,
}

impl Broadcaster {
    /// Creates a broadcaster over `registry`.
    ///
    /// # Arguments
    ///
    /// * `registry` - Source of recipient snapshots
    /// * `write_timeout` - Deadline for each recipient's delivery
    pub fn new(registry: RegistryHandle, write_timeout: Duration) -> Self {
        Self {
            registry,
            write_timeout,
        }
    }

    /// Sends `text` to every registered client except `exclude`, each
    /// followed by a freshly stamped prompt for that recipient.
    pub async fn broadcast(&self, exclude: ConnectionId, text: &str) -> BroadcastReport {
        let recipients = self.registry.snapshot().await;
        let mut deliveries = JoinSet::new();

        for client in recipients.into_iter().filter(|c| c.conn_id != exclude) {
            let lines = [
                ServerLine::relay(text),
                ServerLine::prompt(Timestamp::now(), &client.username),
            ];
            let deadline = self.write_timeout;

            deliveries.spawn(async move {
                let result = write_lines(&client.writer, &lines, deadline).await;
                (client.conn_id, client.username, result)
            });
        }

        let mut report = BroadcastReport::default();

        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok((_, _, Ok(()))) => report.delivered += 1,
                Ok((conn_id, username, Err(e))) => {
                    warn!(
                        conn = %conn_id,
                        username = %username,
                        error = %e,
                        "Failed to deliver broadcast"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "Broadcast delivery task failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            sender = %exclude,
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast complete"
        );

        report
    }

    /// Announces that `username` joined, to everyone but `conn_id`.
    pub async fn announce_join(
        &self,
        conn_id: ConnectionId,
        username: &Username,
    ) -> BroadcastReport {
        self.broadcast(conn_id, &join_announcement(username)).await
    }

    /// Announces that `username` left, to everyone but `conn_id`.
    pub async fn announce_leave(
        &self,
        conn_id: ConnectionId,
        username: &Username,
    ) -> BroadcastReport {
        self.broadcast(conn_id, &leave_announcement(username)).await
    }
}
