//! Registry actor commands, errors, and entries.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `RegisteredClient`: A live entry, as returned by snapshots
//!
//! All types are designed for async message passing and follow the panic-free policy.

use netchat_core::{ConnectionId, Username};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::server::ClientWriter;

// ============================================================================
// Registry Entries
// ============================================================================

/// A registered client: connection identity, claimed name and a handle
/// to its write half.
///
/// Cloning is cheap (the writer is shared), which is what lets a snapshot
/// outlive the actor step that produced it.
#[derive(Clone)]
pub struct RegisteredClient {
    /// Connection the entry belongs to
    pub conn_id: ConnectionId,
    /// Name the session claimed
    pub username: Username,
    /// Shared write half of the connection
    pub writer: ClientWriter,
}

impl std::fmt::Debug for RegisteredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredClient")
            .field("conn_id", &self.conn_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command uses a oneshot channel for the response, enabling
/// request-response patterns in async code without blocking.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Claim a username for a connection.
    ///
    /// Capacity, name and connection checks run in the same actor step as
    /// the insert, so two sessions racing for one name cannot both win.
    ///
    /// # Errors
    /// - `RegistryError::RegistryFull` if at maximum capacity
    /// - `RegistryError::UsernameTaken` if the name is claimed (case-insensitive)
    /// - `RegistryError::AlreadyRegistered` if the connection holds an entry
    Register {
        /// The entry to insert (boxed to reduce enum size variance)
        client: Box<RegisteredClient>,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<(), RegistryError>>,
    },

    /// Remove a connection's entry and free its name.
    ///
    /// Responds with the freed username, or `None` if the connection had
    /// no entry (already removed or never registered).
    Unregister {
        /// Connection to remove
        conn_id: ConnectionId,
        /// Channel to send the freed username
        respond_to: oneshot::Sender<Option<Username>>,
    },

    /// Point-in-time copy of all entries, in accept order.
    Snapshot {
        /// Channel to send the entries
        respond_to: oneshot::Sender<Vec<RegisteredClient>>,
    },

    /// Number of live entries.
    Count {
        /// Channel to send the count
        respond_to: oneshot::Sender<usize>,
    },

    /// Whether a name is currently claimed (case-insensitive).
    IsTaken {
        /// Name to check
        username: Username,
        /// Channel to send the answer
        respond_to: oneshot::Sender<bool>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
///
/// Uses `thiserror` for ergonomic error handling and Display implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry has reached its client ceiling.
    #[error("registry is full (max: {max} clients)")]
    RegistryFull {
        /// Maximum number of clients allowed
        max: usize,
    },

    /// Another live session holds this name.
    #[error("username already taken: {0}")]
    UsernameTaken(Username),

    /// The connection already holds an entry.
    #[error("connection already registered: {0}")]
    AlreadyRegistered(ConnectionId),

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::RegistryFull { max: 10 };
        assert_eq!(err.to_string(), "registry is full (max: 10 clients)");

        let err = RegistryError::UsernameTaken(Username::parse("alice").unwrap());
        assert_eq!(err.to_string(), "username already taken: alice");

        let err = RegistryError::AlreadyRegistered(ConnectionId::new(7));
        assert_eq!(err.to_string(), "connection already registered: conn-7");

        let err = RegistryError::ChannelClosed;
        assert_eq!(err.to_string(), "response channel closed");
    }

    #[tokio::test]
    async fn test_command_oneshot_pattern() {
        let (tx, rx) = oneshot::channel::<Result<(), RegistryError>>();

        tokio::spawn(async move {
            tx.send(Ok(())).ok();
        });

        let result = rx.await;
        assert!(result.is_ok());
        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_command_channel_closed_error() {
        let (tx, rx) = oneshot::channel::<Option<Username>>();
        drop(tx);
        assert!(rx.await.is_err());
    }
}
