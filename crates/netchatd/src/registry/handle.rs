//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` provides a cheap-to-clone interface for sending
//! commands to the registry actor. It is the only way sessions and the
//! broadcaster reach registry state; the maps themselves never leave the
//! actor task.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors on mutations are mapped to `RegistryError::ChannelClosed`
//! - Queries degrade to empty / zero / false when the actor is gone

use tokio::sync::{mpsc, oneshot};

use netchat_core::{ConnectionId, Username};

use super::commands::{RegisteredClient, RegistryCommand, RegistryError};
use crate::server::ClientWriter;

// ============================================================================
// Registry Handle
// ============================================================================

/// Handle for interacting with the registry actor.
///
/// This is a cheap-to-clone handle that can be shared across tasks.
/// All methods are async and communicate with the actor via channels.
///
/// # Usage
///
/// ```ignore
/// let handle = registry_handle.clone();
///
/// handle.register(conn_id, username, writer).await?;
/// let recipients = handle.snapshot().await;
/// let freed = handle.unregister(conn_id).await;
/// ```
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create a new registry handle.
    ///
    /// # Arguments
    ///
    /// * `sender` - The command channel sender for communicating with the actor
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Claim `username` for `conn_id`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::RegistryFull` if the registry is at its ceiling
    /// - `RegistryError::UsernameTaken` if the name is claimed (any case)
    /// - `RegistryError::AlreadyRegistered` if the connection holds an entry
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn register(
        &self,
        conn_id: ConnectionId,
        username: Username,
        writer: ClientWriter,
    ) -> Result<(), RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Register {
                client: Box::new(RegisteredClient {
                    conn_id,
                    username,
                    writer,
                }),
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Remove `conn_id`'s entry.
    ///
    /// Returns the freed username, or `None` if the connection had no
    /// entry or the actor is gone. Safe to call more than once.
    pub async fn unregister(&self, conn_id: ConnectionId) -> Option<Username> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Unregister {
                conn_id,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Get a point-in-time copy of all entries, in accept order.
    ///
    /// Returns an empty vector if no clients are registered or if
    /// communication with the actor fails.
    pub async fn snapshot(&self) -> Vec<RegisteredClient> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Snapshot { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Get the number of registered clients (0 if the actor is gone).
    pub async fn count(&self) -> usize {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Count { respond_to: tx })
            .await
            .is_err()
        {
            return 0;
        }

        rx.await.unwrap_or_default()
    }

    /// Check whether `username` is claimed, ignoring case.
    ///
    /// Advisory only: the authoritative check is the one `register` makes.
    pub async fn is_taken(&self, username: &Username) -> bool {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::IsTaken {
                username: username.clone(),
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return false;
        }

        rx.await.unwrap_or(false)
    }
}
