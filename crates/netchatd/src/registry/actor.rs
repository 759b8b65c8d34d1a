//! Registry actor - owns all client state and processes commands.
//!
//! The RegistryActor is the single owner of the connection -> username
//! mapping and the claimed-name set. It receives commands via an mpsc
//! channel and answers each on its oneshot.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Response send failures are ignored (the requester went away)

use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use netchat_core::{ConnectionId, Username};

use super::commands::{RegisteredClient, RegistryCommand, RegistryError};

/// Default ceiling on simultaneously registered clients.
pub const MAX_CLIENTS: usize = 10;

// ============================================================================
// Registry Actor
// ============================================================================

/// The registry actor - owns all client state.
///
/// # Ownership
///
/// The actor owns:
/// - `clients`: entries keyed by `ConnectionId` (ordered, so snapshots
///   come out in accept order)
/// - `claimed`: lower-cased username -> owning connection
///
/// Both maps are updated together in every handler; they always hold the
/// same set of connections.
///
/// # Thread Safety
///
/// The actor runs in a single task and processes commands sequentially.
/// All state mutations happen within this single task.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Live entries
    clients: BTreeMap<ConnectionId, RegisteredClient>,

    /// Claimed names (lower-cased) and the connection holding each
    claimed: HashMap<String, ConnectionId>,

    /// Ceiling on `clients.len()`
    max_clients: usize,
}

impl RegistryActor {
    /// Creates a new registry actor.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `max_clients` - Ceiling on live entries
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>, max_clients: usize) -> Self {
        Self {
            receiver,
            clients: BTreeMap::new(),
            claimed: HashMap::new(),
            max_clients,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders dropped).
    /// This is the main entry point - call this in a spawned task.
    pub async fn run(mut self) {
        info!(max_clients = self.max_clients, "Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(clients = self.clients.len(), "Registry actor stopped");
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register { client, respond_to } => {
                let result = self.handle_register(*client);
                // Ignore send error - client may have dropped the receiver
                let _ = respond_to.send(result);
            }
            RegistryCommand::Unregister {
                conn_id,
                respond_to,
            } => {
                let result = self.handle_unregister(conn_id);
                let _ = respond_to.send(result);
            }
            RegistryCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.clients.values().cloned().collect());
            }
            RegistryCommand::Count { respond_to } => {
                let _ = respond_to.send(self.clients.len());
            }
            RegistryCommand::IsTaken {
                username,
                respond_to,
            } => {
                let _ = respond_to.send(self.claimed.contains_key(&username.key()));
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Handles a username claim.
    fn handle_register(&mut self, client: RegisteredClient) -> Result<(), RegistryError> {
        if self.clients.len() >= self.max_clients {
            warn!(
                conn = %client.conn_id,
                username = %client.username,
                current = self.clients.len(),
                max = self.max_clients,
                "Registry is full, rejecting registration"
            );
            return Err(RegistryError::RegistryFull {
                max: self.max_clients,
            });
        }

        if self.clients.contains_key(&client.conn_id) {
            warn!(conn = %client.conn_id, "Connection already registered");
            return Err(RegistryError::AlreadyRegistered(client.conn_id));
        }

        let key = client.username.key();
        if let Some(holder) = self.claimed.get(&key) {
            debug!(
                conn = %client.conn_id,
                username = %client.username,
                holder = %holder,
                "Username already claimed"
            );
            return Err(RegistryError::UsernameTaken(client.username));
        }

        let conn_id = client.conn_id;
        let username = client.username.clone();

        self.claimed.insert(key, conn_id);
        self.clients.insert(conn_id, client);

        info!(
            conn = %conn_id,
            username = %username,
            total_clients = self.clients.len(),
            max = self.max_clients,
            "Client registered"
        );

        Ok(())
    }

    /// Handles removal of a connection's entry.
    fn handle_unregister(&mut self, conn_id: ConnectionId) -> Option<Username> {
        let client = match self.clients.remove(&conn_id) {
            Some(client) => client,
            None => {
                debug!(conn = %conn_id, "Unregister for unknown connection, ignoring");
                return None;
            }
        };

        self.claimed.remove(&client.username.key());

        info!(
            conn = %conn_id,
            username = %client.username,
            remaining = self.clients.len(),
            max = self.max_clients,
            "Client unregistered"
        );

        Some(client.username)
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the number of registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Returns the number of claimed names.
    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }
}
