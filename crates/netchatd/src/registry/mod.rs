//! Client registry using Actor pattern.
//!
//! The registry is the single source of truth for who is online. It maps
//! each live connection to the username it claimed and keeps the set of
//! claimed names (case-insensitive) used for uniqueness checks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   ChatSession   │────▶│  RegistryActor  │◀────│   Broadcaster   │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!         │                       │                       │
//!         │   Register /          │                       │  Snapshot
//!         │   Unregister          │                       │  (copy, then
//!         ▼                       ▼                       ▼   write)
//!    claim / free name     BTreeMap<ConnectionId,    per-recipient
//!                          RegisteredClient>         deliveries
//! ```
//!
//! Because every operation is one actor step, the uniqueness check and the
//! insert are atomic, and no caller ever holds registry state while doing
//! network I/O.
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::mpsc;

mod actor;
mod commands;
mod handle;

pub use actor::{RegistryActor, MAX_CLIENTS};
pub use commands::{RegisteredClient, RegistryCommand, RegistryError};
pub use handle::RegistryHandle;

/// Channel buffer size
const COMMAND_BUFFER: usize = 100;

/// Spawn the registry actor and return a handle for interaction.
///
/// This function:
/// 1. Creates the command channel
/// 2. Spawns the RegistryActor on a tokio task
/// 3. Returns a RegistryHandle for client use
///
/// The actor stops once every handle has been dropped.
///
/// # Example
///
/// ```no_run
/// use netchatd::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry(10);
///     let online = handle.count().await;
/// }
/// ```
pub fn spawn_registry(max_clients: usize) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = RegistryActor::new(cmd_rx, max_clients);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx)
}
