//! netchat Core - Shared domain types for the chat server
//!
//! This crate provides the domain types shared between the wire
//! protocol (netchat-protocol) and the server (netchatd).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod message;
pub mod session;
pub mod username;

// Re-exports for convenience
pub use error::{DomainError, DomainResult};
pub use message::{ChatMessage, Timestamp, TIMESTAMP_FORMAT};
pub use session::{ConnectionId, SessionState};
pub use username::{is_valid_username, Username, MAX_USERNAME_LEN};
