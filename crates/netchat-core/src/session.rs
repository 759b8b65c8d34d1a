//! Connection identity and the per-connection session state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

// ============================================================================
// Connection Identity
// ============================================================================

/// Identity of an accepted connection.
///
/// Assigned by the listener from a monotonically increasing counter, so
/// ordering by `ConnectionId` is accept order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection ID from a raw counter value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle state of a client session.
///
/// ```text
/// Connecting ──▶ AwaitingUsername ──▶ Active ──▶ Disconnected
///      │                 │                            ▲
///      └─────────────────┴────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepted; capacity check and banner pending.
    #[default]
    Connecting,

    /// Banner sent; negotiating a username.
    AwaitingUsername,

    /// Registered; exchanging messages.
    Active,

    /// Torn down. Terminal.
    Disconnected,
}

impl SessionState {
    /// Returns true if the machine may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, next),
            (Connecting, AwaitingUsername)
                | (Connecting, Disconnected)
                | (AwaitingUsername, Active)
                | (AwaitingUsername, Disconnected)
                | (Active, Disconnected)
        )
    }

    /// Validates and returns the next state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` for an illegal edge.
    pub fn transition(self, next: SessionState) -> DomainResult<SessionState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns true once the session can no longer change state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingUsername => write!(f, "AwaitingUsername"),
            Self::Active => write!(f, "Active"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}
