//! Domain-specific error types following panic-free policy.

use crate::SessionState;
use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Candidate username failed validation
    #[error("Invalid username '{value}': {reason}")]
    InvalidUsername { value: String, reason: String },

    /// Message text contained a line break
    #[error("Message text must be a single line")]
    MultilineMessage,

    /// Session state machine was asked to take an illegal edge
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
