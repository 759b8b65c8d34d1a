//! Username validation and the claimed-name newtype.
//!
//! A username is 1-20 ASCII alphanumeric characters. Uniqueness is
//! case-insensitive: `Alice` and `alice` claim the same slot, so the
//! registry keys on [`Username::key`] while announcements keep the name
//! as the client typed it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Maximum username length in characters.
pub const MAX_USERNAME_LEN: usize = 20;

/// Returns true if `candidate` is an acceptable username.
///
/// Pure predicate: no trimming, no registry lookup. Callers trim the raw
/// input line and check uniqueness separately.
#[must_use]
pub fn is_valid_username(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= MAX_USERNAME_LEN
        && candidate.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// A validated username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validates and wraps a candidate username.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUsername` if the candidate is empty,
    /// longer than [`MAX_USERNAME_LEN`], or contains anything other than
    /// ASCII letters and digits.
    pub fn parse(candidate: &str) -> DomainResult<Self> {
        if candidate.is_empty() {
            return Err(invalid(candidate, "must not be empty"));
        }
        if candidate.len() > MAX_USERNAME_LEN {
            return Err(invalid(
                candidate,
                &format!("longer than {MAX_USERNAME_LEN} characters"),
            ));
        }
        if !is_valid_username(candidate) {
            return Err(invalid(candidate, "must be ASCII alphanumeric"));
        }
        Ok(Self(candidate.to_string()))
    }

    /// Returns the name as typed.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lower-cased form used for uniqueness checks.
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

fn invalid(value: &str, reason: &str) -> DomainError {
    DomainError::InvalidUsername {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(name: Username) -> Self {
        name.0
    }
}
