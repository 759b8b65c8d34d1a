//! Chat messages and their timestamps.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::Username;

/// Wire format for timestamps: `YYYY-MM-DD HH:MM:SS`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock time truncated to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Captures the current local time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_local(Local::now())
    }

    /// Wraps a local time, dropping sub-second precision.
    pub fn from_local(time: DateTime<Local>) -> Self {
        Self::from_naive(time.naive_local())
    }

    /// Wraps a naive wall-clock time, dropping sub-second precision.
    pub fn from_naive(time: NaiveDateTime) -> Self {
        Self(time.with_nanosecond(0).unwrap_or(time))
    }

    /// Returns the underlying wall-clock time.
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

/// A single accepted chat message.
///
/// Text is one line: the session strips the line terminator and
/// surrounding whitespace before constructing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Username,
    pub sent_at: Timestamp,
    text: String,
}

impl ChatMessage {
    /// Creates a message.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MultilineMessage` if `text` contains `\n` or `\r`.
    pub fn new(sender: Username, sent_at: Timestamp, text: impl Into<String>) -> DomainResult<Self> {
        let text = text.into();
        if text.contains(['\n', '\r']) {
            return Err(DomainError::MultilineMessage);
        }
        Ok(Self {
            sender,
            sent_at,
            text,
        })
    }

    /// Returns the message body.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Renders the message as it is broadcast and persisted:
    /// `[YYYY-MM-DD HH:MM:SS][username]: text`.
    #[must_use]
    pub fn render(&self) -> String {
        format!("[{}][{}]: {}", self.sent_at, self.sender, self.text)
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
