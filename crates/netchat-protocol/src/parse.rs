//! Classifying raw lines read from a client.
//!
//! Clients are typically `nc`, so input arrives as raw bytes terminated by
//! `\n` (sometimes `\r\n`) and is not guaranteed to be UTF-8.

/// A line received from a client, with the terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLine {
    /// Nothing but whitespace; ignored and re-prompted.
    Blank,

    /// Trimmed, non-empty text.
    Text(String),
}

impl ClientLine {
    /// Decodes and trims a raw line.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, and surrounding
    /// whitespace (including the `\r\n` terminator) is removed.
    pub fn parse(raw: &[u8]) -> Self {
        let decoded = String::from_utf8_lossy(raw);
        let trimmed = decoded.trim();
        if trimmed.is_empty() {
            Self::Blank
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// Returns the text, or `None` for a blank line.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Blank => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Returns true for a blank line.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }
}
