//! Welcome banner shown to every new connection.
//!
//! The banner is an opaque byte blob (usually ASCII art) read once at
//! startup. A missing or unreadable asset degrades to a one-line greeting.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use netchat_protocol::DEFAULT_GREETING;

/// Welcome banner bytes, cheap to clone into every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    bytes: Arc<[u8]>,
}

impl Banner {
    /// Wraps raw banner bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Reads the banner asset.
    ///
    /// # Errors
    ///
    /// Returns `BannerError::Read` if the file cannot be read.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, BannerError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| BannerError::Read {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Reads the banner asset, falling back to the default greeting.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::read(path.as_ref()) {
            Ok(banner) => {
                info!(
                    path = %path.as_ref().display(),
                    bytes = banner.bytes.len(),
                    "Welcome banner loaded"
                );
                banner
            }
            Err(e) => {
                warn!(error = %e, "Could not load welcome banner, using default greeting");
                Self::default()
            }
        }
    }

    /// Returns the bytes to send, always ending with a newline so the
    /// name prompt starts on its own line.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = self.bytes.to_vec();
        if out.last() != Some(&b'\n') {
            out.push(b'\n');
        }
        out
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Banner {
    fn default() -> Self {
        Self::from_bytes(DEFAULT_GREETING.as_bytes())
    }
}

/// Errors that can occur while loading the banner.
#[derive(Debug, Error)]
pub enum BannerError {
    #[error("Could not read welcome banner {path}: {error}")]
    Read { path: String, error: String },
}
