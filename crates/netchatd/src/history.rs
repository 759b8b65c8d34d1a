//! Append-only chat transcript.
//!
//! The transcript is a flat file holding one rendered message per line,
//! in the order messages were accepted. It is emptied once when the server
//! starts, appended to after every accepted message, and replayed in full
//! to each newly joined client.
//!
//! There is no in-process lock: every call opens, uses and closes the file
//! independently, and concurrent appends are ordered by the file system.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use netchat_protocol::ServerLine;

use crate::server::{write_lines, ClientWriter, ConnectionError};

/// Handle to the transcript file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Creates a store backed by `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the transcript path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file if needed and discards its contents.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Io` if the file cannot be opened for writing.
    pub async fn truncate(&self) -> Result<(), HistoryError> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Chat history cleared");
        Ok(())
    }

    /// Appends one rendered line.
    ///
    /// # Errors
    ///
    /// - `HistoryError::InvalidLine` if `line` contains a line break
    /// - `HistoryError::Io` if the file cannot be opened or written
    pub async fn append(&self, line: &str) -> Result<(), HistoryError> {
        if line.contains(['\n', '\r']) {
            return Err(HistoryError::InvalidLine);
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        file.write_all(record.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        Ok(())
    }

    /// Streams every stored line to `writer`, in file order.
    ///
    /// A missing file is an empty history. Returns the number of lines sent.
    ///
    /// # Errors
    ///
    /// - `HistoryError::Io` if the file exists but cannot be read
    /// - `HistoryError::Delivery` if writing to the client fails
    pub async fn replay(
        &self,
        writer: &ClientWriter,
        deadline: Duration,
    ) -> Result<usize, HistoryError> {
        let file = match self.open_for_read().await? {
            Some(file) => file,
            None => return Ok(0),
        };

        let mut lines = BufReader::new(file).lines();
        let mut sent = 0;

        while let Some(line) = lines.next_line().await.map_err(|e| self.io_error(e))? {
            write_lines(writer, &[ServerLine::history(line)], deadline).await?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Reads the whole transcript into memory.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Io` if the file exists but cannot be read.
    pub async fn lines(&self) -> Result<Vec<String>, HistoryError> {
        let file = match self.open_for_read().await? {
            Some(file) => file,
            None => return Ok(Vec::new()),
        };

        let mut lines = BufReader::new(file).lines();
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await.map_err(|e| self.io_error(e))? {
            out.push(line);
        }
        Ok(out)
    }

    async fn open_for_read(&self) -> Result<Option<File>, HistoryError> {
        match File::open(&self.path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No chat history file");
                Ok(None)
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, error: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            error: error.to_string(),
        }
    }
}

/// Errors that can occur while reading or writing the transcript.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History file {path}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("History lines must not contain line breaks")]
    InvalidLine,

    #[error("Failed to deliver history: {0}")]
    Delivery(#[from] ConnectionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::client_writer;
    use tokio::io::AsyncReadExt;

    const DEADLINE: Duration = Duration::from_secs(1);

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("savedChat.txt"))
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append("[2024-01-01 10:00:00][alice]: one").await.unwrap();
        store.append("[2024-01-01 10:00:01][bob]: two").await.unwrap();
        store.append("[2024-01-01 10:00:02][alice]: three").await.unwrap();

        assert_eq!(
            store.lines().await.unwrap(),
            vec![
                "[2024-01-01 10:00:00][alice]: one",
                "[2024-01-01 10:00:01][bob]: two",
                "[2024-01-01 10:00:02][alice]: three",
            ]
        );
    }

    #[tokio::test]
    async fn test_truncate_discards_prior_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append("old line").await.unwrap();
        store.truncate().await.unwrap();

        assert!(store.lines().await.unwrap().is_empty());
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.lines().await.unwrap().is_empty());

        let (ours, _theirs) = tokio::io::duplex(64);
        let sent = store.replay(&client_writer(ours), DEADLINE).await.unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn test_replay_streams_lines_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append("[2024-01-01 10:00:00][alice]: hi").await.unwrap();
        store.append("[2024-01-01 10:00:05][bob]: hey").await.unwrap();

        let (ours, mut theirs) = tokio::io::duplex(1024);
        let writer = client_writer(ours);
        let sent = store.replay(&writer, DEADLINE).await.unwrap();
        drop(writer);

        let mut out = String::new();
        theirs.read_to_string(&mut out).await.unwrap();
        assert_eq!(sent, 2);
        assert_eq!(
            out,
            "[2024-01-01 10:00:00][alice]: hi\n[2024-01-01 10:00:05][bob]: hey\n"
        );
    }

    #[tokio::test]
    async fn test_append_rejects_multiline() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let err = store.append("one\ntwo").await.unwrap_err();
        assert!(matches!(err, HistoryError::InvalidLine));
        assert!(store.lines().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("missing-dir").join("savedChat.txt"));

        let err = store.append("line").await.unwrap_err();
        assert!(matches!(err, HistoryError::Io { .. }));
        assert!(err.to_string().contains("missing-dir"));
    }

    #[tokio::test]
    async fn test_concurrent_appends_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..20 {
            let store = store.clone();
            tasks.spawn(async move { store.append(&format!("line {i}")).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let mut lines = store.lines().await.unwrap();
        lines.sort();
        assert_eq!(lines.len(), 20);
        assert!(lines.iter().all(|l| l.starts_with("line ")));
    }
}
