//! Connection plumbing shared by sessions and the broadcaster.
//!
//! A connection is split at accept time:
//! - the read half stays with its `ChatSession` (`ClientReader`)
//! - the write half is wrapped in a shared `ClientWriter` so the session
//!   and the broadcaster can both write to it without interleaving
//!   partial lines
//!
//! Every write is bounded by a deadline, and the deadline includes the wait
//! for the writer's lock, so concurrent deliveries to one stalled client
//! each give up after at most one deadline. A writer whose write failed or
//! timed out is marked failed: its buffer may hold half a line, so every
//! later write is refused instead of appending to it.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - I/O failures surface as `ConnectionError`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use netchat_protocol::{ClientLine, ServerLine};

/// Boxed write half of a client connection.
pub type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Boxed read half of a client connection.
///
/// `Sync` so that a session can hold `&self` across an await and still be
/// spawned onto the multi-threaded runtime.
pub type BoxedRead = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Shared writer handle for a client connection.
pub type ClientWriter = Arc<ClientSink>;

/// Buffered reader owned by a single session.
pub type ClientReader = BufReader<BoxedRead>;

/// Write half of a client connection plus its failure flag.
///
/// The flag lives outside the lock so a failed writer is refused without
/// queueing behind whoever holds it.
pub struct ClientSink {
    failed: AtomicBool,
    inner: Mutex<BufWriter<BoxedWrite>>,
}

impl ClientSink {
    fn new(writer: BoxedWrite) -> Self {
        Self {
            failed: AtomicBool::new(false),
            inner: Mutex::new(BufWriter::new(writer)),
        }
    }

    /// Returns true once a write has failed or timed out, or after shutdown.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }
}

/// Wraps any write half into a shareable `ClientWriter`.
pub fn client_writer<W>(writer: W) -> ClientWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(ClientSink::new(Box::new(writer)))
}

/// Wraps any read half into a `ClientReader`.
pub fn client_reader<R>(reader: R) -> ClientReader
where
    R: AsyncRead + Send + Sync + Unpin + 'static,
{
    BufReader::new(Box::new(reader) as BoxedRead)
}

/// Writes raw bytes and flushes, within `deadline`.
///
/// The deadline covers waiting for the lock as well as the write itself.
/// Any failure marks the writer failed.
///
/// # Errors
///
/// - `ConnectionError::Closed` if the writer already failed
/// - `ConnectionError::Io` if the write or flush fails
/// - `ConnectionError::WriteTimeout` if the deadline passes first
pub async fn write_bytes(
    writer: &ClientWriter,
    bytes: &[u8],
    deadline: Duration,
) -> Result<(), ConnectionError> {
    if writer.is_failed() {
        return Err(ConnectionError::Closed);
    }

    let attempt = timeout(deadline, async {
        let mut inner = writer.inner.lock().await;
        if writer.is_failed() {
            return Err(ConnectionError::Closed);
        }
        inner
            .write_all(bytes)
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;
        inner
            .flush()
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))
    })
    .await;

    let result = attempt.unwrap_or(Err(ConnectionError::WriteTimeout));
    if matches!(
        result,
        Err(ConnectionError::Io(_) | ConnectionError::WriteTimeout)
    ) {
        writer.mark_failed();
    }
    result
}

/// Renders and writes a sequence of lines under one lock acquisition.
///
/// Holding the lock across the whole batch keeps, for example, a relayed
/// message and the prompt that follows it together on the recipient's
/// screen.
///
/// # Errors
///
/// Same as [`write_bytes`].
pub async fn write_lines(
    writer: &ClientWriter,
    lines: &[ServerLine],
    deadline: Duration,
) -> Result<(), ConnectionError> {
    let rendered: String = lines.iter().map(ServerLine::render).collect();
    write_bytes(writer, rendered.as_bytes(), deadline).await
}

/// Reads one newline-terminated line, optionally bounded by an idle deadline.
///
/// Bytes the peer sent before closing without a final newline are not a
/// line: they are discarded and reported as `Eof`.
///
/// # Errors
///
/// - `ConnectionError::Eof` when the peer has closed the connection
/// - `ConnectionError::Io` on a read failure
/// - `ConnectionError::Timeout` if `idle` elapses without a full line
pub async fn read_line(
    reader: &mut ClientReader,
    idle: Option<Duration>,
) -> Result<ClientLine, ConnectionError> {
    let mut buf = Vec::new();

    let read = match idle {
        Some(limit) => timeout(limit, reader.read_until(b'\n', &mut buf))
            .await
            .map_err(|_| ConnectionError::Timeout)?,
        None => reader.read_until(b'\n', &mut buf).await,
    };

    match read {
        Ok(0) => Err(ConnectionError::Eof),
        Ok(n) if buf.last() != Some(&b'\n') => {
            debug!(bytes = n, "Discarding unterminated line at end of stream");
            Err(ConnectionError::Eof)
        }
        Ok(_) => Ok(ClientLine::parse(&buf)),
        Err(e) => Err(ConnectionError::Io(e.to_string())),
    }
}

/// Flushes and shuts down the write half, within `deadline`.
///
/// A writer that already failed is shut down without flushing, so a
/// half-written line never reaches the peer. The writer refuses further
/// writes afterwards.
///
/// Errors are returned for logging only; the connection is unusable
/// afterwards either way.
pub async fn shutdown(writer: &ClientWriter, deadline: Duration) -> Result<(), ConnectionError> {
    let attempt = timeout(deadline, async {
        let mut inner = writer.inner.lock().await;
        if writer.is_failed() {
            inner.get_mut().shutdown().await
        } else {
            inner.shutdown().await
        }
    })
    .await;

    writer.mark_failed();

    match attempt {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConnectionError::Io(e.to_string())),
        Err(_) => Err(ConnectionError::WriteTimeout),
    }
}

/// Errors that can occur during connection handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Eof,

    #[error("Read timeout")]
    Timeout,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Connection already failed")]
    Closed,
}

impl ConnectionError {
    /// Returns true for the expected end of a conversation (peer hung up).
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Eof)
    }
}
