//! Line-oriented JSON-RPC client.
//!
//! The client owns one reader and one writer. Each exchange writes exactly
//! one request line and waits, with a hard deadline, for the matching
//! response line.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Split};
use tokio::time::Instant;

use crate::rpc::{ClientError, Incoming, Request, Response, TransportError};

/// Default bound on waiting for a response line (5 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that can carry out one request/response exchange at a time.
///
/// Implemented by [`LineClient`] and by [`crate::session::ServerSession`],
/// so scenario drivers can run against either.
#[async_trait]
pub trait Exchange: Send {
    /// Allocate an id, send `method` with `params`, and wait at most
    /// `timeout` for the response.
    ///
    /// # Errors
    ///
    /// See [`LineClient::send_request`].
    async fn exchange(
        &mut self,
        method: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Response, ClientError>;
}

/// JSON-RPC client over a pair of line-delimited byte streams.
#[derive(Debug)]
pub struct LineClient<R, W> {
    lines: Split<BufReader<R>>,
    writer: W,
    next_id: u64,
    closed: bool,
}

impl<R, W> LineClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a client reading responses from `reader` and writing requests to `writer`.
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: BufReader::new(reader).split(b'\n'),
            writer,
            next_id: 1,
            closed: false,
        }
    }

    /// Returns `true` once a transport failure has been observed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Allocate the next request id. Ids increase monotonically from 1.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// Send a request and wait at most `timeout` for its response.
    ///
    /// Writes one line and flushes before waiting. Lines that belong to no
    /// exchange (notifications, blank lines) and responses carrying a
    /// different id (late answers to abandoned exchanges) are skipped; the
    /// deadline is not extended for them. A response without an id is
    /// attributed to this request.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`ClientError::Timeout`] if no matching line arrived in time
    /// - [`ClientError::Parse`] if a line arrived that is not a JSON-RPC message
    /// - [`ClientError::Serialize`] if the request cannot be encoded
    /// - [`ClientError::Transport`] if the stream closed or a write failed;
    ///   every later call then fails with [`TransportError::Closed`]
    pub async fn send_request(
        &mut self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        if self.closed {
            return Err(TransportError::Closed.into());
        }

        let mut line = request.to_line()?;
        line.push('\n');

        tracing::debug!(id = request.id, method = %request.method, "Sending request");
        if let Err(e) = self.write_line(&line).await {
            self.closed = true;
            return Err(TransportError::from_write(e).into());
        }

        let deadline = Instant::now() + timeout;
        // Safe: timeout values are never going to exceed u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;

        loop {
            // `next_segment` is cancel safe: a partial line stays buffered.
            let bytes = match tokio::time::timeout_at(deadline, self.lines.next_segment()).await {
                Err(_) => {
                    tracing::warn!(id = request.id, timeout_ms, "Timed out waiting for response");
                    return Err(ClientError::Timeout(timeout_ms));
                }
                Ok(Ok(Some(bytes))) => bytes,
                Ok(Ok(None)) => {
                    self.closed = true;
                    return Err(TransportError::StreamClosed.into());
                }
                Ok(Err(e)) => {
                    self.closed = true;
                    return Err(TransportError::Io(e).into());
                }
            };

            let line = match String::from_utf8(bytes) {
                Ok(line) => line,
                Err(e) => {
                    let reason = e.utf8_error().to_string();
                    let line = String::from_utf8_lossy(e.as_bytes()).into_owned();
                    tracing::warn!(
                        id = request.id,
                        line = %line,
                        "Response line is not valid UTF-8"
                    );
                    return Err(ClientError::Parse { line, reason });
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Incoming::parse(trimmed) {
                Err(reason) => {
                    tracing::warn!(id = request.id, line = %trimmed, "Malformed response line");
                    return Err(ClientError::Parse { line, reason });
                }
                Ok(Incoming::Notification { method }) => {
                    tracing::debug!(method = %method, "Skipping server notification");
                }
                Ok(Incoming::Response(response)) => match response.id {
                    Some(id) if id != request.id => {
                        tracing::warn!(
                            expected = request.id,
                            received = id,
                            "Discarding response for an abandoned request"
                        );
                    }
                    _ => {
                        tracing::debug!(
                            id = request.id,
                            is_error = response.is_error(),
                            "Received response"
                        );
                        return Ok(response);
                    }
                },
            }
        }
    }

    /// Allocate an id and send `method` with `params`.
    ///
    /// # Errors
    ///
    /// See [`LineClient::send_request`].
    pub async fn call(
        &mut self,
        method: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let request = Request::new(self.allocate_id(), method, params);
        self.send_request(&request, timeout).await
    }

    /// Mark the client closed so further exchanges fail immediately.
    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    /// Take back the writer, e.g. to close the server's input.
    pub(crate) fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }
}

#[async_trait]
impl<R, W> Exchange for LineClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn exchange(
        &mut self,
        method: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        self.call(method, params, timeout).await
    }
}
