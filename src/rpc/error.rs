//! Exchange error types.

use std::io;

/// Failure of the pipe or the process behind it.
///
/// Any transport failure is fatal to the session: later exchanges fail
/// immediately with [`TransportError::Closed`].
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The server closed its output stream.
    #[error("Server closed its output stream")]
    StreamClosed,

    /// The server process exited.
    #[error("Server process exited ({})", describe_exit(.0))]
    ProcessExited(Option<i32>),

    /// Writing to the server input failed because the pipe is closed.
    #[error("Broken pipe writing to server: {0}")]
    BrokenPipe(#[source] io::Error),

    /// Other I/O error on the pipes.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The session already failed or was shut down.
    #[error("Session is closed")]
    Closed,
}

impl TransportError {
    /// Create a `TransportError` from a write-side I/O error, classifying common cases.
    pub(crate) fn from_write(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::UnexpectedEof => Self::BrokenPipe(err),
            _ => Self::Io(err),
        }
    }
}

#[allow(clippy::ref_option)]
pub(crate) fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"))
}

/// Errors that can occur during a single request/response exchange.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// No response line arrived within the bound.
    #[error("No response within {0}ms")]
    Timeout(u64),

    /// A line arrived but was not a well-formed JSON-RPC message.
    #[error("Malformed response ({reason}): {line}")]
    Parse {
        /// The raw line as received.
        line: String,
        /// Why the line was rejected.
        reason: String,
    },

    /// The request could not be serialized.
    #[error("Failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The pipe or process failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Returns `true` if the session can no longer be used.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
