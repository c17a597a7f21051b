//! Session error types.

use super::SessionState;
use crate::rpc::describe_exit;

/// Errors that can occur while starting or stopping a server session.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// The server binary was not found.
    #[error("Server program not found: {0}")]
    NotFound(String),

    /// Permission denied when spawning.
    #[error("Permission denied launching {0}")]
    PermissionDenied(String),

    /// Other I/O error while spawning.
    #[error("Failed to start server: {0}")]
    Spawn(#[source] std::io::Error),

    /// A standard stream was not piped.
    #[error("Server {0} pipe not available")]
    MissingPipe(&'static str),

    /// The server exited during its startup grace period.
    #[error("Server did not start ({}){}", describe_exit(.code), stderr_suffix(.stderr))]
    ExitedDuringStartup { code: Option<i32>, stderr: String },

    /// The requested lifecycle step is not valid from the current state.
    #[error("Invalid session transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    /// Failed to terminate the process.
    #[error("Failed to terminate server: {0}")]
    Terminate(#[source] std::io::Error),
}

impl SessionError {
    /// Create a `SessionError` from a spawn I/O error, classifying common cases.
    pub(crate) fn from_spawn(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_string()),
            _ => Self::Spawn(err),
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
