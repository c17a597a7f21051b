//! Server process sessions.
//!
//! A session is the lifetime of one spawned server process. It is created
//! when the process starts with its stdio attached and ends when the caller
//! shuts it down, or when the process dies.

mod command;
mod error;
mod server;
mod state;

pub use command::ServerCommand;
pub use error::SessionError;
pub use server::{ServerSession, DEFAULT_SHUTDOWN_TIMEOUT};
pub use state::{ExchangeKind, SessionState, SessionStateMachine, SessionStats};
