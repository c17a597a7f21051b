//! Top-level error type for the driver binary.

use crate::config::ConfigError;
use crate::rpc::{ClientError, RemoteError};
use crate::scenario::ScenarioError;
use crate::session::SessionError;
use crate::tools::PayloadError;

/// Any failure that ends a driver command before it can report results.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Server error: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
