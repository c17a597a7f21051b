//! JSON-RPC over line-delimited byte streams.
//!
//! # Protocol
//!
//! Communication uses JSON-line format over the server's stdio:
//! - Client writes one request as JSON + newline, then flushes
//! - Server answers with one response as JSON + newline
//!
//! ```text
//! Client                         Server
//!     |                              |
//!     |-- {"id":1,"method":...} ---->|
//!     |                              | (run tool)
//!     |<-- {"id":1,"result":...} ----|
//!     |                              |
//! ```
//!
//! Every wait is bounded. An exchange ends in one of four ways: a
//! [`Response`] (which may carry a [`RemoteError`]), [`ClientError::Timeout`],
//! [`ClientError::Parse`], or [`ClientError::Transport`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use mcp_line_client::rpc::{LineClient, Request};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (reader, writer) = tokio::io::split(tokio::io::duplex(4096).0);
//! let mut client = LineClient::new(reader, writer);
//!
//! let request = Request::new(client.allocate_id(), "tools/list", Default::default());
//! let response = client.send_request(&request, Duration::from_secs(5)).await?;
//! println!("{:?}", response.result());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod types;

pub use client::{Exchange, LineClient, DEFAULT_REQUEST_TIMEOUT};
pub(crate) use error::describe_exit;
pub use error::{ClientError, TransportError};
pub(crate) use types::Incoming;
pub use types::{RemoteError, Request, Response, ResponseOutcome, JSONRPC_VERSION};
