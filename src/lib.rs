//! MCP line client - scripted JSON-RPC over stdio against MCP tool servers.

pub mod config;
pub mod display;
pub mod error;
pub mod rpc;
pub mod scenario;
pub mod session;
pub mod tools;

pub use error::DriverError;
