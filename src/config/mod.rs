//! Configuration module.

mod credential;
mod loader;
mod types;

pub use credential::*;
pub use loader::*;
pub use types::*;
