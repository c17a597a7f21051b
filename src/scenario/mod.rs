//! Declarative scenarios.
//!
//! A scenario is an ordered list of (method, params, expectation) steps.
//! Scenarios come from TOML files or from the built-in set, have their
//! `${var}` placeholders resolved up front, and are run by a
//! [`ScenarioRunner`] against any [`crate::rpc::Exchange`].
//!
//! ```toml
//! name = "open-pr"
//! stop_on_failure = true
//!
//! [[steps]]
//! label = "Open pull request"
//! method = "tools/call"
//! expect = { kind = "tool_payload", report = "html_url" }
//!
//! [steps.params]
//! name = "create_pull_request"
//! arguments = { owner = "${owner}", repo = "demo", title = "Test", head = "dev", base = "main" }
//! ```

mod builtin;
mod runner;
mod types;
mod vars;

use std::path::PathBuf;

pub use builtin::{builtin, default_vars, BUILTIN_NAMES};
pub use runner::{
    evaluate, AbortReason, ScenarioReport, ScenarioRunner, StepEvent, StepReport, StepStatus,
    NOT_AVAILABLE,
};
pub use types::{Expect, Scenario, Step};
pub use vars::{placeholders, substitute};

/// Errors that can occur while loading or preparing a scenario.
#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    /// Scenario file could not be read.
    #[error("Failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Scenario text is not valid.
    #[error("Invalid scenario: {0}")]
    Parse(String),

    /// Placeholders without a value.
    #[error("Scenario {scenario} needs unset variables: {}", .names.join(", "))]
    UnknownVariables {
        scenario: String,
        names: Vec<String>,
    },

    /// Neither a built-in name nor an existing file.
    #[error("Unknown scenario {0} (not a built-in and no such file)")]
    NotFound(String),
}

/// Resolve a scenario by built-in name or file path.
///
/// # Errors
///
/// Returns [`ScenarioError::NotFound`] if `name` is neither, or a load error
/// for an unreadable file.
pub fn resolve(name: &str) -> Result<Scenario, ScenarioError> {
    if let Some(scenario) = builtin(name) {
        return Ok(scenario);
    }
    let path = PathBuf::from(name);
    if path.exists() {
        return Scenario::load(&path);
    }
    Err(ScenarioError::NotFound(name.to_string()))
}
