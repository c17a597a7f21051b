//! Scenario definitions.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ScenarioError;

/// What a step must produce to pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expect {
    /// Any well-formed response, including a remote error.
    Any,
    /// A result, not an error.
    #[default]
    Success,
    /// A `tools/list` result with a `tools` array.
    ToolList,
    /// A `tools/call` result whose nested payload decodes as JSON.
    ToolPayload {
        /// Payload field to report on success, e.g. `html_url`.
        #[serde(default)]
        report: Option<String>,
    },
}

/// One request in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Short description printed while the step runs.
    pub label: String,
    /// JSON-RPC method.
    pub method: String,
    /// Method parameters; strings may contain `${var}` placeholders.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Per-step response bound, overriding the default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Pass condition.
    #[serde(default)]
    pub expect: Expect,
}

impl Step {
    /// Create a step with default expectation [`Expect::Success`].
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        method: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self {
            label: label.into(),
            method: method.into(),
            params,
            timeout_ms: None,
            expect: Expect::default(),
        }
    }

    /// Set the pass condition.
    #[must_use]
    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    /// Set the response bound.
    #[must_use]
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Response bound for this step, falling back to `default`.
    #[must_use]
    pub fn timeout(&self, default: Duration) -> Duration {
        self.timeout_ms.map_or(default, Duration::from_millis)
    }
}

/// An ordered list of steps run against one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// What the scenario does.
    #[serde(default)]
    pub description: String,
    /// Abandon remaining steps after the first failed step.
    #[serde(default)]
    pub stop_on_failure: bool,
    /// Pause between steps, giving the remote side time to settle.
    #[serde(default)]
    pub pause_ms: u64,
    /// Steps in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Create an empty scenario.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            stop_on_failure: false,
            pause_ms: 0,
            steps: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Abandon remaining steps after the first failure.
    #[must_use]
    pub fn stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Pause between steps.
    #[must_use]
    pub fn pause_ms(mut self, ms: u64) -> Self {
        self.pause_ms = ms;
        self
    }

    /// Append a step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Parse a scenario from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Parse`] if the text is not a valid scenario.
    pub fn from_toml(content: &str) -> Result<Self, ScenarioError> {
        toml::from_str(content).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    /// Load a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Read`] if the file cannot be read, or
    /// [`ScenarioError::Parse`] if it is not a valid scenario.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScenarioError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }
}
