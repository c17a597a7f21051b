//! Scenario driver loop.
//!
//! Runs the steps of a [`Scenario`] one at a time against any [`Exchange`],
//! classifying every outcome. A transport failure ends the scenario; any
//! other failure only fails its own step, unless the scenario asks to stop
//! on the first failure.

use std::time::{Duration, Instant};

use serde_json::Value;

use super::{Expect, Scenario, Step};
use crate::rpc::{ClientError, Exchange, RemoteError, Response};
use crate::tools::{decode_tool_payload, parse_tool_list};

/// Shown when a reported payload field is absent.
pub const NOT_AVAILABLE: &str = "not available";

/// How a step ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// The expectation was met.
    Passed {
        /// Extra information worth printing, e.g. a created URL.
        detail: Option<String>,
    },
    /// No response within the bound.
    Timeout { timeout_ms: u64 },
    /// A line arrived that was not a JSON-RPC message.
    ParseError { line: String, reason: String },
    /// The server answered with an error.
    RemoteError(RemoteError),
    /// The server answered but the result did not meet the expectation.
    Unexpected(String),
    /// The server process or its pipes failed.
    TransportFailure(String),
}

impl StepStatus {
    /// Returns `true` if the step passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Zero-based position in the scenario.
    pub index: usize,
    /// Step label.
    pub label: String,
    /// How the step ended.
    pub status: StepStatus,
    /// Time spent on the exchange.
    pub elapsed: Duration,
}

/// Why a scenario ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The session failed; no further exchange is possible.
    TransportFailure,
    /// A step failed and the scenario stops on failure.
    StepFailed,
}

/// Outcome of a whole scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Reports for the steps that ran, in order.
    pub steps: Vec<StepReport>,
    /// Steps never attempted because the scenario ended early.
    pub skipped: usize,
    /// Set if the scenario ended early.
    pub aborted: Option<AbortReason>,
}

impl ScenarioReport {
    /// Number of steps that passed.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_passed()).count()
    }

    /// Number of steps that ran and failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.steps.len() - self.passed()
    }

    /// Returns `true` if every step ran and passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped == 0
    }
}

/// Progress notification for live output.
#[derive(Debug, Clone, Copy)]
pub enum StepEvent<'a> {
    /// A step is about to send its request.
    Started { index: usize, step: &'a Step },
    /// A step has finished.
    Finished(&'a StepReport),
}

/// Drives scenarios against an exchange.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    default_timeout: Duration,
}

impl ScenarioRunner {
    /// Create a runner using `default_timeout` for steps without their own bound.
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Run `scenario` to completion.
    pub async fn run<E>(&self, exchange: &mut E, scenario: &Scenario) -> ScenarioReport
    where
        E: Exchange + ?Sized,
    {
        self.run_with(exchange, scenario, |_| {}).await
    }

    /// Run `scenario`, reporting progress to `on_event`.
    pub async fn run_with<E, F>(
        &self,
        exchange: &mut E,
        scenario: &Scenario,
        mut on_event: F,
    ) -> ScenarioReport
    where
        E: Exchange + ?Sized,
        F: FnMut(StepEvent<'_>),
    {
        tracing::info!(
            scenario = %scenario.name,
            steps = scenario.steps.len(),
            "Running scenario"
        );

        let mut report = ScenarioReport {
            name: scenario.name.clone(),
            steps: Vec::with_capacity(scenario.steps.len()),
            skipped: 0,
            aborted: None,
        };

        for (index, step) in scenario.steps.iter().enumerate() {
            if index > 0 && scenario.pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(scenario.pause_ms)).await;
            }

            on_event(StepEvent::Started { index, step });

            let timeout = step.timeout(self.default_timeout);
            let started = Instant::now();
            let result = exchange
                .exchange(&step.method, step.params.clone(), timeout)
                .await;
            let elapsed = started.elapsed();

            let fatal = matches!(&result, Err(e) if e.is_fatal());
            let status = match result {
                Ok(response) => evaluate(&step.expect, response),
                Err(err) => status_from_error(err),
            };

            tracing::info!(
                scenario = %scenario.name,
                step = %step.label,
                passed = status.is_passed(),
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Step finished"
            );

            let step_report = StepReport {
                index,
                label: step.label.clone(),
                status,
                elapsed,
            };
            on_event(StepEvent::Finished(&step_report));
            let passed = step_report.status.is_passed();
            report.steps.push(step_report);

            let abort = if fatal {
                Some(AbortReason::TransportFailure)
            } else if !passed && scenario.stop_on_failure {
                Some(AbortReason::StepFailed)
            } else {
                None
            };

            if let Some(reason) = abort {
                report.skipped = scenario.steps.len() - index - 1;
                report.aborted = Some(reason);
                tracing::warn!(
                    scenario = %scenario.name,
                    reason = ?reason,
                    skipped = report.skipped,
                    "Scenario aborted"
                );
                break;
            }
        }

        report
    }
}

/// Check a response against a step's expectation.
#[must_use]
pub fn evaluate(expect: &Expect, response: Response) -> StepStatus {
    let result = match (expect, response.into_result()) {
        (Expect::Any, Err(err)) => {
            return StepStatus::Passed {
                detail: Some(err.to_string()),
            };
        }
        (_, Err(err)) => return StepStatus::RemoteError(err),
        (_, Ok(result)) => result,
    };

    match expect {
        Expect::Any | Expect::Success => StepStatus::Passed { detail: None },
        Expect::ToolList => match parse_tool_list(&result) {
            Ok(tools) => StepStatus::Passed {
                detail: Some(format!("{} tools", tools.len())),
            },
            Err(err) => StepStatus::Unexpected(err.to_string()),
        },
        Expect::ToolPayload { report } => match decode_tool_payload(&result) {
            Ok(payload) => StepStatus::Passed {
                detail: report.as_deref().map(|field| report_field(&payload, field)),
            },
            Err(err) => StepStatus::Unexpected(err.to_string()),
        },
    }
}

fn report_field(payload: &Value, field: &str) -> String {
    match payload.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => NOT_AVAILABLE.to_string(),
        Some(other) => other.to_string(),
    }
}

fn status_from_error(err: ClientError) -> StepStatus {
    match err {
        ClientError::Timeout(timeout_ms) => StepStatus::Timeout { timeout_ms },
        ClientError::Parse { line, reason } => StepStatus::ParseError { line, reason },
        ClientError::Serialize(e) => StepStatus::Unexpected(e.to_string()),
        ClientError::Transport(e) => StepStatus::TransportFailure(e.to_string()),
    }
}
