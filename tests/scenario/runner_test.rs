//! Scenario runner behavior against scripted and in-memory servers.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use mcp_line_client::rpc::{
    ClientError, Exchange, RemoteError, Response, ResponseOutcome, TransportError,
};
use mcp_line_client::scenario::{
    self, AbortReason, Expect, Scenario, ScenarioRunner, Step, StepEvent, StepStatus,
};
use serde_json::{json, Map, Value};

use crate::common::{pair, tool_result};

/// Replays canned outcomes in order and records the methods it was asked for.
struct ScriptedExchange {
    outcomes: VecDeque<Result<Response, ClientError>>,
    methods: Vec<String>,
}

impl ScriptedExchange {
    fn new(outcomes: Vec<Result<Response, ClientError>>) -> Self {
        Self {
            outcomes: outcomes.into(),
            methods: Vec::new(),
        }
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn exchange(
        &mut self,
        method: &str,
        _params: Map<String, Value>,
        _timeout: Duration,
    ) -> Result<Response, ClientError> {
        self.methods.push(method.to_string());
        self.outcomes
            .pop_front()
            .expect("scenario ran more steps than scripted")
    }
}

fn ok(result: Value) -> Result<Response, ClientError> {
    Ok(Response {
        id: Some(1),
        outcome: ResponseOutcome::Result(result),
    })
}

fn remote(message: &str) -> Result<Response, ClientError> {
    Ok(Response {
        id: Some(1),
        outcome: ResponseOutcome::Error(RemoteError {
            code: Some(-32000),
            message: message.to_string(),
            data: None,
        }),
    })
}

fn three_steps(stop_on_failure: bool) -> Scenario {
    Scenario::new("three")
        .stop_on_failure(stop_on_failure)
        .step(Step::new("first", "a", Map::new()))
        .step(Step::new("second", "b", Map::new()))
        .step(Step::new("third", "c", Map::new()))
}

fn runner() -> ScenarioRunner {
    ScenarioRunner::new(Duration::from_millis(200))
}

#[tokio::test]
async fn test_step_outcomes() {
    struct Case {
        name: &'static str,
        stop_on_failure: bool,
        outcomes: Vec<Result<Response, ClientError>>,
        passed: usize,
        failed: usize,
        skipped: usize,
        aborted: Option<AbortReason>,
    }

    let cases = vec![
        Case {
            name: "all pass",
            stop_on_failure: false,
            outcomes: vec![ok(json!({})), ok(json!({})), ok(json!({}))],
            passed: 3,
            failed: 0,
            skipped: 0,
            aborted: None,
        },
        Case {
            name: "failures do not stop a lenient scenario",
            stop_on_failure: false,
            outcomes: vec![
                remote("already exists"),
                Err(ClientError::Timeout(200)),
                ok(json!({})),
            ],
            passed: 1,
            failed: 2,
            skipped: 0,
            aborted: None,
        },
        Case {
            name: "strict scenario stops at first failure",
            stop_on_failure: true,
            outcomes: vec![ok(json!({})), remote("bad credentials")],
            passed: 1,
            failed: 1,
            skipped: 1,
            aborted: Some(AbortReason::StepFailed),
        },
        Case {
            name: "transport failure always aborts",
            stop_on_failure: false,
            outcomes: vec![Err(ClientError::Transport(TransportError::ProcessExited(
                Some(1),
            )))],
            passed: 0,
            failed: 1,
            skipped: 2,
            aborted: Some(AbortReason::TransportFailure),
        },
    ];

    for case in cases {
        let mut exchange = ScriptedExchange::new(case.outcomes);
        let report = runner()
            .run(&mut exchange, &three_steps(case.stop_on_failure))
            .await;

        assert_eq!(report.passed(), case.passed, "{}: passed", case.name);
        assert_eq!(report.failed(), case.failed, "{}: failed", case.name);
        assert_eq!(report.skipped, case.skipped, "{}: skipped", case.name);
        assert_eq!(report.aborted, case.aborted, "{}: aborted", case.name);
        assert_eq!(
            report.is_success(),
            case.failed == 0 && case.skipped == 0,
            "{}: success",
            case.name
        );
    }
}

#[tokio::test]
async fn test_statuses_are_classified() {
    let mut exchange = ScriptedExchange::new(vec![
        Err(ClientError::Timeout(200)),
        Err(ClientError::Parse {
            line: "garbage".to_string(),
            reason: "expected value".to_string(),
        }),
        remote("not found"),
    ]);

    let report = runner().run(&mut exchange, &three_steps(false)).await;

    assert_eq!(report.steps[0].status, StepStatus::Timeout { timeout_ms: 200 });
    assert!(matches!(
        &report.steps[1].status,
        StepStatus::ParseError { line, .. } if line == "garbage"
    ));
    assert!(matches!(
        &report.steps[2].status,
        StepStatus::RemoteError(err) if err.message == "not found"
    ));
    assert_eq!(exchange.methods, ["a", "b", "c"]);
}

#[tokio::test]
async fn test_events_arrive_in_order() {
    let mut exchange = ScriptedExchange::new(vec![ok(json!({})), ok(json!({})), ok(json!({}))]);
    let mut events = Vec::new();

    runner()
        .run_with(&mut exchange, &three_steps(false), |event| {
            events.push(match event {
                StepEvent::Started { index, step } => format!("start {index} {}", step.label),
                StepEvent::Finished(report) => format!("done {}", report.index),
            });
        })
        .await;

    assert_eq!(
        events,
        [
            "start 0 first",
            "done 0",
            "start 1 second",
            "done 1",
            "start 2 third",
            "done 2"
        ]
    );
}

#[tokio::test]
async fn test_any_expectation_accepts_remote_error() {
    let scenario = Scenario::new("lenient")
        .step(Step::new("enable", "tools/call", Map::new()).expect(Expect::Any));
    let mut exchange = ScriptedExchange::new(vec![remote("toolset already enabled")]);

    let report = runner().run(&mut exchange, &scenario).await;

    assert!(report.is_success());
    assert_eq!(
        report.steps[0].status,
        StepStatus::Passed {
            detail: Some("toolset already enabled (code -32000)".to_string())
        }
    );
}

#[tokio::test]
async fn test_repository_flow_over_line_client() {
    let vars = HashMap::from([
        ("owner".to_string(), "octocat".to_string()),
        ("repo".to_string(), "demo".to_string()),
        ("branch".to_string(), "dev".to_string()),
    ]);
    let flow = scenario::substitute(&scenario::builtin("repository-flow").unwrap(), &vars)
        .unwrap()
        .pause_ms(0);
    let steps = flow.steps.len();

    let (mut client, mut server) = pair();
    let server_task = tokio::spawn(async move {
        let mut tools = Vec::new();
        for _ in 0..steps {
            let request = server.read_request().await;
            let tool = request.params["name"].as_str().unwrap().to_string();
            if tool != "create_repository" {
                assert_eq!(request.params["arguments"]["owner"], json!("octocat"));
            }
            let payload = if tool == "create_pull_request" {
                json!({"number": 1, "html_url": "https://github.com/octocat/demo/pull/1"})
            } else {
                json!({"ok": true})
            };
            server.write_line(&tool_result(request.id, &payload)).await;
            tools.push(tool);
        }
        tools
    });

    let report = runner().run(&mut client, &flow).await;
    let tools = server_task.await.unwrap();

    assert!(report.is_success(), "{report:?}");
    assert_eq!(
        tools,
        [
            "create_repository",
            "create_or_update_file",
            "create_branch",
            "create_or_update_file",
            "create_pull_request"
        ]
    );
    assert_eq!(
        report.steps.last().unwrap().status,
        StepStatus::Passed {
            detail: Some("https://github.com/octocat/demo/pull/1".to_string())
        }
    );
}
