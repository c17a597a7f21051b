//! Built-in scenarios for the GitHub MCP server.
//!
//! Repository-related steps use the `${owner}` variable; the repository and
//! branch names default to `mcp-demo-repo` and `feature/test-mcp` and can be
//! overridden with `${repo}` and `${branch}`.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use super::{Expect, Scenario, Step};
use crate::tools::{call_params, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST};

/// Names of all built-in scenarios, in display order.
pub const BUILTIN_NAMES: &[&str] = &[
    "tools",
    "toolsets",
    "enable-toolsets",
    "repository-flow",
    "repository-batch",
];

/// Default values for variables the built-ins use besides `owner`.
#[must_use]
pub fn default_vars() -> HashMap<String, String> {
    HashMap::from([
        ("repo".to_string(), "mcp-demo-repo".to_string()),
        ("branch".to_string(), "feature/test-mcp".to_string()),
    ])
}

/// Look up a built-in scenario by name.
#[must_use]
pub fn builtin(name: &str) -> Option<Scenario> {
    match name {
        "tools" => Some(list_tools()),
        "toolsets" => Some(list_toolsets()),
        "enable-toolsets" => Some(enable_toolsets(&["repos", "pull_requests"])),
        "repository-flow" => Some(repository_flow()),
        "repository-batch" => Some(repository_batch()),
        _ => None,
    }
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn tool_step(label: &str, tool: &str, arguments: Value) -> Step {
    Step::new(label, METHOD_TOOLS_CALL, call_params(tool, args(arguments)))
}

/// List every tool the server exposes.
#[must_use]
pub fn list_tools() -> Scenario {
    Scenario::new("tools")
        .description("List available tools")
        .step(Step::new("List tools", METHOD_TOOLS_LIST, Map::new()).expect(Expect::ToolList))
}

/// List the server's toolsets and whether each is enabled.
#[must_use]
pub fn list_toolsets() -> Scenario {
    Scenario::new("toolsets")
        .description("List available toolsets")
        .step(
            tool_step("List toolsets", "list_available_toolsets", json!({}))
                .expect(Expect::ToolPayload { report: None }),
        )
}

/// Enable each named toolset; an already-enabled toolset still passes.
#[must_use]
pub fn enable_toolsets(toolsets: &[&str]) -> Scenario {
    let scenario = Scenario::new("enable-toolsets")
        .description("Enable toolsets needed by the other scenarios");
    toolsets.iter().fold(scenario, |scenario, toolset| {
        scenario.step(
            tool_step(
                &format!("Enable {toolset} toolset"),
                "enable_toolset",
                json!({ "toolset": toolset }),
            )
            .expect(Expect::Any),
        )
    })
}

/// Create a repository, commit to main, branch, commit to the branch, and
/// open a pull request. Stops at the first failure.
#[must_use]
pub fn repository_flow() -> Scenario {
    Scenario::new("repository-flow")
        .description("Create a repository and open a pull request from a new branch")
        .stop_on_failure(true)
        .pause_ms(2000)
        .step(
            tool_step(
                "Create repository ${owner}/${repo}",
                "create_repository",
                json!({ "name": "${repo}", "private": false, "autoInit": false }),
            )
            .timeout_ms(10_000),
        )
        .step(tool_step(
            "Initial commit on main",
            "create_or_update_file",
            json!({
                "owner": "${owner}",
                "repo": "${repo}",
                "path": "README.md",
                "message": "Initial commit via MCP Server",
                "content": "# MCP Demo Repository\n\nThis repository was automatically created to test the complete MCP Server flow.\n",
                "branch": "main"
            }),
        ))
        .step(tool_step(
            "Create branch ${branch}",
            "create_branch",
            json!({
                "owner": "${owner}",
                "repo": "${repo}",
                "branch": "${branch}",
                "base": "main"
            }),
        ))
        .step(tool_step(
            "Add test file on ${branch}",
            "create_or_update_file",
            json!({
                "owner": "${owner}",
                "repo": "${repo}",
                "path": "test-mcp.md",
                "message": "Add test file via MCP Server",
                "content": "# MCP Server Test\n\nFile automatically created in the feature branch.\n",
                "branch": "${branch}"
            }),
        ))
        .step(
            tool_step(
                "Open pull request",
                "create_pull_request",
                json!({
                    "owner": "${owner}",
                    "repo": "${repo}",
                    "title": "MCP Server Test",
                    "body": "This PR was automatically created to test the complete MCP Server flow.",
                    "head": "${branch}",
                    "base": "main"
                }),
            )
            .expect(Expect::ToolPayload {
                report: Some("html_url".to_string()),
            }),
        )
}

/// Exercise several repositories, branches, files and pull requests,
/// continuing past individual failures.
#[must_use]
pub fn repository_batch() -> Scenario {
    let mut scenario = Scenario::new("repository-batch")
        .description("Create several repositories, branches, files and pull requests");

    let repos = [
        json!({ "name": "mcp-test-public", "private": false, "description": "", "autoInit": true }),
        json!({ "name": "mcp-test-private", "private": true, "description": "", "autoInit": true }),
        json!({
            "name": "mcp-test-with-desc",
            "private": false,
            "description": "Test repository with description",
            "autoInit": true
        }),
    ];
    for repo in repos {
        let label = format!("Create repository {}", repo["name"].as_str().unwrap_or_default());
        scenario = scenario.step(tool_step(&label, "create_repository", repo));
    }

    for branch in ["feature/test-1", "bugfix/test-2", "hotfix/test-3"] {
        scenario = scenario.step(tool_step(
            &format!("Create branch {branch}"),
            "create_branch",
            json!({
                "owner": "${owner}",
                "repo": "mcp-test-public",
                "branch": branch,
                "base": "main"
            }),
        ));
    }

    let files = [
        (
            "docs/README.md",
            "# Documentation\n\nThis is a test documentation file.",
            "Add documentation",
        ),
        (
            "src/main.py",
            "def main():\n    print('Hello, MCP!')\n\nif __name__ == '__main__':\n    main()",
            "Add main script",
        ),
        (
            "tests/test_main.py",
            "def test_main():\n    assert True  # Placeholder test\n",
            "Add test file",
        ),
    ];
    for (path, content, message) in files {
        scenario = scenario.step(tool_step(
            &format!("Create file {path}"),
            "create_or_update_file",
            json!({
                "owner": "${owner}",
                "repo": "mcp-test-public",
                "path": path,
                "message": message,
                "content": content,
                "branch": "feature/test-1"
            }),
        ));
    }

    let prs = [
        (
            "Feature: Add documentation",
            "This PR adds initial documentation to the project.",
            "feature/test-1",
        ),
        (
            "Bugfix: Fix main script",
            "This PR fixes issues in the main script.",
            "bugfix/test-2",
        ),
    ];
    for (title, body, head) in prs {
        scenario = scenario.step(
            tool_step(
                &format!("Open pull request: {title}"),
                "create_pull_request",
                json!({
                    "owner": "${owner}",
                    "repo": "mcp-test-public",
                    "title": title,
                    "body": body,
                    "head": head,
                    "base": "main"
                }),
            )
            .expect(Expect::ToolPayload {
                report: Some("html_url".to_string()),
            }),
        );
    }

    scenario
}
