//! Toolset listing over an in-memory server.

use std::time::Duration;

use mcp_line_client::rpc::{ClientError, TransportError};
use mcp_line_client::tools::{self, TOOL_GET_TOOLSET_TOOLS, TOOL_LIST_TOOLSETS};
use mcp_line_client::DriverError;
use serde_json::json;

use crate::common::{pair, tool_result};

const BOUND: Duration = Duration::from_millis(500);

#[tokio::test]
async fn test_list_toolsets_fetches_tools_of_each_toolset() {
    let (mut client, mut server) = pair();

    let server_task = tokio::spawn(async move {
        let request = server.read_request().await;
        assert_eq!(request.params["name"], json!(TOOL_LIST_TOOLSETS));
        let toolsets = json!([
            {"name": "repos", "description": "Repository tools", "enabled": true},
            {"name": "issues", "enabled": false}
        ]);
        server.write_line(&tool_result(request.id, &toolsets)).await;

        let request = server.read_request().await;
        assert_eq!(request.params["name"], json!(TOOL_GET_TOOLSET_TOOLS));
        assert_eq!(request.params["arguments"], json!({"toolset": "repos"}));
        let repo_tools = json!([
            {"name": "create_branch", "description": "Create a branch"},
            {"name": "create_repository"}
        ]);
        server.write_line(&tool_result(request.id, &repo_tools)).await;

        let request = server.read_request().await;
        assert_eq!(request.params["arguments"], json!({"toolset": "issues"}));
        server
            .write_line(&json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "error": {"code": -32602, "message": "toolset not found"}
            })
            .to_string())
            .await;
    });

    let listings = tools::list_toolsets(&mut client, BOUND).await.unwrap();
    server_task.await.unwrap();

    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].toolset.name, "repos");
    assert!(listings[0].toolset.enabled);
    let repo_tools = listings[0].tools.as_ref().unwrap();
    let names: Vec<_> = repo_tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["create_branch", "create_repository"]);

    assert!(!listings[1].toolset.enabled);
    assert_eq!(
        listings[1].tools,
        Err("Server error: toolset not found (code -32602)".to_string())
    );
}

#[tokio::test]
async fn test_toolset_timeout_does_not_stop_the_listing() {
    let (mut client, mut server) = pair();

    let server_task = tokio::spawn(async move {
        let request = server.read_request().await;
        let toolsets = json!([{"name": "repos"}, {"name": "users"}]);
        server.write_line(&tool_result(request.id, &toolsets)).await;

        // No answer for "repos"; "users" is answered.
        server.read_request().await;
        let request = server.read_request().await;
        server
            .write_line(&tool_result(request.id, &json!([{"name": "get_me"}])))
            .await;
        server
    });

    let listings = tools::list_toolsets(&mut client, Duration::from_millis(200))
        .await
        .unwrap();
    let _server = server_task.await.unwrap();

    assert_eq!(listings[0].tools, Err("No response within 200ms".to_string()));
    assert_eq!(listings[1].tools.as_ref().unwrap()[0].name, "get_me");
}

#[tokio::test]
async fn test_lost_server_ends_the_listing() {
    let (mut client, mut server) = pair();

    let server_task = tokio::spawn(async move {
        let request = server.read_request().await;
        let toolsets = json!([{"name": "repos"}, {"name": "users"}]);
        server.write_line(&tool_result(request.id, &toolsets)).await;
        server.read_request().await;
    });

    let err = tools::list_toolsets(&mut client, BOUND).await.unwrap_err();
    server_task.await.unwrap();

    assert!(matches!(
        err,
        DriverError::Client(ClientError::Transport(TransportError::StreamClosed))
    ));
}
