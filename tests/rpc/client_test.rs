//! Exchange behavior of `LineClient` against an in-memory server.

use std::time::{Duration, Instant};

use mcp_line_client::rpc::{ClientError, LineClient, Request, TransportError};
use serde_json::{json, Map};

use crate::common::{pair, tool_result};

const BOUND: Duration = Duration::from_millis(500);

#[tokio::test]
async fn test_request_is_written_as_exactly_one_line() {
    let (mut client, mut server) = pair();

    let request = Request::new(client.allocate_id(), "tools/list", Map::new());
    let expected = request.clone();
    let handle = tokio::spawn(async move { client.send_request(&request, BOUND).await });

    let received = server.read_request().await;
    assert_eq!(received, expected);
    server.write_line(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#).await;

    let response = handle.await.unwrap().unwrap();
    assert_eq!(response.result(), Some(&json!({"tools": []})));
    assert!(server.try_read_line(Duration::from_millis(50)).await.is_none());
}

#[tokio::test]
async fn test_silent_server_times_out_within_bound() {
    let (mut client, mut server) = pair();

    let started = Instant::now();
    let err = client
        .call("tools/list", Map::new(), Duration::from_millis(100))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Timeout(100)));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!client.is_closed());
    // The request still went out.
    assert_eq!(server.read_request().await.method, "tools/list");
}

#[tokio::test]
async fn test_malformed_line_is_a_parse_error() {
    let (mut client, mut server) = pair();
    server.write_line("this is not json").await;

    let err = client.call("tools/list", Map::new(), BOUND).await.unwrap_err();

    match err {
        ClientError::Parse { line, .. } => assert_eq!(line, "this is not json"),
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_result_is_returned_for_matching_id() {
    let (mut client, mut server) = pair();
    for _ in 0..6 {
        client.allocate_id();
    }

    let handle = tokio::spawn(async move {
        let response = client.call("tools/call", Map::new(), BOUND).await;
        (client, response)
    });
    let request = server.read_request().await;
    assert_eq!(request.id, 7);
    server.write_line(r#"{"jsonrpc":"2.0","id":7,"result":{"ok":true}}"#).await;

    let (_client, response) = handle.await.unwrap();
    let response = response.unwrap();
    assert_eq!(response.id, Some(7));
    assert_eq!(response.into_result().unwrap(), json!({"ok": true}));
}

#[tokio::test]
async fn test_error_response_is_a_remote_error_not_a_failure() {
    let (mut client, mut server) = pair();
    server
        .write_line(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"not found"}}"#)
        .await;

    let response = client.call("nope", Map::new(), BOUND).await.unwrap();

    assert!(response.is_error());
    let err = response.error().unwrap();
    assert_eq!(err.message, "not found");
    assert_eq!(err.code, Some(-32601));
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_closed_stream_is_fatal() {
    let (mut client, server) = pair();
    drop(server);

    let err = client.call("tools/list", Map::new(), BOUND).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_fatal());
    assert!(client.is_closed());

    let err = client.call("tools/list", Map::new(), BOUND).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Closed)));
}

#[tokio::test]
async fn test_server_exit_after_request_reports_stream_closed() {
    let (mut client, mut server) = pair();

    let handle = tokio::spawn(async move {
        let result = client.call("tools/list", Map::new(), BOUND).await;
        (client, result)
    });
    server.read_request().await;
    drop(server);

    let (client, result) = handle.await.unwrap();
    assert!(matches!(
        result.unwrap_err(),
        ClientError::Transport(TransportError::StreamClosed)
    ));
    assert!(client.is_closed());
}

#[tokio::test]
async fn test_late_response_to_abandoned_request_is_discarded() {
    let (mut client, mut server) = pair();

    let err = client
        .call("slow", Map::new(), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert_eq!(server.read_request().await.id, 1);

    // The answer to request 1 arrives only now, ahead of the answer to 2.
    server.write_line(r#"{"jsonrpc":"2.0","id":1,"result":"late"}"#).await;
    server
        .write_line(r#"{"jsonrpc":"2.0","method":"notifications/progress","params":{}}"#)
        .await;
    server.write_line("").await;
    server.write_line(r#"{"jsonrpc":"2.0","id":2,"result":"fresh"}"#).await;

    let response = client.call("fast", Map::new(), BOUND).await.unwrap();
    assert_eq!(response.id, Some(2));
    assert_eq!(response.result(), Some(&json!("fresh")));
}

#[tokio::test]
async fn test_partial_line_survives_a_timeout() {
    let (mut client, mut server) = pair();
    server.write_raw(r#"{"jsonrpc":"2.0","id":1,"#).await;

    let request = Request::new(client.allocate_id(), "tools/list", Map::new());
    let err = client
        .send_request(&request, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));

    server.write_raw("\"result\":{\"done\":true}}\n").await;
    let response = client.send_request(&request, BOUND).await.unwrap();
    assert_eq!(response.result(), Some(&json!({"done": true})));
}

#[tokio::test]
async fn test_tool_call_payload_round_trip() {
    let (mut client, mut server) = pair();
    let payload = json!({"html_url": "https://github.com/octocat/demo/pull/1"});
    server.write_line(&tool_result(1, &payload)).await;

    let request = Request::tools_call(client.allocate_id(), "create_pull_request", Map::new());
    let result = client
        .send_request(&request, BOUND)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    let decoded = mcp_line_client::tools::decode_tool_payload(&result).unwrap();
    assert_eq!(decoded, payload);
}

#[tokio::test]
async fn test_exact_bytes_on_the_wire() {
    let mock = tokio_test::io::Builder::new()
        .write(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\",\"params\":{}}\n")
        .read(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"tools\":[]}}\n")
        .build();
    let (reader, writer) = tokio::io::split(mock);
    let mut client = LineClient::new(reader, writer);

    let request = Request::tools_list(client.allocate_id());
    let response = client.send_request(&request, BOUND).await.unwrap();

    assert_eq!(response.result(), Some(&json!({"tools": []})));
}

#[tokio::test]
async fn test_invalid_utf8_line_is_reported_and_session_survives() {
    let (mut client, mut server) = pair();
    server
        .write_bytes(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":\"\xff\xfe\"}\n")
        .await;
    server.write_line(r#"{"jsonrpc":"2.0","id":2,"result":"ok"}"#).await;

    let err = client.call("first", Map::new(), BOUND).await.unwrap_err();
    match err {
        ClientError::Parse { line, reason } => {
            assert!(line.starts_with(r#"{"jsonrpc":"2.0","id":1,"result":""#), "{line}");
            assert!(line.contains('\u{fffd}'), "{line}");
            assert!(reason.contains("utf-8"), "{reason}");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(!client.is_closed());

    let response = client.call("second", Map::new(), BOUND).await.unwrap();
    assert_eq!(response.id, Some(2));
    assert_eq!(response.result(), Some(&json!("ok")));
}
