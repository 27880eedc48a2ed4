//! Remote tool client + tool bridge integration tests.
//!
//! The happy paths run against the real in-process tool server; the
//! degenerate remote behaviors (malformed tool output, handshake failure)
//! are scripted with a mock HTTP endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use sandbridge_lib::bridge::ToolBridge;
use sandbridge_lib::mcp::client::{ClientError, RemoteToolClient};
use sandbridge_lib::mcp::transport::{HttpTransport, TransportConfig};

async fn connected_client(url: &str) -> Arc<RemoteToolClient> {
    let transport = HttpTransport::new(url, TransportConfig::default()).unwrap();
    let client = Arc::new(RemoteToolClient::new(Box::new(transport)));
    client.connect().await.unwrap();
    client
}

#[tokio::test]
async fn test_discovery_over_http() {
    let workspace = tempfile::tempdir().unwrap();
    let (url, server) = common::spawn_tool_server(workspace.path()).await;

    let client = connected_client(&url).await;
    let tools = client.list_tools().await.unwrap();

    assert_eq!(tools.len(), 9);
    let list_files = tools.iter().find(|t| t.name == "listFiles").unwrap();
    assert_eq!(list_files.input_schema["required"][0], "path");

    client.disconnect().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn test_write_read_roundtrip_through_client() {
    let workspace = tempfile::tempdir().unwrap();
    let (url, server) = common::spawn_tool_server(workspace.path()).await;

    let client = connected_client(&url).await;

    let written = client
        .call_tool(
            "writeFile",
            json!({ "path": "/src/app.ts", "content": "export const x = 1;" }),
        )
        .await
        .unwrap();
    assert!(!written.is_error);
    assert_eq!(written.value["success"], true);

    let read = client
        .call_tool("readFile", json!({ "path": "/src/app.ts" }))
        .await
        .unwrap();
    assert_eq!(read.value["content"], "export const x = 1;");

    server.abort();
}

#[tokio::test]
async fn test_tool_failure_surfaces_as_is_error_not_fault() {
    let workspace = tempfile::tempdir().unwrap();
    let (url, server) = common::spawn_tool_server(workspace.path()).await;

    let client = connected_client(&url).await;

    // Missing required argument: the server reports the failure inside the
    // result payload, and the client carries it as data.
    let outcome = client.call_tool("readFile", json!({})).await.unwrap();
    assert!(outcome.is_error);
    assert!(outcome.value["error"].as_str().unwrap().contains("path"));

    server.abort();
}

#[tokio::test]
async fn test_bridge_over_live_server() {
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join("notes.txt"), "alpha\nbeta\n").unwrap();
    let (url, server) = common::spawn_tool_server(workspace.path()).await;

    let client = connected_client(&url).await;
    let descriptors = client.list_tools().await.unwrap();
    let bridge = ToolBridge::new(Arc::clone(&client), descriptors);

    let result = bridge
        .get("grep")
        .unwrap()
        .invoke(json!({ "pattern": "beta", "path": "/" }))
        .await;
    assert!(result.ok);
    assert_eq!(result.value.unwrap()["matches"], 1);

    // Validation failures never reach the wire.
    let rejected = bridge.get("grep").unwrap().invoke(json!({ "pattern": 7 })).await;
    assert!(!rejected.ok);

    server.abort();
}

// ============================================================================
// Scripted remote behaviors
// ============================================================================

fn init_envelope() -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "scripted", "version": "0.0.0" }
        }
    })
}

#[tokio::test]
async fn test_malformed_tool_output_falls_back_to_raw_string() {
    let mock = httpmock::MockServer::start_async().await;

    mock.mock_async(|when, then| {
        when.method(httpmock::Method::GET).path("/events");
        then.status(200)
            .header("content-type", "text/event-stream")
            .body("event: ready\ndata: {}\n\n");
    })
    .await;
    mock.mock_async(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/rpc")
            .body_contains("\"initialize\"");
        then.status(200).json_body(init_envelope());
    })
    .await;
    mock.mock_async(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/rpc")
            .body_contains("\"notifications/initialized\"");
        then.status(202);
    })
    .await;
    mock.mock_async(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/rpc")
            .body_contains("\"tools/call\"");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {
                "content": [{ "type": "text", "text": "not json" }]
            }
        }));
    })
    .await;

    let client = connected_client(&mock.base_url()).await;
    let outcome = client.call_tool("echo", json!({})).await.unwrap();

    // Malformed JSON payloads come back as the raw string, never a fault.
    assert_eq!(outcome.value, json!("not json"));
    assert!(!outcome.is_error);
}

#[tokio::test]
async fn test_handshake_failure_leaves_client_unconnected() {
    let mock = httpmock::MockServer::start_async().await;

    mock.mock_async(|when, then| {
        when.method(httpmock::Method::GET).path("/events");
        then.status(200)
            .header("content-type", "text/event-stream")
            .body("event: ready\ndata: {}\n\n");
    })
    .await;
    mock.mock_async(|when, then| {
        when.method(httpmock::Method::POST).path("/rpc");
        then.status(500).body("initialize exploded");
    })
    .await;

    let transport = HttpTransport::new(
        mock.base_url(),
        TransportConfig::with_timeout(Duration::from_secs(2)),
    )
    .unwrap();
    let client = RemoteToolClient::new(Box::new(transport));

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::Connection(_)));
    assert!(!client.is_connected());

    // Operations still refuse to run.
    assert!(matches!(
        client.list_tools().await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn test_catalog_is_not_cached_across_calls() {
    let workspace = tempfile::tempdir().unwrap();
    let (url, server) = common::spawn_tool_server(workspace.path()).await;

    let client = connected_client(&url).await;
    let first = client.list_tools().await.unwrap();
    let second = client.list_tools().await.unwrap();

    // Same remote catalog, fetched fresh both times.
    assert_eq!(first, second);

    server.abort();
}
