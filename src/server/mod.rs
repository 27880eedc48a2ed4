//! Tool server HTTP surface.
//!
//! Three routes make up the contract the remote tool client depends on:
//! - `GET /health`: `{status: "ok", timestamp}` liveness probe;
//! - `GET /events`: SSE event channel (a `ready` event, then keepalives);
//! - `POST /rpc`: JSON-RPC envelope for `initialize`, `tools/list`, and
//!   `tools/call`.
//!
//! Tool failures are carried inside the `tools/call` result (`isError: true`
//! plus a JSON error payload) rather than as protocol-level faults; only an
//! unknown tool name is a JSON-RPC error.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream};
use futures::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::mcp::types::{
    CallToolRequest, CallToolResult, Implementation, InitializeResponse, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, ServerCapabilities,
    ToolsCapability, PROTOCOL_VERSION,
};
use crate::tools::{ToolError, ToolRegistry};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Shared state behind the router.
pub struct ServerState {
    registry: ToolRegistry,
}

impl ServerState {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }
}

/// Build the tool-server router.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(events))
        .route("/rpc", post(rpc))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn events() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("event channel client connected");

    let ready = stream::once(async {
        Ok(Event::default()
            .event("ready")
            .data(serde_json::json!({ "server": "sandbridge" }).to_string()))
    });

    // The channel stays open for the life of the connection; keepalive
    // comments prevent idle proxies from reaping it.
    Sse::new(ready.chain(stream::pending()))
        .keep_alive(KeepAlive::new().interval(KEEPALIVE_INTERVAL).text("keepalive"))
}

async fn rpc(State(state): State<Arc<ServerState>>, Json(request): Json<JsonRpcRequest>) -> Response {
    debug!("rpc request: method={}", request.method);

    if request.is_notification() {
        // Nothing to answer; acknowledge receipt.
        return StatusCode::ACCEPTED.into_response();
    }

    let id = request.id.clone().unwrap_or(RequestId::Number(0));
    let response = dispatch(&state, &request, id).await;
    Json(response).into_response()
}

async fn dispatch(state: &ServerState, request: &JsonRpcRequest, id: RequestId) -> JsonRpcResponse {
    match request.method.as_str() {
        "initialize" => {
            let response = InitializeResponse {
                protocol_version: PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {
                        list_changed: Some(false),
                    }),
                },
                server_info: Implementation::new("sandbridge-server", env!("CARGO_PKG_VERSION")),
            };
            match serde_json::to_value(&response) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
            }
        }

        "tools/list" => {
            let result = ListToolsResult {
                tools: state.registry.list(),
            };
            match serde_json::to_value(&result) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
            }
        }

        "tools/call" => {
            let call: CallToolRequest = match request
                .params
                .clone()
                .map(serde_json::from_value)
                .transpose()
            {
                Ok(Some(call)) => call,
                Ok(None) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params("tools/call requires params"),
                    );
                }
                Err(e) => {
                    return JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string()));
                }
            };

            let args = serde_json::Value::Object(call.arguments.unwrap_or_default());
            let result = match state.registry.invoke(&call.name, args).await {
                Ok(value) => {
                    let text = serde_json::to_string_pretty(&value)
                        .unwrap_or_else(|_| value.to_string());
                    CallToolResult::text(text)
                }
                Err(ToolError::UnknownTool(name)) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Unknown tool: {name}")),
                    );
                }
                Err(e) => {
                    // Tool failure travels inside the result, not as a
                    // protocol fault.
                    let payload = serde_json::json!({ "error": e.to_string() });
                    let text = serde_json::to_string_pretty(&payload)
                        .unwrap_or_else(|_| payload.to_string());
                    CallToolResult::error_text(text)
                }
            };

            match serde_json::to_value(&result) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
            }
        }

        other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tools::ToolContext;

    fn state(dir: &tempfile::TempDir) -> Arc<ServerState> {
        let registry = ToolRegistry::new(ToolContext::with_capabilities(dir.path(), false));
        Arc::new(ServerState::new(registry))
    }

    fn request(method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest::new(RequestId::Number(1), method, Some(params))
    }

    #[tokio::test]
    async fn test_initialize_reports_tool_capability() {
        let dir = tempfile::tempdir().unwrap();
        let response = dispatch(&state(&dir), &request("initialize", json!({})), RequestId::Number(1)).await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "sandbridge-server");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list_returns_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let response = dispatch(&state(&dir), &request("tools/list", json!({})), RequestId::Number(1)).await;

        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 9);
        assert!(tools.iter().any(|t| t["name"] == "listFiles"));
    }

    #[tokio::test]
    async fn test_tools_call_wraps_result_as_text_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi").unwrap();

        let response = dispatch(
            &state(&dir),
            &request(
                "tools/call",
                json!({ "name": "readFile", "arguments": { "path": "/hello.txt" } }),
            ),
            RequestId::Number(1),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        let text = result["content"][0]["text"].as_str().unwrap();
        let payload: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["content"], "hi");
        assert!(result.get("isError").is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_a_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let response = dispatch(
            &state(&dir),
            &request("tools/call", json!({ "name": "teleport", "arguments": {} })),
            RequestId::Number(1),
        )
        .await;

        let error = response.error.unwrap();
        assert!(error.message.contains("Unknown tool: teleport"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_carried_as_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // Missing required argument makes the tool itself fail.
        let response = dispatch(
            &state(&dir),
            &request("tools/call", json!({ "name": "readFile", "arguments": {} })),
            RequestId::Number(1),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        let payload: serde_json::Value = serde_json::from_str(text).unwrap();
        assert!(payload["error"].as_str().unwrap().contains("path"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let response = dispatch(&state(&dir), &request("prompts/list", json!({})), RequestId::Number(1)).await;
        assert!(response.error.unwrap().message.contains("prompts/list"));
    }
}
