//! Tool-calling protocol types.
//!
//! Wire types for the JSON-RPC 2.0 envelope and the MCP-shaped tool surface
//! (initialize handshake, tool discovery, tool invocation). Only the subset
//! this system exchanges is modeled; unknown fields from remote peers are
//! ignored on deserialization.

use serde::{Deserialize, Serialize};

// ============================================================================
// JSON-RPC Base Types
// ============================================================================

/// JSON-RPC version constant.
pub const JSON_RPC_VERSION: &str = "2.0";

/// Protocol version advertised during the initialize handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error codes.
pub mod error_codes {
    /// Parse error (-32700): Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request (-32600): The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found (-32601): The method does not exist.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params (-32602): Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error (-32603): Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Request identifier type (string or integer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// A JSON-RPC request object. A request without an id is a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Create a notification request (no id, no response expected).
    pub fn notification(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC response object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: impl AsRef<str>) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method.as_ref()),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }
}

// ============================================================================
// Initialize Types
// ============================================================================

/// Implementation information (name and version).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Capabilities advertised by the client during initialization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {}

/// Capabilities advertised by the server during initialization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Initialize request sent by client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    pub client_info: Implementation,
}

impl InitializeRequest {
    pub fn new(protocol_version: impl Into<String>, client_info: Implementation) -> Self {
        Self {
            protocol_version: protocol_version.into(),
            capabilities: ClientCapabilities::default(),
            client_info,
        }
    }
}

/// Initialize response sent by server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

// ============================================================================
// Tool Types
// ============================================================================

/// Metadata advertising one remotely invocable tool.
///
/// Immutable once discovered; `input_schema` is carried as raw JSON because
/// remote servers report arbitrary (and occasionally malformed) schema
/// shapes. The schema translator in [`crate::bridge::schema`] is the only
/// consumer and is deliberately tolerant of anything found here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_schema() -> serde_json::Value {
    serde_json::json!({})
}

/// Result of listing tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<ToolDescriptor>,
}

/// Request to call a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Map<String, serde_json::Value>>,
}

/// One item in a tool result's content list.
///
/// The kind tag is kept as a plain string so content kinds this client does
/// not understand still deserialize; only `"text"` items are interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentItem {
    /// Create a text content item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
        }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// Successful result carrying a single text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: None,
        }
    }

    /// Failed result carrying a single text payload describing the error.
    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(
            RequestId::Number(1),
            "tools/list",
            Some(json!({})),
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 1);
        assert_eq!(value["method"], "tools/list");
    }

    #[test]
    fn test_notification_has_no_id() {
        let notification =
            JsonRpcRequest::notification("notifications/initialized", Some(json!({})));
        assert!(notification.is_notification());

        let value = serde_json::to_value(&notification).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_response_error_roundtrip() {
        let response = JsonRpcResponse::error(
            RequestId::Number(7),
            JsonRpcError::invalid_params("Unknown tool: nope"),
        );

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["code"], error_codes::INVALID_PARAMS);

        let parsed: JsonRpcResponse = serde_json::from_value(value).unwrap();
        assert!(parsed.result.is_none());
        assert!(parsed.error.unwrap().message.contains("nope"));
    }

    #[test]
    fn test_tool_descriptor_defaults() {
        // Missing description and inputSchema must not fail discovery.
        let minimal = json!({ "name": "echo" });
        let descriptor: ToolDescriptor = serde_json::from_value(minimal).unwrap();
        assert_eq!(descriptor.name, "echo");
        assert_eq!(descriptor.description, "");
        assert_eq!(descriptor.input_schema, json!({}));
    }

    #[test]
    fn test_tool_descriptor_wire_names() {
        let descriptor = ToolDescriptor {
            name: "readFile".to_string(),
            description: "Read a file".to_string(),
            input_schema: json!({ "type": "object" }),
        };

        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["inputSchema"]["type"], "object");
    }

    #[test]
    fn test_call_tool_result_unknown_content_kind() {
        // A non-text content item still deserializes.
        let raw = json!({
            "content": [{ "type": "image", "data": "..." }],
            "isError": false
        });

        let result: CallToolResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result.content[0].kind, "image");
        assert!(result.content[0].text.is_none());
    }

    #[test]
    fn test_initialize_roundtrip() {
        let request = InitializeRequest::new(
            PROTOCOL_VERSION,
            Implementation::new("sandbridge", "0.1.0"),
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(value["clientInfo"]["name"], "sandbridge");

        let response = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": "sandbridge-server", "version": "0.1.0" }
        });
        let parsed: InitializeResponse = serde_json::from_value(response).unwrap();
        assert!(parsed.capabilities.tools.is_some());
    }
}
