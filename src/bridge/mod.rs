//! Tool bridge: discovered descriptors to validated callables.
//!
//! [`ToolBridge::new`] takes a connected [`RemoteToolClient`] and its
//! discovered descriptor set and produces one [`CallableTool`] per
//! descriptor. Each callable validates its input against the translated
//! schema, dispatches through the client, and normalizes every outcome into
//! a [`ToolResult`]. A tool failure must never crash the owning session, so
//! nothing here propagates a fault to the agent loop.

pub mod schema;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::mcp::client::RemoteToolClient;
use crate::mcp::types::ToolDescriptor;
use schema::{SchemaNode, ValidationError};

/// Normalized result of one tool invocation. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub ok: bool,
    pub value: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl ToolResult {
    pub fn success(value: serde_json::Value) -> Self {
        Self {
            ok: true,
            value: Some(value),
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            error_message: Some(message.into()),
        }
    }

    /// Failure that still carries the remote payload (a tool-reported error
    /// travels as data).
    pub fn failure_with_value(value: serde_json::Value, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: Some(value),
            error_message: Some(message.into()),
        }
    }
}

/// One invokable tool produced by the bridge.
///
/// `invoke` closes over the owning client and the tool's name; the callable
/// is valid for the lifetime of the bridge that created it.
pub struct CallableTool {
    name: String,
    description: String,
    validator: SchemaNode,
    client: Arc<RemoteToolClient>,
    revoked: Arc<AtomicBool>,
}

impl CallableTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Validate arguments against the tool's input contract, returning the
    /// normalized arguments on success.
    pub fn validate(&self, args: &serde_json::Value) -> Result<serde_json::Value, ValidationError> {
        self.validator.validate(args)
    }

    /// Validate and invoke the tool.
    ///
    /// Every failure mode is folded into the returned [`ToolResult`]:
    /// - validation failure: `ok: false`, the remote side is never called;
    /// - revoked bridge or lost connection: `ok: false`;
    /// - dispatch failure (network, remote fault): `ok: false` with the
    ///   rejection message;
    /// - tool-reported failure (`isError`): `ok: false` with the payload
    ///   retained in `value`.
    pub async fn invoke(&self, args: serde_json::Value) -> ToolResult {
        let validated = match self.validate(&args) {
            Ok(validated) => validated,
            Err(e) => {
                debug!("tool {} rejected arguments: {e}", self.name);
                return ToolResult::failure(format!("invalid arguments: {e}"));
            }
        };

        if self.revoked.load(Ordering::SeqCst) {
            return ToolResult::failure(format!(
                "tool {} belongs to a revoked bridge; no new invocations are dispatched",
                self.name
            ));
        }

        match self.client.call_tool(&self.name, validated).await {
            Ok(outcome) if outcome.is_error => {
                let message = match &outcome.value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                ToolResult::failure_with_value(outcome.value, message)
            }
            Ok(outcome) => ToolResult::success(outcome.value),
            Err(e) => {
                warn!("tool {} dispatch failed: {e}", self.name);
                ToolResult::failure(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for CallableTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableTool")
            .field("name", &self.name)
            .field("revoked", &self.revoked.load(Ordering::SeqCst))
            .finish()
    }
}

/// Mapping from tool name to callable, built from one discovery result.
///
/// Valid only while the underlying client is connected; invoking a tool
/// after disconnection fails with a not-connected error rather than
/// silently doing nothing.
pub struct ToolBridge {
    tools: HashMap<String, CallableTool>,
    revoked: Arc<AtomicBool>,
}

impl ToolBridge {
    /// Build the callable set from discovered descriptors.
    ///
    /// Tool names in the result exactly match descriptor names. If the
    /// remote side reports duplicate names, the later descriptor silently
    /// overwrites the earlier one (last-write-wins); this mirrors the
    /// remote catalog's own behavior and is not treated as an error.
    pub fn new(client: Arc<RemoteToolClient>, descriptors: Vec<ToolDescriptor>) -> Self {
        let revoked = Arc::new(AtomicBool::new(false));
        let mut tools = HashMap::new();

        for descriptor in descriptors {
            if tools.contains_key(&descriptor.name) {
                debug!(
                    "duplicate tool name '{}' discovered; keeping the later entry",
                    descriptor.name
                );
            }

            let callable = CallableTool {
                name: descriptor.name.clone(),
                description: descriptor.description,
                validator: SchemaNode::parse(&descriptor.input_schema),
                client: Arc::clone(&client),
                revoked: Arc::clone(&revoked),
            };
            tools.insert(descriptor.name, callable);
        }

        debug!("bridge built with {} tools", tools.len());
        Self { tools, revoked }
    }

    /// Look up a callable by name.
    pub fn get(&self, name: &str) -> Option<&CallableTool> {
        self.tools.get(name)
    }

    /// All callables, keyed by name.
    pub fn tools(&self) -> &HashMap<String, CallableTool> {
        &self.tools
    }

    /// Sorted tool names, for prompt assembly and diagnostics.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Revoke this bridge's callables.
    ///
    /// In-flight invocations finish or fail on their own; new invocations
    /// through any callable of this bridge fail without dispatching. Used by
    /// the session manager when a rebuilt bridge replaces this one.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Whether this bridge has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ToolBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBridge")
            .field("tools", &self.names())
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::mcp::transport::{McpTransport, TransportError};
    use crate::mcp::types::{Implementation, InitializeResponse, ServerCapabilities};

    /// Transport whose tools/call either fails or echoes a canned payload,
    /// counting dispatches.
    struct ScriptedTransport {
        fail_calls: bool,
        call_text: String,
        is_error: bool,
        dispatches: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn ok(call_text: &str) -> Self {
            Self {
                fail_calls: false,
                call_text: call_text.to_string(),
                is_error: false,
                dispatches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing() -> Self {
            Self {
                fail_calls: true,
                call_text: String::new(),
                is_error: false,
                dispatches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn tool_error(call_text: &str) -> Self {
            Self {
                fail_calls: false,
                call_text: call_text.to_string(),
                is_error: true,
                dispatches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl McpTransport for ScriptedTransport {
        async fn open(&self) -> Result<InitializeResponse, TransportError> {
            Ok(InitializeResponse {
                protocol_version: "2024-11-05".to_string(),
                capabilities: ServerCapabilities::default(),
                server_info: Implementation::new("scripted", "0.0.0"),
            })
        }

        async fn request(
            &self,
            method: &str,
            _params: serde_json::Value,
        ) -> Result<serde_json::Value, TransportError> {
            if method == "tools/call" {
                self.dispatches.fetch_add(1, Ordering::SeqCst);
                if self.fail_calls {
                    return Err(TransportError::Rpc("remote call rejected".to_string()));
                }
                return Ok(json!({
                    "content": [{ "type": "text", "text": self.call_text }],
                    "isError": self.is_error
                }));
            }
            Ok(json!({}))
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }

        fn endpoint(&self) -> &str {
            "http://scripted"
        }
    }

    async fn connected_client(transport: ScriptedTransport) -> Arc<RemoteToolClient> {
        let client = Arc::new(RemoteToolClient::new(Box::new(transport)));
        client.connect().await.unwrap();
        client
    }

    fn list_files_descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "listFiles".to_string(),
            description: "List files".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }),
        }
    }

    #[tokio::test]
    async fn test_bridge_builds_callables_with_descriptor_names() {
        let client = connected_client(ScriptedTransport::ok("{}")).await;
        let bridge = ToolBridge::new(client, vec![list_files_descriptor()]);

        assert_eq!(bridge.len(), 1);
        let tool = bridge.get("listFiles").unwrap();
        assert_eq!(tool.name(), "listFiles");
        assert_eq!(tool.description(), "List files");
    }

    #[tokio::test]
    async fn test_validation_failure_skips_dispatch() {
        let transport = ScriptedTransport::ok("{}");
        let dispatches = Arc::clone(&transport.dispatches);
        let client = connected_client(transport).await;
        let bridge = ToolBridge::new(client, vec![list_files_descriptor()]);

        let result = bridge.get("listFiles").unwrap().invoke(json!({})).await;
        assert!(!result.ok);
        assert!(result.error_message.unwrap().contains("path"));
        assert_eq!(dispatches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_arguments_are_dispatched() {
        let client = connected_client(ScriptedTransport::ok(r#"{"files":[],"count":0}"#)).await;
        let bridge = ToolBridge::new(client, vec![list_files_descriptor()]);

        let result = bridge
            .get("listFiles")
            .unwrap()
            .invoke(json!({ "path": "/" }))
            .await;
        assert!(result.ok);
        assert_eq!(result.value.unwrap()["count"], 0);
    }

    #[tokio::test]
    async fn test_rejected_dispatch_is_folded_into_result() {
        let client = connected_client(ScriptedTransport::failing()).await;
        let bridge = ToolBridge::new(client, vec![list_files_descriptor()]);

        let result = bridge
            .get("listFiles")
            .unwrap()
            .invoke(json!({ "path": "/" }))
            .await;
        assert!(!result.ok);
        assert!(result.error_message.unwrap().contains("remote call rejected"));
    }

    #[tokio::test]
    async fn test_tool_reported_error_carried_as_data() {
        let client =
            connected_client(ScriptedTransport::tool_error(r#"{"error":"no such file"}"#)).await;
        let bridge = ToolBridge::new(client, vec![list_files_descriptor()]);

        let result = bridge
            .get("listFiles")
            .unwrap()
            .invoke(json!({ "path": "/" }))
            .await;
        assert!(!result.ok);
        assert_eq!(result.value.unwrap()["error"], "no such file");
    }

    #[tokio::test]
    async fn test_invoke_after_disconnect_fails() {
        let client = connected_client(ScriptedTransport::ok("{}")).await;
        let bridge = ToolBridge::new(Arc::clone(&client), vec![list_files_descriptor()]);

        client.disconnect().await.unwrap();

        let result = bridge
            .get("listFiles")
            .unwrap()
            .invoke(json!({ "path": "/" }))
            .await;
        assert!(!result.ok);
        assert!(result.error_message.unwrap().contains("not connected"));
    }

    #[tokio::test]
    async fn test_duplicate_names_last_write_wins() {
        let client = connected_client(ScriptedTransport::ok("{}")).await;
        let first = ToolDescriptor {
            name: "echo".to_string(),
            description: "first".to_string(),
            input_schema: json!({}),
        };
        let second = ToolDescriptor {
            name: "echo".to_string(),
            description: "second".to_string(),
            input_schema: json!({}),
        };

        let bridge = ToolBridge::new(client, vec![first, second]);
        assert_eq!(bridge.len(), 1);
        assert_eq!(bridge.get("echo").unwrap().description(), "second");
    }

    #[tokio::test]
    async fn test_revoked_bridge_blocks_new_invocations() {
        let transport = ScriptedTransport::ok("{}");
        let dispatches = Arc::clone(&transport.dispatches);
        let client = connected_client(transport).await;
        let bridge = ToolBridge::new(client, vec![list_files_descriptor()]);

        bridge.revoke();
        assert!(bridge.is_revoked());

        let result = bridge
            .get("listFiles")
            .unwrap()
            .invoke(json!({ "path": "/" }))
            .await;
        assert!(!result.ok);
        assert!(result.error_message.unwrap().contains("revoked"));
        assert_eq!(dispatches.load(Ordering::SeqCst), 0);
    }
}
