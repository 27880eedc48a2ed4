//! Remote tool client.
//!
//! [`RemoteToolClient`] maintains one logical connection to a remote tool
//! server and exposes the two operations the rest of the system needs:
//! discovering the tool catalog and invoking a tool. It owns a boxed
//! [`McpTransport`], so tests can substitute an in-memory transport for the
//! HTTP one.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::transport::{McpTransport, TransportError};
use super::types::{CallToolResult, ListToolsResult, ToolDescriptor};

/// Errors that can occur during client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An operation was attempted while the client is not connected.
    /// This is a sequencing fault under correct orchestration, but it is
    /// checked defensively rather than allowed to silently no-op.
    #[error("client is not connected")]
    NotConnected,
    /// The connection handshake failed; the client remains unconnected.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The transport failed after the connection was established.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The remote side answered with something the client cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Value extracted from a tool call, plus the remote failure flag.
///
/// A tool-reported failure is data, not a fault: the payload describing the
/// error travels in `value` and `is_error` marks it, so the caller can feed
/// both back to the agent loop.
#[derive(Debug, Clone)]
pub struct ToolCallOutcome {
    pub value: serde_json::Value,
    pub is_error: bool,
}

/// Client for a remote tool server.
///
/// At most one live client exists per session. The connection is owned:
/// dropping or disconnecting the client releases it.
pub struct RemoteToolClient {
    transport: Box<dyn McpTransport>,
    connected: AtomicBool,
}

impl RemoteToolClient {
    /// Create an unconnected client over the given transport.
    pub fn new(transport: Box<dyn McpTransport>) -> Self {
        Self {
            transport,
            connected: AtomicBool::new(false),
        }
    }

    /// Connect to the remote endpoint.
    ///
    /// Idempotent: if already connected, returns immediately without
    /// reconnecting. On handshake failure the client stays unconnected and
    /// the caller may retry.
    pub async fn connect(&self) -> Result<(), ClientError> {
        if self.is_connected() {
            return Ok(());
        }

        self.transport
            .open()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Whether the client currently holds a live connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// The endpoint URL this client talks to.
    pub fn endpoint_url(&self) -> &str {
        self.transport.endpoint()
    }

    /// List the tools the remote side currently advertises.
    ///
    /// The result is never cached: each call reflects the remote catalog at
    /// call time.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        self.ensure_connected()?;

        let result = self
            .transport
            .request("tools/list", serde_json::json!({}))
            .await?;

        let listing: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        debug!("discovered {} tools", listing.tools.len());
        Ok(listing.tools)
    }

    /// Call a tool by name with the given arguments.
    ///
    /// Result extraction rule: take the first content item; if its declared
    /// kind is "text", try to parse the text as JSON and fall back to the
    /// raw string when that fails (tool output is heterogeneous and a
    /// malformed payload must never become an exception). No content items
    /// means a null value.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallOutcome, ClientError> {
        self.ensure_connected()?;

        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });

        let result = self.transport.request("tools/call", params).await?;

        let call: CallToolResult = serde_json::from_value(result)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        Ok(ToolCallOutcome {
            value: extract_value(&call),
            is_error: call.is_error.unwrap_or(false),
        })
    }

    /// Disconnect from the remote endpoint. Idempotent: only acts while
    /// connected.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Ok(());
        }

        self.transport.close().await?;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}

impl std::fmt::Debug for RemoteToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteToolClient")
            .field("endpoint", &self.transport.endpoint())
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn extract_value(result: &CallToolResult) -> serde_json::Value {
    let Some(first) = result.content.first() else {
        return serde_json::Value::Null;
    };

    if first.kind != "text" {
        return serde_json::Value::Null;
    }

    let Some(text) = &first.text else {
        return serde_json::Value::Null;
    };

    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => serde_json::Value::String(text.clone()),
    }
}
