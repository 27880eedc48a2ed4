//! Transport layer for the tool-calling protocol.
//!
//! [`McpTransport`] is the seam between the [`RemoteToolClient`] and the
//! wire: `open` performs the handshake (event channel + initialize),
//! `request` carries one JSON-RPC call, `close` releases the connection.
//! [`HttpTransport`] is the production implementation: JSON-RPC over
//! `POST {base}/rpc` and a Server-Sent Events channel at `GET {base}/events`.
//!
//! [`RemoteToolClient`]: crate::mcp::client::RemoteToolClient

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use super::types::{
    Implementation, InitializeRequest, InitializeResponse, JsonRpcRequest, JsonRpcResponse,
    RequestId, PROTOCOL_VERSION,
};

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors specific to transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("remote error: {0}")]
    Rpc(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TransportError {
    pub fn connection<E: std::fmt::Display>(err: E) -> Self {
        TransportError::Connection(err.to_string())
    }

    pub fn serialization<E: std::fmt::Display>(err: E) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

/// Configuration for transports.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Client name reported in the initialize handshake.
    pub client_name: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            client_name: "sandbridge".to_string(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// Trait for tool-protocol transports.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Establish the connection: open the event channel and complete the
    /// initialize handshake. Returns the server's initialize response.
    async fn open(&self) -> Result<InitializeResponse, TransportError>;

    /// Send one JSON-RPC request and return the `result` payload.
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError>;

    /// Release the underlying connection. Idempotent.
    async fn close(&self) -> Result<(), TransportError>;

    /// The endpoint this transport talks to.
    fn endpoint(&self) -> &str;
}

/// HTTP transport with an SSE event channel.
pub struct HttpTransport {
    /// Client for JSON-RPC requests, bounded by the configured timeout.
    rpc_client: reqwest::Client,
    /// Client for the long-lived event stream (no overall timeout).
    stream_client: reqwest::Client,
    base_url: String,
    next_id: AtomicI64,
    config: TransportConfig,
    event_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl HttpTransport {
    /// Create a new HTTP transport for the given endpoint.
    pub fn new(base_url: impl Into<String>, config: TransportConfig) -> Result<Self, TransportError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let rpc_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TransportError::connection)?;

        let stream_client = reqwest::Client::builder()
            .build()
            .map_err(TransportError::connection)?;

        Ok(Self {
            rpc_client,
            stream_client,
            base_url,
            next_id: AtomicI64::new(1),
            config,
            event_task: Mutex::new(None),
        })
    }

    /// Open the SSE event channel and spawn a background reader for it.
    async fn open_event_channel(&self) -> Result<(), TransportError> {
        let url = format!("{}/events", self.base_url);

        let response = tokio::time::timeout(
            self.config.timeout,
            self.stream_client
                .get(&url)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .send(),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.config.timeout))?
        .map_err(|e| TransportError::connection(format!("failed to open event channel: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Http { status, message });
        }

        info!("event channel open at {url}");

        let mut stream = response.bytes_stream();
        let endpoint = self.base_url.clone();
        let task = tokio::spawn(async move {
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => trace!(
                        "event channel [{endpoint}]: {}",
                        String::from_utf8_lossy(&bytes).trim()
                    ),
                    Err(e) => {
                        debug!("event channel [{endpoint}] closed: {e}");
                        break;
                    }
                }
            }
        });

        let mut guard = self.event_task.lock().await;
        if let Some(previous) = guard.replace(task) {
            previous.abort();
        }

        Ok(())
    }

    /// Send one JSON-RPC envelope to `/rpc` and unwrap the response.
    async fn post_rpc(
        &self,
        method: &str,
        params: serde_json::Value,
        expect_response: bool,
    ) -> Result<serde_json::Value, TransportError> {
        let request = if expect_response {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            trace!("sending request: method={method}, id={id}");
            JsonRpcRequest::new(RequestId::Number(id), method, Some(params))
        } else {
            trace!("sending notification: method={method}");
            JsonRpcRequest::notification(method, Some(params))
        };

        let url = format!("{}/rpc", self.base_url);
        let response = self
            .rpc_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.config.timeout)
                } else {
                    TransportError::connection(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Http { status, message });
        }

        if !expect_response {
            return Ok(serde_json::json!({}));
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(TransportError::Rpc(error.message));
        }

        Ok(envelope.result.unwrap_or_else(|| serde_json::json!({})))
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn open(&self) -> Result<InitializeResponse, TransportError> {
        self.open_event_channel().await?;

        let client_info = Implementation::new(
            self.config.client_name.clone(),
            env!("CARGO_PKG_VERSION"),
        );
        let init = InitializeRequest::new(PROTOCOL_VERSION, client_info);
        let params = serde_json::to_value(&init).map_err(TransportError::serialization)?;

        let result = match self.post_rpc("initialize", params, true).await {
            Ok(result) => result,
            Err(e) => {
                // Handshake failed: release the event channel so a retry
                // starts from a clean slate.
                let _ = self.close().await;
                return Err(e);
            }
        };

        let response: InitializeResponse = serde_json::from_value(result)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        if let Err(e) = self
            .post_rpc("notifications/initialized", serde_json::json!({}), false)
            .await
        {
            warn!("failed to send initialized notification: {e}");
        }

        info!(
            "connected to {} ({} {})",
            self.base_url, response.server_info.name, response.server_info.version
        );

        Ok(response)
    }

    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        self.post_rpc(method, params, true).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.event_task.try_lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }
}
