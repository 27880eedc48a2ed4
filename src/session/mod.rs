//! Agent session lifecycle.
//!
//! [`AgentSession`] owns the full chain for one session: it drives the
//! [`SessionOrchestrator`] to a ready endpoint, connects a
//! [`RemoteToolClient`] against it, discovers the tool catalog, and builds
//! the [`ToolBridge`] whose callable set is handed to an external
//! agent-loop/model driver (the loop itself lives outside this crate).

use std::sync::Arc;

use tracing::info;

use crate::bridge::ToolBridge;
use crate::bus::EventBus;
use crate::mcp::client::RemoteToolClient;
use crate::mcp::transport::{HttpTransport, TransportConfig};
use crate::sandbox::provider::SandboxProvider;
use crate::sandbox::{SandboxSession, SessionConfig, SessionError, SessionOrchestrator};

/// System prompt handed to the model driver together with the tool set.
pub const SYSTEM_PROMPT: &str = r#"You are a developer agent with access to a sandboxed development environment.

<capabilities>
You have access to a complete development sandbox where you can:
- Explore the filesystem with listFiles
- Read files with readFile, tail, or readLines (for specific line ranges)
- Write files with writeFile
- Execute shell commands with executeCommand
- Analyze TypeScript code with analyzeFunctions
- Search files with grep
- Parse JSON files with parseJson

All operations run in an isolated sandbox environment.
</capabilities>

<filesystem>
The filesystem starts at /workspace:
- Use "/" or "/workspace" to access the root
- All paths are relative to /workspace
- Create any directory structure you need
</filesystem>

<output_management>
When you execute commands, the output is automatically redirected to files to keep context clean:
- stdout and stderr are saved to /workspace/outputs/cmd-{timestamp}-stdout.txt and -stderr.txt
- Use tail to read the last N lines of output files
- Use readLines to read specific line ranges
- Use grep to search for patterns in output files
</output_management>

<workflow>
1. Explore - Use listFiles("/") to understand the workspace structure
2. Read - Use readFile for small files, tail for recent output, readLines for specific sections
3. Write - Use writeFile to create or update files
4. Execute - Use executeCommand to run commands (outputs go to files automatically)
5. Check - Use tail to check last lines of output, grep to search for errors
6. Iterate - Fix issues and retry as needed
</workflow>

Always provide clear, helpful responses that explain what you're doing and what the results mean.
Assume the user can't see the results of the tool calls, so summarize important information for them."#;

/// Owner of one session's orchestrator, client, and bridge.
///
/// Guarantees at most one live bridge per session: rebuilding revokes the
/// previous bridge's callables before the replacement is exposed.
pub struct AgentSession {
    orchestrator: SessionOrchestrator,
    transport_config: TransportConfig,
    client: Option<Arc<RemoteToolClient>>,
    bridge: Option<Arc<ToolBridge>>,
}

impl AgentSession {
    pub fn new(
        provider: Arc<dyn SandboxProvider>,
        config: SessionConfig,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            orchestrator: SessionOrchestrator::new(provider, config, bus),
            transport_config: TransportConfig::default(),
            client: None,
            bridge: None,
        }
    }

    /// Override the transport configuration used for the tool client.
    pub fn with_transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// Bring the session up end to end and return the callable tool set.
    pub async fn start(&mut self) -> Result<Arc<ToolBridge>, SessionError> {
        let endpoint = self.orchestrator.start().await?;

        let transport = HttpTransport::new(endpoint.clone(), self.transport_config.clone())
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        let client = Arc::new(RemoteToolClient::new(Box::new(transport)));
        client
            .connect()
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        self.client = Some(Arc::clone(&client));
        self.install_bridge(client).await
    }

    /// Rebuild the bridge against the already-connected client, e.g. after
    /// the remote catalog changed. The previous bridge is revoked first.
    pub async fn rebuild_bridge(&mut self) -> Result<Arc<ToolBridge>, SessionError> {
        let client = self
            .client
            .as_ref()
            .cloned()
            .ok_or_else(|| SessionError::Connection("session has no client".to_string()))?;
        self.install_bridge(client).await
    }

    async fn install_bridge(
        &mut self,
        client: Arc<RemoteToolClient>,
    ) -> Result<Arc<ToolBridge>, SessionError> {
        let descriptors = client
            .list_tools()
            .await
            .map_err(|e| SessionError::Discovery(e.to_string()))?;

        if let Some(previous) = self.bridge.take() {
            previous.revoke();
        }

        let bridge = Arc::new(ToolBridge::new(client, descriptors));
        info!(
            "session {}: bridge ready with tools [{}]",
            self.orchestrator.session_id(),
            bridge.names().join(", ")
        );
        self.bridge = Some(Arc::clone(&bridge));
        Ok(bridge)
    }

    /// The live bridge, if the session has reached ready.
    pub fn bridge(&self) -> Option<Arc<ToolBridge>> {
        self.bridge.clone()
    }

    /// Observable session snapshot (state, endpoint, last message, error).
    pub fn session(&self) -> &SandboxSession {
        self.orchestrator.session()
    }

    /// Retry a failed session from scratch and rebuild the tool set.
    pub async fn retry(&mut self) -> Result<Arc<ToolBridge>, SessionError> {
        if let Some(previous) = self.bridge.take() {
            previous.revoke();
        }
        if let Some(client) = self.client.take() {
            let _ = client.disconnect().await;
        }

        let endpoint = self.orchestrator.retry().await?;

        let transport = HttpTransport::new(endpoint, self.transport_config.clone())
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        let client = Arc::new(RemoteToolClient::new(Box::new(transport)));
        client
            .connect()
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        self.client = Some(Arc::clone(&client));
        self.install_bridge(client).await
    }

    /// Tear the session down: revoke the bridge, disconnect the client, and
    /// release the sandbox environment.
    pub async fn shutdown(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.revoke();
        }
        if let Some(client) = self.client.take() {
            let _ = client.disconnect().await;
        }
        self.orchestrator.stop().await;
    }
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("orchestrator", &self.orchestrator)
            .field("has_client", &self.client.is_some())
            .field("has_bridge", &self.bridge.is_some())
            .finish()
    }
}
