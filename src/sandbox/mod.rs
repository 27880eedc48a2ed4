//! Sandbox session orchestration.
//!
//! [`SessionOrchestrator`] is the state machine that takes a session from
//! nothing to a ready tool-server endpoint:
//!
//! ```text
//! idle -> creating -> installing -> starting -> connecting -> ready
//!                 \__ (local mode skips straight here) __/
//! ```
//!
//! `error` is reachable from every non-terminal state; `ready` and `error`
//! are terminal for an attempt, and retry re-enters `creating` from scratch
//! (a failed environment is never partially reused). Every transition
//! publishes a human-readable progress message on the event bus, which is
//! the orchestrator's only coupling to the presentation layer.

pub mod health;
pub mod provider;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::EventBus;
use crate::config::AppConfig;
use health::{HealthConfig, HealthPoller};
use provider::{CommandSpec, SandboxHandle, SandboxProvider, SandboxSpec};

/// States of one sandbox session attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No resources allocated.
    Idle,
    /// Environment provisioning requested.
    Creating,
    /// Dependency installation inside a freshly created environment.
    /// Entered only in provisioned mode.
    Installing,
    /// Tool-server process launched detached; not awaited.
    Starting,
    /// Endpoint resolved; health polling in progress.
    Connecting,
    /// Endpoint healthy and exposed. Terminal for this attempt.
    Ready,
    /// Attempt failed. Terminal; retry restarts from `Creating`.
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Creating => "creating",
            SessionState::Installing => "installing",
            SessionState::Starting => "starting",
            SessionState::Connecting => "connecting",
            SessionState::Ready => "ready",
            SessionState::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Observable snapshot of a session. Mutated only by the orchestrator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSession {
    pub state: SessionState,
    pub endpoint_url: Option<String>,
    pub last_message: String,
    pub error: Option<String>,
}

impl SandboxSession {
    fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            endpoint_url: None,
            last_message: String::new(),
            error: None,
        }
    }
}

/// Errors terminating a session attempt.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Environment creation failed.
    #[error("sandbox provisioning failed: {0}")]
    Provisioning(String),
    /// Dependency installation exited non-zero; carries captured output.
    #[error("dependency install failed: {output}")]
    Install { output: String },
    /// The detached tool-server launch was rejected.
    #[error("failed to start tool server: {0}")]
    Start(String),
    /// The endpoint never became healthy within the polling budget.
    #[error(transparent)]
    HealthTimeout(#[from] health::HealthTimeout),
    /// Handshake to a resolved endpoint failed.
    #[error("connection to tool server failed: {0}")]
    Connection(String),
    /// Tool discovery against a connected endpoint failed.
    #[error("tool discovery failed: {0}")]
    Discovery(String),
}

/// Configuration for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Skip provisioning and target `local_endpoint` directly.
    pub local_mode: bool,
    /// Fixed endpoint used in local mode.
    pub local_endpoint: String,
    /// Environment shape requested from the provider.
    pub spec: SandboxSpec,
    /// Dependency install step run in a fresh environment.
    pub install_command: CommandSpec,
    /// Detached tool-server launch.
    pub start_command: CommandSpec,
    /// Port the tool server listens on inside the environment.
    pub port: u16,
    /// Health poll pacing.
    pub health: HealthConfig,
}

impl SessionConfig {
    /// Derive a session configuration from the application config.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            local_mode: config.use_local,
            local_endpoint: config.local_endpoint.clone(),
            spec: SandboxSpec {
                repo_url: config.repo_url.clone(),
                ports: vec![config.port],
                ..SandboxSpec::default()
            },
            install_command: CommandSpec::new("cargo", &["build", "--release"]),
            start_command: CommandSpec::new("./target/release/sandbridge-server", &[]),
            port: config.port,
            health: HealthConfig::default(),
        }
    }
}

/// State machine provisioning one sandbox session.
///
/// All mutation goes through `&mut self`, so transitions within one
/// orchestrator are strictly sequential.
pub struct SessionOrchestrator {
    session_id: String,
    provider: Arc<dyn SandboxProvider>,
    config: SessionConfig,
    bus: Arc<EventBus>,
    poller: HealthPoller,
    session: SandboxSession,
    sandbox: Option<SandboxHandle>,
}

impl SessionOrchestrator {
    pub fn new(
        provider: Arc<dyn SandboxProvider>,
        config: SessionConfig,
        bus: Arc<EventBus>,
    ) -> Self {
        let poller = HealthPoller::new(config.health.clone());
        Self {
            session_id: Uuid::new_v4().to_string(),
            provider,
            config,
            bus,
            poller,
            session: SandboxSession::idle(),
            sandbox: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current observable session snapshot.
    pub fn session(&self) -> &SandboxSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    /// Drive the state machine to `ready`, returning the endpoint URL.
    ///
    /// On failure the session lands in `error` with the triggering message
    /// captured for display; the error is also returned to the caller. No
    /// automatic retry happens here.
    pub async fn start(&mut self) -> Result<String, SessionError> {
        match self.run_attempt().await {
            Ok(endpoint) => {
                self.session.endpoint_url = Some(endpoint.clone());
                self.transition(
                    SessionState::Ready,
                    format!("Tool server ready at {endpoint}"),
                );
                Ok(endpoint)
            }
            Err(e) => {
                self.session.error = Some(e.to_string());
                self.transition(SessionState::Error, format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Re-attempt after a terminal `error`: tear down any environment left
    /// over from the failed attempt and restart from `creating`.
    pub async fn retry(&mut self) -> Result<String, SessionError> {
        if let Some(sandbox) = self.sandbox.take() {
            if let Err(e) = self.provider.stop(&sandbox).await {
                warn!("failed to stop leftover sandbox {}: {e}", sandbox.id);
            }
        }
        self.session = SandboxSession::idle();
        self.start().await
    }

    /// Release whatever this session owns.
    ///
    /// A provisioned environment gets a stop request; in local mode nothing
    /// is owned and this is a no-op. The session returns to `idle`.
    pub async fn stop(&mut self) {
        if let Some(sandbox) = self.sandbox.take() {
            info!("stopping sandbox {}", sandbox.id);
            if let Err(e) = self.provider.stop(&sandbox).await {
                warn!("failed to stop sandbox {}: {e}", sandbox.id);
            }
        }
        self.session = SandboxSession::idle();
    }

    async fn run_attempt(&mut self) -> Result<String, SessionError> {
        if self.config.local_mode {
            return self.run_local_attempt().await;
        }

        self.transition(SessionState::Creating, "Creating sandbox...".to_string());
        let sandbox = self
            .provider
            .create(&self.config.spec)
            .await
            .map_err(|e| SessionError::Provisioning(e.to_string()))?;
        info!("sandbox {} created", sandbox.id);
        self.sandbox = Some(sandbox.clone());

        self.transition(
            SessionState::Installing,
            "Sandbox created, installing dependencies...".to_string(),
        );
        let install = self
            .provider
            .run_command(&sandbox, &self.config.install_command)
            .await
            .map_err(|e| SessionError::Provisioning(e.to_string()))?;
        if !install.success() {
            return Err(SessionError::Install {
                output: install.combined_output(),
            });
        }

        self.transition(
            SessionState::Starting,
            "Dependencies installed, starting tool server...".to_string(),
        );
        self.provider
            .start_detached(&sandbox, &self.config.start_command)
            .await
            .map_err(|e| SessionError::Start(e.to_string()))?;

        let endpoint = self.provider.endpoint_url(&sandbox, self.config.port);
        self.transition(
            SessionState::Connecting,
            "Waiting for tool server to be ready...".to_string(),
        );
        self.poller.wait_healthy(&endpoint).await?;

        Ok(endpoint)
    }

    async fn run_local_attempt(&mut self) -> Result<String, SessionError> {
        let endpoint = self.config.local_endpoint.clone();
        self.transition(
            SessionState::Creating,
            format!("Using local tool server at {endpoint}"),
        );

        self.transition(
            SessionState::Connecting,
            "Waiting for tool server to be ready...".to_string(),
        );
        self.poller.wait_healthy(&endpoint).await?;

        Ok(endpoint)
    }

    fn transition(&mut self, state: SessionState, message: String) {
        self.session.state = state;
        self.session.last_message = message.clone();
        info!("session {} -> {state}: {message}", self.session_id);

        self.bus.emit(
            "session",
            "session.state_changed",
            Some(self.session_id.clone()),
            serde_json::json!({
                "state": state,
                "message": message,
            }),
        );
    }
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("session_id", &self.session_id)
            .field("state", &self.session.state)
            .field("local_mode", &self.config.local_mode)
            .finish()
    }
}
