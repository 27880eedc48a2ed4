//! Sandbox provisioning seam.
//!
//! The provisioning service is a black box reached over HTTP; this module
//! only models the handful of operations the orchestrator needs: create an
//! environment, run a command in it (optionally detached), resolve its
//! public endpoint, and tear it down. [`HttpSandboxProvider`] is the thin
//! production wrapper; tests substitute their own [`SandboxProvider`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from the provisioning service.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Requested shape of a new sandbox environment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSpec {
    /// Git repository cloned into the environment.
    pub repo_url: String,
    pub vcpus: u32,
    /// Ports exposed by the environment.
    pub ports: Vec<u16>,
    /// Maximum lifetime before the provider reclaims the environment.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for SandboxSpec {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            vcpus: 4,
            ports: vec![crate::config::DEFAULT_TOOL_SERVER_PORT],
            timeout: Duration::from_secs(45 * 60),
        }
    }
}

mod duration_secs {
    use super::Duration;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}

/// Handle to a provisioned environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxHandle {
    pub id: String,
    /// Public domain under which the environment's ports are reachable.
    pub domain: String,
}

/// A command to run inside an environment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    pub cmd: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl CommandSpec {
    pub fn new(cmd: impl Into<String>, args: &[&str]) -> Self {
        Self {
            cmd: cmd.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Render for diagnostics ("npm install" style).
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.cmd.clone()
        } else {
            format!("{} {}", self.cmd, self.args.join(" "))
        }
    }
}

/// Outcome of a completed (non-detached) command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub exit_code: i32,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Captured output for failure diagnostics, stderr first.
    pub fn combined_output(&self) -> String {
        let mut out = self.stderr.trim().to_string();
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(stdout);
        }
        out
    }
}

/// Operations the orchestrator needs from a provisioning backend.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Provision a new environment.
    async fn create(&self, spec: &SandboxSpec) -> Result<SandboxHandle, ProviderError>;

    /// Run a command to completion inside the environment.
    async fn run_command(
        &self,
        sandbox: &SandboxHandle,
        command: &CommandSpec,
    ) -> Result<CommandOutcome, ProviderError>;

    /// Launch a command detached: fire to running, do not await its exit.
    /// Liveness is tracked only via the health-check loop, never via this
    /// call's own completion.
    async fn start_detached(
        &self,
        sandbox: &SandboxHandle,
        command: &CommandSpec,
    ) -> Result<(), ProviderError>;

    /// Public URL for a port exposed by the environment.
    fn endpoint_url(&self, sandbox: &SandboxHandle, port: u16) -> String;

    /// Tear the environment down.
    async fn stop(&self, sandbox: &SandboxHandle) -> Result<(), ProviderError>;
}

/// HTTP implementation against the provisioning service's REST surface.
pub struct HttpSandboxProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSandboxProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(ProviderError::Http { status, message })
        }
    }
}

#[async_trait]
impl SandboxProvider for HttpSandboxProvider {
    async fn create(&self, spec: &SandboxSpec) -> Result<SandboxHandle, ProviderError> {
        debug!("provisioning sandbox from {}", spec.repo_url);

        let response = self
            .client
            .post(format!("{}/v1/sandboxes", self.base_url))
            .json(spec)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn run_command(
        &self,
        sandbox: &SandboxHandle,
        command: &CommandSpec,
    ) -> Result<CommandOutcome, ProviderError> {
        debug!("sandbox {}: running {}", sandbox.id, command.display());

        let response = self
            .client
            .post(format!(
                "{}/v1/sandboxes/{}/commands",
                self.base_url, sandbox.id
            ))
            .json(&serde_json::json!({
                "cmd": command.cmd,
                "args": command.args,
                "cwd": command.cwd,
                "detached": false,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn start_detached(
        &self,
        sandbox: &SandboxHandle,
        command: &CommandSpec,
    ) -> Result<(), ProviderError> {
        debug!("sandbox {}: starting {} detached", sandbox.id, command.display());

        let response = self
            .client
            .post(format!(
                "{}/v1/sandboxes/{}/commands",
                self.base_url, sandbox.id
            ))
            .json(&serde_json::json!({
                "cmd": command.cmd,
                "args": command.args,
                "cwd": command.cwd,
                "detached": true,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }

    fn endpoint_url(&self, sandbox: &SandboxHandle, port: u16) -> String {
        format!("https://{port}-{}", sandbox.domain)
    }

    async fn stop(&self, sandbox: &SandboxHandle) -> Result<(), ProviderError> {
        debug!("sandbox {}: stopping", sandbox.id);

        let response = self
            .client
            .delete(format!("{}/v1/sandboxes/{}", self.base_url, sandbox.id))
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }
}
