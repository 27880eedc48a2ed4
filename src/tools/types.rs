//! Shared types and traits for the sandbox tool system.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::mcp::types::ToolDescriptor;

/// Errors that can occur during tool execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Per-registry context threaded into every tool invocation.
///
/// Capabilities (currently only jq availability) are probed once when the
/// context is built and carried here, scoped to one registry rather than
/// held in process-wide state.
#[derive(Debug, Clone)]
pub struct ToolContext {
    workspace_root: PathBuf,
    outputs_dir: PathBuf,
    jq_available: bool,
}

impl ToolContext {
    /// Build a context for the given workspace root, probing capabilities.
    pub fn detect(workspace_root: impl Into<PathBuf>) -> Self {
        let jq_available = std::process::Command::new("jq")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);

        Self::with_capabilities(workspace_root, jq_available)
    }

    /// Build a context with explicitly chosen capabilities (used by tests).
    pub fn with_capabilities(workspace_root: impl Into<PathBuf>, jq_available: bool) -> Self {
        let workspace_root = workspace_root.into();
        let outputs_dir = workspace_root.join("outputs");
        Self {
            workspace_root,
            outputs_dir,
            jq_available,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    pub fn jq_available(&self) -> bool {
        self.jq_available
    }

    /// Resolve a user-supplied path beneath the workspace root.
    ///
    /// Leading slashes are treated as workspace-relative ("/src" is
    /// `{root}/src`), matching how the agent addresses the sandbox.
    pub fn resolve(&self, user_path: &str) -> PathBuf {
        let clean = user_path.trim_start_matches('/');
        if clean.is_empty() {
            self.workspace_root.clone()
        } else {
            self.workspace_root.join(clean)
        }
    }

    /// A resolved path rendered workspace-relative for results.
    pub fn relativize(&self, path: &Path) -> String {
        match path.strip_prefix(&self.workspace_root) {
            Ok(relative) => format!("/{}", relative.to_string_lossy()),
            Err(_) => path.to_string_lossy().to_string(),
        }
    }
}

/// Trait for implementing sandbox tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the descriptor for this tool: name, description, and the
    /// JSON schema for its input.
    fn descriptor(&self) -> ToolDescriptor;

    /// Invokes the tool with the given context and JSON arguments.
    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;
}

/// Extract a required string argument.
pub(crate) fn require_str<'a>(
    args: &'a serde_json::Value,
    name: &str,
) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidInput(format!("{name} required")))
}

/// Extract a required integer argument.
pub(crate) fn require_u64(args: &serde_json::Value, name: &str) -> Result<u64, ToolError> {
    args.get(name)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ToolError::InvalidInput(format!("{name} required")))
}
