//! Application configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

/// Default port the tool server listens on.
pub const DEFAULT_TOOL_SERVER_PORT: u16 = 3002;

/// Default endpoint used when local mode is enabled.
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:3002";

/// Top-level application configuration.
///
/// Every field has an environment override; `load()` reads a `.env` file
/// first so local development does not need exported variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// When true, the orchestrator skips sandbox provisioning entirely and
    /// targets `local_endpoint`, still subject to the health check.
    pub use_local: bool,
    /// Fixed tool-server endpoint used in local mode.
    pub local_endpoint: String,
    /// Base URL of the sandbox provisioning service.
    pub sandbox_api_url: String,
    /// Git repository cloned into freshly provisioned sandboxes.
    pub repo_url: String,
    /// Port the tool server binds (server side) and is probed on (client side).
    pub port: u16,
    /// Root directory all tool paths are resolved beneath.
    pub workspace_root: PathBuf,
    /// Timeout for requests against the provisioning service.
    pub provider_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            use_local: false,
            local_endpoint: DEFAULT_LOCAL_ENDPOINT.to_string(),
            sandbox_api_url: "http://localhost:8080".to_string(),
            repo_url: String::new(),
            port: DEFAULT_TOOL_SERVER_PORT,
            workspace_root: PathBuf::from("/workspace"),
            provider_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Load configuration from a `.env` file (if present) and the process
    /// environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Read configuration from the process environment only.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            use_local: env_flag("USE_LOCAL"),
            local_endpoint: env_or("LOCAL_TOOL_SERVER_URL", &defaults.local_endpoint),
            sandbox_api_url: env_or("SANDBOX_API_URL", &defaults.sandbox_api_url),
            repo_url: env_or("SANDBOX_REPO_URL", &defaults.repo_url),
            port: std::env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.port),
            workspace_root: std::env::var("WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            provider_timeout: defaults.provider_timeout,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|value| {
            let v = value.trim().to_ascii_lowercase();
            v == "true" || v == "1" || v == "yes"
        })
        .unwrap_or(false)
}
