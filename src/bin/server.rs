//! Tool server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use sandbridge_lib::config::AppConfig;
use sandbridge_lib::server::{self, ServerState};
use sandbridge_lib::tools::{ToolContext, ToolRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load();

    tokio::fs::create_dir_all(&config.workspace_root).await?;
    let context = ToolContext::detect(config.workspace_root.clone());
    if !context.jq_available() {
        info!("jq not found; parseJson will report it as unavailable");
    }

    let registry = ToolRegistry::new(context);
    let state = Arc::new(ServerState::new(registry));
    let app = server::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("tool server running on http://{addr}");
    info!("  rpc endpoint:   http://{addr}/rpc");
    info!("  event channel:  http://{addr}/events");
    info!("  health check:   http://{addr}/health");
    info!("  workspace root: {}", config.workspace_root.display());

    axum::serve(listener, app).await?;
    Ok(())
}
