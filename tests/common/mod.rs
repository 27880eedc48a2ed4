//! Shared helpers for integration tests.
#![allow(dead_code)]

pub mod mock_provider;

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tokio::task::JoinHandle;

use sandbridge_lib::server::{self, ServerState};
use sandbridge_lib::tools::{ToolContext, ToolRegistry};

/// Spawn the real tool server on an ephemeral port over the given workspace.
/// Returns the base URL and the server task handle.
pub async fn spawn_tool_server(workspace: &Path) -> (String, JoinHandle<()>) {
    let registry = ToolRegistry::new(ToolContext::with_capabilities(workspace, false));
    let state = Arc::new(ServerState::new(registry));
    let app = server::router(state);

    serve(app).await
}

/// Health endpoint that fails the first `fail_first` probes and reports
/// healthy afterwards. Returns the base URL, the probe counter, and the
/// server task handle.
pub async fn spawn_health_server(fail_first: u32) -> (String, Arc<AtomicU32>, JoinHandle<()>) {
    #[derive(Clone)]
    struct HealthState {
        counter: Arc<AtomicU32>,
        fail_first: u32,
    }

    async fn health(State(state): State<HealthState>) -> (StatusCode, Json<serde_json::Value>) {
        let attempt = state.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= state.fail_first {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "starting" })),
            )
        } else {
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ok",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
        }
    }

    let counter = Arc::new(AtomicU32::new(0));
    let state = HealthState {
        counter: Arc::clone(&counter),
        fail_first,
    };
    let app = Router::new().route("/health", get(health)).with_state(state);

    let (url, handle) = serve(app).await;
    (url, counter, handle)
}

/// Health endpoint that always answers 200 but never with the "ok"
/// sentinel. Returns the base URL, the probe counter, and the task handle.
pub async fn spawn_tool_server_with_bad_health() -> (String, Arc<AtomicU32>, JoinHandle<()>) {
    let counter = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&counter);
    let app = Router::new().route(
        "/health",
        get(move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({ "status": "degraded" }))
            }
        }),
    );

    let (url, handle) = serve(app).await;
    (url, counter, handle)
}

async fn serve(app: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}
