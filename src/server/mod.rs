//! HTTP trigger for probe runs.
//!
//! `POST /api/run-tests` runs every probe and returns the report. Callers
//! must present the shared secret in the `x-cron-secret` header; the
//! orchestrator is not invoked otherwise.

use crate::models::RunReport;
use crate::runner::{RunError, Runner};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Header carrying the shared trigger secret.
pub const SECRET_HEADER: &str = "x-cron-secret";

/// Application state
pub struct AppState {
    pub runner: Runner,
    /// Expected trigger secret. `None` rejects every trigger.
    pub secret: Option<String>,
}

impl AppState {
    pub fn new(runner: Runner, secret: Option<String>) -> Self {
        Self { runner, secret }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        match (headers.get(SECRET_HEADER), self.secret.as_deref()) {
            (Some(given), Some(expected)) => given.as_bytes() == expected.as_bytes(),
            _ => false,
        }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/run-tests", post(run_tests))
        .route("/api/probes", get(list_probes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

/// Liveness endpoint
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Run every probe once
async fn run_tests(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        warn!("Rejected run trigger without a valid secret");
        return unauthorized();
    }

    // Spawned so a dropped connection does not cancel probes mid-run.
    let run = tokio::spawn(async move { state.runner.run_all().await });
    match run.await {
        Ok(result) => run_response(result),
        Err(e) => {
            error!("Run task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    success: false,
                    message: "Runner crashed".to_string(),
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Registered probe ids in registry order
async fn list_probes(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }

    let probes: Vec<ProbeEntry> = state
        .runner
        .registry()
        .iter()
        .map(|entry| ProbeEntry {
            id: entry.id.to_string(),
            kind: entry.probe.kind().to_string(),
        })
        .collect();

    Json(probes).into_response()
}

/// Map a run result onto the wire.
///
/// A report is returned even when probes failed; only an orchestrator
/// fault produces the error shape.
pub fn run_response(result: Result<RunReport, RunError>) -> Response {
    match result {
        Ok(report) => (
            StatusCode::OK,
            Json(RunResponse {
                success: true,
                report,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Runner crashed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    success: false,
                    message: "Runner crashed".to_string(),
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            success: false,
            message: "Unauthorized".to_string(),
            error: None,
        }),
    )
        .into_response()
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Successful run response: the report plus a success flag.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: RunReport,
}

#[derive(Debug, Serialize)]
pub struct ProbeEntry {
    pub id: String,
    pub kind: String,
}

/// API error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
