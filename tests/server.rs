//! HTTP trigger routes.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pulsecheck::models::ProbeOutcome;
use pulsecheck::probe::probe_fn;
use pulsecheck::registry::ProbeRegistry;
use pulsecheck::runner::Runner;
use pulsecheck::server::{create_router, AppState, SECRET_HEADER};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

fn app(calls: Arc<AtomicUsize>) -> axum::Router {
    let registry = ProbeRegistry::builder()
        .register(
            "campus-chat",
            probe_fn(move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ProbeOutcome::pass("Model replied"))
                }
            }),
        )
        .register(
            "landing-boca",
            probe_fn(|| async { Err(anyhow::anyhow!("connection refused")) }),
        )
        .build()
        .unwrap();

    let state = AppState::new(
        Runner::new(Arc::new(registry)),
        Some("cron-s3cret".to_string()),
    );
    create_router(Arc::new(state))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn trigger(secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/api/run-tests");
    if let Some(secret) = secret {
        builder = builder.header(SECRET_HEADER, secret);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_missing_secret_is_unauthorized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = app(calls.clone()).oneshot(trigger(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Unauthorized");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_secret_is_unauthorized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = app(calls.clone())
        .oneshot(trigger(Some("cron-s3cret-but-longer")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_authorized_trigger_returns_report() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = app(calls.clone())
        .oneshot(trigger(Some("cron-s3cret")))
        .await
        .unwrap();

    // Probe failures are part of a successful run.
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["success"], true);
    assert!(json["runId"].as_str().unwrap().starts_with("run_"));
    assert_eq!(json["allPassed"], false);
    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["summary"]["passed"], 1);
    assert_eq!(json["summary"]["failed"], 1);
    assert_eq!(json["failedIds"], serde_json::json!(["landing-boca"]));
    assert_eq!(
        json["failureDetails"][0],
        "landing-boca → connection refused"
    );
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
    assert!(json["results"][0]["durationMs"].is_u64());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_list_probes_requires_secret() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = app(calls);

    let denied = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/probes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = router
        .oneshot(
            Request::builder()
                .uri("/api/probes")
                .header(SECRET_HEADER, "cron-s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    let json = body_json(allowed).await;
    assert_eq!(json[0]["id"], "campus-chat");
    assert_eq!(json[1]["id"], "landing-boca");
    assert_eq!(json[0]["kind"], "custom");
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = app(Arc::new(AtomicUsize::new(0)))
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}
