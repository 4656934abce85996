// tests/http_tests.rs
mod common;

use common::ScriptedProbe;
use hyper::{Body, Method, Request, StatusCode};
use serde_json::Value;
use service_health::health::{HealthAggregator, ProbeOutcome, ProbeRegistry};
use service_health::metrics::MetricsRegistry;
use service_health::probes::{PostgresProbe, ProcessProbe, RedisProbe};
use service_health::server::{AppState, RequestHandler};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn handler(registry: ProbeRegistry) -> RequestHandler {
    let metrics = MetricsRegistry::new("healthd").unwrap();
    metrics.sink().set_gauge("up", "Application is running", 1.0);
    let aggregator = HealthAggregator::new(Arc::new(registry), metrics.sink());

    RequestHandler::new(Arc::new(AppState {
        service_name: "orders-api".to_string(),
        aggregator,
        metrics,
        metrics_path: "/metrics".to_string(),
        deadline: Duration::from_millis(500),
    }))
}

async fn get(handler: &RequestHandler, path: &str) -> (StatusCode, hyper::HeaderMap, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    let response = handler.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_root_reports_running() {
    let handler = handler(ProbeRegistry::empty());

    let (status, headers, body) = get(&handler, "/").await;
    let json: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(json["status"], "running");
    assert_eq!(json["service"], "orders-api");
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_health_ok_when_all_healthy() {
    let registry = ProbeRegistry::builder()
        .register("app", ProcessProbe::new())
        .register("database", ScriptedProbe::healthy())
        .build()
        .unwrap();
    let handler = handler(registry);

    let (status, _, body) = get(&handler, "/health").await;
    let json: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["app"], "healthy");
    assert_eq!(json["checks"]["database"], "healthy");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_degraded_returns_503_with_reasons() {
    let registry = ProbeRegistry::builder()
        .register("app", ProcessProbe::new())
        .register("database", PostgresProbe::unconfigured())
        .register("redis", RedisProbe::unconfigured())
        .register(
            "search",
            ScriptedProbe::after(Duration::from_secs(30), ProbeOutcome::Healthy),
        )
        .build()
        .unwrap();
    let handler = handler(registry);

    let (status, _, body) = get(&handler, "/health").await;
    let json: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["app"], "healthy");
    assert_eq!(json["checks"]["database"], "unhealthy: not configured");
    assert_eq!(json["checks"]["redis"], "unhealthy: not configured");
    assert_eq!(json["checks"]["search"], "unhealthy: timed out");
}

#[tokio::test]
async fn test_health_checks_keep_registration_order() {
    let registry = ProbeRegistry::builder()
        .register("zeta", ScriptedProbe::healthy())
        .register("alpha", ScriptedProbe::healthy())
        .register("mid", ScriptedProbe::healthy())
        .build()
        .unwrap();
    let handler = handler(registry);

    let (_, _, body) = get(&handler, "/health").await;

    let zeta = body.find("\"zeta\"").unwrap();
    let alpha = body.find("\"alpha\"").unwrap();
    let mid = body.find("\"mid\"").unwrap();
    assert!(zeta < alpha && alpha < mid, "{}", body);
}

#[tokio::test]
async fn test_metrics_reflect_completed_checks() {
    let registry = ProbeRegistry::builder()
        .register("app", ProcessProbe::new())
        .register("database", ScriptedProbe::failing("connection refused"))
        .build()
        .unwrap();
    let handler = handler(registry);

    get(&handler, "/health").await;
    get(&handler, "/health").await;
    let (status, headers, body) = get(&handler, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "text/plain; version=0.0.4");
    assert!(body.contains("# HELP healthd_up Application is running"));
    assert!(body.contains("# TYPE healthd_up gauge"));
    assert!(body.contains("healthd_up 1"));
    assert!(body.contains("# TYPE healthd_checks_total counter"));
    assert!(body.contains("healthd_checks_total 2"));
    assert!(body.contains("healthd_checks_degraded_total 2"));
    assert!(body.contains("healthd_database_unhealthy_total 2"));
    assert!(body.contains("healthd_app_unhealthy_total 0"));
    assert!(body.contains("healthd_last_check_healthy 0"));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let handler = handler(ProbeRegistry::empty());

    let (status, _, body) = get(&handler, "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"not found"}"#);
}

#[tokio::test]
async fn test_non_get_is_405() {
    let handler = handler(ProbeRegistry::empty());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = handler.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET");
}
