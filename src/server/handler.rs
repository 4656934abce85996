// src/server/handler.rs
use crate::health::{DependencyName, HealthAggregator, HealthReport, OverallStatus, ProbeOutcome};
use crate::metrics::{MetricsRegistry, CONTENT_TYPE};
use chrono::{SecondsFormat, Utc};
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE as CONTENT_TYPE_HEADER};
use hyper::{Body, Method, Request, Response, StatusCode};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower::Service;
use tracing::error;

/// Everything the routes need, built once in `main`.
pub struct AppState {
    pub service_name: String,
    pub aggregator: HealthAggregator,
    pub metrics: MetricsRegistry,
    pub metrics_path: String,
    pub deadline: Duration,
}

#[derive(Clone)]
pub struct RequestHandler {
    state: Arc<AppState>,
}

#[derive(Serialize)]
struct InfoBody<'a> {
    status: &'static str,
    service: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
struct HealthBody<'a> {
    status: OverallStatus,
    checks: &'a IndexMap<DependencyName, ProbeOutcome>,
    timestamp: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

enum Route {
    Info,
    Health,
    Metrics,
}

impl RequestHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, hyper::http::Error> {
        let route = match req.uri().path() {
            "/" => Route::Info,
            "/health" => Route::Health,
            path if path == self.state.metrics_path => Route::Metrics,
            _ => return json(StatusCode::NOT_FOUND, &ErrorBody { error: "not found" }),
        };

        if req.method() != Method::GET {
            let mut response = json(
                StatusCode::METHOD_NOT_ALLOWED,
                &ErrorBody {
                    error: "method not allowed",
                },
            )?;
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET"));
            return Ok(response);
        }

        match route {
            Route::Info => self.info(),
            Route::Health => self.health().await,
            Route::Metrics => self.metrics(),
        }
    }

    fn info(&self) -> Result<Response<Body>, hyper::http::Error> {
        json(
            StatusCode::OK,
            &InfoBody {
                status: "running",
                service: &self.state.service_name,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            },
        )
    }

    async fn health(&self) -> Result<Response<Body>, hyper::http::Error> {
        let report = self.state.aggregator.check(self.state.deadline).await;
        health_response(&report)
    }

    fn metrics(&self) -> Result<Response<Body>, hyper::http::Error> {
        match self.state.metrics.gather() {
            Ok(body) => Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE_HEADER, CONTENT_TYPE)
                .body(Body::from(body)),
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &ErrorBody {
                        error: "failed to encode metrics",
                    },
                )
            }
        }
    }
}

/// 200 when every dependency is healthy, 503 otherwise.
pub fn health_response(report: &HealthReport) -> Result<Response<Body>, hyper::http::Error> {
    let status = match report.status() {
        OverallStatus::Healthy => StatusCode::OK,
        OverallStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };

    json(
        status,
        &HealthBody {
            status: report.status(),
            checks: report.checks(),
            timestamp: report
                .checked_at()
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        },
    )
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, hyper::http::Error> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|e| {
        error!(%e, "failed to serialize response body");
        Vec::new()
    });
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE_HEADER, "application/json")
        .body(Body::from(bytes))
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = hyper::http::Error;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move {
            handler.handle(req).await.map_err(|e| {
                tracing::error!(%e, "failed to build response");
                e
            })
        })
    }
}
