// src/health/probe.rs
use super::outcome::{DependencyName, ProbeOutcome};
use async_trait::async_trait;
use std::future::Future;
use tokio::time::Instant;

/// Per-invocation context handed to a probe.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub dependency: DependencyName,
    /// Absolute cutoff shared by every probe of the same check.
    pub deadline: Instant,
}

impl ProbeContext {
    pub fn new(dependency: DependencyName, deadline: Instant) -> Self {
        Self {
            dependency,
            deadline,
        }
    }

    /// Run `fut` until the shared deadline. `None` means the deadline fired
    /// first and `fut` was dropped.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::time::timeout_at(self.deadline, fut).await.ok()
    }
}

/// Checks one external dependency.
///
/// Implementations must be safe to call concurrently and must translate any
/// internal failure into `ProbeOutcome::Unhealthy` with a reason that is safe
/// to show to clients (no credentials, no raw driver errors).
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    async fn probe(&self, ctx: &ProbeContext) -> ProbeOutcome;

    /// Short label for logs, e.g. `"postgres"`.
    fn kind(&self) -> &'static str;
}
