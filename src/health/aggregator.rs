// src/health/aggregator.rs
use super::outcome::{DependencyName, HealthReport, ProbeOutcome};
use super::probe::ProbeContext;
use super::registry::ProbeRegistry;
use crate::metrics::{MetricsBatch, MetricsSink};
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

pub const CHECKS_TOTAL: &str = "checks_total";
pub const CHECKS_DEGRADED_TOTAL: &str = "checks_degraded_total";
pub const LAST_CHECK_HEALTHY: &str = "last_check_healthy";
pub const LAST_CHECK_DURATION_SECONDS: &str = "last_check_duration_seconds";

pub fn unhealthy_counter(name: &DependencyName) -> String {
    format!("{}_unhealthy_total", name)
}

pub fn timeout_counter(name: &DependencyName) -> String {
    format!("{}_timeouts_total", name)
}

/// Runs every registered probe concurrently under one shared deadline.
///
/// Checks do not serialize against each other; the metrics sink is the only
/// state they share.
pub struct HealthAggregator {
    registry: Arc<ProbeRegistry>,
    metrics: Arc<MetricsSink>,
}

impl HealthAggregator {
    pub fn new(registry: Arc<ProbeRegistry>, metrics: Arc<MetricsSink>) -> Self {
        let mut batch = MetricsBatch::new();
        batch
            .declare_counter(CHECKS_TOTAL, "Total number of health checks run")
            .declare_counter(
                CHECKS_DEGRADED_TOTAL,
                "Total number of health checks that reported degraded",
            );
        for name in registry.names() {
            batch
                .declare_counter(unhealthy_counter(name), unhealthy_help(name))
                .declare_counter(timeout_counter(name), timeout_help(name));
        }
        metrics.apply(batch);

        Self { registry, metrics }
    }

    pub async fn check(&self, deadline: Duration) -> HealthReport {
        let check_id = Uuid::new_v4();
        let span = info_span!("health_check", %check_id);
        self.run_check(deadline).instrument(span).await
    }

    async fn run_check(&self, deadline: Duration) -> HealthReport {
        let started = Instant::now();
        let cutoff = cutoff_after(started, deadline);
        let entries = self.registry.list();

        // Spawned so a slow probe cannot hold up the others. Dropping a handle
        // detaches the task; whatever it returns afterwards is discarded.
        let handles: Vec<_> = entries
            .iter()
            .map(|entry| {
                let probe = entry.probe.clone();
                let ctx = ProbeContext::new(entry.name.clone(), cutoff);
                tokio::spawn(async move { probe.probe(&ctx).await })
            })
            .collect();

        let outcomes = futures::future::join_all(
            handles
                .into_iter()
                .map(|handle| async move { timeout_at(cutoff, handle).await }),
        )
        .await;

        let mut checks = IndexMap::with_capacity(entries.len());
        for (entry, result) in entries.iter().zip(outcomes) {
            let outcome = match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_error)) => join_failure(&entry.name, join_error),
                Err(_) => ProbeOutcome::TimedOut,
            };
            checks.insert(entry.name.clone(), outcome);
        }

        let report = HealthReport::new(checks, Utc::now(), started.elapsed());
        self.record(&report);

        if report.is_healthy() {
            debug!(
                dependencies = report.checks().len(),
                elapsed_ms = report.elapsed().as_millis() as u64,
                "health check passed"
            );
        } else {
            let failing: Vec<&str> = report.failing().map(|name| name.as_str()).collect();
            warn!(
                failing = ?failing,
                elapsed_ms = report.elapsed().as_millis() as u64,
                "health check degraded"
            );
        }

        report
    }

    /// Applies every counter and gauge touched by `report` as one batch.
    fn record(&self, report: &HealthReport) {
        let mut batch = MetricsBatch::new();
        batch.increment(CHECKS_TOTAL, "Total number of health checks run");

        if !report.is_healthy() {
            batch.increment(
                CHECKS_DEGRADED_TOTAL,
                "Total number of health checks that reported degraded",
            );
        }

        for (name, outcome) in report.checks() {
            if outcome.is_healthy() {
                continue;
            }
            batch.increment(unhealthy_counter(name), unhealthy_help(name));
            if outcome.is_timed_out() {
                batch.increment(timeout_counter(name), timeout_help(name));
            }
        }

        batch
            .set_gauge(
                LAST_CHECK_HEALTHY,
                "Whether the most recent health check was healthy (1) or degraded (0)",
                if report.is_healthy() { 1.0 } else { 0.0 },
            )
            .set_gauge(
                LAST_CHECK_DURATION_SECONDS,
                "Wall time of the most recent health check",
                report.elapsed().as_secs_f64(),
            );

        self.metrics.apply(batch);
    }
}

/// `started + deadline`, saturating to a far-future instant on overflow.
fn cutoff_after(started: Instant, deadline: Duration) -> Instant {
    started
        .checked_add(deadline)
        .unwrap_or_else(|| started + Duration::from_secs(86400 * 365 * 30))
}

fn join_failure(name: &DependencyName, err: JoinError) -> ProbeOutcome {
    if err.is_panic() {
        error!(dependency = %name, "probe panicked");
        ProbeOutcome::unhealthy("probe panicked")
    } else {
        error!(dependency = %name, "probe task cancelled");
        ProbeOutcome::unhealthy("probe cancelled")
    }
}

fn unhealthy_help(name: &DependencyName) -> String {
    format!("Total number of checks where {} was not healthy", name)
}

fn timeout_help(name: &DependencyName) -> String {
    format!("Total number of checks where {} timed out", name)
}
