// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use service_health::health::{DependencyProbe, ProbeContext, ProbeOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Waits `delay`, then reports `outcome`.
pub struct ScriptedProbe {
    pub delay: Duration,
    pub outcome: ProbeOutcome,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn healthy() -> Self {
        Self::after(Duration::ZERO, ProbeOutcome::Healthy)
    }

    pub fn failing(reason: &str) -> Self {
        Self::after(Duration::ZERO, ProbeOutcome::unhealthy(reason))
    }

    pub fn after(delay: Duration, outcome: ProbeOutcome) -> Self {
        Self {
            delay,
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl DependencyProbe for ScriptedProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }

    fn kind(&self) -> &'static str {
        "scripted"
    }
}

/// Panics on every call.
pub struct PanickingProbe;

#[async_trait]
impl DependencyProbe for PanickingProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> ProbeOutcome {
        panic!("driver exploded");
    }

    fn kind(&self) -> &'static str {
        "panicking"
    }
}
