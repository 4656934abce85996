// src/probes/process.rs
use crate::health::{DependencyProbe, ProbeContext, ProbeOutcome};
use async_trait::async_trait;

/// Reports on the service process itself. If it can answer, it is up.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessProbe;

impl ProcessProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DependencyProbe for ProcessProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> ProbeOutcome {
        ProbeOutcome::Healthy
    }

    fn kind(&self) -> &'static str {
        "process"
    }
}
