// src/health/mod.rs
mod aggregator;
mod outcome;
mod probe;
mod registry;

pub use aggregator::{
    timeout_counter, unhealthy_counter, HealthAggregator, CHECKS_DEGRADED_TOTAL, CHECKS_TOTAL,
    LAST_CHECK_DURATION_SECONDS, LAST_CHECK_HEALTHY,
};
pub use outcome::{DependencyName, HealthReport, OverallStatus, ProbeOutcome};
pub use probe::{DependencyProbe, ProbeContext};
pub use registry::{is_valid_name, ProbeEntry, ProbeRegistry, ProbeRegistryBuilder, RegistryError};
