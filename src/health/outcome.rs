// src/health/outcome.rs
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Identifier of a registered dependency. Unique within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DependencyName(String);

impl DependencyName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for DependencyName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DependencyName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for DependencyName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DependencyName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Result of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy { reason: String },
    /// The probe did not report before the check deadline.
    TimedOut,
}

impl ProbeOutcome {
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self::Unhealthy {
            reason: reason.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Unhealthy { reason } => write!(f, "unhealthy: {}", reason),
            Self::TimedOut => f.write_str("unhealthy: timed out"),
        }
    }
}

impl Serialize for ProbeOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

impl OverallStatus {
    /// `Healthy` iff every outcome is healthy. Vacuously healthy when empty.
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a ProbeOutcome>,
    {
        if outcomes.into_iter().all(ProbeOutcome::is_healthy) {
            Self::Healthy
        } else {
            Self::Degraded
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single `HealthAggregator::check` call.
///
/// Built fresh for every check; `checks` keeps registration order.
#[derive(Debug, Clone)]
pub struct HealthReport {
    checks: IndexMap<DependencyName, ProbeOutcome>,
    status: OverallStatus,
    checked_at: DateTime<Utc>,
    elapsed: Duration,
}

impl HealthReport {
    pub fn new(
        checks: IndexMap<DependencyName, ProbeOutcome>,
        checked_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let status = OverallStatus::from_outcomes(checks.values());
        Self {
            checks,
            status,
            checked_at,
            elapsed,
        }
    }

    pub fn status(&self) -> OverallStatus {
        self.status
    }

    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Healthy
    }

    pub fn checks(&self) -> &IndexMap<DependencyName, ProbeOutcome> {
        &self.checks
    }

    pub fn get(&self, name: &str) -> Option<&ProbeOutcome> {
        self.checks.get(name)
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Names of every dependency whose outcome is not healthy, in report order.
    pub fn failing(&self) -> impl Iterator<Item = &DependencyName> {
        self.checks
            .iter()
            .filter(|(_, outcome)| !outcome.is_healthy())
            .map(|(name, _)| name)
    }
}
