// src/metrics/mod.rs
mod collector;
mod sink;

pub use collector::{MetricsRegistry, CONTENT_TYPE};
pub use sink::{MetricKind, MetricSample, MetricValue, MetricsBatch, MetricsSink};
