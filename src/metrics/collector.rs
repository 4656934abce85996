// src/metrics/collector.rs
use super::sink::{MetricSample, MetricValue, MetricsSink};
use anyhow::Result;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Owns the prometheus registry the sink is exposed through.
pub struct MetricsRegistry {
    registry: Registry,
    sink: Arc<MetricsSink>,
}

impl MetricsRegistry {
    pub fn new(namespace: &str) -> Result<Self> {
        let registry = Registry::new();
        let sink = Arc::new(MetricsSink::new());

        registry.register(Box::new(SinkCollector {
            sink: sink.clone(),
            namespace: namespace.to_string(),
        }))?;

        Ok(Self { registry, sink })
    }

    pub fn sink(&self) -> Arc<MetricsSink> {
        self.sink.clone()
    }

    /// Render the current snapshot in the text exposition format.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

/// Bridges [`MetricsSink`] into prometheus. Every scrape converts a single
/// snapshot, so one exposition never mixes two checks.
struct SinkCollector {
    sink: Arc<MetricsSink>,
    namespace: String,
}

impl SinkCollector {
    fn family(&self, sample: &MetricSample) -> MetricFamily {
        let mut metric = proto::Metric::default();
        let field_type = match sample.value {
            MetricValue::Counter(v) => {
                let mut counter = proto::Counter::default();
                counter.set_value(v as f64);
                metric.set_counter(counter);
                MetricType::COUNTER
            }
            MetricValue::Gauge(v) => {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(v);
                metric.set_gauge(gauge);
                MetricType::GAUGE
            }
        };

        let mut family = MetricFamily::default();
        family.set_name(qualified_name(&self.namespace, &sample.name));
        family.set_help(sample.help.clone());
        family.set_field_type(field_type);
        family.set_metric(vec![metric].into());
        family
    }
}

impl Collector for SinkCollector {
    fn desc(&self) -> Vec<&Desc> {
        // Sample names are only known at runtime.
        Vec::new()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.sink
            .snapshot()
            .iter()
            .map(|sample| self.family(sample))
            .collect()
    }
}

fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", namespace, name)
    }
}
