// src/metrics/sink.rs
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(f64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub help: String,
    pub value: MetricValue,
}

impl MetricSample {
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

#[derive(Debug, Clone)]
enum Op {
    Declare { name: String, help: String },
    Increment { name: String, help: String, by: u64 },
    SetGauge { name: String, help: String, value: f64 },
}

/// A group of updates applied to the sink under a single write lock.
#[derive(Debug, Clone, Default)]
pub struct MetricsBatch {
    ops: Vec<Op>,
}

impl MetricsBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure a counter exists (at 0) without changing its value.
    pub fn declare_counter(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
    ) -> &mut Self {
        self.ops.push(Op::Declare {
            name: name.into(),
            help: help.into(),
        });
        self
    }

    pub fn increment(&mut self, name: impl Into<String>, help: impl Into<String>) -> &mut Self {
        self.ops.push(Op::Increment {
            name: name.into(),
            help: help.into(),
            by: 1,
        });
        self
    }

    pub fn set_gauge(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        value: f64,
    ) -> &mut Self {
        self.ops.push(Op::SetGauge {
            name: name.into(),
            help: help.into(),
            value,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Process-wide counters and gauges.
///
/// Constructed once at startup and shared by handle. Readers only ever see
/// whole batches: every mutation goes through [`MetricsSink::apply`].
#[derive(Debug, Default)]
pub struct MetricsSink {
    samples: RwLock<IndexMap<String, MetricSample>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_counter(&self, name: &str, help: &str) {
        let mut batch = MetricsBatch::new();
        batch.increment(name, help);
        self.apply(batch);
    }

    pub fn set_gauge(&self, name: &str, help: &str, value: f64) {
        let mut batch = MetricsBatch::new();
        batch.set_gauge(name, help, value);
        self.apply(batch);
    }

    pub fn apply(&self, batch: MetricsBatch) {
        if batch.is_empty() {
            return;
        }

        let mut samples = self.samples.write();
        for op in batch.ops {
            match op {
                Op::Declare { name, help } => {
                    samples.entry(name.clone()).or_insert(MetricSample {
                        name,
                        help,
                        value: MetricValue::Counter(0),
                    });
                }
                Op::Increment { name, help, by } => {
                    let sample = samples.entry(name.clone()).or_insert(MetricSample {
                        name,
                        help,
                        value: MetricValue::Counter(0),
                    });
                    match &mut sample.value {
                        MetricValue::Counter(v) => *v = v.saturating_add(by),
                        MetricValue::Gauge(_) => {
                            warn!(metric = %sample.name, "ignoring counter increment on a gauge");
                        }
                    }
                }
                Op::SetGauge { name, help, value } => {
                    let sample = samples.entry(name.clone()).or_insert(MetricSample {
                        name,
                        help,
                        value: MetricValue::Gauge(value),
                    });
                    match &mut sample.value {
                        MetricValue::Gauge(v) => *v = value,
                        MetricValue::Counter(_) => {
                            warn!(metric = %sample.name, "ignoring gauge update on a counter");
                        }
                    }
                }
            }
        }
    }

    /// Point-in-time copy of every sample, in first-registration order.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.samples.read().values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.samples.read().get(name).map(|sample| sample.value)
    }

    pub fn counter(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            MetricValue::Counter(v) => Some(v),
            MetricValue::Gauge(_) => None,
        }
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            MetricValue::Gauge(v) => Some(v),
            MetricValue::Counter(_) => None,
        }
    }
}
