use std::sync::{Arc, Mutex};

use tracing::debug;

/// Kind of a recorded metric sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Histogram,
}

/// A metric sample (captured by the mock sink)
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub kind: MetricKind,
    pub name: String,
    pub value: f64,
}

/// Fire-and-forget metrics sink.
///
/// Recording never fails and never blocks; callers must not depend on a
/// sample being delivered.
#[derive(Clone, Debug, Default)]
pub enum Metrics {
    /// Emit samples as debug events under the `metrics` target
    #[default]
    Tracing,
    /// Discard everything
    Noop,
    /// Capture samples in memory for testing
    Mock(Arc<Mutex<Vec<MetricSample>>>),
}

impl Metrics {
    /// Create a new mock sink for testing
    #[must_use]
    pub fn mock() -> Self {
        Self::Mock(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn gauge(&self, name: &str, value: f64) {
        self.record(MetricKind::Gauge, name, value);
    }

    pub fn histogram(&self, name: &str, value: f64) {
        self.record(MetricKind::Histogram, name, value);
    }

    fn record(&self, kind: MetricKind, name: &str, value: f64) {
        match self {
            Self::Tracing => {
                debug!(target: "metrics", metric = name, kind = ?kind, value, "metric recorded");
            }
            Self::Noop => {}
            Self::Mock(samples) => {
                // A poisoned lock only loses test samples
                if let Ok(mut samples) = samples.lock() {
                    samples.push(MetricSample {
                        kind,
                        name: name.to_string(),
                        value,
                    });
                }
            }
        }
    }

    /// Get all recorded samples (only available for mock sink)
    #[must_use]
    pub fn samples(&self) -> Option<Vec<MetricSample>> {
        match self {
            Self::Mock(samples) => samples.lock().ok().map(|s| s.clone()),
            Self::Tracing | Self::Noop => None,
        }
    }

    /// Get recorded samples with the given name (only available for mock sink)
    #[must_use]
    pub fn samples_named(&self, name: &str) -> Option<Vec<MetricSample>> {
        self.samples()
            .map(|samples| samples.into_iter().filter(|s| s.name == name).collect())
    }
}
