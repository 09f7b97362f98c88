//! Observations: a timestamped bundle of metrics.

use std::collections::BTreeMap;

use crate::value::Metric;
use crate::Timestamp;

/// A timestamped set of metric values describing a subject at one moment.
///
/// Immutable once stored: nothing in this workspace ever hands out a
/// `&mut Observation` to a stored value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Observation {
    /// When this observation was taken.
    pub ts: Timestamp,
    /// Metrics, keyed by name.
    pub metrics: BTreeMap<String, Metric>,
}

impl Observation {
    /// Construct an empty observation at the given time.
    pub fn new(ts: Timestamp) -> Self {
        Observation {
            ts,
            metrics: BTreeMap::new(),
        }
    }

    /// Construct an observation from an explicit list of metrics.
    pub fn from_metrics(ts: Timestamp, metrics: impl IntoIterator<Item = Metric>) -> Self {
        let mut map = BTreeMap::new();
        for m in metrics {
            map.insert(m.name.clone(), m);
        }
        Observation { ts, metrics: map }
    }

    /// Insert or replace a metric in this observation before it is stored.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.insert(metric.name.clone(), metric);
        self
    }
}
