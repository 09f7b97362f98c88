//! Metric values.

use std::fmt;

use crate::status::Status;

/// A status paired with a comparable score.
///
/// The score has no intrinsic unit: it is only meaningful when compared or
/// averaged within observations of the same metric name.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Value {
    /// The health status this value represents.
    pub status: Status,
    /// A score in `[0, 100]`.
    pub score: f32,
}

impl Value {
    /// Construct a new value, clamping the score into `[0, 100]`.
    pub fn new(status: Status, score: f32) -> Self {
        Value {
            status,
            score: score.clamp(0.0, 100.0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:.1}", self.status, self.score)
    }
}

/// A single named measurement within an [`crate::Observation`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Metric {
    /// The metric's name, e.g. `"cpu"` or `"req.103"`.
    pub name: String,
    /// The metric's value.
    pub value: Value,
}

impl Metric {
    /// Construct a new metric.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Metric {
            name: name.into(),
            value,
        }
    }
}
