//! The three append-only logical tables persisted state is written to.

use panorama_types::{Inference, Registration, Report};
use serde::{Deserialize, Serialize};

/// Render a metric map as `name:STATUS/score.s` pairs, sorted by name and
/// comma-joined, matching the flattened `metrics_text` column the original
/// `sqlite` schema stored instead of a second table.
fn metrics_text<'a>(metrics: impl Iterator<Item = (&'a str, &'a panorama_types::Value)>) -> String {
    let mut pairs: Vec<(&str, &panorama_types::Value)> = metrics.collect();
    pairs.sort_by_key(|(name, _)| *name);
    pairs
        .into_iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// One row destined for the `panorama` table: `(id, subject, observer, time,
/// metrics_text)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanoramaRow {
    pub id: u64,
    pub subject: String,
    pub observer: String,
    pub time: u128,
    pub metrics_text: String,
}

impl PanoramaRow {
    /// Build a row from a [`Report`], assigning it row id `id`.
    pub fn from_report(id: u64, report: &Report) -> Self {
        PanoramaRow {
            id,
            subject: report.subject.to_string(),
            observer: report.observer.to_string(),
            time: report.observation.ts.as_nanos(),
            metrics_text: metrics_text(
                report
                    .observation
                    .metrics
                    .iter()
                    .map(|(name, m)| (name.as_str(), &m.value)),
            ),
        }
    }
}

/// One row destined for the `inference` table: `(id, subject, observers_csv,
/// time, metrics_text)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRow {
    pub id: u64,
    pub subject: String,
    pub observers_csv: String,
    pub time: u128,
    pub metrics_text: String,
}

impl InferenceRow {
    /// Build a row from an [`Inference`], assigning it row id `id`.
    pub fn from_inference(id: u64, inference: &Inference) -> Self {
        InferenceRow {
            id,
            subject: inference.subject.to_string(),
            observers_csv: inference
                .observers
                .iter()
                .map(|o| o.to_string())
                .collect::<Vec<_>>()
                .join(","),
            time: inference.observation.ts.as_nanos(),
            metrics_text: metrics_text(
                inference
                    .observation
                    .metrics
                    .iter()
                    .map(|(name, m)| (name.as_str(), &m.value)),
            ),
        }
    }
}

/// One row destined for the `registration` table: `(id, handle, module,
/// observer, time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRow {
    pub id: u64,
    pub handle: u64,
    pub module: String,
    pub observer: String,
    pub time: u128,
}

impl RegistrationRow {
    /// Build a row from a [`Registration`], assigning it row id `id`.
    pub fn from_registration(id: u64, registration: &Registration) -> Self {
        RegistrationRow {
            id,
            handle: registration.handle,
            module: registration.module.clone(),
            observer: registration.observer.to_string(),
            time: registration.time.as_nanos(),
        }
    }
}

/// A tagged union of the three row kinds, as written one-per-line to the
/// append-only file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum PersistRow {
    Panorama(PanoramaRow),
    Inference(InferenceRow),
    Registration(RegistrationRow),
}
