//! Wire-level data model for Panorama.
//!
//! This crate holds only plain data types and the pure logic that belongs to
//! them (e.g. a [`View`]'s ring-buffer eviction). Concurrency-protected
//! aggregates such as the locked per-subject panorama map live in
//! `panorama-store`; this crate's types are what gets passed across those
//! locks and across the wire.

mod ids;
mod inference;
mod observation;
mod registration;
mod report;
mod status;
mod time;
mod value;
mod view;

pub use ids::{Handle, ObserverId, PeerId, SubjectId, HANDLE_START};
pub use inference::Inference;
pub use observation::Observation;
pub use registration::Registration;
pub use report::{Report, ReportOutcome};
pub use status::Status;
pub use time::Timestamp;
pub use value::{Metric, Value};
pub use view::{View, DEFAULT_MAX_REPORTS_PER_VIEW};
