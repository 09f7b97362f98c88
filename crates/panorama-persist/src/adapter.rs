//! The narrow trait every persistence backend implements.

use panorama_error::PanoramaError;
use panorama_types::{Inference, Registration, Report};

/// Appends reports, inferences and registrations to durable storage.
///
/// Modeled on `tor_persist::StorageHandle`: a small, object-safe,
/// `Send + Sync` trait so callers can hold `Arc<dyn PersistAdapter>` without
/// parameterizing over a concrete backend. Unlike `StorageHandle` (which
/// loads and overwrites a single keyed object), every method here only
/// appends. The persisted tables are append-only and nothing reads them
/// back at runtime.
///
/// Every method is synchronous: implementations are expected to do their own
/// lock-guarded, buffered I/O quickly. Callers on the hot (async) ingest
/// path run these through `tokio::task::spawn_blocking` so a slow disk never
/// stalls request handling: a failing insert must not block ingest.
pub trait PersistAdapter: Send + Sync {
    /// Append one row to the `panorama` table.
    fn insert_report(&self, id: u64, report: &Report) -> Result<(), PanoramaError>;

    /// Append one row to the `inference` table.
    fn insert_inference(&self, id: u64, inference: &Inference) -> Result<(), PanoramaError>;

    /// Append one row to the `registration` table.
    fn insert_registration(&self, id: u64, registration: &Registration) -> Result<(), PanoramaError>;
}

/// A [`PersistAdapter`] that discards everything, used when `DBFile` is
/// left unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAdapter;

impl PersistAdapter for NullAdapter {
    fn insert_report(&self, _id: u64, _report: &Report) -> Result<(), PanoramaError> {
        Ok(())
    }

    fn insert_inference(&self, _id: u64, _inference: &Inference) -> Result<(), PanoramaError> {
        Ok(())
    }

    fn insert_registration(&self, _id: u64, _registration: &Registration) -> Result<(), PanoramaError> {
        Ok(())
    }
}
