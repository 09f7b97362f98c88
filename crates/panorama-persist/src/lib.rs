//! Append-only persistence of reports, inferences and registrations.
//!
//! This crate defines the narrow insert contract the rest of the workspace
//! persists through ([`PersistAdapter`]) and one concrete backend
//! ([`JsonlFileAdapter`]) — it specifies only the insert contract the core
//! uses, not a persistent database engine.

mod adapter;
mod fs;
mod ids;
mod record;

pub use adapter::{NullAdapter, PersistAdapter};
pub use fs::JsonlFileAdapter;
pub use ids::RowIdAllocator;
pub use record::{InferenceRow, PanoramaRow, PersistRow, RegistrationRow};

use std::path::Path;
use std::sync::Arc;

/// Construct the adapter named by a `DBFile` configuration value: `None`
/// yields a [`NullAdapter`], `Some(path)` opens a [`JsonlFileAdapter`].
pub fn open(db_file: Option<&Path>) -> Result<Arc<dyn PersistAdapter>, panorama_error::PanoramaError> {
    match db_file {
        None => Ok(Arc::new(NullAdapter)),
        Some(path) => Ok(Arc::new(JsonlFileAdapter::open(path)?)),
    }
}
