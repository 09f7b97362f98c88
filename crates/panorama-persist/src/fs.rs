//! A concrete [`PersistAdapter`] that appends newline-delimited JSON rows to
//! a single file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use panorama_error::PanoramaError;
use panorama_types::{Inference, Registration, Report};

use crate::adapter::PersistAdapter;
use crate::record::{InferenceRow, PanoramaRow, PersistRow, RegistrationRow};

/// Appends one JSON object per line to a file opened in append mode, behind
/// a single lock — the same "one lock around a private `Inner`" shape as
/// `tor-persist`'s `CheckedDir`-backed stores, sized down to a single
/// `std::sync::Mutex<File>` since we only ever append, never rewrite.
pub struct JsonlFileAdapter {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlFileAdapter {
    /// Open (creating if necessary) the append-only file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PanoramaError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                PanoramaError::new(
                    panorama_error::ErrorKind::Fatal,
                    format!("failed to open persistence file {}", path.display()),
                )
                .with_cause(e)
            })?;
        Ok(JsonlFileAdapter {
            path,
            file: Mutex::new(file),
        })
    }

    /// The path this adapter writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_row(&self, row: PersistRow) -> Result<(), PanoramaError> {
        let mut line = serde_json::to_string(&row).map_err(|e| {
            PanoramaError::new(
                panorama_error::ErrorKind::TransientStore,
                "failed to serialize persistence row",
            )
            .with_cause(e)
        })?;
        line.push('\n');

        let mut file = self.file.lock().expect("panorama-persist lock poisoned");
        file.write_all(line.as_bytes()).map_err(|e| {
            PanoramaError::new(
                panorama_error::ErrorKind::TransientStore,
                format!("failed to append to {}", self.path.display()),
            )
            .with_cause(e)
        })
    }
}

impl PersistAdapter for JsonlFileAdapter {
    fn insert_report(&self, id: u64, report: &Report) -> Result<(), PanoramaError> {
        self.append_row(PersistRow::Panorama(PanoramaRow::from_report(id, report)))
    }

    fn insert_inference(&self, id: u64, inference: &Inference) -> Result<(), PanoramaError> {
        self.append_row(PersistRow::Inference(InferenceRow::from_inference(id, inference)))
    }

    fn insert_registration(&self, id: u64, registration: &Registration) -> Result<(), PanoramaError> {
        self.append_row(PersistRow::Registration(RegistrationRow::from_registration(
            id,
            registration,
        )))
    }
}
