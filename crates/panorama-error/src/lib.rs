//! Shared error type for the Panorama workspace.
//!
//! Every crate in the workspace returns `Result<T, PanoramaError>` (or a
//! crate-local error that carries a `#[from]` conversion into it) from its
//! public, fallible operations. The type is modeled on `tor_error`'s
//! `ErrorKind`/`HasKind` split: callers that only care about *why* something
//! failed can match on [`ErrorKind`] without caring about the concrete error
//! representation, while the [`PanoramaError`] itself keeps the full
//! `std::error::Error` source chain for logging.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use thiserror::Error;

/// Broad classification of why an operation failed.
///
/// Covers validation failures at the RPC boundary, the non-error "ignored"
/// outcome, transient failures in peer or persistence I/O that must not
/// roll back local state, and internal bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A caller-supplied argument was invalid: unknown handle, malformed
    /// observation, unknown subject for an accessor that requires one.
    InvalidArgument,
    /// A report was not accepted because the subject is not on the
    /// watchlist. Not really a "failure" — callers should treat this as a
    /// normal outcome, not log it as an error.
    Ignored,
    /// A peer RPC failed transiently (timeout, connection refused, peer
    /// process down). Does not roll back any local state.
    TransientPeer,
    /// A persistence operation (table append, state reopen) failed
    /// transiently. Does not affect the in-memory path.
    TransientStore,
    /// The requested subject, observer, or inference does not exist.
    NotFound,
    /// A capability token (handle) presented by a caller is not recognized.
    BadHandle,
    /// Startup failed in a way that cannot be recovered from in-process:
    /// listener bind failure, corrupted persisted state on reopen.
    Fatal,
    /// The program hit a state its own logic should have made impossible.
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Ignored => "ignored",
            ErrorKind::TransientPeer => "transient peer error",
            ErrorKind::TransientStore => "transient store error",
            ErrorKind::NotFound => "not found",
            ErrorKind::BadHandle => "unrecognized handle",
            ErrorKind::Fatal => "fatal",
            ErrorKind::InternalError => "internal error (bug)",
        };
        f.write_str(s)
    }
}

/// Trait for types that can report an [`ErrorKind`].
///
/// Implemented for [`PanoramaError`] itself and for [`InternalError`] so that
/// `internal!()` sites compose with the rest of the error machinery without
/// an explicit wrap.
pub trait HasKind {
    /// Return the kind of error this is.
    fn kind(&self) -> ErrorKind;
}

/// The error type returned by fallible operations across the workspace.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct PanoramaError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl PanoramaError {
    /// Construct a new error of the given kind with a human-readable message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        PanoramaError {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach an underlying cause, preserving the source chain.
    #[must_use]
    pub fn with_cause(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Shorthand for the very common "caller handed us something we can't
    /// act on" case.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        PanoramaError::new(ErrorKind::InvalidArgument, message)
    }

    /// Shorthand for "this subject/observer/inference doesn't exist".
    pub fn not_found(message: impl Into<String>) -> Self {
        PanoramaError::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for "the handle presented is not one we issued".
    pub fn bad_handle(handle: u64) -> Self {
        PanoramaError::new(ErrorKind::BadHandle, format!("unrecognized handle {handle}"))
    }
}

impl HasKind for PanoramaError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<InternalError> for PanoramaError {
    fn from(e: InternalError) -> Self {
        PanoramaError::new(ErrorKind::InternalError, e.to_string())
    }
}

/// An error representing a bug: a state the code's own invariants should
/// have made unreachable.
///
/// Prefer constructing these via [`internal!`] so the call site is recorded.
#[derive(Debug, Clone)]
pub struct InternalError {
    message: String,
    location: &'static Location<'static>,
}

impl InternalError {
    /// Create an internal error. Prefer [`internal!`], which records the
    /// call site automatically.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        InternalError {
            message: message.into(),
            location: Location::caller(),
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal error (bug) at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for InternalError {}

impl HasKind for InternalError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InternalError
    }
}

/// Construct an [`InternalError`], `format!`-style, capturing the call site.
///
/// ```
/// use panorama_error::internal;
/// let e = internal!("watchlist entry missing for subject we just inserted");
/// assert!(e.to_string().contains("watchlist entry missing"));
/// ```
#[macro_export]
macro_rules! internal {
    { $( $arg:tt )* } => {
        $crate::InternalError::new(format!($($arg)*))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = PanoramaError::invalid_argument("bad subject id");
        let s = e.to_string();
        assert!(s.contains("invalid argument"));
        assert!(s.contains("bad subject id"));
    }

    #[test]
    fn internal_macro_records_message() {
        let e = internal!("subject {} vanished from watchlist", "TS_1");
        assert_eq!(e.kind(), ErrorKind::InternalError);
        assert!(e.to_string().contains("TS_1"));
    }

    #[test]
    fn bad_handle_kind() {
        let e = PanoramaError::bad_handle(42);
        assert_eq!(e.kind(), ErrorKind::BadHandle);
    }
}
