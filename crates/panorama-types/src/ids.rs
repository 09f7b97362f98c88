//! Identifiers used throughout the workspace.
//!
//! Subjects, observers and peers are all opaque string identifiers at the
//! wire level; we wrap them in distinct newtypes so the
//! compiler catches a subject id passed where an observer id was expected,
//! the way `tor-linkspec`'s `PtTransportName`/`TransportId` wrap a bare
//! `String` instead of passing raw strings around.

use std::fmt;
use std::sync::Arc;

/// An entity whose health is being assessed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SubjectId(Arc<str>);

/// An entity that files reports about a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ObserverId(Arc<str>);

/// A peer node in the gossip cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PeerId(Arc<str>);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            /// Wrap a string as this id type.
            pub fn new(s: impl Into<Arc<str>>) -> Self {
                $ty(s.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                $ty::new(s)
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                $ty::new(s)
            }
        }

        impl std::borrow::Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(SubjectId);
string_id!(ObserverId);
string_id!(PeerId);

/// A capability token handed out by [`Register`](crate::Registration) and
/// required by `SubmitReport`. Starts at [`HANDLE_START`] and is assigned
/// monotonically.
pub type Handle = u64;

/// The first handle value ever assigned.
pub const HANDLE_START: Handle = 10_000;
