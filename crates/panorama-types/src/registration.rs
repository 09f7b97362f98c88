//! Observer registration handles.

use crate::ids::{Handle, ObserverId};
use crate::Timestamp;

/// A registration record: the capability token plus who it was issued to
/// and when.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Registration {
    /// The capability token; `≥ HANDLE_START` and monotonically assigned.
    pub handle: Handle,
    /// The registering module's name.
    pub module: String,
    /// The observer identity being registered.
    pub observer: ObserverId,
    /// When the registration was recorded.
    pub time: Timestamp,
}

impl Registration {
    /// Construct a new registration.
    pub fn new(handle: Handle, module: impl Into<String>, observer: ObserverId, time: Timestamp) -> Self {
        Registration {
            handle,
            module: module.into(),
            observer,
            time,
        }
    }
}
