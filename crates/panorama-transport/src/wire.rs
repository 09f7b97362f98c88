//! The two RPCs a peer connection carries, as an on-the-wire JSON enum.
//! A field-preserving encoding is all that's required here, so this reuses
//! every type's existing `serde` impl rather than inventing a parallel
//! wire representation.

use panorama_exchange::LearnKind;
use panorama_types::{PeerId, Report, ReportOutcome, Timestamp};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) enum WireRequest {
    LearnReport {
        kind: LearnKind,
        source: PeerId,
        report: Report,
    },
    Ping {
        source: PeerId,
    },
}

/// Errors cross the wire as plain strings; the receiving side already knows
/// which [`panorama_error::ErrorKind`] to wrap them back in (`TransientPeer`
/// in every case, since a peer RPC failure is by definition transient from
/// the caller's point of view).
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) enum WireResponse {
    LearnReport(Result<ReportOutcome, String>),
    Ping(Result<Timestamp, String>),
}
