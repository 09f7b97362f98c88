//! The capability Exchange needs from a peer connection, abstracted away
//! from any one wire transport.
//!
//! `panorama-transport` supplies a concrete [`PeerClientFactory`]; this
//! crate's own tests use an in-memory fake instead, the same split
//! `tor-chanmgr` draws between its `ChannelFactory` trait and a concrete
//! network implementation.

use std::sync::Arc;

use async_trait::async_trait;
use panorama_error::PanoramaError;
use panorama_types::{PeerId, Report, ReportOutcome, Timestamp};

/// Which of the three `LearnReport` request kinds is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LearnKind {
    /// A normal report propagation.
    Normal,
    /// "I am now interested in this subject."
    Subscription,
    /// "I am no longer interested in this subject."
    Unsubscription,
}

/// A connection to one peer, capable of the two RPCs Exchange issues.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Send a `LearnReport` RPC of the given kind.
    async fn learn_report(
        &self,
        kind: LearnKind,
        source: PeerId,
        report: Report,
    ) -> Result<ReportOutcome, PanoramaError>;

    /// Send a `Ping` RPC, returning the peer's reported time.
    async fn ping(&self, source: PeerId) -> Result<Timestamp, PanoramaError>;
}

/// Lazily establishes [`PeerClient`]s for a peer address, mirroring the
/// original `getOrMakeClient`'s dial-on-first-use-then-cache behavior (the
/// cache itself lives in [`crate::Exchange`], not here).
pub trait PeerClientFactory: Send + Sync {
    /// Connect (or prepare to lazily connect) to `peer` at `addr`.
    fn connect(&self, peer: &PeerId, addr: &str) -> Arc<dyn PeerClient>;
}
