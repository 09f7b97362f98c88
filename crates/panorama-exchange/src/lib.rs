//! Peer-to-peer report propagation and per-subject ignore-sets.

mod client;
mod exchange;
mod ignore_set;

pub use client::{LearnKind, PeerClient, PeerClientFactory};
pub use exchange::{Exchange, FanOutOutcome};
pub use ignore_set::IgnoreSet;
