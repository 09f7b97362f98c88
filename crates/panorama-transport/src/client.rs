//! Dials a peer over TCP for every RPC, framing requests and responses as
//! newline-delimited JSON. Any encoding that preserves fields would do;
//! this one is simple to frame and to read back in a test harness.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use asynchronous_codec::{Framed, JsonCodec};
use futures::{SinkExt, StreamExt};
use panorama_error::{ErrorKind, PanoramaError};
use panorama_exchange::{LearnKind, PeerClient, PeerClientFactory};
use panorama_types::{PeerId, Report, ReportOutcome, Timestamp};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncReadCompatExt;

use crate::wire::{WireRequest, WireResponse};

/// How long to wait for a TCP connection to a peer before giving up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// How long to wait for a peer to answer an RPC once connected.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`PeerClient`] that dials `addr` fresh for every RPC.
///
/// Panorama's peer set is small and long-lived, so a persistent connection
/// per peer would only add reconnect-on-drop bookkeeping without saving
/// much; dialing per request instead keeps one unreachable peer's failures
/// from ever wedging the connection to another (the peer client cache that
/// avoids re-dialing for every *call* already lives in `Exchange`, one
/// layer up).
pub struct TcpPeerClient {
    addr: String,
}

impl TcpPeerClient {
    /// Connect to `addr` and build a client for it.
    pub fn new(addr: impl Into<String>) -> Self {
        TcpPeerClient { addr: addr.into() }
    }

    async fn roundtrip(&self, request: WireRequest) -> Result<WireResponse, PanoramaError> {
        let dial = async {
            tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
                .await
                .map_err(|_| self.transient(format!("connecting to {} timed out", self.addr)))?
                .map_err(|e| self.transient(format!("connecting to {}", self.addr)).with_cause(e))
        };
        let stream = dial.await?;

        let roundtrip = async {
            let mut framed = Framed::new(stream.compat(), JsonCodec::<WireRequest, WireResponse>::new());
            framed
                .send(request)
                .await
                .map_err(|e| self.transient(format!("sending request to {}", self.addr)).with_cause(e))?;
            framed
                .next()
                .await
                .ok_or_else(|| self.transient(format!("{} closed the connection", self.addr)))?
                .map_err(|e| self.transient(format!("reading response from {}", self.addr)).with_cause(e))
        };
        tokio::time::timeout(REQUEST_TIMEOUT, roundtrip)
            .await
            .map_err(|_| self.transient(format!("{} did not answer in time", self.addr)))?
    }

    fn transient(&self, message: impl Into<String>) -> PanoramaError {
        PanoramaError::new(ErrorKind::TransientPeer, message)
    }
}

#[async_trait]
impl PeerClient for TcpPeerClient {
    async fn learn_report(
        &self,
        kind: LearnKind,
        source: PeerId,
        report: Report,
    ) -> Result<ReportOutcome, PanoramaError> {
        match self
            .roundtrip(WireRequest::LearnReport { kind, source, report })
            .await?
        {
            WireResponse::LearnReport(result) => result.map_err(|msg| self.transient(msg)),
            WireResponse::Ping(_) => Err(PanoramaError::new(
                ErrorKind::InternalError,
                format!("{} answered LearnReport with a Ping response", self.addr),
            )),
        }
    }

    async fn ping(&self, source: PeerId) -> Result<Timestamp, PanoramaError> {
        match self.roundtrip(WireRequest::Ping { source }).await? {
            WireResponse::Ping(result) => result.map_err(|msg| self.transient(msg)),
            WireResponse::LearnReport(_) => Err(PanoramaError::new(
                ErrorKind::InternalError,
                format!("{} answered Ping with a LearnReport response", self.addr),
            )),
        }
    }
}

/// Builds a [`TcpPeerClient`] for a peer address.
///
/// The cache that avoids building a new one for every call already lives in
/// `Exchange`, so this factory carries no state of its own.
#[derive(Default)]
pub struct TcpPeerClientFactory;

impl TcpPeerClientFactory {
    /// A new factory.
    pub fn new() -> Self {
        TcpPeerClientFactory
    }
}

impl PeerClientFactory for TcpPeerClientFactory {
    fn connect(&self, _peer: &PeerId, addr: &str) -> Arc<dyn PeerClient> {
        Arc::new(TcpPeerClient::new(addr))
    }
}
