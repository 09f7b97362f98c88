//! Accepts incoming peer connections and dispatches their RPCs to a
//! [`PeerRequestHandler`], framed the same way [`crate::client`] speaks.
//! Modeled on `arti-rpcserver`'s `accept_connections`: a bind, an accept
//! loop, one spawned task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use asynchronous_codec::{Framed, JsonCodec};
use futures::{SinkExt, StreamExt};
use panorama_error::{ErrorKind, PanoramaError};
use panorama_exchange::LearnKind;
use panorama_types::{PeerId, Report, ReportOutcome, Timestamp};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::compat::TokioAsyncReadCompatExt;

use crate::wire::{WireRequest, WireResponse};

/// What an incoming peer's `LearnReport`/`Ping` RPCs are applied to.
///
/// `panorama-dispatcher` implements this; the trait lives here instead of
/// there so this crate never needs to depend on the dispatcher crate.
#[async_trait]
pub trait PeerRequestHandler: Send + Sync {
    /// Handle an incoming `LearnReport` RPC.
    async fn learn_report(
        &self,
        kind: LearnKind,
        source: PeerId,
        report: Report,
    ) -> Result<ReportOutcome, PanoramaError>;

    /// Handle an incoming `Ping` RPC.
    async fn ping(&self, source: PeerId) -> Result<Timestamp, PanoramaError>;
}

/// Listen at `addr` and serve peer RPCs to `handler` until `shutdown`
/// resolves.
///
/// `shutdown` only covers the graceful half of shutdown: once it resolves,
/// `serve` stops *accepting new connections* and returns, but connections
/// already spawned keep running to completion independently. A hard
/// shutdown (drop everything immediately) is simply not calling `.await` on
/// the task `serve` runs in, or aborting it; that distinction belongs to
/// whatever wires this crate into the rest of the process, not to the
/// listener itself.
pub async fn serve(
    addr: SocketAddr,
    handler: Arc<dyn PeerRequestHandler>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), PanoramaError> {
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        PanoramaError::new(ErrorKind::Fatal, format!("binding peer listener to {addr}")).with_cause(e)
    })?;

    tokio::pin!(shutdown);
    loop {
        let accepted = tokio::select! {
            biased;
            _ = &mut shutdown => return Ok(()),
            accepted = listener.accept() => accepted,
        };
        let (stream, peer_addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, handler).await {
                tracing::warn!(peer = %peer_addr, error = %e, "peer connection ended with an error");
            }
        });
    }
}

async fn serve_connection(
    stream: TcpStream,
    handler: Arc<dyn PeerRequestHandler>,
) -> Result<(), PanoramaError> {
    let mut framed = Framed::new(stream.compat(), JsonCodec::<WireResponse, WireRequest>::new());
    while let Some(request) = framed.next().await {
        let request = request.map_err(|e| {
            PanoramaError::new(ErrorKind::TransientPeer, "decoding peer request").with_cause(e)
        })?;
        let response = match request {
            WireRequest::LearnReport {
                kind,
                source,
                report,
            } => WireResponse::LearnReport(
                handler
                    .learn_report(kind, source, report)
                    .await
                    .map_err(|e| e.to_string()),
            ),
            WireRequest::Ping { source } => {
                WireResponse::Ping(handler.ping(source).await.map_err(|e| e.to_string()))
            }
        };
        framed.send(response).await.map_err(|e| {
            PanoramaError::new(ErrorKind::TransientPeer, "writing peer response").with_cause(e)
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TcpPeerClient;
    use panorama_exchange::PeerClient;
    use panorama_types::{Metric, Observation, Status, SubjectId, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        learned: AtomicUsize,
    }

    #[async_trait]
    impl PeerRequestHandler for CountingHandler {
        async fn learn_report(
            &self,
            _kind: LearnKind,
            _source: PeerId,
            _report: Report,
        ) -> Result<ReportOutcome, PanoramaError> {
            self.learned.fetch_add(1, Ordering::SeqCst);
            Ok(ReportOutcome::Accepted)
        }

        async fn ping(&self, _source: PeerId) -> Result<Timestamp, PanoramaError> {
            Ok(Timestamp::from_nanos(42))
        }
    }

    #[tokio::test]
    async fn client_round_trips_learn_report_and_ping_through_a_real_socket() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let handler = Arc::new(CountingHandler {
            learned: AtomicUsize::new(0),
        });
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
        let server = tokio::spawn(serve(addr, handler.clone(), async {
            let _ = stop_rx.await;
        }));

        // Give the listener a moment to bind before dialing it.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let client = TcpPeerClient::new(addr.to_string());
        let report = Report::new(
            panorama_types::ObserverId::new("A"),
            SubjectId::new("S"),
            Observation::from_metrics(
                Timestamp::from_nanos(1),
                [Metric::new("cpu", Value::new(Status::Healthy, 1.0))],
            ),
        );
        let outcome = client
            .learn_report(LearnKind::Normal, PeerId::new("A"), report)
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::Accepted);
        assert_eq!(handler.learned.load(Ordering::SeqCst), 1);

        let pong = client.ping(PeerId::new("A")).await.unwrap();
        assert_eq!(pong, Timestamp::from_nanos(42));

        let _ = stop_tx.send(());
        server.await.unwrap().unwrap();
    }
}
