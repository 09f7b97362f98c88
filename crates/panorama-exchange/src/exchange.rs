//! Peer fan-out and the subject-at-peer interest state machine.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use futures::future::join_all;
use panorama_error::PanoramaError;
use panorama_types::{ObserverId, PeerId, Report, ReportOutcome, SubjectId, Timestamp};
use tracing::debug;

use crate::client::{LearnKind, PeerClient, PeerClientFactory};
use crate::ignore_set::IgnoreSet;

/// The result of a fan-out ([`Exchange::propagate`] or
/// [`Exchange::ping_all`]): per-peer elapsed time for observability, plus
/// the first error encountered, if any. Every peer is tried regardless of
/// earlier failures; only the first error survives in the outcome.
#[derive(Debug, Default)]
pub struct FanOutOutcome {
    /// Wall-clock time each peer's RPC took.
    pub elapsed: BTreeMap<PeerId, Duration>,
    /// The first error encountered across the fan-out, if any.
    pub first_error: Option<PanoramaError>,
}

/// Peer fan-out: propagates reports, tracks per-subject peer interest, and
/// answers liveness pings.
///
/// Holds the peer table, a lazily populated client cache, and a two-tier
/// locking scheme over per-subject interest: one lock around the
/// subject→ignore-set mapping, and one lock per ignore-set, so that
/// concurrent propagation to different subjects never contends on the same
/// lock.
pub struct Exchange {
    my_id: PeerId,
    peers: BTreeMap<PeerId, String>,
    ignore_sets: RwLock<BTreeMap<SubjectId, Arc<IgnoreSet>>>,
    clients: RwLock<BTreeMap<PeerId, Arc<dyn PeerClient>>>,
    factory: Arc<dyn PeerClientFactory>,
}

impl Exchange {
    /// Construct an exchange for node `my_id`, with the given peer
    /// id→address table and a factory for lazily dialing peers.
    pub fn new(my_id: PeerId, peers: BTreeMap<PeerId, String>, factory: Arc<dyn PeerClientFactory>) -> Self {
        Exchange {
            my_id,
            peers,
            ignore_sets: RwLock::new(BTreeMap::new()),
            clients: RwLock::new(BTreeMap::new()),
            factory,
        }
    }

    /// This node's own id.
    pub fn my_id(&self) -> &PeerId {
        &self.my_id
    }

    /// The configured peer table (id → address), excluding this node.
    pub fn peers(&self) -> &BTreeMap<PeerId, String> {
        &self.peers
    }

    /// Fan out a NORMAL `LearnReport` about `report` to every peer except
    /// self, skipping any peer in the subject's ignore-set. On an IGNORED
    /// reply, the replying peer is added to the subject's ignore-set.
    pub async fn propagate(&self, report: &Report) -> FanOutOutcome {
        let ignore_set = self.ignore_sets.read()
            .expect("panorama-exchange ignore-sets lock poisoned")
            .get(&report.subject)
            .cloned();

        let targets: Vec<PeerId> = self
            .peers
            .keys()
            .filter(|peer| **peer != self.my_id)
            .filter(|peer| match &ignore_set {
                Some(set) => !set.contains(peer),
                None => true,
            })
            .cloned()
            .collect();

        let calls = targets.into_iter().map(|peer| {
            let report = report.clone();
            async move {
                let client = self.client_for(&peer);
                let start = Instant::now();
                let result = client.learn_report(LearnKind::Normal, self.my_id.clone(), report).await;
                (peer, start.elapsed(), result)
            }
        });

        let results = join_all(calls).await;

        let mut outcome = FanOutOutcome::default();
        for (peer, elapsed, result) in results {
            outcome.elapsed.insert(peer.clone(), elapsed);
            match result {
                Ok(ReportOutcome::Ignored) => {
                    self.ignore_set_for(&report.subject).insert(peer.clone());
                    debug!(%peer, subject = %report.subject, "peer ignored report, added to ignore-set");
                }
                Ok(_) => {}
                Err(e) => {
                    if outcome.first_error.is_none() {
                        outcome.first_error = Some(e);
                    }
                }
            }
        }
        outcome
    }

    /// Send a SUBSCRIPTION `LearnReport` about `subject` to every peer,
    /// ungated by the ignore-set.
    pub async fn subscribe(&self, subject: &SubjectId) -> FanOutOutcome {
        self.broadcast_kind(subject, LearnKind::Subscription).await
    }

    /// Send an UNSUBSCRIPTION `LearnReport` about `subject` to every peer,
    /// ungated by the ignore-set.
    pub async fn unsubscribe(&self, subject: &SubjectId) -> FanOutOutcome {
        self.broadcast_kind(subject, LearnKind::Unsubscription).await
    }

    async fn broadcast_kind(&self, subject: &SubjectId, kind: LearnKind) -> FanOutOutcome {
        let marker = Report::new(
            ObserverId::new(self.my_id.as_str()),
            subject.clone(),
            panorama_types::Observation::new(Timestamp::now()),
        );

        let targets: Vec<PeerId> = self.peers.keys().filter(|p| **p != self.my_id).cloned().collect();
        let calls = targets.into_iter().map(|peer| {
            let report = marker.clone();
            async move {
                let client = self.client_for(&peer);
                let start = Instant::now();
                let result = client.learn_report(kind, self.my_id.clone(), report).await;
                (peer, start.elapsed(), result)
            }
        });

        let results = join_all(calls).await;
        let mut outcome = FanOutOutcome::default();
        for (peer, elapsed, result) in results {
            outcome.elapsed.insert(peer, elapsed);
            if let Err(e) = result {
                if outcome.first_error.is_none() {
                    outcome.first_error = Some(e);
                }
            }
        }
        outcome
    }

    /// Remove `peer` from `subject`'s ignore-set, marking it Interested
    /// again. Returns `true` iff an ignore-set existed for the subject at
    /// all (a no-op subject never had one).
    pub fn interested(&self, peer: &PeerId, subject: &SubjectId) -> bool {
        let set = self
            .ignore_sets
            .read()
            .expect("panorama-exchange ignore-sets lock poisoned")
            .get(subject)
            .cloned();
        match set {
            Some(set) => {
                set.remove(peer);
                true
            }
            None => false,
        }
    }

    /// Add `peer` to `subject`'s ignore-set, marking it Uninterested.
    /// Always returns `true` (an ignore-set is created if one is missing).
    pub fn uninterested(&self, peer: &PeerId, subject: &SubjectId) -> bool {
        self.ignore_set_for(subject).insert(peer.clone());
        true
    }

    /// Liveness-probe one peer, returning its reported time.
    pub async fn ping(&self, peer: &PeerId) -> Result<Timestamp, PanoramaError> {
        self.client_for(peer).ping(self.my_id.clone()).await
    }

    /// Liveness-probe every peer except self.
    pub async fn ping_all(&self) -> (BTreeMap<PeerId, Timestamp>, Option<PanoramaError>) {
        let targets: Vec<PeerId> = self.peers.keys().filter(|p| **p != self.my_id).cloned().collect();
        let calls = targets.into_iter().map(|peer| async move {
            let result = self.ping(&peer).await;
            (peer, result)
        });

        let results = join_all(calls).await;
        let mut replies = BTreeMap::new();
        let mut first_error = None;
        for (peer, result) in results {
            match result {
                Ok(ts) => {
                    replies.insert(peer, ts);
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        (replies, first_error)
    }

    fn ignore_set_for(&self, subject: &SubjectId) -> Arc<IgnoreSet> {
        if let Some(set) = self
            .ignore_sets
            .read()
            .expect("panorama-exchange ignore-sets lock poisoned")
            .get(subject)
        {
            return set.clone();
        }
        self.ignore_sets
            .write()
            .expect("panorama-exchange ignore-sets lock poisoned")
            .entry(subject.clone())
            .or_insert_with(|| Arc::new(IgnoreSet::new()))
            .clone()
    }

    fn client_for(&self, peer: &PeerId) -> Arc<dyn PeerClient> {
        if let Some(client) = self
            .clients
            .read()
            .expect("panorama-exchange clients lock poisoned")
            .get(peer)
        {
            return client.clone();
        }
        let addr = self.peers.get(peer).map(String::as_str).unwrap_or_default();
        let client = self.factory.connect(peer, addr);
        self.clients
            .write()
            .expect("panorama-exchange clients lock poisoned")
            .entry(peer.clone())
            .or_insert(client)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LearnKind;
    use async_trait::async_trait;
    use panorama_types::{Observation, Status, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeClient {
        reply: ReportOutcome,
        calls: Arc<AtomicUsize>,
        kinds: Mutex<Vec<LearnKind>>,
    }

    #[async_trait]
    impl PeerClient for FakeClient {
        async fn learn_report(
            &self,
            kind: LearnKind,
            _source: PeerId,
            _report: Report,
        ) -> Result<ReportOutcome, PanoramaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.kinds.lock().unwrap().push(kind);
            Ok(self.reply)
        }

        async fn ping(&self, _source: PeerId) -> Result<Timestamp, PanoramaError> {
            Ok(Timestamp::now())
        }
    }

    struct FakeFactory {
        reply: ReportOutcome,
        calls: Arc<AtomicUsize>,
    }

    impl PeerClientFactory for FakeFactory {
        fn connect(&self, _peer: &PeerId, _addr: &str) -> Arc<dyn PeerClient> {
            Arc::new(FakeClient {
                reply: self.reply,
                calls: self.calls.clone(),
                kinds: Mutex::new(Vec::new()),
            })
        }
    }

    fn exchange(reply: ReportOutcome, calls: Arc<AtomicUsize>) -> Exchange {
        let mut peers = BTreeMap::new();
        peers.insert(PeerId::new("A"), "A_addr".to_string());
        peers.insert(PeerId::new("B"), "B_addr".to_string());
        peers.insert(PeerId::new("C"), "C_addr".to_string());
        Exchange::new(PeerId::new("A"), peers, Arc::new(FakeFactory { reply, calls }))
    }

    fn report(subject: &str) -> Report {
        Report::new(
            ObserverId::new("FE_1"),
            SubjectId::new(subject),
            Observation::new(Timestamp::from_nanos(1)).with_metric(panorama_types::Metric::new(
                "cpu",
                Value::new(Status::Healthy, 90.0),
            )),
        )
    }

    #[tokio::test]
    async fn propagate_skips_self_and_calls_every_other_peer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ex = exchange(ReportOutcome::Accepted, calls.clone());
        let outcome = ex.propagate(&report("TS_1")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.elapsed.len(), 2);
        assert!(outcome.first_error.is_none());
    }

    #[tokio::test]
    async fn ignored_reply_adds_peer_to_ignore_set_and_future_propagate_skips_it() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ex = exchange(ReportOutcome::Ignored, calls.clone());
        ex.propagate(&report("TS_1")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        calls.store(0, Ordering::SeqCst);
        ex.propagate(&report("TS_1")).await;
        // Both B and C ignored last time, so the second propagate skips both.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn interested_clears_a_peer_from_the_ignore_set() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ex = exchange(ReportOutcome::Ignored, calls.clone());
        ex.propagate(&report("TS_1")).await;

        assert!(ex.interested(&PeerId::new("B"), &SubjectId::new("TS_1")));
        calls.store(0, Ordering::SeqCst);
        ex.propagate(&report("TS_1")).await;
        // B was un-ignored, C remains ignored.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn uninterested_adds_a_peer_without_needing_a_prior_reply() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ex = exchange(ReportOutcome::Accepted, calls.clone());
        assert!(ex.uninterested(&PeerId::new("B"), &SubjectId::new("TS_1")));
        ex.propagate(&report("TS_1")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_is_not_gated_by_the_ignore_set() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ex = exchange(ReportOutcome::Ignored, calls.clone());
        ex.uninterested(&PeerId::new("B"), &SubjectId::new("TS_1"));
        calls.store(0, Ordering::SeqCst);
        ex.subscribe(&SubjectId::new("TS_1")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn interested_on_a_subject_with_no_ignore_set_is_a_no_op() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ex = exchange(ReportOutcome::Accepted, calls);
        assert!(!ex.interested(&PeerId::new("B"), &SubjectId::new("TS_9")));
    }
}
