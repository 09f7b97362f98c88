//! Wires Store, Inference and Exchange behind the `Register`/`SubmitReport`/
//! `LearnReport` RPC surface.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use panorama_cache::ListCache;
use panorama_config::{BufConfig, GcConfig};
use panorama_error::{internal, PanoramaError};
use panorama_exchange::{Exchange, LearnKind};
use panorama_inference::Engine;
use panorama_persist::{PersistAdapter, RowIdAllocator};
use panorama_store::{Panorama, Store};
use panorama_transport::PeerRequestHandler;
use panorama_types::{
    Handle, Inference, ObserverId, PeerId, Registration, Report, ReportOutcome, SubjectId, Timestamp, View,
};
use tracing::warn;

/// Owns every other subsystem and answers the observer-facing RPCs.
///
/// `SubmitReport` needs the store, the engine and the exchange all at
/// once; resolved the way `arti_client::TorClient` resolves the same shape
/// for its own subsystems: one struct holds `Arc<Store>`, `Arc<Engine>`,
/// `Arc<Exchange>` as plain fields, and every other component stays
/// ignorant of it.
pub struct Dispatcher {
    store: Arc<Store>,
    engine: Arc<Engine>,
    exchange: Arc<Exchange>,
    persist: Arc<dyn PersistAdapter>,
    handles: crate::handles::HandleTable,
    hold_buffer: ListCache<SubjectId, Report>,
    hold_time: Duration,
    filter_submission: bool,
    registration_ids: RowIdAllocator,
}

impl Dispatcher {
    /// Construct a dispatcher over already-running subsystems.
    pub fn new(
        store: Arc<Store>,
        engine: Arc<Engine>,
        exchange: Arc<Exchange>,
        persist: Arc<dyn PersistAdapter>,
        buf: BufConfig,
        filter_submission: bool,
    ) -> Arc<Self> {
        Arc::new(Dispatcher {
            store,
            engine,
            exchange,
            persist,
            handles: crate::handles::HandleTable::new(),
            hold_buffer: ListCache::new(buf.hold_list_len),
            hold_time: buf.hold_time(),
            filter_submission,
            registration_ids: RowIdAllocator::new(),
        })
    }

    /// Spawn the background garbage-collection loop. A no-op if
    /// `gc.enable` is false.
    pub fn spawn_gc(self: &Arc<Self>, gc: GcConfig) {
        if !gc.enable {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(gc.frequency()).await;
                let reaped = this.store.gc(gc.threshold(), gc.relative);
                for subject in reaped.keys() {
                    if let Err(e) = this.engine.infer_subject_async(subject.clone()).await {
                        warn!(%subject, error = %e, "failed to enqueue post-GC recompute");
                    }
                }
            }
        });
    }

    /// `Register(module, observer)`: idempotent capability issuance. Also
    /// watches `observer` as a subject, so a node's reports about itself are
    /// accepted even before anyone explicitly calls `Observe`.
    pub fn register(&self, module: &str, observer: &ObserverId) -> Handle {
        let (handle, fresh) = self.handles.register(module, observer);
        if fresh {
            self.store.add_subject(SubjectId::new(observer.as_str()));
            self.persist_registration(Registration::new(handle, module, observer.clone(), Timestamp::now()));
        }
        handle
    }

    /// `SubmitReport(handle, report)`: a local observer filing a report.
    /// Never filtered by the watchlist — `AnalyzeReport`/`Propagate` run
    /// fire-and-forget once the store accepts it.
    pub fn submit_report(self: &Arc<Self>, handle: Handle, report: Report) -> Result<ReportOutcome, PanoramaError> {
        self.check_handle(handle)?;
        let outcome = self.store.add_report(report.clone(), false);
        match outcome {
            ReportOutcome::Accepted => {
                let this = Arc::clone(self);
                let analyzed = report.clone();
                tokio::spawn(async move {
                    this.analyze_report(&analyzed, true).await;
                });
                let exchange = self.exchange.clone();
                let propagated = report;
                tokio::spawn(async move {
                    let outcome = exchange.propagate(&propagated).await;
                    if let Some(e) = outcome.first_error {
                        warn!(error = %e, "propagating a local report to peers");
                    }
                });
            }
            ReportOutcome::Ignored => {
                return Err(internal!(
                    "SubmitReport got IGNORED for handle {handle}; AddReport is never filtered for local submissions"
                )
                .into());
            }
            _ => {}
        }
        Ok(outcome)
    }

    /// `LearnReport(kind, source, report)`: a peer's RPC.
    pub async fn learn_report(
        self: &Arc<Self>,
        kind: LearnKind,
        source: PeerId,
        report: Report,
    ) -> Result<ReportOutcome, PanoramaError> {
        match kind {
            LearnKind::Normal => {
                let outcome = self.store.add_report(report.clone(), self.filter_submission);
                match outcome {
                    ReportOutcome::Accepted => {
                        self.exchange.interested(&source, &report.subject);
                        if let Err(e) = self.engine.infer_report_async(report.clone()).await {
                            warn!(error = %e, "enqueueing incremental recompute after LearnReport");
                        }
                    }
                    ReportOutcome::Ignored => {
                        self.hold_buffer.set(report.subject.clone(), report.clone(), self.hold_time);
                    }
                    _ => {}
                }
                Ok(outcome)
            }
            LearnKind::Subscription => {
                self.exchange.interested(&source, &report.subject);
                Ok(ReportOutcome::Accepted)
            }
            LearnKind::Unsubscription => {
                self.exchange.uninterested(&source, &report.subject);
                Ok(ReportOutcome::Accepted)
            }
        }
    }

    /// `GetLatestReport(subject)`.
    pub fn get_latest_report(&self, subject: &SubjectId) -> Result<(ObserverId, panorama_types::Observation), PanoramaError> {
        self.store
            .get_latest_report(subject)
            .ok_or_else(|| PanoramaError::not_found(format!("no reports for subject {subject}")))
    }

    /// `GetPanorama(subject)`.
    pub fn get_panorama(&self, subject: &SubjectId) -> Result<Arc<Panorama>, PanoramaError> {
        self.store
            .get_panorama(subject)
            .ok_or_else(|| PanoramaError::not_found(format!("unknown subject {subject}")))
    }

    /// `GetView(observer, subject)`.
    pub fn get_view(&self, observer: &ObserverId, subject: &SubjectId) -> Result<View, PanoramaError> {
        self.store
            .get_view(observer, subject)
            .ok_or_else(|| PanoramaError::not_found(format!("no view for observer {observer} of subject {subject}")))
    }

    /// `GetInference(subject)`.
    pub fn get_inference(&self, subject: &SubjectId) -> Result<Inference, PanoramaError> {
        self.engine
            .get_inference(subject)
            .ok_or_else(|| PanoramaError::not_found(format!("no inference for subject {subject}")))
    }

    /// `Observe(subject)`: watch a subject, and tell peers we're interested.
    pub fn observe(self: &Arc<Self>, subject: SubjectId) -> bool {
        let added = self.store.add_subject(subject.clone());
        let exchange = self.exchange.clone();
        tokio::spawn(async move {
            exchange.subscribe(&subject).await;
        });
        added
    }

    /// `StopObserving(subject)`: unwatch a subject, and tell peers we're no
    /// longer interested. `clean` also drops the subject's panorama.
    pub fn stop_observing(self: &Arc<Self>, subject: &SubjectId, clean: bool) -> bool {
        let removed = self.store.remove_subject(subject, clean);
        let exchange = self.exchange.clone();
        let subject = subject.clone();
        tokio::spawn(async move {
            exchange.unsubscribe(&subject).await;
        });
        removed
    }

    /// `GetObservedSubjects()`.
    pub fn get_observed_subjects(&self) -> Vec<SubjectId> {
        self.store.get_subjects()
    }

    /// `DumpPanorama()`.
    pub fn dump_panorama(&self) -> BTreeMap<SubjectId, Arc<Panorama>> {
        self.store.dump_panorama()
    }

    /// `DumpInference()`.
    pub fn dump_inference(&self) -> BTreeMap<SubjectId, Inference> {
        self.engine.dump_inference()
    }

    /// `GetPeers()`.
    pub fn get_peers(&self) -> BTreeMap<PeerId, String> {
        self.exchange.peers().clone()
    }

    /// `GetId()`.
    pub fn get_id(&self) -> PeerId {
        self.exchange.my_id().clone()
    }

    /// `Ping(peer)`: liveness-probe one peer.
    pub async fn ping(&self, peer: &PeerId) -> Result<Timestamp, PanoramaError> {
        self.exchange.ping(peer).await
    }

    /// Replays the hold-buffer for `report.subject` if `check_hold`, then
    /// forwards `report` to the inference engine either way.
    async fn analyze_report(&self, report: &Report, check_hold: bool) {
        if check_hold {
            for held in self.hold_buffer.get(&report.subject) {
                self.store.add_report(held, false);
            }
            self.hold_buffer.empty(&report.subject);
            self.exchange.subscribe(&report.subject).await;
        }
        if let Err(e) = self.engine.infer_report_async(report.clone()).await {
            warn!(error = %e, "enqueueing recompute from AnalyzeReport");
        }
    }

    fn check_handle(&self, handle: Handle) -> Result<(), PanoramaError> {
        if self.handles.is_valid(handle) {
            Ok(())
        } else {
            Err(PanoramaError::bad_handle(handle))
        }
    }

    fn persist_registration(&self, registration: Registration) {
        let persist = self.persist.clone();
        let id = self.registration_ids.next();
        let write = move || {
            if let Err(e) = persist.insert_registration(id, &registration) {
                warn!(error = %e, "failed to persist registration");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}

/// Adapts a [`Dispatcher`] to [`PeerRequestHandler`].
///
/// A plain `impl PeerRequestHandler for Arc<Dispatcher>` is an orphan-rule
/// violation (`Arc` isn't a fundamental type), so incoming peer connections
/// are served through this thin wrapper instead.
pub struct DispatcherPeerHandler(pub Arc<Dispatcher>);

#[async_trait]
impl PeerRequestHandler for DispatcherPeerHandler {
    async fn learn_report(&self, kind: LearnKind, source: PeerId, report: Report) -> Result<ReportOutcome, PanoramaError> {
        self.0.learn_report(kind, source, report).await
    }

    async fn ping(&self, _source: PeerId) -> Result<Timestamp, PanoramaError> {
        Ok(Timestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use panorama_error::HasKind;
    use panorama_persist::NullAdapter;
    use panorama_types::{Metric, Observation, Status, Value};
    use std::collections::BTreeMap as Map;

    struct FakePeerClient;

    #[async_trait]
    impl panorama_exchange::PeerClient for FakePeerClient {
        async fn learn_report(
            &self,
            _kind: LearnKind,
            _source: PeerId,
            _report: Report,
        ) -> Result<ReportOutcome, PanoramaError> {
            Ok(ReportOutcome::Accepted)
        }

        async fn ping(&self, _source: PeerId) -> Result<Timestamp, PanoramaError> {
            Ok(Timestamp::now())
        }
    }

    struct FakeFactory;

    impl panorama_exchange::PeerClientFactory for FakeFactory {
        fn connect(&self, _peer: &PeerId, _addr: &str) -> Arc<dyn panorama_exchange::PeerClient> {
            Arc::new(FakePeerClient)
        }
    }

    fn report(observer: &str, subject: &str, ts: u128) -> Report {
        Report::new(
            ObserverId::new(observer),
            SubjectId::new(subject),
            Observation::from_metrics(Timestamp::from_nanos(ts), [Metric::new("cpu", Value::new(Status::Healthy, 1.0))]),
        )
    }

    fn dispatcher() -> Arc<Dispatcher> {
        let persist: Arc<dyn PersistAdapter> = Arc::new(NullAdapter);
        let store = Arc::new(Store::new(10, persist.clone()));
        let engine = Engine::start(store.clone(), persist.clone(), 2);
        let exchange = Arc::new(Exchange::new(PeerId::new("self"), Map::new(), Arc::new(FakeFactory)));
        Dispatcher::new(store, engine, exchange, persist, BufConfig::default(), true)
    }

    #[tokio::test]
    async fn registering_the_same_pair_twice_is_idempotent() {
        let d = dispatcher();
        let h1 = d.register("agent", &ObserverId::new("FE_1"));
        let h2 = d.register("agent", &ObserverId::new("FE_1"));
        assert_eq!(h1, h2);
        assert!(d.get_observed_subjects().contains(&SubjectId::new("FE_1")));
    }

    #[tokio::test]
    async fn submit_report_rejects_an_unknown_handle() {
        let d = dispatcher();
        let err = d.submit_report(99, report("FE_1", "TS_1", 1)).unwrap_err();
        assert_eq!(err.kind(), panorama_error::ErrorKind::BadHandle);
    }

    #[tokio::test]
    async fn submit_report_is_accepted_for_a_registered_handle() {
        let d = dispatcher();
        let handle = d.register("agent", &ObserverId::new("FE_1"));
        let outcome = d.submit_report(handle, report("FE_1", "TS_1", 1)).unwrap();
        assert_eq!(outcome, ReportOutcome::Accepted);
    }

    #[tokio::test]
    async fn learn_report_normal_parks_ignored_reports_in_the_hold_buffer() {
        let d = dispatcher();
        let outcome = d
            .learn_report(LearnKind::Normal, PeerId::new("peer-a"), report("FE_1", "TS_1", 1))
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::Ignored);
        assert!(d.get_panorama(&SubjectId::new("TS_1")).is_err());
    }

    #[tokio::test]
    async fn analyze_report_replays_the_hold_buffer_once_the_subject_is_watched() {
        let d = dispatcher();
        d.learn_report(LearnKind::Normal, PeerId::new("peer-a"), report("FE_1", "TS_1", 1))
            .await
            .unwrap();

        let handle = d.register("agent", &ObserverId::new("TS_1"));
        d.submit_report(handle, report("TS_1", "TS_1", 2)).unwrap();

        for _ in 0..50 {
            if d.get_view(&ObserverId::new("FE_1"), &SubjectId::new("TS_1")).is_ok() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let view = d.get_view(&ObserverId::new("FE_1"), &SubjectId::new("TS_1")).unwrap();
        assert_eq!(view.len(), 1);
    }

    #[tokio::test]
    async fn learn_report_subscription_and_unsubscription_reply_accepted() {
        let d = dispatcher();
        let subj = SubjectId::new("TS_1");
        let marker = report("peer-a", "TS_1", 1);
        let sub = d.learn_report(LearnKind::Subscription, PeerId::new("peer-a"), marker.clone()).await.unwrap();
        assert_eq!(sub, ReportOutcome::Accepted);
        let unsub = d.learn_report(LearnKind::Unsubscription, PeerId::new("peer-a"), marker).await.unwrap();
        assert_eq!(unsub, ReportOutcome::Accepted);
        let _ = subj;
    }

    #[tokio::test]
    async fn gc_loop_is_a_noop_when_disabled() {
        let d = dispatcher();
        let gc = GcConfig::builder().enable(false).build().unwrap();
        d.spawn_gc(gc);
        // No assertion beyond "doesn't panic/hang" — disabled GC never runs.
        tokio::task::yield_now().await;
    }
}
