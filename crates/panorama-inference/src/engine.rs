//! The background inference worker and its synchronous recompute API.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use panorama_error::{ErrorKind, PanoramaError};
use panorama_persist::{PersistAdapter, RowIdAllocator};
use panorama_store::Store;
use panorama_types::{Inference, Report, SubjectId};
use tokio::sync::mpsc;
use tracing::warn;

use crate::fold::{contributing_observers, fold_summaries, summarize_view};
use crate::workbook::Workbook;

/// Bounded capacity for both work queues: work is enqueued onto an
/// internal channel of bounded capacity, dropping nothing — the submitter
/// blocks instead once it's full.
pub const QUEUE_CAPACITY: usize = 50;

/// Work posted to the report queue; `Stop` is the sentinel posted to
/// unblock a receiver parked on an empty channel.
enum ReportWork {
    Report(Report),
    Stop,
}

/// Folds per-observer views into subject-wide health inferences.
///
/// Two bounded channels feed one background worker task: one for full
/// subject recomputes, one for report-driven incremental recomputes,
/// kept distinct so a subject-wide recompute never blocks behind a
/// backlog of per-report work.
pub struct Engine {
    store: Arc<Store>,
    persist: Arc<dyn PersistAdapter>,
    results: RwLock<BTreeMap<SubjectId, Inference>>,
    workbook: Workbook,
    history_size: usize,
    alive: AtomicBool,
    subject_tx: mpsc::Sender<SubjectId>,
    report_tx: mpsc::Sender<ReportWork>,
    inference_ids: RowIdAllocator,
}

impl Engine {
    /// Construct the engine and spawn its worker task onto the current
    /// runtime. `history_size` is typically `VIEW_METRIC_HISTORY_SIZE`.
    pub fn start(store: Arc<Store>, persist: Arc<dyn PersistAdapter>, history_size: usize) -> Arc<Self> {
        let (subject_tx, mut subject_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (report_tx, mut report_rx) = mpsc::channel(QUEUE_CAPACITY);

        let engine = Arc::new(Engine {
            store,
            persist,
            results: RwLock::new(BTreeMap::new()),
            workbook: Workbook::new(),
            history_size,
            alive: AtomicBool::new(true),
            subject_tx,
            report_tx,
            inference_ids: RowIdAllocator::new(),
        });

        let worker = Arc::clone(&engine);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    work = report_rx.recv() => {
                        match work {
                            Some(ReportWork::Report(report)) => {
                                if !worker.alive.load(Ordering::Acquire) {
                                    break;
                                }
                                worker.infer_report(&report);
                            }
                            Some(ReportWork::Stop) | None => break,
                        }
                    }
                    subject = subject_rx.recv() => {
                        match subject {
                            Some(subject) => {
                                if !worker.alive.load(Ordering::Acquire) {
                                    break;
                                }
                                worker.infer_subject(&subject);
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        engine
    }

    /// Enqueue a subject for wholesale recomputation; blocks if the queue is
    /// full rather than dropping the request.
    pub async fn infer_subject_async(&self, subject: SubjectId) -> Result<(), PanoramaError> {
        self.subject_tx.send(subject).await.map_err(|_| worker_gone())
    }

    /// Enqueue a report for incremental recomputation; blocks if the queue is
    /// full rather than dropping the request.
    pub async fn infer_report_async(&self, report: Report) -> Result<(), PanoramaError> {
        self.report_tx
            .send(ReportWork::Report(report))
            .await
            .map_err(|_| worker_gone())
    }

    /// Synchronously recompute the whole panorama for `subject`, clearing
    /// its workbook first.
    pub fn infer_subject(&self, subject: &SubjectId) -> Option<Inference> {
        self.workbook.clear_subject(subject);
        self.recompute(subject)
    }

    /// Synchronously recompute incrementally: only `report.observer`'s
    /// memoized summary is invalidated before re-folding.
    pub fn infer_report(&self, report: &Report) -> Option<Inference> {
        self.workbook.invalidate(&report.subject, &report.observer);
        self.recompute(&report.subject)
    }

    /// The most recently memoized inference for `subject`, if any.
    pub fn get_inference(&self, subject: &SubjectId) -> Option<Inference> {
        self.results
            .read()
            .expect("panorama-inference results lock poisoned")
            .get(subject)
            .cloned()
    }

    /// A snapshot of every memoized inference.
    pub fn dump_inference(&self) -> BTreeMap<SubjectId, Inference> {
        self.results
            .read()
            .expect("panorama-inference results lock poisoned")
            .clone()
    }

    /// Stop the worker: flips the alive flag and posts the sentinel that
    /// unblocks a receiver parked on an empty report queue.
    pub async fn stop(&self) {
        self.alive.store(false, Ordering::Release);
        let _ = self.report_tx.send(ReportWork::Stop).await;
    }

    fn recompute(&self, subject: &SubjectId) -> Option<Inference> {
        let panorama = self.store.get_panorama(subject)?;
        let views = panorama
            .views
            .read()
            .expect("panorama-store panorama lock poisoned");

        let mut summaries = BTreeMap::new();
        for (observer, view) in views.iter() {
            let summary = match self.workbook.get(subject, observer) {
                Some(cached) => cached,
                None => match summarize_view(view, self.history_size) {
                    Some(fresh) => {
                        self.workbook.insert(subject, observer.clone(), fresh.clone());
                        fresh
                    }
                    None => continue,
                },
            };
            summaries.insert(observer.clone(), summary);
        }
        drop(views);

        let folded = fold_summaries(&summaries)?;
        let inference = Inference::new(subject.clone(), contributing_observers(&summaries), folded);

        self.results
            .write()
            .expect("panorama-inference results lock poisoned")
            .insert(subject.clone(), inference.clone());
        self.persist_inference(inference.clone());
        Some(inference)
    }

    fn persist_inference(&self, inference: Inference) {
        let persist = self.persist.clone();
        let id = self.inference_ids.next();
        let write = move || {
            if let Err(e) = persist.insert_inference(id, &inference) {
                warn!(error = %e, "failed to persist inference");
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

fn worker_gone() -> PanoramaError {
    PanoramaError::new(ErrorKind::Fatal, "inference worker task is no longer running")
}
