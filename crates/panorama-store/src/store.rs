//! The watchlist and subject→panorama map.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use panorama_persist::{PersistAdapter, RowIdAllocator};
use panorama_types::{Observation, ObserverId, Report, ReportOutcome, SubjectId, Timestamp, View};
use tracing::warn;

use crate::gc::GcReport;
use crate::panorama::Panorama;

struct Inner {
    watchlist: BTreeSet<SubjectId>,
    panoramas: BTreeMap<SubjectId, Arc<Panorama>>,
}

/// The top-level observation store: the watchlist gate plus a bounded,
/// per-subject collection of per-observer views.
///
/// Two-tier locking mirrors `tor_chanmgr::mgr::map::ChannelMap`: `inner`
/// guards only the watchlist and the subject→panorama mapping. Each
/// [`Panorama`] then guards its own `views` with a separate lock, so a
/// write to one subject's views never blocks a reader of another subject's.
pub struct Store {
    inner: RwLock<Inner>,
    view_capacity: usize,
    persist: Arc<dyn PersistAdapter>,
    report_ids: RowIdAllocator,
}

impl Store {
    /// Construct an empty store. `view_capacity` bounds every per-observer
    /// view (`MaxReportPerView`); `persist` receives a fire-and-forget copy
    /// of every accepted report.
    pub fn new(view_capacity: usize, persist: Arc<dyn PersistAdapter>) -> Self {
        Store {
            inner: RwLock::new(Inner {
                watchlist: BTreeSet::new(),
                panoramas: BTreeMap::new(),
            }),
            view_capacity: view_capacity.max(1),
            persist,
            report_ids: RowIdAllocator::new(),
        }
    }

    /// Add `subject` to the watchlist. Returns `true` iff it was not already
    /// present.
    pub fn add_subject(&self, subject: SubjectId) -> bool {
        self.lock_mut().watchlist.insert(subject)
    }

    /// Remove `subject` from the watchlist; if `clean`, also drop its
    /// panorama (and every view it holds). Returns `true` iff the subject
    /// was on the watchlist.
    pub fn remove_subject(&self, subject: &SubjectId, clean: bool) -> bool {
        let mut inner = self.lock_mut();
        let removed = inner.watchlist.remove(subject);
        if clean {
            inner.panoramas.remove(subject);
        }
        removed
    }

    /// A snapshot of the watchlist.
    pub fn get_subjects(&self) -> Vec<SubjectId> {
        self.lock().watchlist.iter().cloned().collect()
    }

    /// File a report: inserts `subject` into the watchlist and appends
    /// `report`'s observation to the observer's view, or, if `filter` is
    /// set and `subject` is not on the watchlist, rejects it instead.
    pub fn add_report(&self, report: Report, filter: bool) -> ReportOutcome {
        let subject = report.subject.clone();

        let panorama = {
            let mut inner = self.lock_mut();
            if filter && !inner.watchlist.contains(&subject) {
                return ReportOutcome::Ignored;
            }
            inner.watchlist.insert(subject.clone());
            inner
                .panoramas
                .entry(subject.clone())
                .or_insert_with(|| Arc::new(Panorama::new(subject.clone())))
                .clone()
        };

        {
            let mut views = panorama
                .views
                .write()
                .expect("panorama-store panorama lock poisoned");
            let view = views.entry(report.observer.clone()).or_insert_with(|| {
                View::new(report.observer.clone(), subject.clone(), self.view_capacity)
            });
            view.push(report.observation.clone());
        }

        self.persist_report(report);
        ReportOutcome::Accepted
    }

    /// The most recent observation about `subject` across every observer,
    /// with the observer that filed it. `None` if the subject has no
    /// panorama yet.
    pub fn get_latest_report(&self, subject: &SubjectId) -> Option<(ObserverId, Observation)> {
        let panorama = self.get_panorama(subject)?;
        let views = panorama
            .views
            .read()
            .expect("panorama-store panorama lock poisoned");
        views
            .values()
            .filter_map(|v| v.latest().map(|o| (v.observer.clone(), o.clone())))
            .max_by_key(|(_, o)| o.ts)
    }

    /// A clone of one observer's view of `subject`, taken under the
    /// panorama's lock.
    pub fn get_view(&self, observer: &ObserverId, subject: &SubjectId) -> Option<View> {
        let panorama = self.get_panorama(subject)?;
        let views = panorama
            .views
            .read()
            .expect("panorama-store panorama lock poisoned");
        views.get(observer).cloned()
    }

    /// The live panorama for `subject`, still behind its own lock: callers
    /// must acquire that lock before iterating its views.
    pub fn get_panorama(&self, subject: &SubjectId) -> Option<Arc<Panorama>> {
        self.lock().panoramas.get(subject).cloned()
    }

    /// A snapshot of every subject's panorama. Safe to share without
    /// copying observations: they're immutable once stored.
    pub fn dump_panorama(&self) -> BTreeMap<SubjectId, Arc<Panorama>> {
        self.lock().panoramas.clone()
    }

    /// Sweep every panorama's views, dropping aged-out observations.
    /// `relative` selects between the relative and absolute retention modes.
    pub fn gc(&self, ttl: Duration, relative: bool) -> GcReport {
        let panoramas: Vec<Arc<Panorama>> = self.lock().panoramas.values().cloned().collect();
        let now = Timestamp::now();
        let mut report = GcReport::new();

        for panorama in panoramas {
            let mut views = panorama
                .views
                .write()
                .expect("panorama-store panorama lock poisoned");
            let mut reaped = 0;
            for view in views.values_mut() {
                reaped += if relative {
                    let max_ts = match view.latest() {
                        Some(o) => o.ts,
                        None => continue,
                    };
                    view.retain_keeping_latest(|o| max_ts.saturating_duration_since(o.ts) < ttl)
                } else {
                    let threshold = now.saturating_sub(ttl);
                    view.retain(|o| o.ts >= threshold)
                };
            }
            if reaped > 0 {
                report.insert(panorama.subject.clone(), reaped);
            }
        }

        report
    }

    fn persist_report(&self, report: Report) {
        let persist = self.persist.clone();
        let id = self.report_ids.next();
        let write = move || {
            if let Err(e) = persist.insert_report(id, &report) {
                warn!(error = %e, "failed to persist report");
            }
        };
        // Fire-and-forget: never let a slow disk stall the caller. Fall
        // back to an inline write outside a tokio runtime (plain
        // synchronous tests) since `spawn_blocking` has nowhere to run
        // there.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }

    fn lock(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("panorama-store lock poisoned")
    }

    fn lock_mut(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("panorama-store lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_persist::NullAdapter;

    fn store() -> Store {
        Store::new(3, Arc::new(NullAdapter))
    }

    fn report(observer: &str, subject: &str, ts: u128) -> Report {
        Report::new(
            ObserverId::new(observer),
            SubjectId::new(subject),
            Observation::new(Timestamp::from_nanos(ts)),
        )
    }

    #[test]
    fn watchlist_gate_ignores_unwatched_subjects() {
        let s = store();
        let outcome = s.add_report(report("FE_1", "TS_1", 1), true);
        assert_eq!(outcome, ReportOutcome::Ignored);
        assert!(s.get_panorama(&SubjectId::new("TS_1")).is_none());
    }

    #[test]
    fn unfiltered_report_creates_subject_and_panorama() {
        let s = store();
        let outcome = s.add_report(report("FE_1", "TS_1", 1), false);
        assert_eq!(outcome, ReportOutcome::Accepted);
        assert!(s.get_subjects().contains(&SubjectId::new("TS_1")));
        assert!(s.get_panorama(&SubjectId::new("TS_1")).is_some());
    }

    #[test]
    fn watchlist_upgrade_lets_later_filtered_reports_through() {
        let s = store();
        s.add_subject(SubjectId::new("TS_1"));
        let outcome = s.add_report(report("FE_1", "TS_1", 1), true);
        assert_eq!(outcome, ReportOutcome::Accepted);
    }

    #[test]
    fn view_is_bounded_and_drops_oldest() {
        let s = store();
        for ts in 0..5 {
            s.add_report(report("FE_1", "TS_1", ts), false);
        }
        let view = s.get_view(&ObserverId::new("FE_1"), &SubjectId::new("TS_1")).unwrap();
        assert_eq!(view.len(), 3);
        let kept: Vec<u128> = view.iter().map(|o| o.ts.as_nanos()).collect();
        assert_eq!(kept, vec![2, 3, 4]);
    }

    #[test]
    fn latest_report_picks_max_ts_across_observers() {
        let s = store();
        s.add_report(report("FE_1", "TS_1", 1), false);
        s.add_report(report("FE_2", "TS_1", 5), false);
        s.add_report(report("FE_3", "TS_1", 3), false);
        let (observer, obs) = s.get_latest_report(&SubjectId::new("TS_1")).unwrap();
        assert_eq!(observer, ObserverId::new("FE_2"));
        assert_eq!(obs.ts.as_nanos(), 5);
    }

    #[test]
    fn remove_subject_with_clean_drops_panorama() {
        let s = store();
        s.add_report(report("FE_1", "TS_1", 1), false);
        assert!(s.remove_subject(&SubjectId::new("TS_1"), true));
        assert!(s.get_panorama(&SubjectId::new("TS_1")).is_none());
        assert!(!s.get_subjects().contains(&SubjectId::new("TS_1")));
    }

    #[test]
    fn remove_subject_without_clean_keeps_panorama() {
        let s = store();
        s.add_report(report("FE_1", "TS_1", 1), false);
        assert!(s.remove_subject(&SubjectId::new("TS_1"), false));
        assert!(s.get_panorama(&SubjectId::new("TS_1")).is_some());
    }

    #[test]
    fn gc_relative_always_keeps_latest_observation() {
        let s = store();
        s.add_report(report("FE_1", "TS_1", 0), false);
        s.add_report(report("FE_1", "TS_1", 1), false);
        s.add_report(report("FE_1", "TS_1", 1_000_000_000), false);

        let reaped = s.gc(Duration::from_nanos(10), true);
        assert_eq!(reaped.get(&SubjectId::new("TS_1")), Some(&2));
        let view = s.get_view(&ObserverId::new("FE_1"), &SubjectId::new("TS_1")).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.latest().unwrap().ts.as_nanos(), 1_000_000_000);
    }

    #[test]
    fn gc_absolute_can_drop_every_observation() {
        let s = store();
        s.add_report(report("FE_1", "TS_1", 0), false);
        s.add_report(report("FE_1", "TS_1", 1), false);

        let reaped = s.gc(Duration::ZERO, false);
        assert_eq!(reaped.get(&SubjectId::new("TS_1")), Some(&2));
        let view = s.get_view(&ObserverId::new("FE_1"), &SubjectId::new("TS_1")).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn dump_panorama_snapshots_every_subject() {
        let s = store();
        s.add_report(report("FE_1", "TS_1", 1), false);
        s.add_report(report("FE_1", "TS_2", 1), false);
        let dump = s.dump_panorama();
        assert_eq!(dump.len(), 2);
    }
}
