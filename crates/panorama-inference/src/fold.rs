//! The pure math of view summarization and panorama folding.
//!
//! Kept free of locks and channels so it can be unit-tested directly against
//! [`View`] and workbook snapshots without spinning up the worker task.

use std::collections::{BTreeMap, BTreeSet};

use panorama_types::{Metric, Observation, ObserverId, Status, Timestamp, Value, View};

/// Summarize a single observer's view, walking from most recent backwards
/// per metric.
///
/// `history_size` is `VIEW_METRIC_HISTORY_SIZE`: once a metric has
/// contributed this many observations (or has hit a status change), older
/// observations of that metric stop being considered. Returns `None` if the
/// view has no observations at all.
pub fn summarize_view(view: &View, history_size: usize) -> Option<Observation> {
    let latest_ts = view.latest()?.ts;

    struct Accum {
        status: Status,
        score_sum: f32,
        count: usize,
        stopped: bool,
    }

    let mut accums: BTreeMap<&str, Accum> = BTreeMap::new();

    for obs in view.iter_rev() {
        for (name, metric) in &obs.metrics {
            match accums.get_mut(name.as_str()) {
                None => {
                    accums.insert(
                        name.as_str(),
                        Accum {
                            status: metric.value.status,
                            score_sum: metric.value.score,
                            count: 1,
                            stopped: false,
                        },
                    );
                }
                Some(acc) => {
                    if acc.stopped || acc.count >= history_size {
                        continue;
                    }
                    if metric.value.status == Status::Pending && acc.status == Status::Healthy {
                        // PENDING is consumed by the HEALTHY that followed it;
                        // keep scanning back without counting this entry.
                        continue;
                    } else if metric.value.status != acc.status {
                        acc.stopped = true;
                    } else {
                        acc.score_sum += metric.value.score;
                        acc.count += 1;
                    }
                }
            }
        }
    }

    if accums.is_empty() {
        return None;
    }

    let mut summary = Observation::new(latest_ts);
    for (name, acc) in accums {
        let score = acc.score_sum / acc.count as f32;
        summary = summary.with_metric(Metric::new(name, Value::new(acc.status, score)));
    }
    Some(summary)
}

/// Fold per-observer view summaries into one subject-wide observation.
/// Returns `None` if no observer contributed a summary.
pub fn fold_summaries(summaries: &BTreeMap<ObserverId, Observation>) -> Option<Observation> {
    if summaries.is_empty() {
        return None;
    }

    struct MetricFold {
        score_sum: f32,
        count: usize,
        histogram: BTreeMap<Status, usize>,
    }

    let mut per_metric: BTreeMap<&str, MetricFold> = BTreeMap::new();
    let mut max_ts: Option<Timestamp> = None;

    for summary in summaries.values() {
        max_ts = Some(max_ts.map_or(summary.ts, |t| t.max(summary.ts)));
        for (name, metric) in &summary.metrics {
            let fold = per_metric.entry(name.as_str()).or_insert_with(|| MetricFold {
                score_sum: 0.0,
                count: 0,
                histogram: BTreeMap::new(),
            });
            fold.score_sum += metric.value.score;
            fold.count += 1;
            *fold.histogram.entry(metric.value.status).or_insert(0) += 1;
        }
    }

    let ts = max_ts?;
    let mut folded = Observation::new(ts);
    for (name, fold) in per_metric {
        // Mode of the histogram; ties broken by the higher ordinal (more
        // severe) status.
        let mut chosen_status = Status::Invalid;
        let mut chosen_count = 0usize;
        for (&status, &count) in &fold.histogram {
            if count > chosen_count || (count == chosen_count && status > chosen_status) {
                chosen_status = status;
                chosen_count = count;
            }
        }
        let score = fold.score_sum / fold.count as f32;
        folded = folded.with_metric(Metric::new(name, Value::new(chosen_status, score)));
    }
    Some(folded)
}

/// The contributing observers for a folded observation — every key present
/// in the summaries map that was folded.
pub fn contributing_observers(summaries: &BTreeMap<ObserverId, Observation>) -> BTreeSet<ObserverId> {
    summaries.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_types::{ObserverId, SubjectId};

    fn obs(ts: u128, metrics: &[(&str, Status, f32)]) -> Observation {
        let mut o = Observation::new(Timestamp::from_nanos(ts));
        for (name, status, score) in metrics {
            o = o.with_metric(Metric::new(*name, Value::new(*status, *score)));
        }
        o
    }

    fn view_with(obs_list: Vec<Observation>) -> View {
        let mut v = View::new(ObserverId::new("FE_2"), SubjectId::new("TS_3"), 10);
        for o in obs_list {
            v.push(o);
        }
        v
    }

    #[test]
    fn empty_view_has_no_summary() {
        let v = View::new(ObserverId::new("FE_1"), SubjectId::new("TS_1"), 4);
        assert!(summarize_view(&v, 2).is_none());
    }

    #[test]
    fn pending_is_resolved_by_a_later_healthy() {
        let v = view_with(vec![
            obs(0, &[("req.103", Status::Pending, 30.0)]),
            obs(1, &[("req.103", Status::Pending, 40.0)]),
            obs(2, &[("req.103", Status::Healthy, 80.0)]),
        ]);
        let summary = summarize_view(&v, 2).unwrap();
        let m = &summary.metrics["req.103"];
        assert_eq!(m.value.status, Status::Healthy);
        assert_eq!(m.value.score, 80.0);
    }

    #[test]
    fn history_size_caps_how_far_back_a_metric_is_averaged() {
        let v = view_with(vec![
            obs(0, &[("cpu", Status::Healthy, 0.0)]),
            obs(1, &[("cpu", Status::Healthy, 100.0)]),
            obs(2, &[("cpu", Status::Healthy, 80.0)]),
        ]);
        // history_size=2: seed (ts=2, 80) + one older (ts=1, 100) = avg 90;
        // the ts=0 observation is out of the history window.
        let summary = summarize_view(&v, 2).unwrap();
        let m = &summary.metrics["cpu"];
        assert_eq!(m.value.score, 90.0);
    }

    #[test]
    fn status_change_stops_the_lookback() {
        let v = view_with(vec![
            obs(0, &[("cpu", Status::Healthy, 100.0)]),
            obs(1, &[("cpu", Status::Unhealthy, 10.0)]),
        ]);
        let summary = summarize_view(&v, 5).unwrap();
        let m = &summary.metrics["cpu"];
        assert_eq!(m.value.status, Status::Unhealthy);
        assert_eq!(m.value.score, 10.0);
    }

    #[test]
    fn majority_tie_breaks_to_more_severe_status() {
        let mut summaries = BTreeMap::new();
        summaries.insert(ObserverId::new("A"), obs(1, &[("cpu", Status::Healthy, 100.0)]));
        summaries.insert(ObserverId::new("B"), obs(1, &[("cpu", Status::Unhealthy, 60.0)]));
        summaries.insert(ObserverId::new("C"), obs(1, &[("cpu", Status::Healthy, 80.0)]));
        summaries.insert(ObserverId::new("D"), obs(1, &[("cpu", Status::Unhealthy, 20.0)]));

        let folded = fold_summaries(&summaries).unwrap();
        let m = &folded.metrics["cpu"];
        assert_eq!(m.value.status, Status::Unhealthy);
        assert_eq!(m.value.score, 65.0);
    }

    #[test]
    fn folded_ts_is_the_max_across_summaries() {
        let mut summaries = BTreeMap::new();
        summaries.insert(ObserverId::new("A"), obs(5, &[("cpu", Status::Healthy, 1.0)]));
        summaries.insert(ObserverId::new("B"), obs(9, &[("cpu", Status::Healthy, 1.0)]));
        let folded = fold_summaries(&summaries).unwrap();
        assert_eq!(folded.ts.as_nanos(), 9);
    }

    #[test]
    fn no_summaries_means_no_inference() {
        assert!(fold_summaries(&BTreeMap::new()).is_none());
    }
}
