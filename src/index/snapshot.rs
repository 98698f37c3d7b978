//! Live index and its read replica
//!
//! `LiveIndex` owns every mutable structure and is only touched under the
//! search lock. `IndexSnapshot` is a deep copy of the discovery indices taken
//! at a point in time; once built it is never mutated, only replaced.
//!
//! ```text
//! Observation
//!     ↓ apply(now)
//! LiveIndex { metric, tagk, tagv, metric_tags, last }
//!     ↓ snapshot()           (deep copy, last-values excluded)
//! IndexSnapshot { metric, tagk, tagv, metric_tags }
//! ```

use crate::index::{IndexStats, LastStore, MetricIndex, PairIndex};
use crate::types::{MetricTagSet, Observation};
use std::collections::HashMap;

/// Mutable index state fed by ingestion
#[derive(Debug, Default)]
pub struct LiveIndex {
    /// (tag key, tag value) → metrics
    pub(crate) metric: PairIndex,
    /// metric → tag keys
    pub(crate) tagk: MetricIndex,
    /// (metric, tag key) → tag values
    pub(crate) tagv: PairIndex,
    /// series key → full series record
    pub(crate) metric_tags: HashMap<String, MetricTagSet>,
    pub(crate) last: LastStore,
}

impl LiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into every structure
    ///
    /// Presence is stamped with `now` (ingest time); the last-value ring uses
    /// the sample's own timestamp. Returns whether the last-value store
    /// accepted the sample.
    pub fn apply(&mut self, obs: &Observation, now: i64) -> bool {
        let key = obs.series_key();

        for (tag_key, tag_value) in obs.tags.iter() {
            self.metric.mark(tag_key, tag_value, &obs.metric, now);
            self.tagk.mark(&obs.metric, tag_key, now);
            self.tagv.mark(&obs.metric, tag_key, tag_value, now);
        }

        let accepted = self.last.record(&key, obs.timestamp, obs.value.clone());

        if !self.metric_tags.contains_key(&key) {
            self.metric_tags
                .insert(key, MetricTagSet::new(obs.metric.clone(), obs.tags.clone()));
        }

        accepted
    }

    /// Deep copy of the discovery indices
    pub fn snapshot(&self, taken_at: i64) -> IndexSnapshot {
        IndexSnapshot {
            metric: self.metric.clone(),
            tagk: self.tagk.clone(),
            tagv: self.tagv.clone(),
            metric_tags: self.metric_tags.clone(),
            taken_at,
        }
    }

    pub fn last(&self) -> &LastStore {
        &self.last
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            metrics: self.tagk.metric_count(),
            tag_pairs: self.metric.pair_count(),
            series: self.metric_tags.len(),
            last_values: self.last.series_count(),
        }
    }
}

/// Immutable point-in-time copy of the discovery indices
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    pub(crate) metric: PairIndex,
    pub(crate) tagk: MetricIndex,
    pub(crate) tagv: PairIndex,
    pub(crate) metric_tags: HashMap<String, MetricTagSet>,
    /// Unix seconds when the copy was taken, 0 for the initial empty replica
    pub(crate) taken_at: i64,
}

impl IndexSnapshot {
    /// Empty replica served before the first publish
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn taken_at(&self) -> i64 {
        self.taken_at
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            metrics: self.tagk.metric_count(),
            tag_pairs: self.metric.pair_count(),
            series: self.metric_tags.len(),
            last_values: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(ts: i64, v: f64) -> Observation {
        Observation::new("cpu", ts, v).tag("host", "a").tag("dc", "east")
    }

    #[test]
    fn test_apply_fills_every_index() {
        let mut live = LiveIndex::new();
        assert!(live.apply(&cpu(100, 1.0), 1000));

        assert_eq!(live.metric.members("dc", "east"), vec!["cpu"]);
        assert_eq!(live.metric.members("host", "a"), vec!["cpu"]);
        assert_eq!(live.tagk.tag_keys("cpu"), vec!["dc", "host"]);
        assert_eq!(live.tagv.members("cpu", "host"), vec!["a"]);
        assert!(live.metric_tags.contains_key("cpu{dc=east,host=a}"));
        assert_eq!(live.last.series_count(), 1);
    }

    #[test]
    fn test_presence_uses_ingest_time() {
        let mut live = LiveIndex::new();
        live.apply(&cpu(100, 1.0), 5000);

        let seen = live.tagv.get("cpu", "host").unwrap().last_seen("a");
        assert_eq!(seen, Some(5000));
    }

    #[test]
    fn test_stale_sample_still_indexed() {
        let mut live = LiveIndex::new();
        live.apply(&cpu(100, 1.0), 1000);
        live.apply(&cpu(110, 2.0), 1001);

        let stale = Observation::new("cpu", 50, 9.0)
            .tag("host", "b")
            .tag("dc", "east");
        live.apply(&stale, 1002);
        assert!(!live.apply(&cpu(100, 9.0), 1003));

        assert_eq!(live.tagv.members("cpu", "host"), vec!["a", "b"]);
        assert_eq!(live.stats().series, 2);
    }

    #[test]
    fn test_snapshot_is_independent_of_live() {
        let mut live = LiveIndex::new();
        live.apply(&cpu(100, 1.0), 1000);

        let snap = live.snapshot(1000);
        live.apply(&Observation::new("mem", 100, 1.0).tag("host", "a"), 1001);

        assert_eq!(snap.tagk.metrics(), vec!["cpu"]);
        assert_eq!(live.tagk.metrics(), vec!["cpu", "mem"]);
        assert_eq!(snap.taken_at(), 1000);
        assert_eq!(snap.stats().series, 1);
    }
}
