//! Metric Index - metric name → tag keys seen for it
//!
//! The key set of this index is also the authoritative list of known metrics.

use crate::index::PresenceSet;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MetricIndex {
    /// metric → presence set of tag keys
    index: HashMap<String, PresenceSet>,
}

impl MetricIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `tag_key` present for `metric` at `now`
    pub fn mark(&mut self, metric: &str, tag_key: &str, now: i64) {
        match self.index.get_mut(metric) {
            Some(set) => set.mark(tag_key, now),
            None => {
                let mut set = PresenceSet::new();
                set.mark(tag_key, now);
                self.index.insert(metric.to_string(), set);
            }
        }
    }

    pub fn get(&self, metric: &str) -> Option<&PresenceSet> {
        self.index.get(metric)
    }

    /// Sorted tag keys for a metric
    pub fn tag_keys(&self, metric: &str) -> Vec<String> {
        self.get(metric).map(PresenceSet::sorted).unwrap_or_default()
    }

    /// All indexed metrics, sorted
    pub fn metrics(&self) -> Vec<String> {
        let mut out: Vec<String> = self.index.keys().cloned().collect();
        out.sort_unstable();
        out
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        self.index.contains_key(metric)
    }

    pub fn metric_count(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_lookup() {
        let mut index = MetricIndex::new();
        index.mark("cpu", "host", 100);
        index.mark("cpu", "dc", 100);
        index.mark("mem", "host", 100);

        assert_eq!(index.tag_keys("cpu"), vec!["dc", "host"]);
        assert_eq!(index.tag_keys("mem"), vec!["host"]);
        assert!(index.tag_keys("disk").is_empty());
    }

    #[test]
    fn test_metrics_sorted() {
        let mut index = MetricIndex::new();
        index.mark("mem", "host", 1);
        index.mark("cpu", "host", 1);
        index.mark("cpu", "dc", 1);

        assert_eq!(index.metrics(), vec!["cpu", "mem"]);
        assert_eq!(index.metric_count(), 2);
        assert!(index.has_metric("cpu"));
        assert!(!index.has_metric("disk"));
    }

    #[test]
    fn test_remark_updates_time() {
        let mut index = MetricIndex::new();
        index.mark("cpu", "host", 100);
        index.mark("cpu", "host", 200);

        assert_eq!(index.get("cpu").unwrap().last_seen("host"), Some(200));
        assert_eq!(index.tag_keys("cpu").len(), 1);
    }
}
