//! Query Engine - read-only lookups against the published replica
//!
//! Everything here except `get_last` reads an `IndexSnapshot` and never
//! touches the live index, so queries do not contend with ingestion. Results
//! may lag ingestion by up to one snapshot window.

use crate::index::IndexSnapshot;
use crate::search::error::{SearchError, SearchResult};
use crate::types::{series_key, TagSet};
use chrono::Utc;
use std::collections::BTreeSet;
use std::time::Duration;

use super::Search;

/// Newest sample of a series, or a per-second rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastValue {
    pub value: f64,
    /// Timestamp of the newest sample
    pub timestamp: i64,
}

impl IndexSnapshot {
    /// All known metric names, sorted
    pub fn unique_metrics(&self) -> Vec<String> {
        self.tagk.metrics()
    }

    pub fn tag_keys_by_metric(&self, metric: &str) -> Vec<String> {
        self.tagk.tag_keys(metric)
    }

    pub fn metrics_by_tag_pair(&self, key: &str, value: &str) -> Vec<String> {
        self.metric.members(key, value)
    }

    /// Tag values for a metric and key seen at or after `now - since`
    ///
    /// A zero `since` disables the time filter.
    pub fn tag_values_by_metric_tag_key(
        &self,
        metric: &str,
        key: &str,
        since: Duration,
        now: i64,
    ) -> Vec<String> {
        let Some(set) = self.tagv.get(metric, key) else {
            return Vec::new();
        };
        if since.is_zero() {
            set.sorted()
        } else {
            let window = i64::try_from(since.as_secs()).unwrap_or(i64::MAX);
            set.sorted_since(now.saturating_sub(window))
        }
    }

    /// Distinct tag values for `key` across every metric
    pub fn tag_values_by_tag_key(&self, key: &str, since: Duration, now: i64) -> Vec<String> {
        let values: BTreeSet<String> = self
            .unique_metrics()
            .iter()
            .flat_map(|metric| self.tag_values_by_metric_tag_key(metric, key, since, now))
            .collect();
        values.into_iter().collect()
    }

    /// Values of `key` over every series of `metric` whose tags include all of `filters`
    ///
    /// Full scan of the series records.
    pub fn filtered_tag_values_by_metric_tag_key(
        &self,
        metric: &str,
        key: &str,
        filters: &TagSet,
    ) -> Vec<String> {
        let values: BTreeSet<String> = self
            .metric_tags
            .values()
            .filter(|mts| mts.metric == metric && mts.tags.is_superset_of(filters))
            .filter_map(|mts| mts.tags.get(key))
            .map(str::to_string)
            .collect();
        values.into_iter().collect()
    }

    /// Full tag sets of every series of `metric` whose tags include all of `filters`
    ///
    /// Sorted by series key.
    pub fn filtered_tag_sets(&self, metric: &str, filters: &TagSet) -> Vec<TagSet> {
        let mut matches: Vec<(String, TagSet)> = self
            .metric_tags
            .iter()
            .filter(|(_, mts)| mts.metric == metric && mts.tags.is_superset_of(filters))
            .map(|(key, mts)| (key.clone(), mts.tags.clone()))
            .collect();
        matches.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        matches.into_iter().map(|(_, tags)| tags).collect()
    }
}

impl Search {
    /// All known metric names, sorted
    pub fn unique_metrics(&self) -> Vec<String> {
        self.replica().unique_metrics()
    }

    /// Tag keys seen for `metric`, sorted
    pub fn tag_keys_by_metric(&self, metric: &str) -> Vec<String> {
        self.replica().tag_keys_by_metric(metric)
    }

    /// Metrics seen with the tag pair `key=value`, sorted
    pub fn metrics_by_tag_pair(&self, key: &str, value: &str) -> Vec<String> {
        self.replica().metrics_by_tag_pair(key, value)
    }

    /// Tag values seen for `metric` and `key`, optionally only within `since`
    pub fn tag_values_by_metric_tag_key(
        &self,
        metric: &str,
        key: &str,
        since: Duration,
    ) -> Vec<String> {
        self.replica()
            .tag_values_by_metric_tag_key(metric, key, since, Utc::now().timestamp())
    }

    /// Tag values seen for `key` on any metric, deduplicated and sorted
    pub fn tag_values_by_tag_key(&self, key: &str, since: Duration) -> Vec<String> {
        self.replica()
            .tag_values_by_tag_key(key, since, Utc::now().timestamp())
    }

    pub fn filtered_tag_values_by_metric_tag_key(
        &self,
        metric: &str,
        key: &str,
        filters: &TagSet,
    ) -> Vec<String> {
        self.replica()
            .filtered_tag_values_by_metric_tag_key(metric, key, filters)
    }

    pub fn filtered_tag_sets(&self, metric: &str, filters: &TagSet) -> Vec<TagSet> {
        self.replica().filtered_tag_sets(metric, filters)
    }

    /// Latest value of a series, or its per-second rate over the last two samples
    ///
    /// Reads the live index under the shared lock. Returns `Ok(None)` for an
    /// unknown series.
    pub fn get_last(
        &self,
        metric: &str,
        tags: &TagSet,
        as_rate: bool,
    ) -> SearchResult<Option<LastValue>> {
        self.get_last_by_key(&series_key(metric, tags), as_rate)
    }

    /// `get_last` addressed by series identity key
    pub fn get_last_by_key(
        &self,
        series: &str,
        as_rate: bool,
    ) -> SearchResult<Option<LastValue>> {
        let live = self.read_live();
        let Some(ring) = live.last().get(series) else {
            return Ok(None);
        };

        let not_numeric = || SearchError::NotNumeric {
            series: series.to_string(),
        };
        let insufficient = || SearchError::InsufficientSamples {
            series: series.to_string(),
        };

        let Some(newest) = ring.newest() else {
            return Ok(None);
        };
        let value = newest.value.as_f64().ok_or_else(not_numeric)?;

        if !as_rate {
            return Ok(Some(LastValue {
                value,
                timestamp: newest.timestamp,
            }));
        }

        let older = ring.older().ok_or_else(insufficient)?;
        let older_value = older.value.as_f64().ok_or_else(not_numeric)?;
        let elapsed = newest.timestamp - older.timestamp;
        if elapsed == 0 {
            return Err(insufficient());
        }

        Ok(Some(LastValue {
            value: (value - older_value) / elapsed as f64,
            timestamp: newest.timestamp,
        }))
    }
}
