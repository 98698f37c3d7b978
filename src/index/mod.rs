//! Tag Index Structures
//!
//! In-memory reverse indices over the observation stream:
//!
//! - **PresenceSet**: members stamped with their last-observed time
//! - **PairIndex**: (A, B) → PresenceSet, for tag pair → metrics and
//!   metric + tag key → tag values
//! - **MetricIndex**: metric → PresenceSet of tag keys
//! - **LastStore**: series → two most recent samples
//!
//! # Architecture
//!
//! ```text
//! Observation: cpu{host=a,dc=east} @ now
//!        ↓
//! metric[(host,a)] += cpu     metric[(dc,east)] += cpu
//! tagk[cpu]        += host, dc
//! tagv[(cpu,host)] += a       tagv[(cpu,dc)]    += east
//! last[cpu{dc=east,host=a}] ← sample
//! ```

mod last;
mod metric_index;
mod pair_index;
mod present;
mod snapshot;

pub use last::{LastStore, Sample, SampleRing};
pub use metric_index::MetricIndex;
pub use pair_index::PairIndex;
pub use present::PresenceSet;
pub use snapshot::{IndexSnapshot, LiveIndex};

/// Size of an index or replica
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of distinct metrics
    pub metrics: usize,
    /// Number of distinct (tag key, tag value) pairs
    pub tag_pairs: usize,
    /// Number of distinct series
    pub series: usize,
    /// Number of series with a last-value ring (live index only)
    pub last_values: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Metrics: {}, Tag pairs: {}, Series: {}, Last values: {}",
            self.metrics, self.tag_pairs, self.series, self.last_values
        )
    }
}
