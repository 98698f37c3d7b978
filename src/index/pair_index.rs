//! Pair Index - reverse index keyed by an ordered pair of strings
//!
//! Maps (A, B) → PresenceSet. Used twice by the live index:
//!
//! ```text
//! metric: (tag key, tag value) → metrics seen with that pair
//! tagv:   (metric, tag key)    → tag values seen for that metric and key
//! ```
//!
//! Stored as a two-level map so lookups borrow `&str` for both halves of the
//! key instead of allocating a tuple.

use crate::index::PresenceSet;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PairIndex {
    index: HashMap<String, HashMap<String, PresenceSet>>,
}

impl PairIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `member` present under (a, b) at `now`
    pub fn mark(&mut self, a: &str, b: &str, member: &str, now: i64) {
        let inner = match self.index.get_mut(a) {
            Some(inner) => inner,
            None => self.index.entry(a.to_string()).or_default(),
        };
        let set = match inner.get_mut(b) {
            Some(set) => set,
            None => inner.entry(b.to_string()).or_default(),
        };
        set.mark(member, now);
    }

    pub fn get(&self, a: &str, b: &str) -> Option<&PresenceSet> {
        self.index.get(a).and_then(|inner| inner.get(b))
    }

    /// Sorted members under (a, b), empty if the pair was never seen
    pub fn members(&self, a: &str, b: &str) -> Vec<String> {
        self.get(a, b).map(PresenceSet::sorted).unwrap_or_default()
    }

    /// Number of distinct (a, b) pairs
    pub fn pair_count(&self) -> usize {
        self.index.values().map(HashMap::len).sum()
    }
}
