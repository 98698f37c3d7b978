//! Presence Set - members with their last-observed time
//!
//! Members are never removed; each carries the most recent unix timestamp
//! (seconds) at which it was seen.

use std::collections::HashMap;

/// Set of strings, each tagged with the last time it was observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSet {
    /// member → last seen (unix seconds)
    members: HashMap<String, i64>,
}

impl PresenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a member as seen at `now`
    ///
    /// The stored timestamp only moves forward.
    pub fn mark(&mut self, member: &str, now: i64) {
        match self.members.get_mut(member) {
            Some(seen) => {
                if now > *seen {
                    *seen = now;
                }
            }
            None => {
                self.members.insert(member.to_string(), now);
            }
        }
    }

    pub fn last_seen(&self, member: &str) -> Option<i64> {
        self.members.get(member).copied()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains_key(member)
    }

    /// All members, sorted
    pub fn sorted(&self) -> Vec<String> {
        let mut out: Vec<String> = self.members.keys().cloned().collect();
        out.sort_unstable();
        out
    }

    /// Members last seen at or after `cutoff`, sorted
    pub fn sorted_since(&self, cutoff: i64) -> Vec<String> {
        let mut out: Vec<String> = self
            .members
            .iter()
            .filter(|(_, &seen)| seen >= cutoff)
            .map(|(member, _)| member.clone())
            .collect();
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
