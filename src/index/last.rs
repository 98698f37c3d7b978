//! Last-value store - the two most recent samples of every series
//!
//! Each series keeps a `SampleRing`: two slots and a write counter. The slot
//! about to be reused is `writes % 2`; an incoming sample replaces it only
//! when its timestamp is strictly greater than the one already there. The
//! other slot always holds the newest accepted sample.
//!
//! ```text
//! writes=2  [t=100 | t=110]     next write goes to slot 0
//!                     ^ newest
//! ```

use crate::types::SampleValue;
use std::collections::HashMap;

/// A stored observation: value and sample time
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: SampleValue,
}

/// Fixed two-slot circular buffer of samples
#[derive(Debug, Clone)]
pub struct SampleRing {
    slots: [Option<Sample>; 2],
    writes: u64,
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleRing {
    pub fn new() -> Self {
        Self {
            slots: [None, None],
            writes: 0,
        }
    }

    fn next_slot(&self) -> usize {
        (self.writes % 2) as usize
    }

    fn newest_slot(&self) -> usize {
        ((self.writes + 1) % 2) as usize
    }

    /// Offer a sample to the ring
    ///
    /// Returns false, leaving the ring untouched, when the sample is not newer
    /// than the one occupying the slot about to be reused.
    pub fn push(&mut self, timestamp: i64, value: SampleValue) -> bool {
        let slot = self.next_slot();
        let occupied = self.slots[slot].as_ref().map(|s| s.timestamp).unwrap_or(0);
        if timestamp <= occupied {
            return false;
        }
        self.slots[slot] = Some(Sample { timestamp, value });
        self.writes += 1;
        true
    }

    /// The most recently accepted sample
    pub fn newest(&self) -> Option<&Sample> {
        self.slots[self.newest_slot()].as_ref()
    }

    /// The sample accepted before the newest one
    pub fn older(&self) -> Option<&Sample> {
        self.slots[self.next_slot()].as_ref()
    }

    /// Number of accepted samples over the ring's lifetime
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

/// series key → sample ring
#[derive(Debug, Default)]
pub struct LastStore {
    rings: HashMap<String, SampleRing>,
}

impl LastStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample for a series, creating its ring on first sight
    pub fn record(&mut self, series: &str, timestamp: i64, value: SampleValue) -> bool {
        let ring = match self.rings.get_mut(series) {
            Some(ring) => ring,
            None => self.rings.entry(series.to_string()).or_default(),
        };
        ring.push(timestamp, value)
    }

    pub fn get(&self, series: &str) -> Option<&SampleRing> {
        self.rings.get(series)
    }

    pub fn series_count(&self) -> usize {
        self.rings.len()
    }
}
