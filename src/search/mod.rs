//! Tag Search
//!
//! `Search` is the shared handle over the tag index:
//!
//! - **Write path**: `ingest` folds observations into the live index under
//!   the exclusive lock and arms the snapshot scheduler
//! - **Snapshot**: once per window the scheduler deep-copies the live
//!   discovery indices and atomically publishes the copy as the read replica
//! - **Read path**: every query except `get_last` reads the replica without
//!   taking any lock; `get_last` reads the live last-value store under the
//!   shared lock
//!
//! # Architecture
//!
//! ```text
//! ingest ──→ RwLock<LiveIndex> ──(window)──→ ArcSwap<IndexSnapshot> ←── queries
//!                  ↑ read
//!               get_last
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tagsearch::{Observation, Search, SearchConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let search = Arc::new(Search::new(SearchConfig::default()));
//!     let scheduler = search.start_snapshot_scheduler();
//!
//!     search.ingest(&[Observation::new("cpu", 100, 1.0).tag("host", "a")]);
//!
//!     // visible once the window has elapsed
//!     tokio::time::sleep(Duration::from_secs(21)).await;
//!     assert_eq!(search.unique_metrics(), vec!["cpu"]);
//!
//!     search.shutdown();
//!     if let Some(handle) = scheduler {
//!         let _ = handle.await;
//!     }
//! }
//! ```

mod error;
mod query;
mod scheduler;
mod wildcard;

pub use error::{SearchError, SearchResult};
pub use query::LastValue;
pub use scheduler::{Debouncer, SchedulerState};
pub use wildcard::wildcard_match;

use crate::index::{IndexSnapshot, IndexStats, LiveIndex};
use crate::types::Observation;
use arc_swap::{ArcSwap, Guard};
use chrono::Utc;
use scheduler::SchedulerSignal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Default minimum interval between replica refreshes
pub const DEFAULT_SNAPSHOT_WINDOW: Duration = Duration::from_secs(20);

/// Runtime configuration for a `Search`
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Minimum time between replica refreshes (default: 20s)
    pub snapshot_window: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            snapshot_window: DEFAULT_SNAPSHOT_WINDOW,
        }
    }
}

impl SearchConfig {
    pub fn with_window(snapshot_window: Duration) -> Self {
        Self { snapshot_window }
    }
}

/// Concurrent tag index with a snapshot-isolated read path
pub struct Search {
    /// Mutable indices and last values
    live: RwLock<LiveIndex>,
    /// Published read replica
    replica: ArcSwap<IndexSnapshot>,
    debouncer: Debouncer,
    signals: mpsc::UnboundedSender<SchedulerSignal>,
    /// Taken by the scheduler task on start
    receiver: Mutex<Option<mpsc::UnboundedReceiver<SchedulerSignal>>>,
    snapshots: AtomicU64,
    config: SearchConfig,
}

impl Default for Search {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl Search {
    /// Create an empty index with an empty replica
    pub fn new(config: SearchConfig) -> Self {
        let (signals, receiver) = mpsc::unbounded_channel();

        Self {
            live: RwLock::new(LiveIndex::new()),
            replica: ArcSwap::from_pointee(IndexSnapshot::empty()),
            debouncer: Debouncer::new(),
            signals,
            receiver: Mutex::new(Some(receiver)),
            snapshots: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    // ==================== Write Path ====================

    /// Fold a batch of observations into the index
    ///
    /// Never fails: tag data is always indexed, and samples that are not newer
    /// than the slot they would replace are dropped from the last-value store.
    pub fn ingest(&self, batch: &[Observation]) {
        self.ingest_at(batch, Utc::now().timestamp());
    }

    /// `ingest` with an explicit ingest time (unix seconds) for presence stamps
    pub fn ingest_at(&self, batch: &[Observation], now: i64) {
        if batch.is_empty() {
            return;
        }

        let mut live = self.write_live();

        let mut dropped = 0usize;
        for obs in batch {
            if !live.apply(obs, now) {
                dropped += 1;
            }
        }

        if self.debouncer.arm() && self.signals.send(SchedulerSignal::Arm).is_err() {
            tracing::debug!("snapshot scheduler gone; replica will not refresh");
        }

        drop(live);

        tracing::trace!(observations = batch.len(), dropped, "ingested batch");
    }

    // ==================== Snapshots ====================

    /// Copy the live index and publish it as the replica immediately
    pub fn refresh(&self) {
        let live = self.write_live();
        self.publish(&live);
    }

    /// Publish a copy if the scheduler is armed; called when the window elapses
    fn publish_pending(&self) {
        let live = self.write_live();
        if !self.debouncer.begin() {
            return;
        }
        self.publish(&live);
        self.debouncer.finish();
    }

    fn publish(&self, live: &LiveIndex) {
        let snapshot = live.snapshot(Utc::now().timestamp());
        let stats = snapshot.stats();
        self.replica.store(Arc::new(snapshot));
        self.snapshots.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            metrics = stats.metrics,
            tag_pairs = stats.tag_pairs,
            series = stats.series,
            "published index snapshot"
        );
    }

    /// Start the background snapshot task
    ///
    /// Returns `None` if the scheduler was already started.
    pub fn start_snapshot_scheduler(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        let window = self.config.snapshot_window;
        Some(tokio::spawn(scheduler::run(Arc::clone(self), receiver, window)))
    }

    /// Ask the scheduler to publish any pending copy and stop
    pub fn shutdown(&self) {
        if self.signals.send(SchedulerSignal::Shutdown).is_err() {
            tracing::debug!("snapshot scheduler already stopped");
        }
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.debouncer.state()
    }

    /// Number of replicas published so far
    pub fn snapshot_count(&self) -> u64 {
        self.snapshots.load(Ordering::Relaxed)
    }

    // ==================== Introspection ====================

    /// Current read replica
    pub fn replica(&self) -> Guard<Arc<IndexSnapshot>> {
        self.replica.load()
    }

    /// Sizes of the live index
    pub fn stats(&self) -> IndexStats {
        self.read_live().stats()
    }

    fn read_live(&self) -> RwLockReadGuard<'_, LiveIndex> {
        self.live.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_live(&self) -> RwLockWriteGuard<'_, LiveIndex> {
        self.live.write().unwrap_or_else(PoisonError::into_inner)
    }
}
