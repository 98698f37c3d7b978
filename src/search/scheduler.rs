//! Snapshot Scheduler
//!
//! Debounces replica refreshes to at most one per window. The write path arms
//! the scheduler on its first ingest after a publish; later ingests inside the
//! same window coalesce into that one pending copy.
//!
//! ```text
//!            ingest (arm)            window elapsed           copy published
//!   Idle ─────────────────→ Armed ─────────────────→ Running ───────────────→ Idle
//!                            │ ingest: no-op
//! ```
//!
//! Arming and disarming both happen while the live index write lock is held,
//! so an ingest can never land between the copy and the return to `Idle`
//! without re-arming.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

use super::Search;

/// Lifecycle of the pending snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No copy pending
    Idle,
    /// Ingestion happened; a copy is due when the window elapses
    Armed,
    /// Copy in progress
    Running,
}

impl SchedulerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SchedulerState::Armed,
            2 => SchedulerState::Running,
            _ => SchedulerState::Idle,
        }
    }
}

/// Messages from the search handle to the scheduler task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchedulerSignal {
    /// Start a window; sent once per Idle → Armed transition
    Arm,
    /// Publish any pending copy and exit
    Shutdown,
}

/// Atomic Idle/Armed/Running state machine
#[derive(Debug, Default)]
pub struct Debouncer {
    state: AtomicU8,
}

impl Debouncer {
    const IDLE: u8 = 0;
    const ARMED: u8 = 1;
    const RUNNING: u8 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    /// Idle → Armed. True only for the caller that performed the transition.
    pub fn arm(&self) -> bool {
        self.state
            .compare_exchange(Self::IDLE, Self::ARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Armed → Running. False if nothing was armed.
    pub fn begin(&self) -> bool {
        self.state
            .compare_exchange(Self::ARMED, Self::RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Running → Idle
    pub fn finish(&self) {
        self.state.store(Self::IDLE, Ordering::Release);
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Body of the background snapshot task
pub(crate) async fn run(
    search: Arc<Search>,
    mut signals: mpsc::UnboundedReceiver<SchedulerSignal>,
    window: Duration,
) {
    tracing::debug!(window_secs = window.as_secs(), "snapshot scheduler started");

    while let Some(signal) = signals.recv().await {
        if signal == SchedulerSignal::Shutdown {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(window) => {
                search.publish_pending();
            }
            next = signals.recv() => {
                search.publish_pending();
                if matches!(next, Some(SchedulerSignal::Shutdown) | None) {
                    break;
                }
            }
        }
    }

    tracing::debug!("snapshot scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchConfig;
    use crate::types::Observation;

    #[test]
    fn test_debouncer_transitions() {
        let d = Debouncer::new();
        assert_eq!(d.state(), SchedulerState::Idle);

        assert!(!d.begin());
        assert!(d.arm());
        assert_eq!(d.state(), SchedulerState::Armed);

        // coalesced
        assert!(!d.arm());

        assert!(d.begin());
        assert_eq!(d.state(), SchedulerState::Running);
        assert!(!d.arm());

        d.finish();
        assert_eq!(d.state(), SchedulerState::Idle);
        assert!(d.arm());
    }

    fn cpu(host: &str) -> Observation {
        Observation::new("cpu", 100, 1.0).tag("host", host)
    }

    fn search(window_secs: u64) -> Arc<Search> {
        Arc::new(Search::new(SearchConfig::with_window(Duration::from_secs(
            window_secs,
        ))))
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_after_window() {
        let search = search(20);
        let handle = search.start_snapshot_scheduler().unwrap();

        search.ingest(&[cpu("a")]);
        assert_eq!(search.scheduler_state(), SchedulerState::Armed);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(search.unique_metrics().is_empty());
        assert_eq!(search.snapshot_count(), 0);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(search.unique_metrics(), vec!["cpu"]);
        assert_eq!(search.snapshot_count(), 1);
        assert_eq!(search.scheduler_state(), SchedulerState::Idle);

        search.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_copy() {
        let search = search(20);
        let handle = search.start_snapshot_scheduler().unwrap();

        for host in ["a", "b", "c", "d", "e"] {
            search.ingest(&[cpu(host)]);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(search.snapshot_count(), 1);
        assert_eq!(
            search.tag_values_by_metric_tag_key("cpu", "host", Duration::ZERO),
            vec!["a", "b", "c", "d", "e"]
        );

        // quiet window: nothing to copy
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(search.snapshot_count(), 1);

        search.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_after_publish_rearms() {
        let search = search(20);
        let handle = search.start_snapshot_scheduler().unwrap();

        search.ingest(&[cpu("a")]);
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(search.snapshot_count(), 1);

        search.ingest(&[cpu("b")]);
        assert_eq!(search.scheduler_state(), SchedulerState::Armed);
        assert_eq!(
            search.tag_values_by_metric_tag_key("cpu", "host", Duration::ZERO),
            vec!["a"]
        );

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(search.snapshot_count(), 2);
        assert_eq!(
            search.tag_values_by_metric_tag_key("cpu", "host", Duration::ZERO),
            vec!["a", "b"]
        );

        search.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_publishes_pending_copy() {
        let search = search(20);
        let handle = search.start_snapshot_scheduler().unwrap();

        search.ingest(&[cpu("a")]);
        tokio::time::sleep(Duration::from_secs(1)).await;

        search.shutdown();
        handle.await.unwrap();

        assert_eq!(search.unique_metrics(), vec!["cpu"]);
        assert_eq!(search.scheduler_state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_after_scheduler_stopped() {
        let search = search(20);
        let handle = search.start_snapshot_scheduler().unwrap();
        search.shutdown();
        handle.await.unwrap();

        // receiver is gone; a second shutdown is a no-op
        search.shutdown();
        search.ingest(&[cpu("a")]);
        assert_eq!(search.scheduler_state(), SchedulerState::Armed);
        assert!(search.unique_metrics().is_empty());

        search.publish_pending();
        assert_eq!(search.unique_metrics(), vec!["cpu"]);
    }

    #[tokio::test]
    async fn test_scheduler_starts_once() {
        let search = search(20);
        let handle = search.start_snapshot_scheduler().unwrap();
        assert!(search.start_snapshot_scheduler().is_none());

        search.shutdown();
        handle.await.unwrap();
    }
}
