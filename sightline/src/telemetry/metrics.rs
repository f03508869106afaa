//! Atomic counters for session activity.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::MetricsSnapshot;

/// Lock-free counters recorded across the session.
///
/// All methods use relaxed ordering: counters are monotonic and read only
/// for display, so no cross-counter consistency is required.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    events_processed: AtomicU64,
    stale_discarded: AtomicU64,
    markers_created: AtomicU64,
    markers_removed: AtomicU64,
    markers_moved: AtomicU64,
    writes_failed: AtomicU64,
}

impl SessionMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscription event was applied to the registry.
    pub fn event_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// An event from a superseded subscription epoch was discarded.
    pub fn stale_discarded(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// A marker was created for a newly entered key.
    pub fn marker_created(&self) {
        self.markers_created.fetch_add(1, Ordering::Relaxed);
    }

    /// A marker was removed (exit or sweep).
    pub fn marker_removed(&self) {
        self.markers_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// An existing marker was repositioned.
    pub fn marker_moved(&self) {
        self.markers_moved.fetch_add(1, Ordering::Relaxed);
    }

    /// A store write failed (store unavailable).
    pub fn write_failed(&self) {
        self.writes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            markers_created: self.markers_created.load(Ordering::Relaxed),
            markers_removed: self.markers_removed.load(Ordering::Relaxed),
            markers_moved: self.markers_moved.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
        }
    }
}
