//! Point-in-time copy of session counters.

/// Snapshot of [`super::SessionMetrics`] for display by the UI shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Subscription events applied to the registry.
    pub events_processed: u64,
    /// Events discarded for carrying a superseded epoch.
    pub stale_discarded: u64,
    /// Markers created.
    pub markers_created: u64,
    /// Markers removed.
    pub markers_removed: u64,
    /// Markers repositioned in place.
    pub markers_moved: u64,
    /// Store writes that failed.
    pub writes_failed: u64,
}

impl MetricsSnapshot {
    /// Markers currently on screen (created minus removed).
    pub fn live_markers(&self) -> u64 {
        self.markers_created.saturating_sub(self.markers_removed)
    }
}
