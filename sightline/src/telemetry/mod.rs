//! Session telemetry for observability and UI feedback.
//!
//! Lock-free atomic counters recorded by the reconciler and the store-facing
//! paths, copied out as a point-in-time [`MetricsSnapshot`] for display.
//!
//! ```text
//! Reconciler / Spawner ───► SessionMetrics ───► MetricsSnapshot ───► UI shell
//!                           (atomic counters)   (point-in-time copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::SessionMetrics;
pub use snapshot::MetricsSnapshot;
