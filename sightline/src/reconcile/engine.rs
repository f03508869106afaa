//! The reconciliation engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::geoindex::{GeoEventKind, SubscriptionMessage};
use crate::registry::{EntityKey, SightingRegistry};
use crate::subscription::EpochEvent;
use crate::telemetry::SessionMetrics;

use super::surface::{RenderSurface, SIGHTING_REUSE_CLASS};

/// Single consumer of the epoch-tagged subscription stream.
///
/// Applies events in delivery order to the [`SightingRegistry`] and drives
/// the rendering surface. Processing is strictly serial - [`Reconciler::run`]
/// is the only task touching the registry - which keeps registry mutations
/// atomic without locks.
///
/// # Event handling
///
/// - `entered` for an unknown key: register it, create a marker, attach it.
/// - `entered` for a known key: refresh coordinate and reposition the
///   existing marker. Never a second marker; appearance is fixed at
///   creation.
/// - `exited` for a known key: remove the entry, remove its marker.
/// - `exited` for an unknown key: benign no-op.
/// - `Ready` (snapshot complete): sweep entries not re-confirmed under the
///   current epoch. This is what cleans up markers belonging to a superseded
///   viewport whose `exited` events will never arrive.
/// - anything tagged with a non-current epoch: discarded.
pub struct Reconciler {
    registry: SightingRegistry,
    surface: Arc<dyn RenderSurface>,
    /// Shared with the viewport subscriber, which bumps it on every swap.
    epoch: Arc<AtomicU64>,
    metrics: Arc<SessionMetrics>,
}

impl Reconciler {
    /// Create an engine with an empty registry.
    pub fn new(
        surface: Arc<dyn RenderSurface>,
        epoch: Arc<AtomicU64>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            registry: SightingRegistry::new(),
            surface,
            epoch,
            metrics,
        }
    }

    /// The registry this engine maintains.
    pub fn registry(&self) -> &SightingRegistry {
        &self.registry
    }

    /// Apply one epoch-tagged message.
    ///
    /// Idempotent under redelivery: repeated enters refresh, repeated exits
    /// no-op.
    pub fn apply(&mut self, event: EpochEvent) {
        let current = self.epoch.load(Ordering::SeqCst);
        if event.epoch != current {
            debug!(
                event_epoch = event.epoch,
                current_epoch = current,
                "discarding stale subscription event"
            );
            self.metrics.stale_discarded();
            return;
        }

        match event.message {
            SubscriptionMessage::Ready => self.sweep(current),
            SubscriptionMessage::Event(geo) => {
                let key = EntityKey::new(geo.key.clone());
                let coord = geo.coordinate();
                self.metrics.event_processed();

                match geo.kind {
                    GeoEventKind::Entered => {
                        if self.registry.upsert(key.clone(), coord, current) {
                            let handle =
                                self.surface.create_marker(&key, coord, SIGHTING_REUSE_CLASS);
                            self.registry.attach_marker(&key, handle);
                            self.metrics.marker_created();
                            trace!(%key, %handle, "marker created");
                        } else if let Some(handle) = self.registry.marker_of(&key) {
                            // Duplicate enter: position refresh only.
                            self.surface.update_marker_position(handle, coord);
                            self.metrics.marker_moved();
                        }
                    }
                    GeoEventKind::Exited => match self.registry.remove(&key) {
                        Some(handle) => {
                            self.surface.remove_marker(handle);
                            self.metrics.marker_removed();
                            trace!(%key, %handle, "marker removed");
                        }
                        // Key was never shown or already removed.
                        None => trace!(%key, "exit for untracked key ignored"),
                    },
                }
            }
        }
    }

    /// Remove every entry not re-confirmed under `epoch`.
    fn sweep(&mut self, epoch: u64) {
        let released = self.registry.sweep_older_than(epoch);
        if !released.is_empty() {
            debug!(epoch, swept = released.len(), "swept markers from superseded viewport");
        }
        for handle in released {
            self.surface.remove_marker(handle);
            self.metrics.marker_removed();
        }
    }

    /// Consume the event channel until it closes or `cancel` fires.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<EpochEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.apply(event),
                    None => break,
                },
            }
        }
        debug!("reconciler stopped");
    }
}
