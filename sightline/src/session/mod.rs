//! Observer session - the facade the UI shell talks to.
//!
//! Wires the store client, the viewport subscriber, the reconciliation
//! engine, and the sighting spawner into one object with the entry points
//! the rendering surface reports into:
//!
//! - [`ObserverSession::on_viewport_ready`] - first fix, starts the query
//! - [`ObserverSession::on_viewport_center_changed`] - re-query on movement
//! - [`ObserverSession::on_marker_tapped`] - hand off to external navigation
//! - [`ObserverSession::spawn_sighting`] - place a new sighting
//!
//! Nothing here returns an error to the UI path: store failures are logged,
//! counted, and surfaced as [`UserNotice`]s on the channel returned by
//! [`ObserverSession::start`].

mod config;
mod notice;

pub use config::SessionConfig;
pub use notice::UserNotice;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::coord::Coordinate;
use crate::geoindex::{GeoStore, StoreError};
use crate::reconcile::{Reconciler, RenderSurface};
use crate::registry::EntityKey;
use crate::spawner::SightingSpawner;
use crate::subscription::ViewportSubscriber;
use crate::telemetry::{MetricsSnapshot, SessionMetrics};

/// External navigation hand-off.
///
/// Receives a single destination and opens a turn-by-turn consumer. The
/// implementation (system maps app, deep link, whatever) is the shell's
/// business.
pub trait NavigationHandoff: Send + Sync {
    /// Open external navigation to `destination`, labeled for display.
    fn open_external_navigation(&self, destination: Coordinate, label: &str);
}

/// One observer's live session.
pub struct ObserverSession {
    subscriber: ViewportSubscriber,
    spawner: SightingSpawner,
    navigation: Arc<dyn NavigationHandoff>,
    metrics: Arc<SessionMetrics>,
    notice_tx: mpsc::UnboundedSender<UserNotice>,
    engine_task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl ObserverSession {
    /// Start a session: spawns the reconciler task and returns the session
    /// handle plus the notice channel for the UI shell to drain.
    pub fn start(
        store: Arc<dyn GeoStore>,
        surface: Arc<dyn RenderSurface>,
        navigation: Arc<dyn NavigationHandoff>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<UserNotice>) {
        let epoch = Arc::new(AtomicU64::new(0));
        let metrics = Arc::new(SessionMetrics::new());
        let cancel = CancellationToken::new();

        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        let engine = Reconciler::new(surface, Arc::clone(&epoch), Arc::clone(&metrics));
        let engine_task = tokio::spawn(engine.run(engine_rx, cancel.clone()));

        let subscriber =
            ViewportSubscriber::new(Arc::clone(&store), config.radius_km, epoch, engine_tx);
        let spawner = SightingSpawner::new(store, config.key_strategy);

        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        info!(radius_km = config.radius_km, "observer session started");
        (
            Self {
                subscriber,
                spawner,
                navigation,
                metrics,
                notice_tx,
                engine_task,
                cancel,
            },
            notice_rx,
        )
    }

    /// The viewport produced its first usable center.
    pub async fn on_viewport_ready(&mut self, center: Coordinate) {
        if let Err(error) = self.subscriber.on_viewport_ready(center).await {
            self.report_store_failure("radius query", error);
        }
    }

    /// The viewport center moved; the prior query is superseded.
    pub async fn on_viewport_center_changed(&mut self, center: Coordinate) {
        if let Err(error) = self.subscriber.on_center_changed(center).await {
            self.report_store_failure("radius query", error);
        }
    }

    /// The user tapped a marker's callout: hand the destination to external
    /// navigation.
    pub fn on_marker_tapped(&self, key: &EntityKey, coord: Coordinate) {
        let label = sighting_label(key);
        info!(%key, %coord, "marker tapped, handing off to navigation");
        self.navigation.open_external_navigation(coord, &label);
    }

    /// Place a new sighting at `at`.
    ///
    /// Returns the spawned key, or `None` when the store was unreachable (a
    /// notice is emitted; the caller's flow is unaffected).
    pub async fn spawn_sighting(&self, at: Coordinate) -> Option<EntityKey> {
        match self.spawner.spawn(at).await {
            Ok(key) => Some(key),
            Err(error) => {
                self.metrics.write_failed();
                self.report_store_failure("sighting write", error);
                None
            }
        }
    }

    /// Current session counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop the session: cancel the live query and the reconciler task.
    pub async fn shutdown(mut self) {
        self.subscriber.shutdown();
        self.cancel.cancel();
        let _ = self.engine_task.await;
        info!("observer session stopped");
    }

    fn report_store_failure(&self, operation: &'static str, error: StoreError) {
        warn!(operation, %error, "store operation failed");
        // The shell may have dropped the receiver; the notice is best-effort.
        let _ = self.notice_tx.send(UserNotice::StoreUnavailable { operation });
    }
}

/// Human-readable label for a sighting, derived from its key.
///
/// Keys start with the category id ("25", "25-3"), so the leading digits
/// name the category.
fn sighting_label(key: &EntityKey) -> String {
    let digits: String = key
        .as_str()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        "Sighting".to_string()
    } else {
        format!("Sighting #{}", digits)
    }
}
