//! Viewport-driven query subscription.
//!
//! Owns the single live radius query tied to the current viewport. Every
//! center change cancels the prior subscription, bumps the epoch, and issues
//! a fresh query; a spawned forwarder task tags each inbound message with the
//! epoch captured at subscribe time and feeds it into the reconciler's one
//! event channel.
//!
//! There is no blocking wait for old-query teardown. A superseded forwarder
//! may keep draining briefly, but its messages carry the old epoch and the
//! reconciler discards them on arrival. That epoch rule - not teardown
//! ordering - is what prevents a stale `exited` from undoing a fresh
//! `entered` for the same key.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::coord::Coordinate;
use crate::geoindex::{GeoStore, StoreError, SubscriptionId, SubscriptionMessage};

/// A subscription message tagged with its originating epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochEvent {
    /// Epoch of the subscription this message was issued under.
    pub epoch: u64,
    /// The message itself.
    pub message: SubscriptionMessage,
}

/// The live query, while one exists.
#[derive(Debug)]
struct ActiveQuery {
    id: SubscriptionId,
    cancellation: CancellationToken,
    center: Coordinate,
}

/// Query state machine: Idle until the viewport is first ready, then Active;
/// Cancelling only transiently while a superseded query is torn down.
#[derive(Debug)]
enum QueryState {
    Idle,
    Active(ActiveQuery),
    Cancelling,
}

/// Owns the single active radius query for one observer.
pub struct ViewportSubscriber {
    store: Arc<dyn GeoStore>,
    radius_km: f64,
    /// Shared with the reconciler, which discards events whose epoch does
    /// not match the current value.
    epoch: Arc<AtomicU64>,
    engine_tx: mpsc::UnboundedSender<EpochEvent>,
    state: QueryState,
}

impl ViewportSubscriber {
    /// Create a subscriber in the Idle state.
    ///
    /// `epoch` starts at 0 and reaches 1 when the first query is issued.
    pub fn new(
        store: Arc<dyn GeoStore>,
        radius_km: f64,
        epoch: Arc<AtomicU64>,
        engine_tx: mpsc::UnboundedSender<EpochEvent>,
    ) -> Self {
        Self {
            store,
            radius_km,
            epoch,
            engine_tx,
            state: QueryState::Idle,
        }
    }

    /// The epoch of the currently active subscription.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Center of the active query, if one is live.
    pub fn active_center(&self) -> Option<Coordinate> {
        match &self.state {
            QueryState::Active(query) => Some(query.center),
            _ => None,
        }
    }

    /// First viewport-ready signal: Idle -> Active.
    ///
    /// A repeat call while a query is already live is a no-op; center
    /// movement is reported through [`Self::on_center_changed`].
    pub async fn on_viewport_ready(&mut self, center: Coordinate) -> Result<(), StoreError> {
        if matches!(self.state, QueryState::Idle) {
            self.activate(center).await
        } else {
            Ok(())
        }
    }

    /// Viewport center moved: cancel the live query and issue a fresh one.
    ///
    /// Re-issuing with an unchanged center is valid and idempotent: the new
    /// snapshot re-enters the same keys and the registry dedupes them.
    pub async fn on_center_changed(&mut self, center: Coordinate) -> Result<(), StoreError> {
        self.cancel_current();
        self.activate(center).await
    }

    /// Cancel the live query and release it, without waiting for teardown.
    pub fn shutdown(&mut self) {
        self.cancel_current();
        self.state = QueryState::Idle;
    }

    fn cancel_current(&mut self) {
        if let QueryState::Active(query) = std::mem::replace(&mut self.state, QueryState::Cancelling)
        {
            debug!(subscription = %query.id, "cancelling superseded query");
            query.cancellation.cancel();

            // Server-side release is fire-and-forget; correctness rests on
            // the epoch rule, not on teardown completing.
            let store = Arc::clone(&self.store);
            let id = query.id;
            tokio::spawn(async move {
                let _ = store.unsubscribe(id).await;
            });
        }
    }

    async fn activate(&mut self, center: Coordinate) -> Result<(), StoreError> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let subscription = match self.store.subscribe(center, self.radius_km).await {
            Ok(subscription) => subscription,
            Err(error) => {
                warn!(%center, %error, "radius query failed to start");
                self.state = QueryState::Idle;
                return Err(error);
            }
        };

        debug!(epoch, %center, subscription = %subscription.id, "viewport query active");

        let id = subscription.id;
        let cancellation = subscription.cancellation.clone();
        let mut events = subscription.events;
        let engine_tx = self.engine_tx.clone();

        // Forwarder: tag every message with the epoch captured here. Ends
        // when the store closes the channel or the reconciler goes away.
        tokio::spawn(async move {
            while let Some(message) = events.recv().await {
                if engine_tx.send(EpochEvent { epoch, message }).is_err() {
                    break;
                }
            }
        });

        self.state = QueryState::Active(ActiveQuery {
            id,
            cancellation,
            center,
        });
        Ok(())
    }
}
