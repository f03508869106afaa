//! The [`GeoStore`] boundary trait and its error taxonomy.
//!
//! The trait is intentionally minimal: keyed coordinate writes plus live
//! radius subscriptions. It uses `Pin<Box<dyn Future>>` returns so callers
//! can hold any backend as `Arc<dyn GeoStore>`.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::coord::Coordinate;

use super::events::SubscriptionMessage;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur talking to the backing geospatial store.
///
/// None of these are fatal to callers: writes are fire-and-forget at the
/// application level and a failed subscription simply leaves the viewport
/// unpopulated until the next attempt.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing connection is down or unreachable.
    #[error("geospatial store unavailable")]
    Unavailable,

    /// The store is shutting down and no longer accepts operations.
    #[error("geospatial store shutting down")]
    ShuttingDown,
}

/// Opaque identifier for a live radius subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// A live radius subscription handed back by [`GeoStore::subscribe`].
///
/// Events arrive on [`GeoSubscription::events`]; the initial entered-snapshot
/// is closed by a single [`SubscriptionMessage::Ready`]. Cancelling stops
/// delivery: the store checks the token before every send, so after
/// [`GeoSubscription::cancel`] returns at most one already-in-flight event
/// may still land (consumers discard it via the epoch rule). Server-side
/// resources are released via [`GeoStore::unsubscribe`].
#[derive(Debug)]
pub struct GeoSubscription {
    /// Identifier used to release the subscription server-side.
    pub id: SubscriptionId,
    /// Event channel; closed when the subscription is released.
    pub events: mpsc::UnboundedReceiver<SubscriptionMessage>,
    /// Cancellation token shared with the store's delivery side.
    pub cancellation: CancellationToken,
}

impl GeoSubscription {
    /// Stop event delivery.
    ///
    /// Safe to call more than once. A delivery racing this call may still
    /// land after it returns; correctness downstream rests on the epoch
    /// rule, not on cut-off timing. Does not release server-side resources;
    /// pair with [`GeoStore::unsubscribe`].
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

/// Client interface to the backing geospatial store.
///
/// All implementations must be `Send + Sync` so the store can be shared
/// across the subscriber, the spawner, and background tasks as an
/// `Arc<dyn GeoStore>`.
pub trait GeoStore: Send + Sync {
    /// Store or overwrite the coordinate for `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if the backing connection is down. Callers
    /// treat the write as fire-and-forget: the error is logged and surfaced
    /// as a non-blocking notice, never propagated as a failure.
    fn write(&self, key: &str, coord: Coordinate) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Open a live radius query around `center`.
    ///
    /// Emits one `entered` per key currently within `radius_km` of `center`
    /// (then `Ready`), and thereafter tracks joins and departures. See
    /// [`GeoSubscription`] for delivery and cancellation semantics.
    fn subscribe(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<GeoSubscription, StoreError>>;

    /// Release a subscription's server-side resources.
    ///
    /// Unknown ids are a no-op; releasing an already-released subscription is
    /// harmless.
    fn unsubscribe(&self, id: SubscriptionId) -> BoxFuture<'_, Result<(), StoreError>>;
}
