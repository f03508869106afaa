//! In-process geospatial store.
//!
//! `MemoryGeoStore` implements [`GeoStore`] with a concurrent key table and a
//! subscription table. Every write diffs each live subscription's inside-set
//! and pushes the resulting enter/exit events, so subscribers observe the
//! same live behavior a remote store would deliver.
//!
//! The store also powers tests: [`MemoryGeoStore::set_available`] simulates a
//! downed backing connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coord::{haversine_km, Coordinate};

use super::events::{GeoEvent, SubscriptionMessage};
use super::traits::{BoxFuture, GeoStore, GeoSubscription, StoreError, SubscriptionId};

/// State held per live subscription.
struct SubscriptionState {
    center: Coordinate,
    radius_km: f64,
    /// Keys currently inside the radius, with the coordinate last reported
    /// for each. Guarded by a mutex because writes from any task may diff it.
    inside: Mutex<HashMap<String, Coordinate>>,
    tx: mpsc::UnboundedSender<SubscriptionMessage>,
    cancellation: CancellationToken,
}

impl SubscriptionState {
    /// Deliver a message unless the subscription was cancelled.
    fn send(&self, message: SubscriptionMessage) {
        if self.cancellation.is_cancelled() {
            return;
        }
        // A closed channel means the receiver is gone; nothing to deliver to.
        let _ = self.tx.send(message);
    }
}

/// In-process [`GeoStore`] implementation.
pub struct MemoryGeoStore {
    entries: DashMap<String, Coordinate>,
    subscriptions: DashMap<u64, SubscriptionState>,
    next_subscription_id: AtomicU64,
    available: AtomicBool,
}

impl MemoryGeoStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            subscriptions: DashMap::new(),
            next_subscription_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backing connection going down (`false`) or recovering
    /// (`true`). While down, writes and subscribes fail with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The stored coordinate for `key`, if any.
    pub fn coordinate_of(&self, key: &str) -> Option<Coordinate> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    /// Number of live (not yet released) subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    /// Diff one subscription's inside-set against a freshly written key.
    fn notify_subscription(state: &SubscriptionState, key: &str, coord: Coordinate) {
        let within = haversine_km(&state.center, &coord) <= state.radius_km;
        let mut inside = state.inside.lock();

        if within {
            match inside.get(key) {
                // Unchanged position: nothing to announce.
                Some(previous) if *previous == coord => {}
                // Moved while staying inside: re-announce with the fresh
                // coordinate. Consumers treat duplicate enters as a refresh.
                _ => {
                    inside.insert(key.to_string(), coord);
                    state.send(SubscriptionMessage::Event(GeoEvent::entered(key, coord)));
                }
            }
        } else if inside.remove(key).is_some() {
            state.send(SubscriptionMessage::Event(GeoEvent::exited(key, coord)));
        }
    }
}

impl Default for MemoryGeoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoStore for MemoryGeoStore {
    fn write(&self, key: &str, coord: Coordinate) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_available()?;

            debug!(%key, %coord, "geoindex write");
            self.entries.insert(key.clone(), coord);

            for entry in self.subscriptions.iter() {
                Self::notify_subscription(entry.value(), &key, coord);
            }
            Ok(())
        })
    }

    fn subscribe(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<GeoSubscription, StoreError>> {
        Box::pin(async move {
            self.check_available()?;

            let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded_channel();
            let cancellation = CancellationToken::new();

            let state = SubscriptionState {
                center,
                radius_km,
                inside: Mutex::new(HashMap::new()),
                tx,
                cancellation: cancellation.clone(),
            };

            // Go live in the table before collecting the snapshot: a write
            // landing mid-snapshot then reaches this subscription through
            // the normal diff path. The worst case is a duplicate entered,
            // which consumers treat as a position refresh; inserting after
            // the snapshot would instead lose the key entirely.
            self.subscriptions.insert(id, state);

            if let Some(state) = self.subscriptions.get(&id) {
                for entry in self.entries.iter() {
                    Self::notify_subscription(&state, entry.key(), *entry.value());
                }
                state.send(SubscriptionMessage::Ready);

                debug!(
                    subscription = id,
                    %center,
                    radius_km,
                    initial = state.inside.lock().len(),
                    "geoindex subscribe"
                );
            }

            Ok(GeoSubscription {
                id: SubscriptionId(id),
                events: rx,
                cancellation,
            })
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            if let Some((_, state)) = self.subscriptions.remove(&id.0) {
                state.cancellation.cancel();
                debug!(subscription = id.0, "geoindex unsubscribe");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoindex::GeoEventKind;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    /// Drain everything currently queued on a subscription.
    fn drain(sub: &mut GeoSubscription) -> Vec<SubscriptionMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = sub.events.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn test_subscribe_snapshots_keys_inside_radius() {
        let store = MemoryGeoStore::new();
        store.write("25", coord(37.001, -122.001)).await.unwrap();
        store.write("far", coord(38.0, -121.0)).await.unwrap();

        let mut sub = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        let messages = drain(&mut sub);

        assert_eq!(messages.len(), 2);
        match &messages[0] {
            SubscriptionMessage::Event(event) => {
                assert_eq!(event.kind, GeoEventKind::Entered);
                assert_eq!(event.key, "25");
            }
            other => panic!("expected entered event, got {:?}", other),
        }
        assert_eq!(messages[1], SubscriptionMessage::Ready);
    }

    #[tokio::test]
    async fn test_empty_snapshot_still_signals_ready() {
        let store = MemoryGeoStore::new();
        let mut sub = store.subscribe(coord(0.0, 0.0), 2.5).await.unwrap();

        assert_eq!(drain(&mut sub), vec![SubscriptionMessage::Ready]);
    }

    #[tokio::test]
    async fn test_write_inside_radius_emits_entered() {
        let store = MemoryGeoStore::new();
        let mut sub = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        drain(&mut sub);

        store.write("25", coord(37.001, -122.001)).await.unwrap();

        let messages = drain(&mut sub);
        assert_eq!(
            messages,
            vec![SubscriptionMessage::Event(GeoEvent::entered(
                "25",
                coord(37.001, -122.001)
            ))]
        );
    }

    #[tokio::test]
    async fn test_write_moving_key_outside_emits_exited() {
        let store = MemoryGeoStore::new();
        store.write("25", coord(37.001, -122.001)).await.unwrap();

        let mut sub = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        drain(&mut sub);

        store.write("25", coord(37.05, -122.05)).await.unwrap();

        let messages = drain(&mut sub);
        assert_eq!(
            messages,
            vec![SubscriptionMessage::Event(GeoEvent::exited(
                "25",
                coord(37.05, -122.05)
            ))]
        );
    }

    #[tokio::test]
    async fn test_rewrite_with_unchanged_coordinate_is_silent() {
        let store = MemoryGeoStore::new();
        store.write("25", coord(37.001, -122.001)).await.unwrap();

        let mut sub = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        drain(&mut sub);

        store.write("25", coord(37.001, -122.001)).await.unwrap();
        assert!(drain(&mut sub).is_empty());
    }

    #[tokio::test]
    async fn test_move_within_radius_reannounces_entered() {
        let store = MemoryGeoStore::new();
        store.write("25", coord(37.001, -122.001)).await.unwrap();

        let mut sub = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        drain(&mut sub);

        store.write("25", coord(37.002, -122.002)).await.unwrap();

        let messages = drain(&mut sub);
        assert_eq!(
            messages,
            vec![SubscriptionMessage::Event(GeoEvent::entered(
                "25",
                coord(37.002, -122.002)
            ))]
        );
    }

    #[tokio::test]
    async fn test_exited_only_fires_for_keys_that_were_inside() {
        let store = MemoryGeoStore::new();
        let mut sub = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        drain(&mut sub);

        // Key was never inside this radius; moving it around far away
        // produces no events.
        store.write("far", coord(40.0, -120.0)).await.unwrap();
        store.write("far", coord(41.0, -120.0)).await.unwrap();

        assert!(drain(&mut sub).is_empty());
    }

    #[tokio::test]
    async fn test_resubscribe_same_center_yields_same_snapshot() {
        let store = MemoryGeoStore::new();
        store.write("25", coord(37.001, -122.001)).await.unwrap();
        store.write("26", coord(37.002, -122.000)).await.unwrap();

        let snapshot_keys = |messages: Vec<SubscriptionMessage>| {
            let mut keys: Vec<String> = messages
                .into_iter()
                .filter_map(|message| match message {
                    SubscriptionMessage::Event(event) => Some(event.key),
                    SubscriptionMessage::Ready => None,
                })
                .collect();
            keys.sort();
            keys
        };

        let mut first = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        let first_keys = snapshot_keys(drain(&mut first));

        let mut second = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        let second_keys = snapshot_keys(drain(&mut second));

        assert_eq!(first_keys, vec!["25".to_string(), "26".to_string()]);
        assert_eq!(first_keys, second_keys);
    }

    #[tokio::test]
    async fn test_cancelled_subscription_receives_nothing() {
        let store = MemoryGeoStore::new();
        let mut sub = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        drain(&mut sub);

        sub.cancel();
        store.write("25", coord(37.001, -122.001)).await.unwrap();

        assert!(drain(&mut sub).is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_the_channel() {
        let store = MemoryGeoStore::new();
        let mut sub = store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap();
        drain(&mut sub);

        store.unsubscribe(sub.id).await.unwrap();
        assert_eq!(sub.events.recv().await, None);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_id_is_noop() {
        let store = MemoryGeoStore::new();
        assert!(store.unsubscribe(SubscriptionId(999)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unavailable_store_rejects_writes_and_subscribes() {
        let store = MemoryGeoStore::new();
        store.set_available(false);

        let write = store.write("25", coord(37.0, -122.0)).await;
        assert!(matches!(write, Err(StoreError::Unavailable)));

        let subscribe = store.subscribe(coord(37.0, -122.0), 2.5).await;
        assert!(matches!(subscribe, Err(StoreError::Unavailable)));

        store.set_available(true);
        assert!(store.write("25", coord(37.0, -122.0)).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_write_racing_subscribe_is_always_announced() {
        use std::sync::Arc;

        // A write landing while a subscribe collects its snapshot must reach
        // the new subscription either through the snapshot or the live diff
        // path; losing it would leave a sighting inside the radius invisible.
        for round in 0..50 {
            let store = Arc::new(MemoryGeoStore::new());

            // Pre-populate to widen the snapshot window.
            for i in 0..500 {
                let at = coord(37.0 + f64::from(i) * 1e-6, -122.0);
                store.write(&format!("bg-{}", i), at).await.unwrap();
            }

            let barrier = Arc::new(tokio::sync::Barrier::new(2));

            let writer = {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    store.write("k", coord(37.001, -122.001)).await.unwrap();
                })
            };
            let subscriber = {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    store.subscribe(coord(37.0, -122.0), 2.5).await.unwrap()
                })
            };

            writer.await.unwrap();
            let mut sub = subscriber.await.unwrap();

            let announced = drain(&mut sub).into_iter().any(|message| {
                matches!(
                    message,
                    SubscriptionMessage::Event(GeoEvent {
                        kind: GeoEventKind::Entered,
                        ref key,
                        ..
                    }) if key == "k"
                )
            });
            assert!(
                announced,
                "round {}: key inside the radius was never announced",
                round
            );
        }
    }

    #[tokio::test]
    async fn test_write_overwrites_coordinate() {
        let store = MemoryGeoStore::new();
        store.write("25", coord(37.0, -122.0)).await.unwrap();
        store.write("25", coord(38.0, -121.0)).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.coordinate_of("25"), Some(coord(38.0, -121.0)));
    }
}
