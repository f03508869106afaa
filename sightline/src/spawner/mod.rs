//! Sighting generator.
//!
//! Creates a new sighting at a given coordinate with a uniformly random
//! category id and writes it into the geospatial store. The write is
//! fire-and-forget at the application level: a failure is reported to the
//! caller for logging/notice purposes but never crashes anything.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::coord::Coordinate;
use crate::geoindex::{GeoStore, StoreError};
use crate::registry::EntityKey;

/// Number of sighting categories. Category ids run 1..=151.
pub const CATEGORY_COUNT: u32 = 151;

/// How spawned sightings are keyed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Key by category id alone. Spawning a category that was already placed
    /// overwrites the earlier sighting's coordinate - every sighting of one
    /// category shares a single store entry. This matches the reference
    /// deployment's behavior.
    #[default]
    CategoryId,
    /// Key by category id plus a per-spawner monotonic instance counter, so
    /// every spawn is a distinct store entry.
    UniqueInstance,
}

/// Generates sightings and writes them to the store.
pub struct SightingSpawner {
    store: Arc<dyn GeoStore>,
    strategy: KeyStrategy,
    /// Instance counter for [`KeyStrategy::UniqueInstance`].
    next_instance: AtomicU64,
}

impl SightingSpawner {
    /// Create a spawner with the given keying strategy.
    pub fn new(store: Arc<dyn GeoStore>, strategy: KeyStrategy) -> Self {
        Self {
            store,
            strategy,
            next_instance: AtomicU64::new(0),
        }
    }

    /// Spawn a sighting at `at` and return its store key.
    ///
    /// The category id is drawn uniformly from 1..=151. There is no
    /// uniqueness guarantee across calls under [`KeyStrategy::CategoryId`].
    ///
    /// # Errors
    ///
    /// [`StoreError`] when the write cannot reach the store. Callers surface
    /// this as a non-blocking notice; the failed spawn simply never appears.
    pub async fn spawn(&self, at: Coordinate) -> Result<EntityKey, StoreError> {
        let category = draw_category();
        let key = self.derive_key(category);

        debug!(category, key = %key, %at, "spawning sighting");
        self.store.write(key.as_str(), at).await?;
        Ok(key)
    }

    fn derive_key(&self, category: u32) -> EntityKey {
        match self.strategy {
            KeyStrategy::CategoryId => EntityKey::new(category.to_string()),
            KeyStrategy::UniqueInstance => {
                let instance = self.next_instance.fetch_add(1, Ordering::SeqCst);
                EntityKey::new(format!("{}-{}", category, instance))
            }
        }
    }
}

/// Draw a category id uniformly from 1..=151.
fn draw_category() -> u32 {
    rand::rng().random_range(1..=CATEGORY_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoindex::MemoryGeoStore;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[tokio::test]
    async fn test_spawn_writes_to_store() {
        let store = Arc::new(MemoryGeoStore::new());
        let spawner = SightingSpawner::new(
            Arc::clone(&store) as Arc<dyn GeoStore>,
            KeyStrategy::CategoryId,
        );

        let key = spawner.spawn(coord(37.0, -122.0)).await.unwrap();

        assert_eq!(store.coordinate_of(key.as_str()), Some(coord(37.0, -122.0)));
        let category: u32 = key.as_str().parse().unwrap();
        assert!((1..=CATEGORY_COUNT).contains(&category));
    }

    #[tokio::test]
    async fn test_category_keying_overwrites_on_collision() {
        let store = Arc::new(MemoryGeoStore::new());
        let spawner = SightingSpawner::new(
            Arc::clone(&store) as Arc<dyn GeoStore>,
            KeyStrategy::CategoryId,
        );

        // Enough spawns to guarantee key collisions; every colliding spawn
        // overwrites, so the store never exceeds the category count.
        for i in 0..400 {
            let at = coord(37.0 + f64::from(i) * 1e-4, -122.0);
            spawner.spawn(at).await.unwrap();
        }

        assert!(store.len() <= CATEGORY_COUNT as usize);
    }

    #[tokio::test]
    async fn test_unique_instance_keying_never_collides() {
        let store = Arc::new(MemoryGeoStore::new());
        let spawner = SightingSpawner::new(
            Arc::clone(&store) as Arc<dyn GeoStore>,
            KeyStrategy::UniqueInstance,
        );

        for _ in 0..400 {
            spawner.spawn(coord(37.0, -122.0)).await.unwrap();
        }

        assert_eq!(store.len(), 400);
    }

    #[tokio::test]
    async fn test_spawn_surfaces_store_unavailable() {
        let store = Arc::new(MemoryGeoStore::new());
        store.set_available(false);
        let spawner = SightingSpawner::new(
            Arc::clone(&store) as Arc<dyn GeoStore>,
            KeyStrategy::CategoryId,
        );

        let result = spawner.spawn(coord(37.0, -122.0)).await;
        assert!(matches!(result, Err(StoreError::Unavailable)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_category_draw_is_roughly_uniform() {
        // Statistical test: 200 expected draws per id. With a binomial
        // standard deviation of ~14, the 100..=320 window is over seven
        // sigma wide; a failure indicates a broken draw, not bad luck.
        const TRIALS: usize = 151 * 200;
        let mut counts = [0u32; CATEGORY_COUNT as usize + 1];

        for _ in 0..TRIALS {
            let category = draw_category();
            assert!((1..=CATEGORY_COUNT).contains(&category));
            counts[category as usize] += 1;
        }

        for (category, &count) in counts.iter().enumerate().skip(1) {
            assert!(
                (100..=320).contains(&count),
                "category {} drawn {} times, expected ~200",
                category,
                count
            );
        }
    }
}
