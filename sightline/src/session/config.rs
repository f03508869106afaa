//! Session configuration.

use crate::coord::DEFAULT_QUERY_RADIUS_KM;
use crate::spawner::KeyStrategy;

/// Configuration for an [`super::ObserverSession`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Radius of viewport queries, in kilometers.
    pub radius_km: f64,
    /// How spawned sightings are keyed in the store.
    pub key_strategy: KeyStrategy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_QUERY_RADIUS_KM,
            key_strategy: KeyStrategy::default(),
        }
    }
}
