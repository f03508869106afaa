//! Entity registry - the single source of truth for "what is shown".
//!
//! Maps each entity key to its last known coordinate, the epoch of the
//! subscription that last confirmed it, and the display marker currently
//! attached (if any). Plain single-owner data structure: all mutation happens
//! on the reconciliation engine, which is the only writer.
//!
//! Invariants upheld here:
//!
//! - at most one entry per key at any time
//! - a marker handle, once attached, is never attached to a second entry
//!   concurrently
//! - removing a never-registered key is a benign no-op

use std::collections::HashMap;

use crate::coord::Coordinate;
use crate::reconcile::MarkerHandle;

/// Opaque, stable identifier for one sighting in the store's keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey(String);

impl EntityKey {
    /// Wrap a store key. Keys are expected to be non-empty; the store never
    /// produces empty ones.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for EntityKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tracked sighting: cached coordinate, confirming epoch, and the marker
/// shown for it (if one has been attached).
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Last known coordinate (a cached copy; the store owns the truth).
    pub coord: Coordinate,
    /// Epoch of the subscription that last confirmed this entry.
    pub epoch: u64,
    /// Display marker attached to this entry, if any. The registry holds
    /// this association for lookup only; marker lifecycle is driven
    /// explicitly by the reconciliation engine.
    pub marker: Option<MarkerHandle>,
}

/// Registry of currently tracked sightings.
#[derive(Debug, Default)]
pub struct SightingRegistry {
    entries: HashMap<EntityKey, RegistryEntry>,
}

impl SightingRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh an entry.
    ///
    /// Returns `true` when the key was not previously registered. For an
    /// existing key the coordinate and confirming epoch are refreshed and any
    /// attached marker is kept.
    pub fn upsert(&mut self, key: EntityKey, coord: Coordinate, epoch: u64) -> bool {
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.coord = coord;
                entry.epoch = epoch;
                false
            }
            None => {
                self.entries.insert(
                    key,
                    RegistryEntry {
                        coord,
                        epoch,
                        marker: None,
                    },
                );
                true
            }
        }
    }

    /// Attach a marker to an existing entry.
    ///
    /// Returns `false` if the key is unknown or already carries a marker; the
    /// handle is attached only when the entry had none.
    pub fn attach_marker(&mut self, key: &EntityKey, handle: MarkerHandle) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.marker.is_none() => {
                entry.marker = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Remove an entry, returning its attached marker if it had one.
    ///
    /// Unknown keys are a benign no-op returning `None`.
    pub fn remove(&mut self, key: &EntityKey) -> Option<MarkerHandle> {
        self.entries.remove(key).and_then(|entry| entry.marker)
    }

    /// Drop every entry whose confirming epoch is older than `epoch`.
    ///
    /// Used when a fresh subscription's initial snapshot completes: any key
    /// not re-confirmed under the current epoch is no longer inside the
    /// viewport. Returns the removed entries' attached markers so the caller
    /// can release them.
    pub fn sweep_older_than(&mut self, epoch: u64) -> Vec<MarkerHandle> {
        let stale: Vec<EntityKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.epoch < epoch)
            .map(|(key, _)| key.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|key| self.remove(&key))
            .collect()
    }

    /// Look up the marker attached to `key`, if any.
    pub fn marker_of(&self, key: &EntityKey) -> Option<MarkerHandle> {
        self.entries.get(key).and_then(|entry| entry.marker)
    }

    /// Look up the cached coordinate for `key`.
    pub fn coordinate_of(&self, key: &EntityKey) -> Option<Coordinate> {
        self.entries.get(key).map(|entry| entry.coord)
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
