//! The rendering-surface boundary.
//!
//! The UI shell implements [`RenderSurface`]; the reconciler calls it to
//! create, move, and remove markers. Marker pooling (dequeue-or-create) is
//! entirely the surface's concern - the reconciler only supplies a stable
//! reuse class per entity category so visually identical markers can be
//! recycled.

use crate::coord::Coordinate;
use crate::registry::EntityKey;

/// Reuse class for sighting markers. All sightings share one visual pool.
pub const SIGHTING_REUSE_CLASS: &str = "sighting";

/// Reuse class reserved for the observer's own marker.
pub const OBSERVER_REUSE_CLASS: &str = "observer";

/// Opaque reference to a rendered marker, owned by the rendering surface.
///
/// The core holds handles only for lookup and explicit removal requests; it
/// never infers marker lifetime from handle reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

impl std::fmt::Display for MarkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// Marker operations the core requests from the UI shell.
///
/// Methods take `&self`: surfaces are shared across tasks as
/// `Arc<dyn RenderSurface>` and handle their own interior mutability, the
/// same discipline the store trait follows.
pub trait RenderSurface: Send + Sync {
    /// Create (or recycle from the `reuse_class` pool) a marker for `key` at
    /// `coord`.
    ///
    /// Marker appearance is derived from `key` at creation time and is
    /// immutable thereafter; only the position is ever refreshed. When the
    /// surface recycles a pooled marker it rebinds key, coordinate, and
    /// appearance itself - the caller cannot tell a recycled marker from a
    /// fresh one.
    fn create_marker(&self, key: &EntityKey, coord: Coordinate, reuse_class: &str)
        -> MarkerHandle;

    /// Remove a marker. The handle is dead after this call.
    fn remove_marker(&self, handle: MarkerHandle);

    /// Move an existing marker to a new position.
    fn update_marker_position(&self, handle: MarkerHandle, coord: Coordinate);
}
