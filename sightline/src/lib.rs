//! Sightline - live sighting map core
//!
//! This library tracks ephemeral, location-tagged entities ("sightings") in a
//! geospatial key-value store and continuously reconciles which of them fall
//! inside a moving observer's viewport with a stateful set of rendered map
//! markers.
//!
//! The crate is the core of a map application; the UI shell plugs in behind
//! two narrow traits:
//!
//! - [`reconcile::RenderSurface`] - receives marker create/remove/update
//!   calls and reports viewport changes and taps back into the session
//! - [`session::NavigationHandoff`] - receives a single destination when the
//!   user asks for directions to a sighting
//!
//! The backing geospatial store sits behind [`geoindex::GeoStore`], a
//! dyn-compatible async trait offering keyed writes and live radius-query
//! subscriptions. [`geoindex::MemoryGeoStore`] is the in-process
//! implementation used for local operation and tests.
//!
//! # Architecture
//!
//! ```text
//! viewport change ──► ViewportSubscriber ──► GeoStore::subscribe
//!                          │ (epoch-tagged events)
//!                          ▼
//!                     Reconciler ──► SightingRegistry
//!                          │
//!                          ▼
//!                     RenderSurface (markers added/removed/moved)
//! ```
//!
//! A single radius subscription is live at any time. Every viewport change
//! cancels the prior subscription and bumps a monotonic epoch; events from a
//! superseded subscription are discarded on arrival, so stale exits can never
//! undo a fresh enter.

pub mod coord;
pub mod geoindex;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod spawner;
pub mod subscription;
pub mod telemetry;

pub use coord::{haversine_km, CoordError, Coordinate, DEFAULT_QUERY_RADIUS_KM};
pub use geoindex::{GeoEvent, GeoEventKind, GeoStore, MemoryGeoStore, StoreError};
pub use reconcile::{MarkerHandle, Reconciler, RenderSurface};
pub use registry::{EntityKey, SightingRegistry};
pub use session::{NavigationHandoff, ObserverSession, SessionConfig, UserNotice};
pub use spawner::{KeyStrategy, SightingSpawner};
pub use subscription::{EpochEvent, ViewportSubscriber};
pub use telemetry::{MetricsSnapshot, SessionMetrics};
