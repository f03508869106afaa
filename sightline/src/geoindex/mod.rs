//! Geospatial store client.
//!
//! The backing store is a remote service offering keyed coordinate writes and
//! live radius-query subscriptions. This module defines that boundary as the
//! dyn-compatible [`GeoStore`] trait plus the wire-level event model, and
//! ships [`MemoryGeoStore`], the in-process implementation used for local
//! operation and tests.
//!
//! # Subscription semantics
//!
//! `subscribe(center, radius_km)` delivers:
//!
//! 1. one `entered` event per key already inside the radius at subscribe
//!    time, followed by a single `Ready` marker closing the snapshot,
//! 2. thereafter, one `entered` per key that (re)joins the radius and one
//!    `exited` per key that departs it.
//!
//! A key whose coordinate changes while staying inside the radius is
//! re-announced with a fresh `entered`; consumers treat duplicate enters as a
//! position refresh. Cancellation stops delivery, with at most one in-flight
//! event still arriving afterwards; stale deliveries are discarded downstream
//! by the subscription-epoch rule.

mod events;
mod memory;
mod traits;

pub use events::{GeoEvent, GeoEventKind, SubscriptionMessage};
pub use memory::MemoryGeoStore;
pub use traits::{BoxFuture, GeoStore, GeoSubscription, StoreError, SubscriptionId};
