//! Reconciliation between the live event stream and rendered markers.
//!
//! [`Reconciler`] is the single consumer of the epoch-tagged subscription
//! stream. It owns the [`crate::registry::SightingRegistry`] and drives the
//! UI shell through the [`RenderSurface`] trait, guaranteeing idempotent
//! application of repeated events: however many times a key re-enters, at
//! most one marker exists for it.

mod engine;
mod surface;

pub use engine::Reconciler;
pub use surface::{MarkerHandle, RenderSurface, OBSERVER_REUSE_CLASS, SIGHTING_REUSE_CLASS};
