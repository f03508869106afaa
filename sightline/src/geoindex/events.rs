//! Wire-level event model for radius subscriptions.
//!
//! Events cross the store's network boundary as
//! `{type: "entered"|"exited", key, lat, lon}`; the serde derives here pin
//! that schema.

use serde::{Deserialize, Serialize};

use crate::coord::Coordinate;

/// Whether a key joined or left the subscribed radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoEventKind {
    /// The key is now inside the radius. Fired once per (re)join, including
    /// immediately for keys already inside at subscribe time.
    Entered,
    /// The key left the radius. Fired once per departure.
    Exited,
}

/// A single radius-subscription event for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEvent {
    /// Event kind, serialized as the wire field `type`.
    #[serde(rename = "type")]
    pub kind: GeoEventKind,
    /// The entity key this event concerns.
    pub key: String,
    /// Latitude of the key's stored position, in degrees.
    pub lat: f64,
    /// Longitude of the key's stored position, in degrees.
    pub lon: f64,
}

impl GeoEvent {
    /// Build an `entered` event.
    pub fn entered(key: impl Into<String>, coord: Coordinate) -> Self {
        Self {
            kind: GeoEventKind::Entered,
            key: key.into(),
            lat: coord.lat,
            lon: coord.lon,
        }
    }

    /// Build an `exited` event.
    pub fn exited(key: impl Into<String>, coord: Coordinate) -> Self {
        Self {
            kind: GeoEventKind::Exited,
            key: key.into(),
            lat: coord.lat,
            lon: coord.lon,
        }
    }

    /// The position carried by this event.
    ///
    /// Positions were validated when written, so no re-validation happens
    /// here.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

impl std::fmt::Display for GeoEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            GeoEventKind::Entered => "entered",
            GeoEventKind::Exited => "exited",
        };
        write!(f, "{} {} @({:.6}, {:.6})", kind, self.key, self.lat, self.lon)
    }
}

/// A message on a subscription's event channel.
///
/// `Ready` closes the initial snapshot: every key inside the radius at
/// subscribe time has been reported once `Ready` arrives. Consumers use it to
/// sweep state left over from a superseded subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionMessage {
    /// A key entered or exited the radius.
    Event(GeoEvent),
    /// The initial entered-snapshot is complete.
    Ready,
}
