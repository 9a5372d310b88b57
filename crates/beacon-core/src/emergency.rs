//! Emergency descriptors.
//!
//! An emergency is created by the reporting subsystem and is immutable from
//! this crate's perspective; validation only ever references it by id and
//! reads its location, kind, and creation time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmergencyId(Uuid);

impl EmergencyId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EmergencyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EmergencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// Mean earth radius in meters, used for great-circle distance.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

impl GeoPoint {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters (haversine formula).
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        let lat_a = self.latitude.to_radians();
        let lat_b = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let half_chord = (d_lat / 2.0).sin().powi(2)
            + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * half_chord.sqrt().asin()
    }
}

/// Broad classification of a reported emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EmergencyKind {
    /// Generic SOS trigger from a user or wearable.
    Sos,
    /// Medical incident.
    Medical,
    /// Fire.
    Fire,
    /// Crime in progress or assault.
    Crime,
    /// Traffic or industrial accident.
    Accident,
    /// Flood, earthquake, storm, or similar.
    NaturalDisaster,
    /// Anything not covered above.
    Other,
}

impl EmergencyKind {
    /// Returns the canonical string representation of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sos => "sos",
            Self::Medical => "medical",
            Self::Fire => "fire",
            Self::Crime => "crime",
            Self::Accident => "accident",
            Self::NaturalDisaster => "natural_disaster",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EmergencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An emergency as seen by the validation subsystem.
///
/// Owned by the reporting subsystem; immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emergency {
    /// Unique identifier.
    pub id: EmergencyId,
    /// Where the emergency was reported.
    pub location: GeoPoint,
    /// Broad classification.
    pub kind: EmergencyKind,
    /// When the emergency was reported.
    pub reported_at: DateTime<Utc>,
}

impl Emergency {
    /// Creates an emergency reported now at the given location.
    #[must_use]
    pub fn new(kind: EmergencyKind, location: GeoPoint) -> Self {
        Self {
            id: EmergencyId::new(),
            location,
            kind,
            reported_at: Utc::now(),
        }
    }
}
