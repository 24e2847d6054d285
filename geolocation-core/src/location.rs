//! Stored geolocation entries.

use std::net::IpAddr;

use geo::Coord;

/// A location as persisted by a store.
///
/// Coordinates are held as a [`Coord`] with `x` as longitude and `y` as
/// latitude, matching the `geo` convention.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// Store-assigned identifier.
    pub id: i64,
    /// Address the entry is keyed on.
    pub ip_address: IpAddr,
    /// Two-letter country code.
    pub country_code: String,
    /// Country name, as normalised on import.
    pub country: String,
    /// City name, as normalised on import.
    pub city: String,
    /// Longitude (`x`) and latitude (`y`) in decimal degrees.
    pub position: Coord<f64>,
    /// Domain-specific integer carried through from the source.
    pub auxiliary_value: i64,
    /// Creation timestamp as recorded by the store.
    pub created_at: String,
    /// Last update timestamp as recorded by the store.
    pub updated_at: String,
}

impl Location {
    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.position.y
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.position.x
    }
}
