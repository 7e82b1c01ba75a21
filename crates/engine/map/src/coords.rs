//! Coordinate types for geographic positions and metric offsets
//!
//! This module provides the geographic coordinate types used across geoscene
//! and the unit conversion between local metric offsets (meters east/north)
//! and geographic deltas (degrees).

use serde::{Deserialize, Serialize};

/// Approximate length of one degree of latitude in meters
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Equatorial circumference of the Earth in meters
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_000.0;

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geographic coordinate using WGS84 datum (latitude/longitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    /// Latitude in degrees (-90 to 90, positive = north)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180, positive = east)
    pub lon: f64,
}

impl GeoCoord {
    /// Create a new geographic coordinate
    ///
    /// # Arguments
    /// * `lat` - Latitude in degrees (-90 to 90)
    /// * `lon` - Longitude in degrees (-180 to 180)
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Create a coordinate from longitude first, the order mapping engines use
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        Self { lat, lon }
    }

    /// Check if the coordinate is within valid ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Shift this coordinate by a geographic delta
    pub fn offset_by(&self, delta: GeoDelta) -> GeoCoord {
        GeoCoord::new(self.lat + delta.dlat, self.lon + delta.dlon)
    }

    /// Shift this coordinate by a metric offset, scaled at this coordinate's latitude
    pub fn offset_meters(&self, offset: MetricOffset) -> GeoCoord {
        self.offset_by(offset_to_degrees(self.lat, offset.north_m, offset.east_m))
    }

    /// Calculate approximate distance to another coordinate in meters
    /// using the Haversine formula
    pub fn distance_to(&self, other: &GeoCoord) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }
}

impl Default for GeoCoord {
    fn default() -> Self {
        // Default to null island (0, 0)
        Self { lat: 0.0, lon: 0.0 }
    }
}

impl std::fmt::Display for GeoCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}°E, {:.6}°N)", self.lon, self.lat)
    }
}

/// Terrain-following coordinate: a geographic position plus the terrain height there
///
/// Only the terrain resolver creates these, so a height is never made up by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoCoord3D {
    coord: GeoCoord,
    height: f64,
}

impl GeoCoord3D {
    pub(crate) fn resolved(coord: GeoCoord, height: f64) -> Self {
        Self { coord, height }
    }

    /// Geographic part of the position
    pub fn coord(&self) -> GeoCoord {
        self.coord
    }

    /// Latitude in degrees
    pub fn lat(&self) -> f64 {
        self.coord.lat
    }

    /// Longitude in degrees
    pub fn lon(&self) -> f64 {
        self.coord.lon
    }

    /// Terrain height in meters above the ellipsoid
    pub fn height(&self) -> f64 {
        self.height
    }
}

/// Difference between two geographic coordinates, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoDelta {
    /// Latitude delta in degrees
    pub dlat: f64,
    /// Longitude delta in degrees
    pub dlon: f64,
}

impl GeoDelta {
    pub fn new(dlat: f64, dlon: f64) -> Self {
        Self { dlat, dlon }
    }
}

/// Local displacement in meters along the east and north axes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricOffset {
    /// Meters towards east (negative = west)
    pub east_m: f64,
    /// Meters towards north (negative = south)
    pub north_m: f64,
}

impl MetricOffset {
    pub fn new(east_m: f64, north_m: f64) -> Self {
        Self { east_m, north_m }
    }
}

/// Meters spanned by one degree of longitude at the given latitude
pub fn meters_per_degree_lon(lat: f64) -> f64 {
    (EARTH_CIRCUMFERENCE_M * lat.to_radians().cos()) / 360.0
}

/// Convert a metric offset at `origin_lat` into a geographic delta
///
/// The longitude scale is recomputed from `origin_lat` on every call. At the
/// poles (`origin_lat` = ±90) the longitude delta is not finite.
pub fn offset_to_degrees(origin_lat: f64, north_m: f64, east_m: f64) -> GeoDelta {
    GeoDelta {
        dlat: north_m / METERS_PER_DEGREE_LAT,
        dlon: east_m / meters_per_degree_lon(origin_lat),
    }
}

/// Inverse of [`offset_to_degrees`] using the same scale factors
pub fn degrees_to_offset(origin_lat: f64, delta: GeoDelta) -> MetricOffset {
    MetricOffset {
        east_m: delta.dlon * meters_per_degree_lon(origin_lat),
        north_m: delta.dlat * METERS_PER_DEGREE_LAT,
    }
}
