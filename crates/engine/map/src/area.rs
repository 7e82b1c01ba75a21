//! Geographic bounding boxes

use serde::{Deserialize, Serialize};

use crate::coords::{offset_to_degrees, GeoCoord, GeoDelta, MetricOffset};

/// Axis-aligned box in latitude/longitude, `south_west` to `north_east`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub south_west: GeoCoord,
    pub north_east: GeoCoord,
}

impl Area {
    pub fn new(south_west: GeoCoord, north_east: GeoCoord) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Box reaching `half_extent` meters east/west and north/south of `center`
    ///
    /// Degrees are derived at the center latitude.
    pub fn around(center: GeoCoord, half_extent: MetricOffset) -> Self {
        let d = offset_to_degrees(center.lat, half_extent.north_m, half_extent.east_m);
        Self {
            south_west: center.offset_by(GeoDelta::new(-d.dlat, -d.dlon)),
            north_east: center.offset_by(d),
        }
    }

    /// Latitude and longitude span in degrees
    pub fn span(&self) -> GeoDelta {
        GeoDelta::new(
            self.north_east.lat - self.south_west.lat,
            self.north_east.lon - self.south_west.lon,
        )
    }

    /// Inclusive on every edge
    pub fn contains(&self, coord: &GeoCoord) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&coord.lat)
            && (self.south_west.lon..=self.north_east.lon).contains(&coord.lon)
    }

    /// Position of `coord` inside the box as `(east, north)` fractions in [0, 1]
    ///
    /// A zero-width span maps to 0 on that axis.
    pub fn fraction(&self, coord: &GeoCoord) -> Option<(f64, f64)> {
        if !self.contains(coord) {
            return None;
        }
        let span = self.span();
        let ratio = |value: f64, size: f64| if size > 0.0 { value / size } else { 0.0 };
        Some((
            ratio(coord.lon - self.south_west.lon, span.dlon),
            ratio(coord.lat - self.south_west.lat, span.dlat),
        ))
    }
}
