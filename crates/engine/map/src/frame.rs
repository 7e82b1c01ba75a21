//! WGS84 ellipsoid math and local east-north-up frames
//!
//! Positions handed to a scene host are Earth-centered, Earth-fixed (ECEF)
//! cartesian points. Orientations are expressed relative to the local tangent
//! frame at a position, so both are computed here from the same geodetic input.

use glam::{DMat3, DQuat, DVec3};

use crate::coords::GeoCoord;

/// WGS84 semi-major axis in meters
pub const WGS84_SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;

/// WGS84 first eccentricity squared
pub const WGS84_ECCENTRICITY_SQ: f64 = 6.694_379_990_141_33e-3;

/// Convert a geodetic position (degrees, meters above the ellipsoid) to ECEF
pub fn geodetic_to_ecef(coord: &GeoCoord, height: f64) -> DVec3 {
    let (sin_lat, cos_lat) = coord.lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = coord.lon.to_radians().sin_cos();

    // Prime vertical radius of curvature
    let n = WGS84_SEMI_MAJOR_AXIS_M / (1.0 - WGS84_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();

    DVec3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_ECCENTRICITY_SQ) + height) * sin_lat,
    )
}

/// Local tangent frame at a geodetic position, axes expressed in ECEF
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnuFrame {
    pub east: DVec3,
    pub north: DVec3,
    /// Geodetic surface normal
    pub up: DVec3,
}

impl EnuFrame {
    /// Build the east-north-up frame at a geographic coordinate
    ///
    /// The frame depends only on latitude and longitude; height moves the
    /// origin along `up` without rotating the axes.
    pub fn at(coord: &GeoCoord) -> Self {
        let (sin_lat, cos_lat) = coord.lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = coord.lon.to_radians().sin_cos();

        Self {
            east: DVec3::new(-sin_lon, cos_lon, 0.0),
            north: DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
            up: DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
        }
    }

    /// Rotation matrix whose columns are the east, north and up axes
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_cols(self.east, self.north, self.up)
    }

    /// Rotation taking local ENU vectors to ECEF
    pub fn rotation(&self) -> DQuat {
        DQuat::from_mat3(&self.matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: DVec3, b: DVec3, eps: f64) -> bool {
        (a - b).length() < eps
    }

    #[test]
    fn test_equator_prime_meridian() {
        let p = geodetic_to_ecef(&GeoCoord::new(0.0, 0.0), 0.0);
        assert!(approx(p, DVec3::new(WGS84_SEMI_MAJOR_AXIS_M, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_height_moves_along_up() {
        let coord = GeoCoord::new(54.324447, 18.299756);
        let ground = geodetic_to_ecef(&coord, 0.0);
        let raised = geodetic_to_ecef(&coord, 100.0);
        let up = EnuFrame::at(&coord).up;

        assert!(approx(raised - ground, up * 100.0, 1e-6));
    }

    #[test]
    fn test_frame_is_orthonormal_right_handed() {
        let frame = EnuFrame::at(&GeoCoord::new(-33.9, 151.2));
        assert!((frame.east.length() - 1.0).abs() < 1e-12);
        assert!((frame.north.length() - 1.0).abs() < 1e-12);
        assert!(frame.east.dot(frame.north).abs() < 1e-12);
        assert!(approx(frame.east.cross(frame.north), frame.up, 1e-12));
    }

    #[test]
    fn test_rotation_maps_local_axes() {
        let frame = EnuFrame::at(&GeoCoord::new(54.32505, 18.29987));
        let q = frame.rotation();
        assert!(approx(q * DVec3::X, frame.east, 1e-9));
        assert!(approx(q * DVec3::Y, frame.north, 1e-9));
        assert!(approx(q * DVec3::Z, frame.up, 1e-9));
    }
}
