//! Placement poses: terrain position plus orientation in the local frame
//!
//! A pose's orientation is only meaningful together with the position it was
//! computed at, so [`Pose`] can only be produced by [`build_pose`].

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::coords::GeoCoord3D;
use crate::frame::{geodetic_to_ecef, EnuFrame};

/// Heading, pitch and roll in radians
///
/// At zero, a model's local +X axis points east and +Z points up. Positive
/// heading turns clockwise seen from above, positive pitch raises the nose,
/// positive roll lowers the right wing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadingPitchRoll {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl HeadingPitchRoll {
    pub fn new(heading: f64, pitch: f64, roll: f64) -> Self {
        Self {
            heading,
            pitch,
            roll,
        }
    }

    pub fn from_degrees(heading: f64, pitch: f64, roll: f64) -> Self {
        Self::new(heading.to_radians(), pitch.to_radians(), roll.to_radians())
    }

    /// Heading only, level attitude
    pub fn heading(heading: f64) -> Self {
        Self::new(heading, 0.0, 0.0)
    }

    /// Rotation in the local east-north-up frame
    pub fn to_local_quat(&self) -> DQuat {
        let heading = DQuat::from_axis_angle(DVec3::Z, -self.heading);
        let pitch = DQuat::from_axis_angle(DVec3::Y, -self.pitch);
        let roll = DQuat::from_axis_angle(DVec3::X, self.roll);
        heading * pitch * roll
    }
}

/// Position and orientation of a placed entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    position: GeoCoord3D,
    orientation: DQuat,
}

impl Pose {
    /// Terrain-following position
    pub fn position(&self) -> GeoCoord3D {
        self.position
    }

    /// Unit quaternion rotating model axes into ECEF
    pub fn orientation(&self) -> DQuat {
        self.orientation
    }

    /// Engine-native ECEF point of the position
    pub fn cartesian(&self) -> DVec3 {
        geodetic_to_ecef(&self.position.coord(), self.position.height())
    }
}

/// Build a pose at a resolved coordinate with the given attitude
pub fn build_pose(coord: GeoCoord3D, hpr: HeadingPitchRoll) -> Pose {
    let frame = EnuFrame::at(&coord.coord());
    let orientation = (frame.rotation() * hpr.to_local_quat()).normalize();
    Pose {
        position: coord,
        orientation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::GeoCoord;
    use std::f64::consts::FRAC_PI_2;

    fn at(lat: f64, lon: f64, height: f64) -> GeoCoord3D {
        GeoCoord3D::resolved(GeoCoord::new(lat, lon), height)
    }

    fn approx(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn test_level_pose_aligns_with_enu() {
        let coord = at(54.32505, 18.29987, 12.0);
        let pose = build_pose(coord, HeadingPitchRoll::default());
        let frame = EnuFrame::at(&coord.coord());

        assert!(approx(pose.orientation() * DVec3::X, frame.east));
        assert!(approx(pose.orientation() * DVec3::Z, frame.up));
        assert!((pose.orientation().length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_heading_turns_clockwise() {
        let coord = at(54.32505, 18.29987, 0.0);
        let pose = build_pose(coord, HeadingPitchRoll::heading(FRAC_PI_2));
        let frame = EnuFrame::at(&coord.coord());

        // East rotated a quarter turn clockwise seen from above points south
        assert!(approx(pose.orientation() * DVec3::X, -frame.north));
        assert!(approx(pose.orientation() * DVec3::Z, frame.up));
    }

    #[test]
    fn test_positive_pitch_raises_nose() {
        let coord = at(10.0, 20.0, 0.0);
        let pose = build_pose(coord, HeadingPitchRoll::from_degrees(0.0, 30.0, 0.0));
        let frame = EnuFrame::at(&coord.coord());

        let forward = pose.orientation() * DVec3::X;
        assert!(forward.dot(frame.up) > 0.49);
    }

    #[test]
    fn test_cartesian_matches_position() {
        let coord = at(0.0, 0.0, 100.0);
        let pose = build_pose(coord, HeadingPitchRoll::default());
        assert!((pose.cartesian().x - 6_378_237.0).abs() < 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        let pose = build_pose(at(1.0, 1.0, 0.0), HeadingPitchRoll::heading(f64::NAN));
        assert!(pose.orientation().is_nan());
    }
}
