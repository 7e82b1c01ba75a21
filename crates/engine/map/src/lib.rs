//! Geospatial services for geoscene
//!
//! This crate provides the geographic coordinate handling, terrain elevation
//! resolution and placement math used to put entities on the ground.
//!
//! # Modules
//!
//! - [`coords`]: Coordinate types and metric offset to degree conversion
//! - [`frame`]: WGS84 ellipsoid and local east-north-up frames
//! - [`pose`]: Heading/pitch/roll and placement poses
//! - [`terrain`]: Terrain sources and the batched terrain resolver
//! - [`height`]: Gridded height maps
//! - [`area`]: Geographic bounding boxes

pub mod area;
pub mod coords;
pub mod frame;
pub mod height;
pub mod pose;
pub mod terrain;

pub use area::Area;
pub use coords::{
    degrees_to_offset, offset_to_degrees, GeoCoord, GeoCoord3D, GeoDelta, MetricOffset,
};
pub use frame::{geodetic_to_ecef, EnuFrame};
pub use height::HeightMap;
pub use pose::{build_pose, HeadingPitchRoll, Pose};
pub use terrain::{
    FlatTerrain, ProceduralTerrain, TerrainError, TerrainResolver, TerrainResult, TerrainSource,
};
