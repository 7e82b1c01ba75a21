//! Terrain elevation sources and the resolver that turns coordinates into
//! terrain-following positions
//!
//! A [`TerrainSource`] samples heights for a batch of coordinates. The
//! [`TerrainResolver`] wraps one shared source for the lifetime of a scene and
//! pairs every input coordinate with its sampled height, preserving order.

use std::sync::Arc;

use async_trait::async_trait;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use tracing::debug;

use crate::coords::{degrees_to_offset, GeoCoord, GeoCoord3D, GeoDelta};

/// Errors that can occur while resolving terrain heights
#[derive(Debug, Clone, thiserror::Error)]
pub enum TerrainError {
    /// The requested coordinate is outside the available data bounds
    #[error("coordinate {coord} is outside the terrain data")]
    OutOfBounds { coord: GeoCoord },

    /// The data source is not available or failed to load
    #[error("terrain data unavailable: {0}")]
    DataUnavailable(String),

    /// The source returned a different number of heights than requested
    #[error("terrain source returned {actual} heights for {expected} coordinates")]
    CountMismatch { expected: usize, actual: usize },

    /// The source returned a height that is not a finite number
    #[error("terrain source returned an invalid height at {coord}")]
    InvalidHeight { coord: GeoCoord },
}

/// Result type for terrain queries
pub type TerrainResult<T> = Result<T, TerrainError>;

/// Asynchronous provider of terrain heights
///
/// Implementations answer one batch per call; the returned heights must be in
/// the same order as `coords`.
#[async_trait]
pub trait TerrainSource: Send + Sync {
    /// Human readable source name for diagnostics
    fn name(&self) -> &str;

    /// Sample terrain heights (meters) for each coordinate
    async fn sample_heights(&self, coords: &[GeoCoord]) -> TerrainResult<Vec<f64>>;
}

/// Resolves geographic coordinates to terrain-following coordinates
///
/// Cloning is cheap and every clone samples the same dataset.
#[derive(Clone)]
pub struct TerrainResolver {
    source: Arc<dyn TerrainSource>,
}

impl TerrainResolver {
    pub fn new(source: Arc<dyn TerrainSource>) -> Self {
        Self { source }
    }

    /// The shared terrain source
    pub fn source(&self) -> &Arc<dyn TerrainSource> {
        &self.source
    }

    /// Resolve a batch of coordinates in one source round-trip
    ///
    /// Output order matches input order. Any failure fails the whole batch;
    /// no height is ever filled in.
    pub async fn resolve_elevations(&self, coords: &[GeoCoord]) -> TerrainResult<Vec<GeoCoord3D>> {
        if coords.is_empty() {
            return Ok(Vec::new());
        }

        let heights = self.source.sample_heights(coords).await?;
        if heights.len() != coords.len() {
            return Err(TerrainError::CountMismatch {
                expected: coords.len(),
                actual: heights.len(),
            });
        }

        debug!(
            source = self.source.name(),
            count = coords.len(),
            "resolved terrain heights"
        );

        coords
            .iter()
            .zip(heights)
            .map(|(coord, height)| {
                if height.is_finite() {
                    Ok(GeoCoord3D::resolved(*coord, height))
                } else {
                    Err(TerrainError::InvalidHeight { coord: *coord })
                }
            })
            .collect()
    }

    /// Resolve a single coordinate
    pub async fn resolve_one(&self, coord: GeoCoord) -> TerrainResult<GeoCoord3D> {
        let mut resolved = self.resolve_elevations(&[coord]).await?;
        resolved.pop().ok_or(TerrainError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}

impl std::fmt::Debug for TerrainResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainResolver")
            .field("source", &self.source.name())
            .finish()
    }
}

/// Terrain source returning a constant elevation everywhere
#[derive(Debug, Clone, Default)]
pub struct FlatTerrain {
    /// Constant elevation to return (meters)
    pub elevation: f64,
}

impl FlatTerrain {
    pub fn new(elevation: f64) -> Self {
        Self { elevation }
    }
}

#[async_trait]
impl TerrainSource for FlatTerrain {
    fn name(&self) -> &str {
        "flat"
    }

    async fn sample_heights(&self, coords: &[GeoCoord]) -> TerrainResult<Vec<f64>> {
        Ok(vec![self.elevation; coords.len()])
    }
}

/// Rolling hills generated from fractal Perlin noise
///
/// Heights are a function of the metric offset from `anchor`, so features keep
/// their size regardless of latitude.
pub struct ProceduralTerrain {
    anchor: GeoCoord,
    base_elevation: f64,
    amplitude: f64,
    feature_size_m: f64,
    noise: Fbm<Perlin>,
}

impl ProceduralTerrain {
    /// Create a terrain around `anchor`
    ///
    /// # Arguments
    /// * `seed` - Noise seed
    /// * `anchor` - Reference point for the noise domain
    /// * `base_elevation` - Mean height in meters
    /// * `amplitude` - Maximum deviation from the mean in meters
    pub fn new(seed: u32, anchor: GeoCoord, base_elevation: f64, amplitude: f64) -> Self {
        Self {
            anchor,
            base_elevation,
            amplitude,
            feature_size_m: 250.0,
            noise: Fbm::<Perlin>::new(seed).set_octaves(4),
        }
    }

    /// Horizontal size of terrain features in meters
    pub fn with_feature_size(mut self, meters: f64) -> Self {
        self.feature_size_m = meters.max(1.0);
        self
    }

    /// Height at a coordinate
    pub fn height_at(&self, coord: &GeoCoord) -> f64 {
        let offset = degrees_to_offset(
            self.anchor.lat,
            GeoDelta::new(coord.lat - self.anchor.lat, coord.lon - self.anchor.lon),
        );
        let n = self.noise.get([
            offset.east_m / self.feature_size_m,
            offset.north_m / self.feature_size_m,
        ]);
        self.base_elevation + n * self.amplitude
    }
}

#[async_trait]
impl TerrainSource for ProceduralTerrain {
    fn name(&self) -> &str {
        "procedural"
    }

    async fn sample_heights(&self, coords: &[GeoCoord]) -> TerrainResult<Vec<f64>> {
        coords
            .iter()
            .map(|coord| {
                if coord.is_valid() {
                    Ok(self.height_at(coord))
                } else {
                    Err(TerrainError::OutOfBounds { coord: *coord })
                }
            })
            .collect()
    }
}
