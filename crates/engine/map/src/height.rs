//! Gridded height maps
//!
//! A [`HeightMap`] stores elevations on a regular grid over an [`Area`] and
//! answers terrain queries with bilinear interpolation. It stands in for a
//! terrain tile: anything outside the tile is an error, never a guess.

use async_trait::async_trait;

use crate::area::Area;
use crate::coords::{GeoCoord, GeoDelta};
use crate::terrain::{TerrainError, TerrainResult, TerrainSource};

#[derive(Debug, Clone)]
pub struct HeightMap {
    area: Area,
    cols: usize,
    rows: usize,
    /// Row-major, south row first (meters)
    samples: Vec<f64>,
}

impl HeightMap {
    /// Grid with every sample at `elevation`
    pub fn flat(area: Area, cols: usize, rows: usize, elevation: f64) -> Self {
        Self::from_fn(area, cols, rows, |_| elevation)
    }

    /// Bake a grid by evaluating `height` at every sample position
    ///
    /// Grids smaller than 2×2 are widened to 2×2 so interpolation always has
    /// four corners.
    pub fn from_fn(
        area: Area,
        cols: usize,
        rows: usize,
        mut height: impl FnMut(&GeoCoord) -> f64,
    ) -> Self {
        let cols = cols.max(2);
        let rows = rows.max(2);
        let span = area.span();
        let mut samples = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let coord = area.south_west.offset_by(GeoDelta::new(
                    span.dlat * row as f64 / (rows - 1) as f64,
                    span.dlon * col as f64 / (cols - 1) as f64,
                ));
                samples.push(height(&coord));
            }
        }
        Self {
            area,
            cols,
            rows,
            samples,
        }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    /// `(cols, rows)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Sample at a grid node
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        (col < self.cols && row < self.rows).then(|| self.samples[row * self.cols + col])
    }

    /// Bilinear height at `coord`, `None` outside the area
    pub fn sample(&self, coord: &GeoCoord) -> Option<f64> {
        let (u, v) = self.area.fraction(coord)?;
        let gx = u * (self.cols - 1) as f64;
        let gy = v * (self.rows - 1) as f64;

        let c0 = (gx.floor() as usize).min(self.cols - 2);
        let r0 = (gy.floor() as usize).min(self.rows - 2);
        let fx = gx - c0 as f64;
        let fy = gy - r0 as f64;

        let south = self.get(c0, r0)? * (1.0 - fx) + self.get(c0 + 1, r0)? * fx;
        let north = self.get(c0, r0 + 1)? * (1.0 - fx) + self.get(c0 + 1, r0 + 1)? * fx;
        Some(south * (1.0 - fy) + north * fy)
    }
}

#[async_trait]
impl TerrainSource for HeightMap {
    fn name(&self) -> &str {
        "height-map"
    }

    async fn sample_heights(&self, coords: &[GeoCoord]) -> TerrainResult<Vec<f64>> {
        coords
            .iter()
            .map(|coord| {
                self.sample(coord)
                    .ok_or(TerrainError::OutOfBounds { coord: *coord })
            })
            .collect()
    }
}
