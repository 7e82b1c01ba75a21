use std::path::Path;
use std::time::Duration;

use geoscene_map::GeoCoord;
use serde::Deserialize;

use crate::error::{Result, SceneError};
use crate::host::{BillboardGraphics, CameraView, ModelGraphics};

/// Scene configuration, usually loaded from a TOML file
///
/// Every section is optional; missing values fall back to the defaults below.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Name of the element the host renders into
    pub render_target: String,
    pub camera: CameraView,
    pub layout: LayoutConfig,
    pub live: LiveConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            render_target: "cesiumContainer".to_string(),
            camera: CameraView::default(),
            layout: LayoutConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations a scene cannot be built from
    pub fn validate(&self) -> Result<()> {
        if self.render_target.trim().is_empty() {
            return Err(SceneError::Configuration(
                "render target must not be empty".to_string(),
            ));
        }
        check_coord("camera.destination", &self.camera.destination)?;
        check_coord("layout.origin", &self.layout.origin)?;
        check_coord("live.start", &self.live.start)?;

        if !(self.layout.spacing_m.is_finite() && self.layout.spacing_m >= 0.0) {
            return Err(SceneError::Configuration(format!(
                "layout.spacing_m must be a non-negative number, got {}",
                self.layout.spacing_m
            )));
        }
        if self.live.interval_ms == 0 {
            return Err(SceneError::Configuration(
                "live.interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.live.max_step_deg.is_finite() && self.live.max_step_deg >= 0.0) {
            return Err(SceneError::Configuration(format!(
                "live.max_step_deg must be a non-negative number, got {}",
                self.live.max_step_deg
            )));
        }
        Ok(())
    }
}

fn check_coord(field: &str, coord: &GeoCoord) -> Result<()> {
    if coord.lat.is_finite() && coord.lon.is_finite() && coord.is_valid() {
        Ok(())
    } else {
        Err(SceneError::Configuration(format!(
            "{field} is not a valid coordinate: {coord}"
        )))
    }
}

/// Placement of the decorative entities
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// First tree; the tank is placed relative to it as well
    pub origin: GeoCoord,
    pub tree_count: usize,
    /// Distance between neighbouring trees (meters, towards east)
    pub spacing_m: f64,
    pub tree_model: ModelGraphics,
    pub tank_model: ModelGraphics,
    /// Tank offset east of the origin, in spacings
    pub tank_spacings_east: f64,
    /// Tank offset south of the origin, in spacings
    pub tank_spacings_south: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin: GeoCoord::from_lon_lat(18.29887 + 0.001, 54.3249 + 0.00015),
            tree_count: 6,
            spacing_m: 10.0,
            tree_model: ModelGraphics::new("models/maple_tree.glb", 0.05),
            tank_model: ModelGraphics::new("models/tank.glb", 1.0),
            tank_spacings_east: 3.0,
            tank_spacings_south: 2.0,
        }
    }
}

/// The timer-driven live entity
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LiveConfig {
    pub name: String,
    pub start: GeoCoord,
    /// Timer period in milliseconds
    pub interval_ms: u64,
    /// Largest per-tick change of latitude and of longitude, in degrees
    pub max_step_deg: f64,
    pub billboard: BillboardGraphics,
    /// Seed for reproducible walks; entropy when absent
    pub rng_seed: Option<u64>,
}

impl LiveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            start: GeoCoord::from_lon_lat(18.299756, 54.324447),
            interval_ms: 1000,
            max_step_deg: 0.00005,
            billboard: BillboardGraphics {
                image: "player.jpg".to_string(),
                width: 32,
                height: 32,
            },
            rng_seed: None,
        }
    }
}
