//! Scene composition for geoscene
//!
//! Populates a geospatial scene with terrain-clamped decorative entities and
//! drives one live entity on a timer.
//!
//! # Modules
//!
//! - [`host`]: The rendering host boundary and an in-memory host
//! - [`populate`]: One-shot placement of decorative entities
//! - [`live`]: Timer-driven random walk of the live entity
//! - [`session`]: Scene initialization and teardown
//! - [`config`]: TOML scene configuration

pub mod config;
pub mod error;
pub mod host;
pub mod live;
pub mod populate;
pub mod session;

pub use config::{LayoutConfig, LiveConfig, SceneConfig};
pub use error::{Result, SceneError};
pub use host::{
    BillboardGraphics, CameraView, EntityHandle, EntityRecord, EntitySpec, LayerHandle,
    MemoryHost, ModelGraphics, SceneHost, Visual,
};
pub use live::{LiveEntityController, LiveState, TickOutcome};
pub use populate::{plan, populate, Placement, PopulateReport};
pub use session::SceneSession;
