//! Scene error types.

use geoscene_map::TerrainError;
use thiserror::Error;

/// Errors raised while building or driving a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// Invalid configuration, e.g. a missing render target.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Terrain elevation could not be resolved.
    #[error("terrain resolution failed: {0}")]
    Terrain(#[from] TerrainError),

    /// The scene host rejected an operation.
    #[error("scene host error: {0}")]
    Host(String),

    /// The scene host has already been destroyed.
    #[error("scene host already destroyed")]
    Destroyed,

    /// The live entity controller has been stopped.
    #[error("live entity controller stopped")]
    Stopped,

    /// The live entity has not been placed yet.
    #[error("live entity has not been placed")]
    NotPlaced,

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;
