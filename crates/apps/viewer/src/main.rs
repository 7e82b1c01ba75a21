//! Headless scene viewer
//!
//! Builds the scene on an in-memory host whose base map is a terrain tile
//! baked from procedural noise, lets the live entity walk for a while and
//! reports where it ended up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use geoscene_map::{
    Area, GeoCoord, HeightMap, MetricOffset, ProceduralTerrain, TerrainResult, TerrainSource,
};
use geoscene_scene::{MemoryHost, SceneConfig, SceneHost, SceneSession};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "viewer")]
#[command(about = "Headless geospatial scene viewer", long_about = None)]
struct Args {
    /// Scene configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    run_for_secs: Option<u64>,

    /// Seed for the live entity walk
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated terrain query latency in milliseconds
    #[arg(long, default_value = "150")]
    latency_ms: u64,

    /// Seed for the procedural terrain
    #[arg(long, default_value = "1")]
    terrain_seed: u32,

    /// Half-width of the terrain tile around the camera target, in meters
    #[arg(long, default_value = "2000")]
    tile_extent_m: f64,
}

/// Grid nodes per tile edge
const TILE_RESOLUTION: usize = 257;

/// Terrain source that answers after a fixed delay, like a remote provider
struct DelayedTerrain<S> {
    inner: S,
    delay: Duration,
}

#[async_trait]
impl<S: TerrainSource> TerrainSource for DelayedTerrain<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn sample_heights(&self, coords: &[GeoCoord]) -> TerrainResult<Vec<f64>> {
        tokio::time::sleep(self.delay).await;
        self.inner.sample_heights(coords).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.live.rng_seed = Some(seed);
    }

    let center = config.camera.destination;
    let hills = ProceduralTerrain::new(args.terrain_seed, center, 12.0, 8.0);
    let tile = HeightMap::from_fn(
        Area::around(center, MetricOffset::new(args.tile_extent_m, args.tile_extent_m)),
        TILE_RESOLUTION,
        TILE_RESOLUTION,
        |coord| hills.height_at(coord),
    );
    tracing::info!(
        "terrain tile {:.0} m around {} ({}x{} samples)",
        args.tile_extent_m,
        center,
        TILE_RESOLUTION,
        TILE_RESOLUTION
    );
    let terrain = DelayedTerrain {
        inner: tile,
        delay: Duration::from_millis(args.latency_ms),
    };
    let host = Arc::new(MemoryHost::new(Arc::new(terrain)));

    let session = SceneSession::initialize(host.clone(), config)
        .await
        .context("failed to initialize scene")?;

    for record in host.entities() {
        let position = record.pose().position();
        tracing::info!(
            "{:<14} {} at {} height {:.2} m",
            record.spec.name,
            record.handle,
            position.coord(),
            position.height()
        );
    }

    match args.run_for_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            tracing::info!("Press Ctrl+C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl+C")?;
        }
    }

    let live = session.live();
    if let Some(pose) = live.committed_pose() {
        let position = pose.position();
        tracing::info!(
            "{} finished at {} height {:.2} m after {} moves ({} ticks issued)",
            live.config().name,
            position.coord(),
            position.height(),
            live.commit_count(),
            live.issued_seq()
        );
    }

    session.teardown();
    tracing::info!("destroyed: {}", host.is_destroyed());
    Ok(())
}
