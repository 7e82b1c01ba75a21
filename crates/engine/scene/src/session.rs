//! Scene session
//!
//! Wires the host, terrain resolver, decorative population and the live entity
//! into one scene, and tears it down again.

use std::sync::Arc;

use geoscene_map::TerrainResolver;
use tracing::{info, instrument, warn};

use crate::config::SceneConfig;
use crate::error::{Result, SceneError};
use crate::host::{LayerHandle, SceneHost};
use crate::live::LiveEntityController;
use crate::populate::{populate, PopulateReport};

/// A fully initialized scene
pub struct SceneSession {
    host: Arc<dyn SceneHost>,
    resolver: TerrainResolver,
    buildings: LayerHandle,
    report: PopulateReport,
    live: LiveEntityController,
}

impl SceneSession {
    /// Build the scene on `host`
    ///
    /// Invalid configuration is rejected before the host is touched. The base
    /// map is created exactly once and its terrain source backs every height
    /// lookup of the session. If the live entity's start point has no terrain,
    /// the scene comes up without it moving and the controller stays
    /// uninitialized. Any other failure destroys the host before returning, so
    /// no half-built scene is left behind. Must be called from within a tokio
    /// runtime.
    #[instrument(skip_all, fields(render_target = %config.render_target))]
    pub async fn initialize(host: Arc<dyn SceneHost>, config: SceneConfig) -> Result<Self> {
        config.validate()?;

        match Self::build(host.clone(), config).await {
            Ok(session) => Ok(session),
            Err(err) => {
                warn!(error = %err, "scene initialization failed, releasing host");
                if !host.is_destroyed() {
                    host.destroy();
                }
                Err(err)
            }
        }
    }

    async fn build(host: Arc<dyn SceneHost>, config: SceneConfig) -> Result<Self> {
        let terrain = host.create_base_map().await?;
        let resolver = TerrainResolver::new(terrain);
        let buildings = host.create_building_layer().await?;
        host.set_camera_view(config.camera)?;

        let report = populate(host.as_ref(), &resolver, &config.layout).await?;

        let live = LiveEntityController::new(host.clone(), resolver.clone(), config.live);
        match live.place().await {
            Ok(_) => live.start()?,
            Err(SceneError::Terrain(err)) => warn!(
                name = %live.config().name,
                error = %err,
                "live entity start has no terrain, not starting"
            ),
            Err(err) => return Err(err),
        }

        info!(
            terrain = resolver.source().name(),
            decorative = report.placed.len(),
            live = ?live.state(),
            "scene initialized"
        );
        Ok(Self {
            host,
            resolver,
            buildings,
            report,
            live,
        })
    }

    pub fn host(&self) -> &Arc<dyn SceneHost> {
        &self.host
    }

    pub fn resolver(&self) -> &TerrainResolver {
        &self.resolver
    }

    pub fn buildings(&self) -> LayerHandle {
        self.buildings
    }

    /// Decorative entities placed during initialization
    pub fn report(&self) -> &PopulateReport {
        &self.report
    }

    pub fn live(&self) -> &LiveEntityController {
        &self.live
    }

    /// Stop the live entity, then release the host unless it is already gone
    pub fn teardown(self) {
        self.live.stop();
        if self.host.is_destroyed() {
            info!("scene host already destroyed, skipping");
        } else {
            self.host.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RejectingHost;
    use crate::host::{MemoryHost, Visual};
    use crate::live::LiveState;
    use geoscene_map::{Area, FlatTerrain, GeoCoord, HeightMap};
    use std::time::Duration;

    fn seeded_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.live.rng_seed = Some(1);
        config
    }

    #[tokio::test]
    async fn test_initialize_builds_full_scene() {
        let host = Arc::new(MemoryHost::new(Arc::new(FlatTerrain::new(12.0))));
        let session = SceneSession::initialize(host.clone(), seeded_config())
            .await
            .unwrap();

        assert_eq!(host.base_maps_created(), 1);
        assert_eq!(host.layer_count(), 1);
        assert_eq!(host.camera(), Some(SceneConfig::default().camera));
        assert_eq!(host.entity_count(), 8);
        assert_eq!(session.report().placed.len(), 7);
        assert_eq!(session.live().state(), LiveState::Active);

        let player = host.find("Player").unwrap();
        assert!(matches!(player.spec.visual, Visual::Billboard(_)));
        assert_eq!(Some(player.handle), session.live().handle());
        assert_eq!(player.pose().position().height(), 12.0);

        session.teardown();
        assert!(host.is_destroyed());
        assert_eq!(host.destroy_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_leaves_host_untouched() {
        let host = Arc::new(MemoryHost::new(Arc::new(FlatTerrain::new(0.0))));
        let config = SceneConfig {
            render_target: String::new(),
            ..seeded_config()
        };

        let result = SceneSession::initialize(host.clone(), config).await;
        assert!(matches!(result, Err(SceneError::Configuration(_))));
        assert_eq!(host.base_maps_created(), 0);
        assert_eq!(host.layer_count(), 0);
        assert_eq!(host.entity_count(), 0);
        assert!(host.camera().is_none());
    }

    #[tokio::test]
    async fn test_teardown_skips_destroyed_host() {
        let host = Arc::new(MemoryHost::new(Arc::new(FlatTerrain::new(0.0))));
        let session = SceneSession::initialize(host.clone(), seeded_config())
            .await
            .unwrap();

        host.destroy();
        session.teardown();
        assert_eq!(host.destroy_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_entity_moves_until_teardown() {
        let host = Arc::new(MemoryHost::new(Arc::new(FlatTerrain::new(3.0))));
        let session = SceneSession::initialize(host.clone(), seeded_config())
            .await
            .unwrap();
        let handle = session.live().handle().unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.live().commit_count(), 2);
        assert_eq!(host.entity(handle).unwrap().history.len(), 3);

        // Decorative entities never move
        for (_, tree) in &session.report().placed {
            assert_eq!(host.entity(*tree).unwrap().history.len(), 1);
        }

        session.teardown();
        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert!(host.is_destroyed());
        assert_eq!(host.entity_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_start_without_terrain_keeps_scene() {
        // Tile covers the trees and the tank but not the live start point
        let tile = HeightMap::flat(
            Area::new(GeoCoord::new(54.3248, 18.2998), GeoCoord::new(54.3260, 18.3010)),
            8,
            8,
            6.0,
        );
        let host = Arc::new(MemoryHost::new(Arc::new(tile)));
        let session = SceneSession::initialize(host.clone(), seeded_config())
            .await
            .unwrap();

        assert_eq!(session.report().placed.len(), 7);
        assert_eq!(host.entity_count(), 7);
        assert!(host.find("Player").is_none());
        assert_eq!(session.live().state(), LiveState::Uninitialized);
        assert!(session.live().handle().is_none());

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(session.live().issued_seq(), 0);

        session.teardown();
        assert!(host.is_destroyed());
        assert_eq!(host.destroy_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_initialization_releases_host() {
        let host = Arc::new(RejectingHost::new(Arc::new(FlatTerrain::new(0.0)), "Player"));

        let result = SceneSession::initialize(host.clone(), seeded_config()).await;
        assert!(matches!(result, Err(SceneError::Host(_))));
        assert!(host.is_destroyed());
        assert_eq!(host.inner().destroy_calls(), 1);
        assert_eq!(host.inner().entity_count(), 0);
    }
}
