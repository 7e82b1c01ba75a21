//! Static scene population
//!
//! Places the decorative entities once per scene: a line of trees spaced
//! towards east from the layout origin and a tank offset east and south of the
//! same origin. All heights come from a single batched terrain query; if that
//! batch fails, each placement is retried on its own so one bad coordinate
//! only costs its own entity. A host refusing one entity skips only that
//! entity; a destroyed host aborts.
//!
//! Running this twice on the same host registers every entity twice.

use geoscene_map::{
    build_pose, offset_to_degrees, GeoCoord, GeoCoord3D, HeadingPitchRoll, MetricOffset,
    TerrainResolver,
};
use tracing::{info, warn};

use crate::config::LayoutConfig;
use crate::error::{Result, SceneError};
use crate::host::{EntityHandle, EntitySpec, ModelGraphics, SceneHost};

/// A decorative entity waiting for its terrain height
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: String,
    pub offset: MetricOffset,
    pub coord: GeoCoord,
    pub model: ModelGraphics,
}

/// Outcome of [`populate`]
#[derive(Debug, Clone, Default)]
pub struct PopulateReport {
    /// Registered entities in placement order
    pub placed: Vec<(String, EntityHandle)>,
    /// Names of placements whose terrain could not be resolved
    pub skipped: Vec<String>,
}

impl PopulateReport {
    pub fn handle(&self, name: &str) -> Option<EntityHandle> {
        self.placed
            .iter()
            .find(|(placed, _)| placed == name)
            .map(|(_, handle)| *handle)
    }
}

/// Compute the decorative placements for a layout, trees first then the tank
///
/// Every offset is converted at the origin latitude.
pub fn plan(layout: &LayoutConfig) -> Vec<Placement> {
    let origin = layout.origin;
    let at = |offset: MetricOffset| {
        origin.offset_by(offset_to_degrees(origin.lat, offset.north_m, offset.east_m))
    };

    let mut placements: Vec<Placement> = (0..layout.tree_count)
        .map(|i| {
            let offset = MetricOffset::new(i as f64 * layout.spacing_m, 0.0);
            Placement {
                name: format!("Maple Tree {}", i + 1),
                offset,
                coord: at(offset),
                model: layout.tree_model.clone(),
            }
        })
        .collect();

    let tank_offset = MetricOffset::new(
        layout.tank_spacings_east * layout.spacing_m,
        -layout.tank_spacings_south * layout.spacing_m,
    );
    placements.push(Placement {
        name: "Tank".to_string(),
        offset: tank_offset,
        coord: at(tank_offset),
        model: layout.tank_model.clone(),
    });

    placements
}

/// Place every decorative entity of `layout` on `host`
///
/// Terrain and host failures skip only the affected placement. Only a
/// destroyed host aborts.
pub async fn populate(
    host: &dyn SceneHost,
    resolver: &TerrainResolver,
    layout: &LayoutConfig,
) -> Result<PopulateReport> {
    let placements = plan(layout);
    let coords: Vec<GeoCoord> = placements.iter().map(|p| p.coord).collect();

    let resolved: Vec<Option<GeoCoord3D>> = match resolver.resolve_elevations(&coords).await {
        Ok(points) => points.into_iter().map(Some).collect(),
        Err(err) => {
            warn!(error = %err, "batched terrain query failed, resolving placements one by one");
            let mut points = Vec::with_capacity(placements.len());
            for placement in &placements {
                match resolver.resolve_one(placement.coord).await {
                    Ok(point) => points.push(Some(point)),
                    Err(err) => {
                        warn!(name = %placement.name, error = %err, "skipping placement");
                        points.push(None);
                    }
                }
            }
            points
        }
    };

    let mut report = PopulateReport::default();
    for (placement, point) in placements.into_iter().zip(resolved) {
        let Some(point) = point else {
            report.skipped.push(placement.name);
            continue;
        };
        let pose = build_pose(point, HeadingPitchRoll::default());
        match host.add_entity(EntitySpec::model(
            placement.name.clone(),
            pose,
            placement.model,
        )) {
            Ok(handle) => report.placed.push((placement.name, handle)),
            Err(SceneError::Destroyed) => return Err(SceneError::Destroyed),
            Err(err) => {
                warn!(name = %placement.name, error = %err, "host rejected placement, skipping");
                report.skipped.push(placement.name);
            }
        }
    }

    info!(
        placed = report.placed.len(),
        skipped = report.skipped.len(),
        "decorative entities placed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RejectingHost;
    use crate::host::{MemoryHost, Visual};
    use async_trait::async_trait;
    use geoscene_map::{Area, FlatTerrain, HeightMap, TerrainResult, TerrainSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting<S> {
        inner: S,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl<S: TerrainSource> TerrainSource for Counting<S> {
        fn name(&self) -> &str {
            "counting"
        }

        async fn sample_heights(&self, coords: &[GeoCoord]) -> TerrainResult<Vec<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.sample_heights(coords).await
        }
    }

    #[test]
    fn test_trees_are_ten_meters_apart() {
        let layout = LayoutConfig::default();
        let placements = plan(&layout);

        assert_eq!(placements.len(), 7);
        for pair in placements[..6].windows(2) {
            let d = pair[0].coord.distance_to(&pair[1].coord);
            assert!((d - 10.0).abs() <= 0.1, "spacing {d}");
            assert_eq!(pair[0].coord.lat, pair[1].coord.lat);
        }
    }

    #[test]
    fn test_tank_offset() {
        let layout = LayoutConfig::default();
        let tank = plan(&layout).pop().unwrap();

        assert_eq!(tank.name, "Tank");
        assert_eq!(tank.offset, MetricOffset::new(30.0, -20.0));
        let expected = offset_to_degrees(layout.origin.lat, -20.0, 30.0);
        assert_eq!(tank.coord, layout.origin.offset_by(expected));
        assert!(tank.coord.lat < layout.origin.lat);
        assert_eq!(tank.model.uri, "models/tank.glb");
    }

    #[test]
    fn test_tree_names() {
        let names: Vec<String> = plan(&LayoutConfig::default())
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(
            names,
            [
                "Maple Tree 1",
                "Maple Tree 2",
                "Maple Tree 3",
                "Maple Tree 4",
                "Maple Tree 5",
                "Maple Tree 6",
                "Tank"
            ]
        );
    }

    #[tokio::test]
    async fn test_populate_uses_one_terrain_query() {
        let source = Arc::new(Counting {
            inner: FlatTerrain::new(17.0),
            calls: AtomicUsize::new(0),
        });
        let host = MemoryHost::new(source.clone());
        let resolver = TerrainResolver::new(source.clone());

        let report = populate(&host, &resolver, &LayoutConfig::default())
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.placed.len(), 7);
        assert!(report.skipped.is_empty());
        for record in host.entities() {
            assert_eq!(record.spec.pose.position().height(), 17.0);
            assert!(matches!(record.spec.visual, Visual::Model(_)));
        }
        let tree = host.find("Maple Tree 1").unwrap();
        match tree.spec.visual {
            Visual::Model(model) => {
                assert_eq!(model.uri, "models/maple_tree.glb");
                assert_eq!(model.scale, 0.05);
                assert_eq!(model.minimum_pixel_size, 128);
            }
            Visual::Billboard(_) => panic!("tree should be a model"),
        }
    }

    #[tokio::test]
    async fn test_unresolvable_placement_is_skipped() {
        let layout = LayoutConfig::default();
        // Terrain covers the tree line but not the tank 20 m south of it
        let area = Area::new(
            GeoCoord::new(layout.origin.lat - 0.00005, layout.origin.lon - 0.001),
            GeoCoord::new(layout.origin.lat + 0.001, layout.origin.lon + 0.002),
        );
        let source = Arc::new(HeightMap::flat(area, 8, 8, 25.0));
        let host = MemoryHost::new(source.clone());
        let resolver = TerrainResolver::new(source);

        let report = populate(&host, &resolver, &layout).await.unwrap();

        assert_eq!(report.placed.len(), 6);
        assert_eq!(report.skipped, vec!["Tank".to_string()]);
        assert!(host.find("Tank").is_none());
        assert!(host
            .entities()
            .iter()
            .all(|e| (e.spec.pose.position().height() - 25.0).abs() < 1e-9));
    }

    #[tokio::test]
    async fn test_rejected_entity_does_not_stop_the_rest() {
        let host = RejectingHost::new(Arc::new(FlatTerrain::new(4.0)), "Maple Tree 3");
        let resolver = TerrainResolver::new(Arc::new(FlatTerrain::new(4.0)));

        let report = populate(&host, &resolver, &LayoutConfig::default())
            .await
            .unwrap();

        assert_eq!(report.placed.len(), 6);
        assert_eq!(report.skipped, vec!["Maple Tree 3".to_string()]);
        assert!(report.handle("Maple Tree 3").is_none());
        assert!(report.handle("Maple Tree 4").is_some());
        assert!(report.handle("Tank").is_some());
        assert_eq!(host.inner().entity_count(), 6);
    }

    #[tokio::test]
    async fn test_destroyed_host_aborts_population() {
        let host = MemoryHost::new(Arc::new(FlatTerrain::new(0.0)));
        let resolver = TerrainResolver::new(Arc::new(FlatTerrain::new(0.0)));
        host.destroy();

        let result = populate(&host, &resolver, &LayoutConfig::default()).await;
        assert!(matches!(result, Err(SceneError::Destroyed)));
    }
}
