//! Scene host abstraction and an in-memory implementation
//!
//! The rendering engine is an external collaborator. Everything the scene
//! logic needs from it is captured by [`SceneHost`]: loading the base map
//! (which provides the terrain source), adding the building layer, framing the
//! camera, registering entities, moving them and tearing everything down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use geoscene_map::{GeoCoord, Pose, TerrainSource};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SceneError};

/// Identifier of an entity registered with a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(u64);

impl EntityHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity-{}", self.0)
    }
}

/// Identifier of a renderable layer (e.g. buildings) added to a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle(u64);

impl LayerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// 3D model visual, referenced by an opaque asset path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGraphics {
    pub uri: String,
    pub scale: f64,
    /// Smallest on-screen size in pixels regardless of distance
    pub minimum_pixel_size: u32,
    /// Upper bound on the scale applied to keep the minimum pixel size
    pub maximum_scale: f64,
}

impl ModelGraphics {
    pub fn new(uri: impl Into<String>, scale: f64) -> Self {
        Self {
            uri: uri.into(),
            scale,
            minimum_pixel_size: 128,
            maximum_scale: 20_000.0,
        }
    }
}

/// Screen-aligned image visual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillboardGraphics {
    pub image: String,
    pub width: u32,
    pub height: u32,
}

/// How an entity is drawn
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Model(ModelGraphics),
    Billboard(BillboardGraphics),
}

/// Everything a host needs to register an entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpec {
    pub name: String,
    pub pose: Pose,
    pub visual: Visual,
}

impl EntitySpec {
    pub fn model(name: impl Into<String>, pose: Pose, model: ModelGraphics) -> Self {
        Self {
            name: name.into(),
            pose,
            visual: Visual::Model(model),
        }
    }

    pub fn billboard(name: impl Into<String>, pose: Pose, billboard: BillboardGraphics) -> Self {
        Self {
            name: name.into(),
            pose,
            visual: Visual::Billboard(billboard),
        }
    }
}

/// Initial camera framing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub destination: GeoCoord,
    /// Camera height in meters above the ellipsoid
    pub height_m: f64,
    pub heading_deg: f64,
    pub pitch_deg: f64,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            destination: GeoCoord::from_lon_lat(18.299756, 54.324447),
            height_m: 100.0,
            heading_deg: 10.0,
            pitch_deg: -10.0,
        }
    }
}

/// The rendering engine as seen by the scene logic
#[async_trait]
pub trait SceneHost: Send + Sync {
    /// Load the base map and return its terrain source; called once per scene
    async fn create_base_map(&self) -> Result<Arc<dyn TerrainSource>>;

    /// Load the building layer; called once per scene
    async fn create_building_layer(&self) -> Result<LayerHandle>;

    /// Frame the camera
    fn set_camera_view(&self, view: CameraView) -> Result<()>;

    /// Register an entity and return its handle
    fn add_entity(&self, spec: EntitySpec) -> Result<EntityHandle>;

    /// Replace an entity's pose (position and orientation together)
    fn update_entity_pose(&self, handle: EntityHandle, pose: Pose) -> Result<()>;

    /// Current pose of an entity, if it exists
    fn entity_pose(&self, handle: EntityHandle) -> Option<Pose>;

    fn is_destroyed(&self) -> bool;

    /// Release every resource owned by the host
    ///
    /// Callers check [`SceneHost::is_destroyed`] first.
    fn destroy(&self);
}

/// Entity record kept by [`MemoryHost`]
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub handle: EntityHandle,
    pub spec: EntitySpec,
    /// Every pose the entity has had, oldest first
    pub history: Vec<Pose>,
}

impl EntityRecord {
    pub fn pose(&self) -> Pose {
        self.history.last().copied().unwrap_or(self.spec.pose)
    }
}

#[derive(Default)]
struct MemoryState {
    entities: HashMap<EntityHandle, EntityRecord>,
    order: Vec<EntityHandle>,
    layers: Vec<LayerHandle>,
    camera: Option<CameraView>,
    base_maps_created: u32,
    destroyed: bool,
    destroy_calls: u32,
}

/// Headless host that keeps the scene in memory
pub struct MemoryHost {
    terrain: Arc<dyn TerrainSource>,
    next_id: AtomicU64,
    state: Mutex<MemoryState>,
}

impl MemoryHost {
    /// Create a host whose base map samples `terrain`
    pub fn new(terrain: Arc<dyn TerrainSource>) -> Self {
        Self {
            terrain,
            next_id: AtomicU64::new(1),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Registered entities in insertion order
    pub fn entities(&self) -> Vec<EntityRecord> {
        let state = self.state.lock();
        state
            .order
            .iter()
            .filter_map(|handle| state.entities.get(handle).cloned())
            .collect()
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<EntityRecord> {
        self.state.lock().entities.get(&handle).cloned()
    }

    /// Find an entity by name
    pub fn find(&self, name: &str) -> Option<EntityRecord> {
        self.entities().into_iter().find(|e| e.spec.name == name)
    }

    pub fn entity_count(&self) -> usize {
        self.state.lock().entities.len()
    }

    pub fn camera(&self) -> Option<CameraView> {
        self.state.lock().camera
    }

    pub fn layer_count(&self) -> usize {
        self.state.lock().layers.len()
    }

    pub fn base_maps_created(&self) -> u32 {
        self.state.lock().base_maps_created
    }

    /// Number of times [`SceneHost::destroy`] ran
    pub fn destroy_calls(&self) -> u32 {
        self.state.lock().destroy_calls
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl SceneHost for MemoryHost {
    async fn create_base_map(&self) -> Result<Arc<dyn TerrainSource>> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SceneError::Destroyed);
        }
        state.base_maps_created += 1;
        info!(terrain = self.terrain.name(), "base map created");
        Ok(self.terrain.clone())
    }

    async fn create_building_layer(&self) -> Result<LayerHandle> {
        let handle = LayerHandle::new(self.next_id());
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SceneError::Destroyed);
        }
        state.layers.push(handle);
        Ok(handle)
    }

    fn set_camera_view(&self, view: CameraView) -> Result<()> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SceneError::Destroyed);
        }
        state.camera = Some(view);
        Ok(())
    }

    fn add_entity(&self, spec: EntitySpec) -> Result<EntityHandle> {
        let handle = EntityHandle::new(self.next_id());
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SceneError::Destroyed);
        }
        debug!(%handle, name = %spec.name, "entity added");
        state.entities.insert(
            handle,
            EntityRecord {
                handle,
                history: vec![spec.pose],
                spec,
            },
        );
        state.order.push(handle);
        Ok(handle)
    }

    fn update_entity_pose(&self, handle: EntityHandle, pose: Pose) -> Result<()> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SceneError::Destroyed);
        }
        let record = state
            .entities
            .get_mut(&handle)
            .ok_or_else(|| SceneError::Host(format!("unknown {handle}")))?;
        record.history.push(pose);
        Ok(())
    }

    fn entity_pose(&self, handle: EntityHandle) -> Option<Pose> {
        self.state.lock().entities.get(&handle).map(EntityRecord::pose)
    }

    fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        state.destroy_calls += 1;
        state.destroyed = true;
        state.entities.clear();
        state.order.clear();
        state.layers.clear();
        info!("scene host destroyed");
    }
}

/// Hosts used by tests across the crate
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// [`MemoryHost`] that refuses to register one entity name
    pub(crate) struct RejectingHost {
        inner: Arc<MemoryHost>,
        reject: String,
    }

    impl RejectingHost {
        pub(crate) fn new(terrain: Arc<dyn TerrainSource>, reject: &str) -> Self {
            Self {
                inner: Arc::new(MemoryHost::new(terrain)),
                reject: reject.to_string(),
            }
        }

        pub(crate) fn inner(&self) -> &MemoryHost {
            &self.inner
        }
    }

    #[async_trait]
    impl SceneHost for RejectingHost {
        async fn create_base_map(&self) -> Result<Arc<dyn TerrainSource>> {
            self.inner.create_base_map().await
        }

        async fn create_building_layer(&self) -> Result<LayerHandle> {
            self.inner.create_building_layer().await
        }

        fn set_camera_view(&self, view: CameraView) -> Result<()> {
            self.inner.set_camera_view(view)
        }

        fn add_entity(&self, spec: EntitySpec) -> Result<EntityHandle> {
            if spec.name == self.reject {
                return Err(SceneError::Host(format!("{} refused", spec.name)));
            }
            self.inner.add_entity(spec)
        }

        fn update_entity_pose(&self, handle: EntityHandle, pose: Pose) -> Result<()> {
            self.inner.update_entity_pose(handle, pose)
        }

        fn entity_pose(&self, handle: EntityHandle) -> Option<Pose> {
            self.inner.entity_pose(handle)
        }

        fn is_destroyed(&self) -> bool {
            self.inner.is_destroyed()
        }

        fn destroy(&self) {
            self.inner.destroy()
        }
    }
}
