//! Live entity controller
//!
//! Owns the one entity whose pose changes over time. Every timer tick reads
//! the last committed position, applies a bounded random step in degrees,
//! resolves terrain for the new spot in the background and republishes the
//! pose with a fresh random heading.
//!
//! Resolutions may overlap when terrain is slower than the timer. Each tick
//! carries an issue sequence number and a result only commits if it is newer
//! than the last committed one (last-issued-wins). Results landing after
//! [`LiveEntityController::stop`] are dropped.

use std::sync::Arc;

use geoscene_map::{
    build_pose, GeoCoord, GeoCoord3D, GeoDelta, HeadingPitchRoll, Pose, TerrainResolver,
    TerrainResult,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LiveConfig;
use crate::error::{Result, SceneError};
use crate::host::{EntityHandle, EntitySpec, SceneHost};

/// Lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    /// Entity not placed or timer not started
    Uninitialized,
    /// Timer running
    Active,
    /// Torn down; no further pose changes
    Stopped,
}

/// What happened to one tick's update
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The new pose was published
    Committed { seq: u64 },
    /// A newer tick had already committed
    Stale { seq: u64, committed: u64 },
    /// The controller stopped while the tick was in flight
    Discarded { seq: u64 },
    /// Terrain or host failure; the previous pose stays
    Failed { seq: u64, reason: String },
}

struct LiveInner {
    state: LiveState,
    handle: Option<EntityHandle>,
    pose: Option<Pose>,
    issued_seq: u64,
    committed_seq: u64,
    commits: u64,
    rng: StdRng,
}

struct Shared {
    host: Arc<dyn SceneHost>,
    resolver: TerrainResolver,
    config: LiveConfig,
    inner: Mutex<LiveInner>,
}

impl Shared {
    fn issue_tick(self: &Arc<Self>) -> Option<JoinHandle<TickOutcome>> {
        let (seq, target, heading) = {
            let mut inner = self.inner.lock();
            if inner.state == LiveState::Stopped {
                return None;
            }
            let Some(pose) = inner.pose else {
                warn!(name = %self.config.name, "live entity has no position yet, skipping tick");
                return None;
            };

            // Same step in degrees on both axes, not scaled by latitude
            let step = self.config.max_step_deg;
            let dlon = (inner.rng.random::<f64>() - 0.5) * 2.0 * step;
            let dlat = (inner.rng.random::<f64>() - 0.5) * 2.0 * step;
            let heading = inner.rng.random_range(0.0..360.0_f64).to_radians();

            inner.issued_seq += 1;
            let target = pose.position().coord().offset_by(GeoDelta::new(dlat, dlon));
            (inner.issued_seq, target, heading)
        };

        debug!(seq, %target, "live tick issued");
        let shared = Arc::clone(self);
        Some(tokio::spawn(async move {
            let resolved = shared.resolver.resolve_one(target).await;
            shared.commit(seq, resolved, heading)
        }))
    }

    fn commit(&self, seq: u64, resolved: TerrainResult<GeoCoord3D>, heading: f64) -> TickOutcome {
        let mut inner = self.inner.lock();
        if inner.state == LiveState::Stopped {
            debug!(seq, "live update landed after stop, dropped");
            return TickOutcome::Discarded { seq };
        }

        if seq <= inner.committed_seq {
            debug!(seq, committed = inner.committed_seq, "stale live update dropped");
            return TickOutcome::Stale {
                seq,
                committed: inner.committed_seq,
            };
        }

        let point = match resolved {
            Ok(point) => point,
            Err(err) => {
                warn!(seq, error = %err, "terrain resolution failed, keeping previous pose");
                return TickOutcome::Failed {
                    seq,
                    reason: err.to_string(),
                };
            }
        };

        let Some(handle) = inner.handle else {
            return TickOutcome::Discarded { seq };
        };

        let pose = build_pose(point, HeadingPitchRoll::heading(heading));
        if let Err(err) = self.host.update_entity_pose(handle, pose) {
            warn!(seq, error = %err, "host rejected live pose");
            return TickOutcome::Failed {
                seq,
                reason: err.to_string(),
            };
        }

        inner.pose = Some(pose);
        inner.committed_seq = seq;
        inner.commits += 1;
        TickOutcome::Committed { seq }
    }
}

/// Drives the live entity on a fixed-period timer
pub struct LiveEntityController {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LiveEntityController {
    /// Create an uninitialized controller
    pub fn new(host: Arc<dyn SceneHost>, resolver: TerrainResolver, config: LiveConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            shared: Arc::new(Shared {
                host,
                resolver,
                config,
                inner: Mutex::new(LiveInner {
                    state: LiveState::Uninitialized,
                    handle: None,
                    pose: None,
                    issued_seq: 0,
                    committed_seq: 0,
                    commits: 0,
                    rng,
                }),
            }),
            cancel: CancellationToken::new(),
            timer: Mutex::new(None),
        }
    }

    /// Resolve the start coordinate and register the entity
    ///
    /// Calling this again after a successful placement returns the same handle,
    /// also when the calls overlap. A `stop()` during the terrain lookup wins:
    /// nothing is registered and `Stopped` is returned.
    pub async fn place(&self) -> Result<EntityHandle> {
        {
            let inner = self.shared.inner.lock();
            if inner.state == LiveState::Stopped {
                return Err(SceneError::Stopped);
            }
            if let Some(handle) = inner.handle {
                return Ok(handle);
            }
        }

        let config = &self.shared.config;
        let point = self.shared.resolver.resolve_one(config.start).await?;
        let pose = build_pose(point, HeadingPitchRoll::default());

        // The lock is released during the lookup; check again before registering
        let mut inner = self.shared.inner.lock();
        if inner.state == LiveState::Stopped {
            debug!(name = %config.name, "stopped while placing, entity not registered");
            return Err(SceneError::Stopped);
        }
        if let Some(handle) = inner.handle {
            return Ok(handle);
        }
        let handle = self.shared.host.add_entity(EntitySpec::billboard(
            config.name.clone(),
            pose,
            config.billboard.clone(),
        ))?;
        inner.handle = Some(handle);
        inner.pose = Some(pose);
        info!(name = %config.name, %handle, height = point.height(), "live entity placed");
        Ok(handle)
    }

    /// Start the timer; the first tick fires one period from now
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        {
            let mut inner = self.shared.inner.lock();
            match inner.state {
                LiveState::Active => return Ok(()),
                LiveState::Stopped => return Err(SceneError::Stopped),
                LiveState::Uninitialized => {}
            }
            if inner.pose.is_none() {
                return Err(SceneError::NotPlaced);
            }
            inner.state = LiveState::Active;
        }

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let period = shared.config.interval();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // In-flight updates are tracked by sequence number, not awaited
                        let _ = shared.issue_tick();
                    }
                }
            }
            debug!("live entity timer finished");
        });
        *self.timer.lock() = Some(task);

        info!(period_ms = period.as_millis() as u64, "live entity timer started");
        Ok(())
    }

    /// Run one tick by hand; the timer calls the same logic
    ///
    /// Returns `None` when the tick is skipped (stopped, or nothing placed yet).
    pub fn issue_tick(&self) -> Option<JoinHandle<TickOutcome>> {
        self.shared.issue_tick()
    }

    /// Cancel the timer and freeze the pose
    ///
    /// Once this returns no further pose change is published, even for
    /// resolutions still in flight.
    pub fn stop(&self) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state != LiveState::Stopped {
                inner.state = LiveState::Stopped;
                info!(
                    issued = inner.issued_seq,
                    committed = inner.commits,
                    "live entity controller stopped"
                );
            }
        }
        self.cancel.cancel();
        if let Some(task) = self.timer.lock().take() {
            task.abort();
        }
    }

    pub fn state(&self) -> LiveState {
        self.shared.inner.lock().state
    }

    pub fn handle(&self) -> Option<EntityHandle> {
        self.shared.inner.lock().handle
    }

    /// Latest committed pose
    pub fn committed_pose(&self) -> Option<Pose> {
        self.shared.inner.lock().pose
    }

    /// Latest committed position
    pub fn position(&self) -> Option<GeoCoord> {
        self.committed_pose().map(|pose| pose.position().coord())
    }

    /// Sequence number of the last committed tick (0 before any)
    pub fn committed_seq(&self) -> u64 {
        self.shared.inner.lock().committed_seq
    }

    /// Number of ticks issued so far
    pub fn issued_seq(&self) -> u64 {
        self.shared.inner.lock().issued_seq
    }

    /// Number of pose replacements published
    pub fn commit_count(&self) -> u64 {
        self.shared.inner.lock().commits
    }

    pub fn config(&self) -> &LiveConfig {
        &self.shared.config
    }
}

impl Drop for LiveEntityController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
