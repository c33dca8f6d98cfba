use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use biomekit_common::{Aabb, VisibilityConfig};
use glam::{Mat4, Vec3};

use crate::context::{FrustumManager, VisibilityManager};
use crate::frustum::Frustum;

/// Cache keys snap coordinates to this many steps per world unit.
const KEY_STEPS_PER_UNIT: f32 = 10.0;

type BoxKey = [i32; 6];
type SphereKey = [i32; 4];

fn quantise(v: f32) -> i32 {
    (v * KEY_STEPS_PER_UNIT).round() as i32
}

fn box_key(aabb: &Aabb) -> BoxKey {
    [
        quantise(aabb.min.x),
        quantise(aabb.min.y),
        quantise(aabb.min.z),
        quantise(aabb.max.x),
        quantise(aabb.max.y),
        quantise(aabb.max.z),
    ]
}

fn sphere_key(center: Vec3, radius: f32) -> SphereKey {
    [
        quantise(center.x),
        quantise(center.y),
        quantise(center.z),
        quantise(radius),
    ]
}

/// Cache counters since the last `begin_frame`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Camera frustum and distance policy for one frame, with memoised answers.
///
/// Many groups share bounds (or near enough after quantisation), so each box and
/// sphere is tested at most once per frame.
#[derive(Debug)]
pub struct FrameVisibility {
    config: VisibilityConfig,
    frustum: Frustum,
    camera_position: Vec3,
    frame: u64,
    box_cache: RefCell<HashMap<BoxKey, bool>>,
    distance_cache: RefCell<HashMap<SphereKey, bool>>,
    stats: Cell<CacheStats>,
}

impl FrameVisibility {
    pub fn new(config: VisibilityConfig) -> Self {
        Self {
            config,
            frustum: Frustum::default(),
            camera_position: Vec3::ZERO,
            frame: 0,
            box_cache: RefCell::new(HashMap::new()),
            distance_cache: RefCell::new(HashMap::new()),
            stats: Cell::new(CacheStats::default()),
        }
    }

    /// Start a new frame: take the camera state and drop every cached answer.
    pub fn begin_frame(&mut self, view_projection: &Mat4, camera_position: Vec3) {
        let stats = self.stats.get();
        tracing::trace!(
            frame = self.frame,
            hits = stats.hits,
            misses = stats.misses,
            "visibility frame finished"
        );
        self.frame += 1;
        self.frustum = Frustum::from_view_projection(view_projection);
        self.camera_position = camera_position;
        self.box_cache.get_mut().clear();
        self.distance_cache.get_mut().clear();
        self.stats.set(CacheStats::default());
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.stats.get()
    }

    fn record(&self, hit: bool) {
        let mut s = self.stats.get();
        if hit {
            s.hits += 1;
        } else {
            s.misses += 1;
        }
        self.stats.set(s);
    }

    fn within_distance(&self, center: Vec3, radius: f32) -> bool {
        let key = sphere_key(center, radius);
        if let Some(&near) = self.distance_cache.borrow().get(&key) {
            self.record(true);
            return near;
        }
        self.record(false);
        let near = self.camera_position.distance(center)
            <= self.config.animation_max_distance + radius.max(0.0);
        self.distance_cache.borrow_mut().insert(key, near);
        near
    }
}

impl FrustumManager for FrameVisibility {
    fn is_box_visible(&self, aabb: &Aabb) -> bool {
        let key = box_key(aabb);
        if let Some(&visible) = self.box_cache.borrow().get(&key) {
            self.record(true);
            return visible;
        }
        self.record(false);
        let visible = self.frustum.intersects_aabb(aabb);
        self.box_cache.borrow_mut().insert(key, visible);
        visible
    }
}

impl VisibilityManager for FrameVisibility {
    fn should_animate(&self, aabb: &Aabb, center: Vec3, radius: f32) -> bool {
        self.is_box_visible(aabb) && self.within_distance(center, radius)
    }
}
