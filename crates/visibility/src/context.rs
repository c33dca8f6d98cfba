use biomekit_common::{Aabb, WorldBounds};
use glam::Vec3;

/// Centralised per-frame visibility with its own caching.
pub trait VisibilityManager {
    fn should_animate(&self, aabb: &Aabb, center: Vec3, radius: f32) -> bool;
}

/// Older box-only frustum query, consulted when no [`VisibilityManager`] is available.
pub trait FrustumManager {
    fn is_box_visible(&self, aabb: &Aabb) -> bool;
}

/// Why a group may or may not animate this frame. Built fresh per query.
#[derive(Clone, Copy, Default)]
pub struct AnimationVisibilityContext<'a> {
    pub visibility_manager: Option<&'a dyn VisibilityManager>,
    pub frustum_manager: Option<&'a dyn FrustumManager>,
    pub camera_position: Option<Vec3>,
    pub max_distance: Option<f32>,
}

impl<'a> AnimationVisibilityContext<'a> {
    pub fn with_visibility_manager(manager: &'a dyn VisibilityManager) -> Self {
        Self {
            visibility_manager: Some(manager),
            ..Default::default()
        }
    }

    pub fn with_frustum_manager(mut self, manager: &'a dyn FrustumManager) -> Self {
        self.frustum_manager = Some(manager);
        self
    }

    /// Reject groups farther than `max_distance` (plus their radius) from `camera`.
    pub fn with_distance_limit(mut self, camera: Vec3, max_distance: f32) -> Self {
        self.camera_position = Some(camera);
        self.max_distance = Some(max_distance);
        self
    }
}

impl std::fmt::Debug for AnimationVisibilityContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationVisibilityContext")
            .field("visibility_manager", &self.visibility_manager.is_some())
            .field("frustum_manager", &self.frustum_manager.is_some())
            .field("camera_position", &self.camera_position)
            .field("max_distance", &self.max_distance)
            .finish()
    }
}

/// Decide whether a group with `bounds` should animate under `ctx`.
///
/// Does not consider the graphics quality setting; callers check that separately.
pub fn should_animate(
    ctx: Option<&AnimationVisibilityContext<'_>>,
    bounds: Option<&WorldBounds>,
) -> bool {
    let Some(ctx) = ctx else {
        return true;
    };

    if let (Some(manager), Some(bounds)) = (ctx.visibility_manager, bounds) {
        let (center, radius) = if bounds.sphere.is_empty() {
            (bounds.aabb.center(), 0.0)
        } else {
            (bounds.sphere.center, bounds.sphere.radius)
        };
        return manager.should_animate(&bounds.aabb, center, radius);
    }

    if let (Some(frustum), Some(bounds)) = (ctx.frustum_manager, bounds) {
        if !frustum.is_box_visible(&bounds.aabb) {
            tracing::trace!("animation gated: bounds outside frustum");
            return false;
        }
    }

    if let (Some(max), Some(camera), Some(bounds)) = (ctx.max_distance, ctx.camera_position, bounds)
    {
        let sphere = &bounds.sphere;
        if !sphere.is_empty() && camera.distance(sphere.center) > max + sphere.radius {
            tracing::trace!(max, "animation gated: bounds beyond distance limit");
            return false;
        }
    }

    true
}
