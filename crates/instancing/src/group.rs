use std::time::Duration;

use biomekit_anim::{BucketScheduler, ClipAction};
use biomekit_common::{
    AnimationConfig, Color, ConfigError, FrameTime, GraphicsSetting, TRANSFORM_STRIDE, WorldBounds, ZERO_SCALE,
};
use biomekit_pool::{PooledTransforms, TransformPool};
use biomekit_render::{
    AnimationClip, AssetError, InstancedPrimitive, ModelAsset, NodeId, PartRole,
    PrimitiveOptions, SceneBackend,
};
use biomekit_visibility::{AnimationVisibilityContext, should_animate};
use glam::{Mat4, Vec3};

use crate::count::resolve_effective_count;

/// Errors from building an [`InstanceGroup`].
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Construction options for an [`InstanceGroup`].
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    /// Seed for bucket assignment; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Allow raycast picking against the group's primitives.
    pub pickable: bool,
    pub animation: AnimationConfig,
}

/// What one `update_animation` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    /// The graphics tier disables animation.
    GraphicsSuppressed,
    /// The visibility gate rejected the group.
    NotVisible,
    /// The update interval has not elapsed.
    Throttled,
    /// Nothing to write: no active instances or no animated parts.
    Idle,
    Updated { primitives: usize, rows: usize },
}

#[derive(Debug)]
struct AnimatedPart {
    primitive: usize,
    track: usize,
    action: Option<ClipAction>,
}

/// N copies of a multi-part model that move, resize, cull and animate together.
///
/// Slots at or above the active count are not drawn. Removing an instance only
/// hides its slot; callers track which slots are free.
#[derive(Debug)]
pub struct InstanceGroup {
    name: String,
    root: NodeId,
    capacity: usize,
    active_count: usize,
    primitives: Vec<InstancedPrimitive>,
    clip: Option<AnimationClip>,
    animated: Vec<AnimatedPart>,
    scheduler: BucketScheduler,
    world_bounds: Option<WorldBounds>,
    land_color: Color,
    /// Radians per second about each instance's +Y.
    spin: Option<f32>,
    spin_interval: Duration,
    last_spin: Option<Duration>,
    /// Clip actions created so far; each animated part gets exactly one.
    actions_created: usize,
}

impl InstanceGroup {
    /// Build one primitive per asset part, each with `count` slots, none active.
    pub fn new(
        asset: &ModelAsset,
        count: usize,
        options: &GroupOptions,
        backend: &mut dyn SceneBackend,
    ) -> Result<Self, GroupError> {
        asset.validate()?;
        options.animation.validate()?;
        let _span = tracing::info_span!("instance_group_new", asset = %asset.name, count).entered();

        let root = backend.create_group_node(&asset.name);
        let clip = asset.primary_clip().cloned();
        let primitive_options = PrimitiveOptions {
            animated: clip.is_some(),
            pickable: options.pickable,
            emissive_cap: asset.emissive_cap,
        };

        let mut primitives = Vec::with_capacity(asset.parts.len());
        let mut animated = Vec::new();
        for part in &asset.parts {
            let primitive = InstancedPrimitive::from_part(part, count, &primitive_options, backend);
            if let Some(track) = clip.as_ref().and_then(|c| c.track_for(&part.name)) {
                if primitive.channel_count() > 0 {
                    animated.push(AnimatedPart {
                        primitive: primitives.len(),
                        track,
                        action: None,
                    });
                }
            }
            primitives.push(primitive);
        }

        let land_color = asset
            .parts
            .iter()
            .find(|p| p.role == PartRole::Land)
            .map_or(Color::PREVIEW_INVALID, |p| p.material.color);

        let scheduler = BucketScheduler::with_seed(count, &options.animation, options.seed);

        tracing::debug!(
            group = %asset.name,
            primitives = primitives.len(),
            animated = animated.len(),
            "built instance group"
        );

        Ok(Self {
            name: asset.name.clone(),
            root,
            capacity: count,
            active_count: 0,
            primitives,
            clip,
            animated,
            scheduler,
            world_bounds: None,
            land_color,
            spin: None,
            spin_interval: options.animation.spin_interval(),
            last_spin: None,
            actions_created: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_node(&self) -> NodeId {
        self.root
    }

    /// Slot count fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_active_count(&self) -> usize {
        self.active_count
    }

    pub fn primitives(&self) -> &[InstancedPrimitive] {
        &self.primitives
    }

    pub fn scheduler(&self) -> &BucketScheduler {
        &self.scheduler
    }

    /// Whether any part is driven by the group's clip.
    pub fn is_animated(&self) -> bool {
        !self.animated.is_empty()
    }

    pub fn animated_primitive_count(&self) -> usize {
        self.animated.len()
    }

    pub fn world_bounds(&self) -> Option<&WorldBounds> {
        self.world_bounds.as_ref()
    }

    /// Material color of the first land part, or the invalid-preview red.
    pub fn land_color(&self) -> Color {
        self.land_color
    }

    pub fn set_root_scale(&self, scale: Vec3, backend: &mut dyn SceneBackend) {
        backend.set_node_scale(self.root, scale);
    }

    /// Set how many slots are drawn, clamped to `[0, capacity]`. Returns the applied count.
    pub fn set_active_count(&mut self, requested: i64) -> usize {
        let mut limits: Vec<usize> = self.primitives.iter().map(InstancedPrimitive::capacity).collect();
        limits.push(self.capacity);
        let effective = resolve_effective_count(requested, &limits);

        for primitive in &mut self.primitives {
            primitive.set_draw_count(effective);
        }
        self.active_count = effective;
        tracing::trace!(group = %self.name, requested, effective, "set active count");
        self.refresh_bounds();
        effective
    }

    fn slot_in_range(&self, index: usize, op: &'static str) -> bool {
        if index < self.capacity {
            return true;
        }
        tracing::warn!(group = %self.name, index, capacity = self.capacity, op, "slot out of range, ignored");
        false
    }

    /// Write `transform` to slot `index` on every primitive.
    pub fn set_instance_transform(&mut self, index: usize, transform: &Mat4) {
        if !self.slot_in_range(index, "set_instance_transform") {
            return;
        }
        for primitive in &mut self.primitives {
            primitive.set_transform(index, transform);
        }
    }

    /// Write `color` to slot `index` on every primitive that carries colors.
    pub fn set_instance_color(&mut self, index: usize, color: Color) {
        if !self.slot_in_range(index, "set_instance_color") {
            return;
        }
        for primitive in &mut self.primitives {
            primitive.set_color(index, color);
        }
    }

    /// Hide slot `index` by zero-scaling it. The active count is unchanged.
    pub fn remove_instance(&mut self, index: usize) {
        if !self.slot_in_range(index, "remove_instance") {
            return;
        }
        for primitive in &mut self.primitives {
            primitive.set_transform(index, &ZERO_SCALE);
        }
        self.refresh_bounds();
    }

    /// Copy the active transforms of the first primitive into a pooled buffer.
    ///
    /// The caller owns the buffer and should release it back to `pool`.
    pub fn snapshot_transforms(&self, pool: &mut TransformPool) -> (PooledTransforms, usize) {
        let _span =
            tracing::info_span!("snapshot_transforms", group = %self.name, count = self.active_count)
                .entered();
        let mut buffer = pool.acquire(self.active_count);
        if let Some(first) = self.primitives.first() {
            let src = first.transforms();
            let n = (self.active_count * TRANSFORM_STRIDE)
                .min(src.len())
                .min(buffer.as_slice().len());
            buffer.as_mut_slice()[..n].copy_from_slice(&src[..n]);
        }
        (buffer, self.active_count)
    }

    /// Load `count` transforms from `buffer` into every primitive.
    ///
    /// One clamp, covering every primitive's slots and the buffer's own size,
    /// governs both the copy length and the resulting draw count. Returns it.
    pub fn restore_transforms(&mut self, buffer: &PooledTransforms, count: i64) -> usize {
        let _span = tracing::info_span!("restore_transforms", group = %self.name, count).entered();

        let mut limits: Vec<usize> = self.primitives.iter().map(InstancedPrimitive::capacity).collect();
        limits.push(buffer.as_slice().len() / TRANSFORM_STRIDE);
        limits.push(self.capacity);
        let effective = resolve_effective_count(count, &limits);

        let floats = effective * TRANSFORM_STRIDE;
        let src = &buffer.as_slice()[..floats];
        for primitive in &mut self.primitives {
            primitive.transforms_mut()[..floats].copy_from_slice(src);
            primitive.set_draw_count(effective);
            primitive.mark_transforms_dirty();
        }
        self.active_count = effective;
        tracing::debug!(effective, "restored transforms");
        effective
    }

    /// Store a copy of `bounds` (or clear it) and re-apply culling.
    pub fn set_world_bounds(&mut self, bounds: Option<&WorldBounds>) {
        self.world_bounds = bounds.copied();
        self.refresh_bounds();
    }

    fn refresh_bounds(&mut self) {
        for primitive in &mut self.primitives {
            primitive.mark_transforms_dirty();
            primitive.compute_bounding_sphere();
            primitive.apply_world_bounds(self.world_bounds.as_ref());
        }
    }

    /// Rotate every active instance continuously about its own +Y.
    ///
    /// `None` stops spinning. Steps are throttled like morph updates.
    pub fn set_spin(&mut self, radians_per_sec: Option<f32>) {
        self.spin = radians_per_sec;
        self.last_spin = None;
    }

    fn step_spin(&mut self, now: Duration) {
        let Some(rate) = self.spin else {
            return;
        };
        let Some(last) = self.last_spin else {
            self.last_spin = Some(now);
            return;
        };
        let dt = now.saturating_sub(last);
        if dt < self.spin_interval {
            return;
        }
        self.last_spin = Some(now);
        if self.active_count == 0 {
            return;
        }

        let rotation = Mat4::from_rotation_y(rate * dt.as_secs_f32());
        for primitive in &mut self.primitives {
            for i in 0..primitive.draw_count() {
                if let Some(m) = primitive.transform(i) {
                    primitive.set_transform(i, &(m * rotation));
                }
            }
            primitive.mark_transforms_dirty();
        }
    }

    /// Advance morph animation (and spin) for this frame.
    ///
    /// Bucket poses are recomputed at most once per update interval, and only
    /// while the graphics tier and the visibility gate allow it.
    pub fn update_animation(
        &mut self,
        frame: &FrameTime,
        graphics: GraphicsSetting,
        visibility: Option<&AnimationVisibilityContext<'_>>,
    ) -> AnimationOutcome {
        let _span = tracing::trace_span!("animation_update", group = %self.name).entered();

        if !graphics.allows_animation() {
            tracing::trace!(?graphics, "animation suppressed by graphics setting");
            return AnimationOutcome::GraphicsSuppressed;
        }
        if !should_animate(visibility, self.world_bounds.as_ref()) {
            return AnimationOutcome::NotVisible;
        }

        self.step_spin(frame.elapsed);

        if !self.scheduler.is_due(frame.elapsed) {
            tracing::trace!("animation throttled");
            return AnimationOutcome::Throttled;
        }
        let Some(clip) = self.clip.as_ref() else {
            return AnimationOutcome::Idle;
        };

        let now = frame.elapsed_secs();
        let mut written = 0;
        let mut rows = 0;
        for part in &mut self.animated {
            let primitive = &mut self.primitives[part.primitive];
            let active = primitive.draw_count();
            let channels = primitive.channel_count();
            if active == 0 || channels == 0 {
                continue;
            }

            let track = part.track;
            let created = &mut self.actions_created;
            let action: &ClipAction = part.action.get_or_insert_with(|| {
                *created += 1;
                tracing::trace!(track, "starting clip action");
                let mut action = ClipAction::new(track);
                action.play();
                action
            });
            self.scheduler.compute_poses(now, channels, |t, out| {
                action.sample(clip, t, out);
            });

            let Some(texture) = primitive.morph_mut() else {
                continue;
            };
            rows += self.scheduler.fan_out(channels, active, texture);
            texture.mark_dirty();
            written += 1;
        }

        if written == 0 {
            return AnimationOutcome::Idle;
        }
        self.scheduler.mark_updated(frame.elapsed);
        tracing::trace!(primitives = written, rows, "bucket poses written");
        AnimationOutcome::Updated {
            primitives: written,
            rows,
        }
    }

    /// Release every GPU resource and detach the root node.
    pub fn dispose(self, backend: &mut dyn SceneBackend) {
        let count = self.primitives.len();
        for primitive in self.primitives {
            primitive.release(backend);
        }
        backend.detach_node(self.root);
        tracing::info!(group = %self.name, primitives = count, "disposed instance group");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;
    use biomekit_common::{Aabb, BoundingSphere, PoolConfig};
    use biomekit_render::{BackendEvent, RecordingBackend};
    use biomekit_visibility::FrustumManager;

    const CHANNELS: usize = 3;

    fn options() -> GroupOptions {
        GroupOptions {
            seed: Some(9),
            ..Default::default()
        }
    }

    fn group(count: usize) -> (InstanceGroup, RecordingBackend) {
        let mut backend = RecordingBackend::new();
        let g = InstanceGroup::new(&sample::creature(CHANNELS), count, &options(), &mut backend)
            .unwrap();
        (g, backend)
    }

    fn at(ms: u64) -> FrameTime {
        FrameTime::new(Duration::from_millis(ms), Duration::from_millis(16))
    }

    fn morph_data(g: &InstanceGroup) -> Vec<f32> {
        g.primitives()[0].morph().unwrap().data().to_vec()
    }

    fn translation(x: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    struct HiddenFrustum;

    impl FrustumManager for HiddenFrustum {
        fn is_box_visible(&self, _aabb: &Aabb) -> bool {
            false
        }
    }

    #[test]
    fn starts_with_nothing_active() {
        let (g, _) = group(16);
        assert_eq!(g.get_active_count(), 0);
        assert_eq!(g.capacity(), 16);
        assert_eq!(g.primitives().len(), 3);
        assert!(g.primitives().iter().all(|p| p.draw_count() == 0));
        assert!(g.is_animated());
        assert_eq!(g.animated_primitive_count(), 1);
    }

    #[test]
    fn morph_texture_starts_at_base_and_dirty_once() {
        let (g, _) = group(4);
        let morph = g.primitives()[0].morph().unwrap();
        assert_eq!(morph.version(), 1);
        assert_eq!(morph.height(), 4);
        assert!(morph.data().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn zero_rates_are_rejected() {
        let mut backend = RecordingBackend::new();
        for animation in [
            AnimationConfig {
                spin_rate_hz: 0.0,
                ..Default::default()
            },
            AnimationConfig {
                update_rate_hz: -1.0,
                ..Default::default()
            },
        ] {
            let options = GroupOptions {
                animation,
                ..options()
            };
            assert!(matches!(
                InstanceGroup::new(&sample::creature(2), 4, &options, &mut backend),
                Err(GroupError::Config(_))
            ));
        }
        assert!(backend.events().is_empty());
    }

    #[test]
    fn invalid_asset_is_rejected() {
        let mut asset = sample::creature(2);
        asset.clips[0].tracks[0].values.pop();
        let mut backend = RecordingBackend::new();
        assert!(matches!(
            InstanceGroup::new(&asset, 4, &options(), &mut backend),
            Err(GroupError::Asset(_))
        ));
        assert!(backend.events().is_empty());
    }

    #[test]
    fn land_color_from_land_part() {
        let (g, _) = group(1);
        assert_eq!(g.land_color(), Color::new(0.35, 0.55, 0.25));

        let mut asset = sample::creature(0);
        asset.parts.retain(|p| p.role != PartRole::Land);
        let mut backend = RecordingBackend::new();
        let g = InstanceGroup::new(&asset, 1, &options(), &mut backend).unwrap();
        assert_eq!(g.land_color(), Color::PREVIEW_INVALID);
    }

    #[test]
    fn active_count_is_clamped() {
        let (mut g, _) = group(10);
        assert_eq!(g.set_active_count(-5), 0);
        assert_eq!(g.get_active_count(), 0);
        assert_eq!(g.set_active_count(110), 10);
        assert_eq!(g.get_active_count(), 10);
        assert!(g.primitives().iter().all(|p| p.draw_count() == 10));
    }

    #[test]
    fn active_count_respects_smallest_primitive() {
        let mut asset = sample::creature(0);
        asset.parts[1].instance_limit = Some(3);
        let mut backend = RecordingBackend::new();
        let mut g = InstanceGroup::new(&asset, 8, &options(), &mut backend).unwrap();
        assert_eq!(g.set_active_count(8), 3);
        assert!(g.primitives().iter().all(|p| p.draw_count() == 3));
    }

    #[test]
    fn growing_active_count_leaves_other_slots_alone() {
        let mut asset = sample::creature(0);
        asset.parts.truncate(1);
        let mut backend = RecordingBackend::new();
        let mut g = InstanceGroup::new(&asset, 4, &options(), &mut backend).unwrap();
        g.set_instance_transform(0, &translation(1.0));

        assert_eq!(g.set_active_count(2), 2);
        assert_eq!(g.get_active_count(), 2);
        let p = &g.primitives()[0];
        assert_eq!(p.transform(0), Some(translation(1.0)));
        assert_eq!(p.transform(2), Some(ZERO_SCALE));
        assert_eq!(p.transform(3), Some(ZERO_SCALE));
    }

    #[test]
    fn transform_written_to_every_primitive() {
        let (mut g, _) = group(4);
        g.set_instance_transform(2, &translation(5.0));
        for p in g.primitives() {
            assert_eq!(p.transform(2), Some(translation(5.0)));
            assert_eq!(p.transform(1), Some(ZERO_SCALE));
        }
    }

    #[test]
    fn out_of_range_writes_are_ignored() {
        let (mut g, _) = group(4);
        let before: Vec<Vec<f32>> = g.primitives().iter().map(|p| p.transforms().to_vec()).collect();
        g.set_instance_transform(4, &translation(1.0));
        g.set_instance_color(usize::MAX, Color::PREVIEW_INVALID);
        g.remove_instance(100);
        let after: Vec<Vec<f32>> = g.primitives().iter().map(|p| p.transforms().to_vec()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn color_only_on_colored_parts() {
        let (mut g, _) = group(4);
        let red = Color::new(1.0, 0.0, 0.0);
        g.set_instance_color(1, red);
        assert_eq!(g.primitives()[0].color(1), Some(red));
        assert_eq!(g.primitives()[0].color(0), Some(Color::WHITE));
        assert_eq!(g.primitives()[1].color(1), None);
    }

    #[test]
    fn remove_then_snapshot_shows_zero_scale() {
        let mut pool = TransformPool::new(PoolConfig::default());
        let (mut g, _) = group(10);
        for i in 0..10 {
            g.set_instance_transform(i, &translation(i as f32));
        }
        g.set_active_count(10);
        g.remove_instance(3);
        assert_eq!(g.get_active_count(), 10);

        let (buffer, count) = g.snapshot_transforms(&mut pool);
        assert_eq!(count, 10);
        assert_eq!(buffer.transform(3), Some(ZERO_SCALE));
        assert_eq!(buffer.transform(4), Some(translation(4.0)));
        assert!(pool.is_in_use(buffer.id()));
        pool.release(buffer);
        assert_eq!(pool.stats().available, 1);
    }

    #[test]
    fn restore_uses_one_clamp_for_all_primitives() {
        let mut asset = sample::creature(0);
        asset.parts[2].instance_limit = Some(6);
        let mut backend = RecordingBackend::new();
        let mut g = InstanceGroup::new(&asset, 10, &options(), &mut backend).unwrap();

        let mut pool = TransformPool::new(PoolConfig::default());
        let mut buffer = pool.acquire(10);
        for i in 0..10 {
            let start = i * TRANSFORM_STRIDE;
            translation(i as f32)
                .write_cols_to_slice(&mut buffer.as_mut_slice()[start..start + TRANSFORM_STRIDE]);
        }

        assert_eq!(g.restore_transforms(&buffer, 8), 6);
        assert_eq!(g.get_active_count(), 6);
        for p in g.primitives() {
            assert_eq!(p.draw_count(), 6);
            assert_eq!(p.transform(5), Some(translation(5.0)));
        }
        // Slot 6 exists on the larger primitives but is past the clamp.
        assert_eq!(g.primitives()[0].transform(6), Some(ZERO_SCALE));
    }

    #[test]
    fn restore_clamps_to_short_buffer() {
        let mut pool = TransformPool::new(PoolConfig {
            default_capacity: 4,
            growth_step: 4,
        });
        let buffer = pool.acquire(2);
        assert_eq!(buffer.capacity(), 4);

        let (mut g, _) = group(10);
        assert_eq!(g.restore_transforms(&buffer, 10), 4);
        assert_eq!(g.restore_transforms(&buffer, -1), 0);
        assert!(g.primitives().iter().all(|p| p.draw_count() == 0));
    }

    #[test]
    fn snapshot_restore_between_groups() {
        let mut pool = TransformPool::new(PoolConfig::default());
        let (mut a, _) = group(5);
        for i in 0..5 {
            a.set_instance_transform(i, &translation(i as f32 * 2.0));
        }
        a.set_active_count(5);
        let (buffer, count) = a.snapshot_transforms(&mut pool);

        let (mut b, _) = group(5);
        b.restore_transforms(&buffer, count as i64);
        pool.release(buffer);
        assert_eq!(b.get_active_count(), 5);
        assert_eq!(b.primitives()[1].transform(4), Some(translation(8.0)));
    }

    #[test]
    fn world_bounds_toggle_culling() {
        let (mut g, _) = group(2);
        let mut bounds = WorldBounds::from_aabb(Aabb::new(Vec3::ZERO, Vec3::splat(4.0)));
        g.set_world_bounds(Some(&bounds));
        assert!(g.primitives().iter().all(|p| p.frustum_culled()));
        assert_eq!(g.primitives()[0].geometry_bounds(), Some(&bounds));

        // The group holds its own copy.
        bounds.sphere.radius = 99.0;
        assert_ne!(g.world_bounds(), Some(&bounds));

        g.set_world_bounds(None);
        assert!(g.primitives().iter().all(|p| !p.frustum_culled()));
        assert!(g.world_bounds().is_none());
    }

    #[test]
    fn refresh_recomputes_bounding_sphere() {
        let (mut g, _) = group(2);
        g.set_instance_transform(0, &translation(10.0));
        g.set_active_count(1);
        let sphere = g.primitives()[2].bounding_sphere();
        assert!((sphere.center - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
        assert_eq!(sphere.radius, 1.0);
    }

    #[test]
    fn buckets_are_stable_across_updates() {
        let (mut g, _) = group(64);
        g.set_active_count(64);
        let before = g.scheduler().assignments().to_vec();
        g.update_animation(&at(0), GraphicsSetting::High, None);
        g.update_animation(&at(500), GraphicsSetting::High, None);
        assert_eq!(g.scheduler().assignments(), before.as_slice());
    }

    #[test]
    fn update_writes_bucket_pose_to_active_rows() {
        let (mut g, _) = group(40);
        g.set_active_count(25);
        let outcome = g.update_animation(&at(700), GraphicsSetting::High, None);
        assert_eq!(
            outcome,
            AnimationOutcome::Updated {
                primitives: 1,
                rows: 25
            }
        );

        let morph = g.primitives()[0].morph().unwrap();
        assert_eq!(morph.version(), 2);
        for slot in 0..40 {
            let row = morph.row(slot).unwrap();
            if slot < 25 {
                let bucket = g.scheduler().bucket_of(slot).unwrap();
                assert_eq!(row, g.scheduler().pose(bucket, CHANNELS).unwrap());
            } else {
                assert!(row.iter().all(|&w| w == 0.0));
            }
        }
    }

    #[test]
    fn clip_action_starts_once_and_keeps_playing() {
        let (mut g, _) = group(16);
        g.set_active_count(16);
        assert!(g.animated[0].action.is_none());

        // Throttled-out and idle ticks do not create it.
        assert_eq!(
            g.update_animation(&at(0), GraphicsSetting::Low, None),
            AnimationOutcome::GraphicsSuppressed
        );
        assert!(g.animated[0].action.is_none());

        g.update_animation(&at(0), GraphicsSetting::High, None);
        assert_eq!(g.actions_created, 1);
        let action = g.animated[0].action.as_ref().unwrap();
        assert!(action.is_playing());
        assert_eq!(action.track(), 0);

        for ms in [20, 60, 120, 400, 2000] {
            g.update_animation(&at(ms), GraphicsSetting::High, None);
        }
        assert_eq!(g.actions_created, 1);
        assert!(g.animated[0].action.as_ref().unwrap().is_playing());
    }

    #[test]
    fn second_update_inside_interval_is_noop() {
        let (mut g, _) = group(32);
        g.set_active_count(32);
        assert!(matches!(
            g.update_animation(&at(0), GraphicsSetting::High, None),
            AnimationOutcome::Updated { .. }
        ));
        let first = morph_data(&g);
        let version = g.primitives()[0].morph().unwrap().version();

        assert_eq!(
            g.update_animation(&at(30), GraphicsSetting::High, None),
            AnimationOutcome::Throttled
        );
        assert_eq!(morph_data(&g), first);
        assert_eq!(g.primitives()[0].morph().unwrap().version(), version);

        assert!(matches!(
            g.update_animation(&at(50), GraphicsSetting::High, None),
            AnimationOutcome::Updated { .. }
        ));
    }

    #[test]
    fn low_graphics_leaves_weights_untouched() {
        let (mut g, _) = group(8);
        g.set_active_count(8);
        let before = morph_data(&g);
        assert_eq!(
            g.update_animation(&at(1000), GraphicsSetting::Low, None),
            AnimationOutcome::GraphicsSuppressed
        );
        assert_eq!(morph_data(&g), before);
        assert_eq!(g.primitives()[0].morph().unwrap().version(), 1);
    }

    #[test]
    fn hidden_group_does_not_animate() {
        let (mut g, _) = group(8);
        g.set_active_count(8);
        g.set_world_bounds(Some(&WorldBounds::new(
            Aabb::new(Vec3::ZERO, Vec3::ONE),
            BoundingSphere::new(Vec3::splat(0.5), 0.9),
        )));
        let frustum = HiddenFrustum;
        let ctx = AnimationVisibilityContext::default().with_frustum_manager(&frustum);
        assert_eq!(
            g.update_animation(&at(0), GraphicsSetting::High, Some(&ctx)),
            AnimationOutcome::NotVisible
        );
        assert_eq!(g.primitives()[0].morph().unwrap().version(), 1);
    }

    #[test]
    fn empty_group_does_not_advance_throttle() {
        let (mut g, _) = group(8);
        assert_eq!(
            g.update_animation(&at(0), GraphicsSetting::High, None),
            AnimationOutcome::Idle
        );
        assert!(g.scheduler().last_update().is_none());

        g.set_active_count(1);
        assert!(matches!(
            g.update_animation(&at(10), GraphicsSetting::High, None),
            AnimationOutcome::Updated { rows: 1, .. }
        ));
    }

    #[test]
    fn static_asset_never_animates() {
        let mut backend = RecordingBackend::new();
        let mut g =
            InstanceGroup::new(&sample::creature(0), 4, &options(), &mut backend).unwrap();
        g.set_active_count(4);
        assert!(!g.is_animated());
        assert!(g.primitives().iter().all(|p| p.morph().is_none()));
        assert_eq!(
            g.update_animation(&at(0), GraphicsSetting::High, None),
            AnimationOutcome::Idle
        );
    }

    #[test]
    fn spin_rotates_active_instances() {
        let (mut g, _) = group(2);
        g.set_instance_transform(0, &Mat4::IDENTITY);
        g.set_active_count(1);
        g.set_spin(Some(std::f32::consts::PI));

        g.update_animation(&at(0), GraphicsSetting::High, None);
        assert_eq!(g.primitives()[0].transform(0), Some(Mat4::IDENTITY));

        g.update_animation(&at(500), GraphicsSetting::High, None);
        let expected = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let actual = g.primitives()[0].transform(0).unwrap();
        assert!(actual.abs_diff_eq(expected, 1e-5));
        // Inactive slot untouched.
        assert_eq!(g.primitives()[0].transform(1), Some(ZERO_SCALE));
    }

    #[test]
    fn spin_is_throttled() {
        let (mut g, _) = group(1);
        g.set_instance_transform(0, &Mat4::IDENTITY);
        g.set_active_count(1);
        g.set_spin(Some(1.0));
        g.update_animation(&at(0), GraphicsSetting::High, None);
        g.update_animation(&at(10), GraphicsSetting::High, None);
        assert_eq!(g.primitives()[0].transform(0), Some(Mat4::IDENTITY));
    }

    #[test]
    fn root_scale_goes_to_backend() {
        let (g, mut backend) = group(1);
        g.set_root_scale(Vec3::splat(2.0), &mut backend);
        assert_eq!(
            backend.events().last(),
            Some(&BackendEvent::NodeScaled {
                node: g.root_node(),
                scale: Vec3::splat(2.0)
            })
        );
    }

    #[test]
    fn dispose_releases_everything() {
        let (g, mut backend) = group(4);
        let root = g.root_node();
        assert_eq!(backend.live_textures(), 1);
        g.dispose(&mut backend);

        let events = backend.events();
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, BackendEvent::GeometryReleased(_)))
                .count(),
            3
        );
        assert_eq!(events.last(), Some(&BackendEvent::NodeDetached(root)));
    }
}
