use biomekit_common::{BoundingSphere, Color, TRANSFORM_STRIDE, WorldBounds, ZERO_SCALE};
use glam::Mat4;

use crate::asset::{MaterialDesc, ModelPart, PartRole};
use crate::backend::SceneBackend;
use crate::handles::{GeometryHandle, TextureHandle};

/// Alpha-test cutoff applied to parts flagged `has_alpha`.
pub const ALPHA_TEST_THRESHOLD: f32 = 0.075;

const COLOR_STRIDE: usize = 3;

/// Per-instance morph weights, one row per instance and one column per channel.
///
/// Sampled by the vertex shader; `version` bumps whenever the data must be re-uploaded.
#[derive(Debug, Clone)]
pub struct MorphTexture {
    handle: TextureHandle,
    width: usize,
    height: usize,
    data: Vec<f32>,
    version: u64,
}

impl MorphTexture {
    /// `rows` copies of `base`; the width is `base.len()`.
    pub fn new(handle: TextureHandle, base: &[f32], rows: usize) -> Self {
        let width = base.len();
        let mut data = Vec::with_capacity(width * rows);
        for _ in 0..rows {
            data.extend_from_slice(base);
        }
        Self {
            handle,
            width,
            height: rows,
            data,
            version: 0,
        }
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Channels per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows (instance slots).
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.width)?;
        self.data.get(start..start + self.width)
    }

    /// Copy `weights` into the start of row `index`. Returns false when the row is out of range.
    pub fn write_row(&mut self, index: usize, weights: &[f32]) -> bool {
        if index >= self.height {
            return false;
        }
        let n = weights.len().min(self.width);
        let start = index * self.width;
        self.data[start..start + n].copy_from_slice(&weights[..n]);
        true
    }

    pub fn mark_dirty(&mut self) {
        self.version += 1;
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Construction switches for an [`InstancedPrimitive`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveOptions {
    /// Allocate a morph texture for the part.
    pub animated: bool,
    /// Allow raycast picking against the instances.
    pub pickable: bool,
    /// Replacement for emissive intensities above 1.0.
    pub emissive_cap: Option<f32>,
}

/// One model part drawn `draw_count` times from a shared per-instance transform array.
#[derive(Debug)]
pub struct InstancedPrimitive {
    name: String,
    role: PartRole,
    geometry: GeometryHandle,
    material: MaterialDesc,
    local_bounds: BoundingSphere,
    base_morph: Vec<f32>,
    transforms: Vec<f32>,
    transform_version: u64,
    colors: Option<Vec<f32>>,
    color_version: u64,
    draw_count: usize,
    morph: Option<MorphTexture>,
    bounding_sphere: BoundingSphere,
    geometry_bounds: Option<WorldBounds>,
    frustum_culled: bool,
    render_order: i32,
    cast_shadow: bool,
    receive_shadow: bool,
    pickable: bool,
}

impl InstancedPrimitive {
    /// Build a primitive with `capacity` slots (or the part's own limit, if lower).
    ///
    /// Every slot starts as a zero-scale transform and nothing is drawn.
    pub fn from_part(
        part: &ModelPart,
        capacity: usize,
        options: &PrimitiveOptions,
        backend: &mut dyn SceneBackend,
    ) -> Self {
        let capacity = part.instance_limit.map_or(capacity, |limit| limit.min(capacity));

        let zero = ZERO_SCALE.to_cols_array();
        let mut transforms = Vec::with_capacity(capacity * TRANSFORM_STRIDE);
        for _ in 0..capacity {
            transforms.extend_from_slice(&zero);
        }

        let colors = part
            .supports_color
            .then(|| Color::WHITE.to_array().repeat(capacity));

        let mut material = part.material.clone();
        if part.has_alpha {
            material.depth_write = true;
            material.alpha_test = material.alpha_test.max(ALPHA_TEST_THRESHOLD);
        }
        if let Some(cap) = options.emissive_cap {
            if material.emissive_intensity > 1.0 {
                material.emissive_intensity = cap;
            }
        }

        let morph = (options.animated && part.channel_count() > 0).then(|| {
            let handle = backend.create_morph_texture(part.channel_count(), capacity);
            let mut texture = MorphTexture::new(handle, &part.base_morph, capacity);
            texture.mark_dirty();
            texture
        });

        let render_order = match part.role {
            PartRole::Water => 5,
            PartRole::Normal | PartRole::Land | PartRole::Structure => 10,
            PartRole::Outline => 20,
        };

        tracing::debug!(
            part = %part.name,
            role = ?part.role,
            capacity,
            channels = part.channel_count(),
            animated = morph.is_some(),
            "built instanced primitive"
        );

        Self {
            name: part.name.clone(),
            role: part.role,
            geometry: part.geometry,
            material,
            local_bounds: part.local_bounds,
            base_morph: part.base_morph.clone(),
            transforms,
            transform_version: 0,
            colors,
            color_version: 0,
            draw_count: 0,
            morph,
            bounding_sphere: BoundingSphere::EMPTY,
            geometry_bounds: None,
            frustum_culled: false,
            render_order,
            cast_shadow: part.role == PartRole::Structure,
            receive_shadow: part.role == PartRole::Land,
            pickable: options.pickable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> PartRole {
        self.role
    }

    pub fn geometry(&self) -> GeometryHandle {
        self.geometry
    }

    pub fn material(&self) -> &MaterialDesc {
        &self.material
    }

    pub fn render_order(&self) -> i32 {
        self.render_order
    }

    pub fn cast_shadow(&self) -> bool {
        self.cast_shadow
    }

    pub fn receive_shadow(&self) -> bool {
        self.receive_shadow
    }

    pub fn pickable(&self) -> bool {
        self.pickable
    }

    /// Instance slots, derived from the backing transform array.
    pub fn capacity(&self) -> usize {
        self.transforms.len() / TRANSFORM_STRIDE
    }

    /// Number of instances actually drawn.
    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    /// Set the draw count, clamped to capacity. Returns the applied value.
    pub fn set_draw_count(&mut self, requested: usize) -> usize {
        self.draw_count = requested.min(self.capacity());
        self.draw_count
    }

    pub fn transform(&self, index: usize) -> Option<Mat4> {
        let start = index.checked_mul(TRANSFORM_STRIDE)?;
        self.transforms
            .get(start..start + TRANSFORM_STRIDE)
            .map(Mat4::from_cols_slice)
    }

    /// Write one slot. Returns false (and writes nothing) when out of range.
    pub fn set_transform(&mut self, index: usize, m: &Mat4) -> bool {
        if index >= self.capacity() {
            return false;
        }
        let start = index * TRANSFORM_STRIDE;
        m.write_cols_to_slice(&mut self.transforms[start..start + TRANSFORM_STRIDE]);
        true
    }

    pub fn transforms(&self) -> &[f32] {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut [f32] {
        &mut self.transforms
    }

    /// Transform array as raw bytes for upload.
    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }

    pub fn mark_transforms_dirty(&mut self) {
        self.transform_version += 1;
    }

    pub fn transform_version(&self) -> u64 {
        self.transform_version
    }

    pub fn supports_color(&self) -> bool {
        self.colors.is_some()
    }

    pub fn color(&self, index: usize) -> Option<Color> {
        let colors = self.colors.as_ref()?;
        let start = index.checked_mul(COLOR_STRIDE)?;
        colors
            .get(start..start + COLOR_STRIDE)
            .map(|c| Color::new(c[0], c[1], c[2]))
    }

    /// Write one slot's color. No-op (false) without color support or out of range.
    pub fn set_color(&mut self, index: usize, color: Color) -> bool {
        let Some(colors) = self.colors.as_mut() else {
            return false;
        };
        let Some(start) = index.checked_mul(COLOR_STRIDE) else {
            return false;
        };
        match colors.get_mut(start..start + COLOR_STRIDE) {
            Some(dst) => {
                dst.copy_from_slice(&color.to_array());
                self.color_version += 1;
                true
            }
            None => false,
        }
    }

    pub fn color_version(&self) -> u64 {
        self.color_version
    }

    pub fn base_morph(&self) -> &[f32] {
        &self.base_morph
    }

    /// Morph channels driven per instance (0 when not animated).
    pub fn channel_count(&self) -> usize {
        self.morph.as_ref().map_or(0, MorphTexture::width)
    }

    pub fn morph(&self) -> Option<&MorphTexture> {
        self.morph.as_ref()
    }

    pub fn morph_mut(&mut self) -> Option<&mut MorphTexture> {
        self.morph.as_mut()
    }

    /// Recompute the sphere enclosing every drawn instance.
    pub fn compute_bounding_sphere(&mut self) {
        let mut sphere = BoundingSphere::EMPTY;
        for chunk in self.transforms.chunks_exact(TRANSFORM_STRIDE).take(self.draw_count) {
            let m = Mat4::from_cols_slice(chunk);
            sphere = sphere.union(&self.local_bounds.transformed(&m));
        }
        self.bounding_sphere = sphere;
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere
    }

    /// Force culling bounds to `bounds`, or disable frustum culling when none are known.
    pub fn apply_world_bounds(&mut self, bounds: Option<&WorldBounds>) {
        match bounds {
            Some(b) => {
                self.geometry_bounds = Some(*b);
                self.frustum_culled = true;
            }
            None => {
                self.geometry_bounds = None;
                self.frustum_culled = false;
            }
        }
    }

    pub fn geometry_bounds(&self) -> Option<&WorldBounds> {
        self.geometry_bounds.as_ref()
    }

    pub fn frustum_culled(&self) -> bool {
        self.frustum_culled
    }

    /// Hand every GPU resource back to the backend.
    pub fn release(self, backend: &mut dyn SceneBackend) {
        backend.release_geometry(self.geometry);
        backend.release_material(self.material.handle);
        if let Some(morph) = self.morph {
            backend.release_texture(morph.handle);
        }
    }
}
