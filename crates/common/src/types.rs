use std::time::Duration;

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Number of floats per instance transform (one column-major 4x4 matrix).
pub const TRANSFORM_STRIDE: usize = 16;

/// Transform that collapses an instance to a point at the origin.
///
/// Written into slots that should draw nothing.
pub const ZERO_SCALE: Mat4 = Mat4::from_cols(Vec4::ZERO, Vec4::ZERO, Vec4::ZERO, Vec4::W);

/// Linear RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    /// Tint used by build previews when a placement is not allowed.
    pub const PREVIEW_INVALID: Self = Self::new(1.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Bounding sphere. A negative radius marks the empty sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub const EMPTY: Self = Self {
        center: Vec3::ZERO,
        radius: -1.0,
    };

    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    /// Grow the sphere just enough to contain `point`.
    pub fn expand_by_point(&mut self, point: Vec3) {
        if self.is_empty() {
            self.center = point;
            self.radius = 0.0;
            return;
        }
        let offset = point - self.center;
        let length_sq = offset.length_squared();
        if length_sq > self.radius * self.radius {
            let length = length_sq.sqrt();
            let delta = (length - self.radius) * 0.5;
            self.center += offset * (delta / length);
            self.radius += delta;
        }
    }

    /// Smallest sphere (under the incremental scheme) containing both spheres.
    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        let mut out = *self;
        if self.center == other.center {
            out.radius = self.radius.max(other.radius);
            return out;
        }
        let toward = (other.center - self.center).normalize_or_zero() * other.radius;
        out.expand_by_point(other.center + toward);
        out.expand_by_point(other.center - toward);
        out
    }

    /// Apply an affine transform; the radius scales by the largest axis scale.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let max_scale_sq = m
            .x_axis
            .truncate()
            .length_squared()
            .max(m.y_axis.truncate().length_squared())
            .max(m.z_axis.truncate().length_squared());
        Self {
            center: m.transform_point3(self.center),
            radius: self.radius * max_scale_sq.sqrt(),
        }
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Spatial extent an instance group occupies, used for culling and distance checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub aabb: Aabb,
    pub sphere: BoundingSphere,
}

impl WorldBounds {
    pub fn new(aabb: Aabb, sphere: BoundingSphere) -> Self {
        Self { aabb, sphere }
    }

    /// Bounds whose sphere circumscribes the box.
    pub fn from_aabb(aabb: Aabb) -> Self {
        Self {
            aabb,
            sphere: BoundingSphere::new(aabb.center(), aabb.half_extents().length()),
        }
    }
}

/// Clock reading handed to per-frame updates.
///
/// `elapsed` is wall-clock time since the scene started; throttles compare
/// against it, so variable frame rates do not skew update cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    pub elapsed: Duration,
    pub delta: Duration,
}

impl FrameTime {
    pub fn new(elapsed: Duration, delta: Duration) -> Self {
        Self { elapsed, delta }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Advance the clock by one frame of length `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.delta = dt;
    }
}

/// Process-wide graphics quality tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsSetting {
    Low,
    Mid,
    #[default]
    High,
}

impl GraphicsSetting {
    /// The lowest tier suppresses all instance animation.
    pub fn allows_animation(self) -> bool {
        self != Self::Low
    }
}
