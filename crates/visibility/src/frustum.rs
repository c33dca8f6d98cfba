//! View frustum planes extracted from a view-projection matrix.

use biomekit_common::Aabb;
use glam::{Mat4, Vec3, Vec4};

/// A plane `normal . p + d = 0`; points with a positive distance are inside.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    /// Plane from raw `(a, b, c, d)` coefficients, normalised so distances are in world units.
    pub fn from_coefficients(v: Vec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len > 0.0 {
            Self {
                normal: normal / len,
                d: v.w / len,
            }
        } else {
            Self { normal, d: v.w }
        }
    }

    #[inline]
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

/// Six clip planes: left, right, bottom, top, near, far.
///
/// The default frustum has degenerate planes and accepts everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    pub const BOTTOM: usize = 2;
    pub const TOP: usize = 3;
    pub const NEAR: usize = 4;
    pub const FAR: usize = 5;

    /// Extract planes from a view-projection matrix with a `[0, 1]` depth range
    /// (what `Mat4::perspective_rh` produces).
    pub fn from_view_projection(m: &Mat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        let mut planes = [Plane::default(); 6];
        planes[Self::LEFT] = Plane::from_coefficients(r3 + r0);
        planes[Self::RIGHT] = Plane::from_coefficients(r3 - r0);
        planes[Self::BOTTOM] = Plane::from_coefficients(r3 + r1);
        planes[Self::TOP] = Plane::from_coefficients(r3 - r1);
        planes[Self::NEAR] = Plane::from_coefficients(r2);
        planes[Self::FAR] = Plane::from_coefficients(r3 - r2);
        Self { planes }
    }

    /// Conservative box test: false only when the box is wholly outside one plane.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let n = plane.normal;
            let positive = Vec3::new(
                if n.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if n.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if n.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.distance_to_point(positive) >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Frustum {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        Frustum::from_view_projection(&(proj * view))
    }

    fn cube(center: Vec3) -> Aabb {
        Aabb::new(center - Vec3::ONE, center + Vec3::ONE)
    }

    #[test]
    fn box_in_front_is_visible() {
        assert!(camera().intersects_aabb(&cube(Vec3::ZERO)));
    }

    #[test]
    fn box_behind_camera_is_hidden() {
        assert!(!camera().intersects_aabb(&cube(Vec3::new(0.0, 0.0, 20.0))));
    }

    #[test]
    fn box_past_far_plane_is_hidden() {
        assert!(!camera().intersects_aabb(&cube(Vec3::new(0.0, 0.0, -200.0))));
    }

    #[test]
    fn box_off_to_the_side_is_hidden() {
        assert!(!camera().intersects_aabb(&cube(Vec3::new(100.0, 0.0, 0.0))));
    }

    #[test]
    fn straddling_box_is_visible() {
        let wide = Aabb::new(Vec3::new(-500.0, -1.0, -1.0), Vec3::new(500.0, 1.0, 1.0));
        assert!(camera().intersects_aabb(&wide));
    }

    #[test]
    fn default_frustum_accepts_everything() {
        let f = Frustum::default();
        assert!(f.intersects_aabb(&cube(Vec3::splat(1.0e6))));
        assert!(f.intersects_aabb(&cube(Vec3::splat(-1.0e6))));
    }

    #[test]
    fn planes_are_normalised() {
        for plane in camera().planes {
            assert!((plane.normal.length() - 1.0).abs() < 1e-4);
        }
    }
}
