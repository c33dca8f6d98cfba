//! Shared types and configuration for the instanced biome renderer.
//!
//! # Invariants
//! - Per-instance transforms are column-major 4x4 matrices, 16 floats each.
//! - Bounds types are plain values; copying them never aliases caller state.

pub mod config;
pub mod types;

pub use config::{
    AnimationConfig, ConfigError, PoolConfig, SceneConfig, VisibilityConfig,
};
pub use types::{
    Aabb, BoundingSphere, Color, FrameTime, GraphicsSetting, TRANSFORM_STRIDE, WorldBounds,
    ZERO_SCALE,
};

pub fn crate_info() -> &'static str {
    "biomekit-common v0.1.0"
}
