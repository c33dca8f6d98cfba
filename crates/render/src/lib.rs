//! Rendering Adapter: the narrow surface the instancing core needs from a
//! rendering engine.
//!
//! # Invariants
//! - Source assets arrive pre-classified (`PartRole`, `has_alpha`); nothing
//!   downstream inspects part names.
//! - An `InstancedPrimitive` owns CPU-side copies of its per-instance arrays
//!   and signals re-upload through version counters.
//! - GPU handles are released only through a `SceneBackend`.
//!
//! # Workaround
//! `RecordingBackend` stands in for a GPU backend: it hands out handles and
//! logs every call so tests and the CLI can observe resource lifecycles.

mod asset;
mod backend;
mod handles;
mod primitive;

pub use asset::{
    AnimationClip, AssetError, MaterialDesc, ModelAsset, ModelPart, MorphTrack, PartRole,
};
pub use backend::{BackendEvent, RecordingBackend, SceneBackend};
pub use handles::{GeometryHandle, MaterialHandle, NodeId, TextureHandle};
pub use primitive::{ALPHA_TEST_THRESHOLD, InstancedPrimitive, MorphTexture, PrimitiveOptions};

pub fn crate_info() -> &'static str {
    "biomekit-render v0.1.0"
}
