//! A small synthetic creature asset for tooling, benches and tests.

use biomekit_common::{BoundingSphere, Color};
use biomekit_render::{
    AnimationClip, GeometryHandle, MaterialDesc, MaterialHandle, ModelAsset, ModelPart,
    MorphTrack, PartRole,
};
use glam::Vec3;

/// Keyframes in the synthetic idle clip.
const KEYFRAMES: usize = 9;

/// A three-part model: a morph-animated body with per-instance color, its
/// outline, and a land base. `channels` sets the body's morph channel count.
pub fn creature(channels: usize) -> ModelAsset {
    let mut body = ModelPart::new(
        "body",
        GeometryHandle(1),
        MaterialDesc::new(MaterialHandle(1), "body_mat"),
        BoundingSphere::new(Vec3::new(0.0, 0.5, 0.0), 0.75),
    );
    body.base_morph = vec![0.0; channels];
    body.supports_color = true;

    let mut outline = ModelPart::new(
        "body_outline",
        GeometryHandle(2),
        MaterialDesc::new(MaterialHandle(2), "outline_mat"),
        BoundingSphere::new(Vec3::new(0.0, 0.5, 0.0), 0.8),
    );
    outline.role = PartRole::Outline;

    let mut land_mat = MaterialDesc::new(MaterialHandle(3), "land_mat");
    land_mat.color = Color::new(0.35, 0.55, 0.25);
    let mut land = ModelPart::new(
        "land",
        GeometryHandle(3),
        land_mat,
        BoundingSphere::new(Vec3::ZERO, 1.0),
    );
    land.role = PartRole::Land;

    let mut asset = ModelAsset::new("creature", vec![body, outline, land]);
    if channels > 0 {
        asset.clips.push(idle_clip("body", channels, 2.0));
    }
    asset
}

/// A looping clip where channel `c` follows a sine phase-shifted by `c`.
pub fn idle_clip(part: &str, channels: usize, duration: f32) -> AnimationClip {
    let times: Vec<f32> = (0..KEYFRAMES)
        .map(|k| duration * k as f32 / (KEYFRAMES - 1) as f32)
        .collect();
    let mut values = Vec::with_capacity(KEYFRAMES * channels);
    for &t in &times {
        for c in 0..channels {
            let phase = std::f32::consts::TAU * t / duration + c as f32;
            values.push(0.5 + 0.5 * phase.sin());
        }
    }
    AnimationClip {
        name: "idle".into(),
        duration,
        tracks: vec![MorphTrack {
            part: part.into(),
            channels,
            times,
            values,
        }],
    }
}
