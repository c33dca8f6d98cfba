//! Typed multi-part model assets, as produced by the asset pipeline.

use std::collections::HashSet;
use std::path::Path;

use biomekit_common::{BoundingSphere, Color};
use serde::{Deserialize, Serialize};

use crate::handles::{GeometryHandle, MaterialHandle};

/// Errors from validating or loading a model asset.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate part name {0:?}")]
    DuplicatePart(String),
    #[error("track for part {part:?} has {actual} values, expected {expected}")]
    TrackLength {
        part: String,
        expected: usize,
        actual: usize,
    },
    #[error("track for part {0:?} has keyframe times out of order")]
    UnsortedKeyframes(String),
    #[error("track for part {part:?} drives {track} channels but the part has {part_channels}")]
    ChannelMismatch {
        part: String,
        track: usize,
        part_channels: usize,
    },
}

/// Rendering role of a model part, decided by the asset pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartRole {
    #[default]
    Normal,
    /// Silhouette overlay drawn after opaque parts.
    Outline,
    Water,
    /// Ground surface; receives shadows.
    Land,
    /// Buildings and large details; cast shadows.
    Structure,
}

impl PartRole {
    /// Pipeline-side classification from node names.
    ///
    /// A part inherits a role from its parent node when its own name carries none.
    pub fn classify(name: &str, parent: Option<&str>) -> Self {
        let lookup = |s: &str| {
            let s = s.to_ascii_lowercase();
            if s.contains("outline") {
                Some(Self::Outline)
            } else if s.contains("water") || s.contains("ocean") {
                Some(Self::Water)
            } else if s.contains("big_details") || s.contains("building") {
                Some(Self::Structure)
            } else if s.contains("land") {
                Some(Self::Land)
            } else {
                None
            }
        };
        lookup(name)
            .or_else(|| parent.and_then(lookup))
            .unwrap_or_default()
    }
}

/// Material properties the instancing core reads or adjusts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub handle: MaterialHandle,
    pub name: String,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default = "default_true")]
    pub depth_write: bool,
    #[serde(default)]
    pub alpha_test: f32,
    #[serde(default)]
    pub emissive_intensity: f32,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

impl MaterialDesc {
    pub fn new(handle: MaterialHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            transparent: false,
            depth_write: true,
            alpha_test: 0.0,
            emissive_intensity: 0.0,
            color: Color::WHITE,
            opacity: 1.0,
        }
    }
}

/// One drawable part of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPart {
    pub name: String,
    #[serde(default)]
    pub role: PartRole,
    /// Material is not fully opaque (cutouts, foliage).
    #[serde(default)]
    pub has_alpha: bool,
    pub geometry: GeometryHandle,
    pub material: MaterialDesc,
    /// Bounding sphere of the geometry in model space.
    pub local_bounds: BoundingSphere,
    /// Rest-pose morph influences; its length is the part's channel count.
    #[serde(default)]
    pub base_morph: Vec<f32>,
    /// The part carries a per-instance color array.
    #[serde(default)]
    pub supports_color: bool,
    /// Upper bound on instance slots for this part, below the group capacity.
    #[serde(default)]
    pub instance_limit: Option<usize>,
}

impl ModelPart {
    pub fn new(
        name: impl Into<String>,
        geometry: GeometryHandle,
        material: MaterialDesc,
        local_bounds: BoundingSphere,
    ) -> Self {
        Self {
            name: name.into(),
            role: PartRole::Normal,
            has_alpha: false,
            geometry,
            material,
            local_bounds,
            base_morph: Vec::new(),
            supports_color: false,
            instance_limit: None,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.base_morph.len()
    }
}

/// Keyframed morph weights for one part. `values` is row-major by keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphTrack {
    pub part: String,
    pub channels: usize,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

/// A looping animation clip made of morph tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    /// Loop length in seconds.
    pub duration: f32,
    pub tracks: Vec<MorphTrack>,
}

impl AnimationClip {
    /// Index of the track that drives `part`, if any.
    pub fn track_for(&self, part: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.part == part)
    }
}

/// A multi-part model with optional animation clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAsset {
    pub name: String,
    pub parts: Vec<ModelPart>,
    #[serde(default)]
    pub clips: Vec<AnimationClip>,
    /// Emissive intensities above 1.0 are replaced by this value.
    #[serde(default)]
    pub emissive_cap: Option<f32>,
}

impl ModelAsset {
    pub fn new(name: impl Into<String>, parts: Vec<ModelPart>) -> Self {
        Self {
            name: name.into(),
            parts,
            clips: Vec::new(),
            emissive_cap: None,
        }
    }

    /// The clip instance groups animate with (the first one).
    pub fn primary_clip(&self) -> Option<&AnimationClip> {
        self.clips.first()
    }

    /// Check part names and track shapes.
    pub fn validate(&self) -> Result<(), AssetError> {
        let mut seen = HashSet::new();
        for part in &self.parts {
            if !seen.insert(part.name.as_str()) {
                return Err(AssetError::DuplicatePart(part.name.clone()));
            }
        }

        for clip in &self.clips {
            for track in &clip.tracks {
                let expected = track.times.len() * track.channels;
                if track.values.len() != expected {
                    return Err(AssetError::TrackLength {
                        part: track.part.clone(),
                        expected,
                        actual: track.values.len(),
                    });
                }
                if track.times.windows(2).any(|w| w[0] > w[1]) {
                    return Err(AssetError::UnsortedKeyframes(track.part.clone()));
                }
                if let Some(part) = self.parts.iter().find(|p| p.name == track.part) {
                    if part.channel_count() != track.channels {
                        return Err(AssetError::ChannelMismatch {
                            part: part.name.clone(),
                            track: track.channels,
                            part_channels: part.channel_count(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Load and validate an asset description from JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path)?;
        let asset: Self = serde_json::from_reader(file)?;
        asset.validate()?;
        Ok(asset)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
