//! Visibility: decides whether an instance group animates this frame.
//!
//! # Invariants
//! - No context means animate.
//! - A visibility manager, when present and the group has bounds, is the only
//!   collaborator consulted; the frustum and distance fallbacks never run.
//! - Frustum and distance fallbacks apply in that order and either may reject.
//! - [`FrameVisibility`] answers are stable within a frame; `begin_frame` is
//!   the only thing that invalidates them.

mod context;
mod frustum;
mod manager;

pub use context::{AnimationVisibilityContext, FrustumManager, VisibilityManager, should_animate};
pub use frustum::{Frustum, Plane};
pub use manager::{CacheStats, FrameVisibility};

pub fn crate_info() -> &'static str {
    "biomekit-visibility v0.1.0"
}
