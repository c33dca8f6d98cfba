//! Animation: clip sampling and the bucketed morph scheduler.
//!
//! # Invariants
//! - Bucket assignment is drawn once per instance slot and never changes.
//! - Clip evaluations per throttle tick scale with the bucket count, not the
//!   instance count.
//! - The bucket pose scratch buffer only ever grows.

mod clip;
mod scheduler;

pub use clip::ClipAction;
pub use scheduler::BucketScheduler;

pub fn crate_info() -> &'static str {
    "biomekit-anim v0.1.0"
}
