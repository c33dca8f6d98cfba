//! Instancing: N copies of a multi-part model as one addressable group.
//!
//! # Invariants
//! - Every primitive in a group draws the same number of instances, and slot
//!   `i` means the same logical object in each of them.
//! - The active count is always within `[0, capacity]`.
//! - Bucket assignment is fixed at construction.
//! - Out-of-range slot writes are dropped, never redirected to another slot.
//! - A disposed group cannot be used: `dispose` consumes it.

mod count;
mod group;
mod inspector;
pub mod sample;

pub use count::resolve_effective_count;
pub use group::{AnimationOutcome, GroupError, GroupOptions, InstanceGroup};
pub use inspector::{GroupInspector, GroupSummary};

pub fn crate_info() -> &'static str {
    "biomekit-instancing v0.1.0"
}
