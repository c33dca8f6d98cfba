//! Transform Buffer Pool: recycles large per-instance transform arrays.
//!
//! # Invariants
//! - A buffer is either available (in the free list) or in use, never both.
//! - Capacities come from fixed tiers (`default_capacity + k * growth_step`)
//!   and never change after allocation.
//! - Releasing a buffer the pool does not track as in use is a no-op.
//!
//! The pool is an explicit value owned by the scene, not a process global;
//! callers thread `&mut TransformPool` to whoever snapshots transforms.

mod pool;

pub use pool::{BufferId, PoolStats, PooledTransforms, TransformPool};

pub fn crate_info() -> &'static str {
    "biomekit-pool v0.1.0"
}
