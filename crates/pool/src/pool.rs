use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use biomekit_common::{PoolConfig, TRANSFORM_STRIDE};
use glam::Mat4;

/// Ids are process-unique so a buffer released into the wrong pool is never
/// mistaken for one of its own.
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a pooled buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A contiguous block of `capacity * 16` floats checked out of a [`TransformPool`].
///
/// Contents are not cleared between uses; only the prefix the caller wrote is meaningful.
#[derive(Debug, Clone)]
pub struct PooledTransforms {
    id: BufferId,
    capacity: usize,
    data: Vec<f32>,
}

impl PooledTransforms {
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Number of instance transforms the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Read back one instance transform.
    pub fn transform(&self, index: usize) -> Option<Mat4> {
        let start = index.checked_mul(TRANSFORM_STRIDE)?;
        self.data
            .get(start..start + TRANSFORM_STRIDE)
            .map(Mat4::from_cols_slice)
    }
}

/// Pool counters for performance reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub available: usize,
    pub in_use: usize,
    /// Buffers allocated since construction or the last `clear()`.
    pub total_allocated: usize,
    /// Bytes held by available and in-use buffers.
    pub memory_bytes: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool: available={} in_use={} allocated={} memory={:.2}MB",
            self.available,
            self.in_use,
            self.total_allocated,
            self.memory_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}

/// Size-tiered pool of transform buffers.
///
/// Single-threaded: wrap in a mutex before sharing across threads.
#[derive(Debug, Default)]
pub struct TransformPool {
    config: PoolConfig,
    /// Released buffers in release order; searched first-fit.
    available: Vec<PooledTransforms>,
    /// Checked-out buffer ids and their capacities.
    in_use: HashMap<BufferId, usize>,
    total_allocated: usize,
}

impl TransformPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Capacity tier a request for `required_instances` resolves to when
    /// nothing in the free list fits.
    pub fn tier_for(&self, required_instances: usize) -> usize {
        let floor = self.config.default_capacity;
        let required = required_instances.max(floor);
        let step = self.config.growth_step.max(1);
        floor + (required - floor).div_ceil(step) * step
    }

    /// Check out a buffer holding at least `required_instances` transforms.
    ///
    /// Reuses the first released buffer that is large enough; allocates a new
    /// tiered buffer otherwise.
    pub fn acquire(&mut self, required_instances: usize) -> PooledTransforms {
        let required = required_instances.max(self.config.default_capacity);

        let buffer = match self.available.iter().position(|b| b.capacity >= required) {
            Some(pos) => {
                let buffer = self.available.remove(pos);
                tracing::trace!(
                    id = buffer.id.0,
                    capacity = buffer.capacity,
                    required,
                    "reusing pooled transforms"
                );
                buffer
            }
            None => {
                let capacity = self.tier_for(required);
                let id = BufferId::next();
                self.total_allocated += 1;
                tracing::debug!(id = id.0, capacity, required, "allocating pooled transforms");
                PooledTransforms {
                    id,
                    capacity,
                    data: vec![0.0; capacity * TRANSFORM_STRIDE],
                }
            }
        };

        self.in_use.insert(buffer.id, buffer.capacity);
        buffer
    }

    /// Return a buffer to the free list. No-op unless it is currently in use.
    pub fn release(&mut self, buffer: PooledTransforms) {
        if self.in_use.remove(&buffer.id).is_none() {
            tracing::trace!(id = buffer.id.0, "ignoring release of untracked buffer");
            return;
        }
        self.available.push(buffer);
    }

    /// Whether the buffer with this id is currently checked out.
    pub fn is_in_use(&self, id: BufferId) -> bool {
        self.in_use.contains_key(&id)
    }

    /// Drop the free list and forget every in-use buffer.
    ///
    /// Buffers still held by callers become untracked; releasing them later is a no-op.
    pub fn clear(&mut self) {
        self.available.clear();
        self.in_use.clear();
        self.total_allocated = 0;
    }

    pub fn stats(&self) -> PoolStats {
        let held: usize = self.available.iter().map(|b| b.capacity).sum::<usize>()
            + self.in_use.values().sum::<usize>();
        PoolStats {
            available: self.available.len(),
            in_use: self.in_use.len(),
            total_allocated: self.total_allocated,
            memory_bytes: held * TRANSFORM_STRIDE * std::mem::size_of::<f32>(),
        }
    }
}
