use std::time::Duration;

use biomekit_common::AnimationConfig;
use biomekit_render::MorphTexture;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Spreads instances across phase buckets and evaluates one pose per bucket.
///
/// Each instance slot is assigned a bucket once, at construction, and keeps it
/// for the scheduler's lifetime. A tick samples the clip once per bucket into a
/// shared scratch buffer and copies each bucket's pose to its members' rows.
#[derive(Debug, Clone)]
pub struct BucketScheduler {
    bucket_count: usize,
    phase_window: f64,
    interval: Duration,
    assignment: Vec<u8>,
    /// Slot indices per bucket, ascending.
    members: Vec<Vec<u32>>,
    /// `bucket_count * channels` floats; grows, never shrinks.
    scratch: Vec<f32>,
    last_update: Option<Duration>,
}

impl BucketScheduler {
    /// Assign `capacity` slots using `rng`.
    pub fn new<R: Rng>(capacity: usize, config: &AnimationConfig, rng: &mut R) -> Self {
        let bucket_count = config.bucket_count.clamp(1, usize::from(u8::MAX) + 1);
        let assignment: Vec<u8> = (0..capacity)
            .map(|_| rng.gen_range(0..bucket_count) as u8)
            .collect();

        let mut members = vec![Vec::new(); bucket_count];
        for (slot, &b) in assignment.iter().enumerate() {
            members[usize::from(b)].push(slot as u32);
        }

        tracing::debug!(capacity, bucket_count, "assigned animation buckets");

        Self {
            bucket_count,
            phase_window: f64::from(config.phase_window_secs),
            interval: config.update_interval(),
            assignment,
            members,
            scratch: Vec::new(),
            last_update: None,
        }
    }

    /// Assign from a ChaCha8 stream; `None` seeds from OS entropy.
    pub fn with_seed(capacity: usize, config: &AnimationConfig, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::new(capacity, config, &mut rng)
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn capacity(&self) -> usize {
        self.assignment.len()
    }

    pub fn bucket_of(&self, slot: usize) -> Option<usize> {
        self.assignment.get(slot).map(|&b| usize::from(b))
    }

    pub fn assignments(&self) -> &[u8] {
        &self.assignment
    }

    /// Slots assigned to `bucket`, ascending.
    pub fn members(&self, bucket: usize) -> &[u32] {
        self.members.get(bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Member count per bucket.
    pub fn histogram(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }

    /// Whether at least one update interval has passed since the last recomputation.
    pub fn is_due(&self, now: Duration) -> bool {
        match self.last_update {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval,
        }
    }

    pub fn mark_updated(&mut self, now: Duration) {
        self.last_update = Some(now);
    }

    pub fn last_update(&self) -> Option<Duration> {
        self.last_update
    }

    /// Clip time for `bucket`: buckets are spaced evenly across the phase window.
    pub fn bucket_time(&self, bucket: usize, now_secs: f64) -> f64 {
        now_secs + bucket as f64 * (self.phase_window / self.bucket_count as f64)
    }

    /// Fill the scratch buffer with one pose per bucket.
    ///
    /// `sample` receives the bucket's clip time and a `channels`-wide slice to write.
    pub fn compute_poses<F>(&mut self, now_secs: f64, channels: usize, mut sample: F)
    where
        F: FnMut(f64, &mut [f32]),
    {
        let required = self.bucket_count * channels;
        if self.scratch.len() < required {
            tracing::trace!(from = self.scratch.len(), to = required, "growing pose scratch");
            self.scratch.resize(required, 0.0);
        }
        if channels == 0 {
            return;
        }
        for b in 0..self.bucket_count {
            let t = self.bucket_time(b, now_secs);
            sample(t, &mut self.scratch[b * channels..(b + 1) * channels]);
        }
    }

    /// Pose last computed for `bucket`.
    pub fn pose(&self, bucket: usize, channels: usize) -> Option<&[f32]> {
        let start = bucket.checked_mul(channels)?;
        if bucket >= self.bucket_count {
            return None;
        }
        self.scratch.get(start..start + channels)
    }

    /// Copy each bucket's pose into the rows of its members below `active_count`.
    ///
    /// Returns the number of rows written.
    pub fn fan_out(&self, channels: usize, active_count: usize, texture: &mut MorphTexture) -> usize {
        if channels == 0 || self.scratch.len() < self.bucket_count * channels {
            return 0;
        }
        let mut written = 0;
        for (b, slots) in self.members.iter().enumerate() {
            let pose = &self.scratch[b * channels..(b + 1) * channels];
            for &slot in slots {
                let slot = slot as usize;
                if slot >= active_count {
                    break;
                }
                if texture.write_row(slot, pose) {
                    written += 1;
                }
            }
        }
        written
    }

    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }
}
