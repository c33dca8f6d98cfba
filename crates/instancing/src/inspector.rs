use crate::group::InstanceGroup;

/// Read-only queries against instance groups for tooling and profiling.
pub struct GroupInspector;

impl GroupInspector {
    /// Produce a summary of a group's state.
    pub fn summary(group: &InstanceGroup) -> GroupSummary {
        GroupSummary {
            name: group.name().to_string(),
            capacity: group.capacity(),
            active_count: group.get_active_count(),
            primitive_count: group.primitives().len(),
            animated_primitives: group.animated_primitive_count(),
            bucket_histogram: group.scheduler().histogram(),
            has_world_bounds: group.world_bounds().is_some(),
        }
    }
}

/// Snapshot of an instance group for the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub name: String,
    pub capacity: usize,
    pub active_count: usize,
    pub primitive_count: usize,
    pub animated_primitives: usize,
    /// Instance slots per animation bucket.
    pub bucket_histogram: Vec<usize>,
    pub has_world_bounds: bool,
}

impl GroupSummary {
    /// Fullest and emptiest bucket sizes.
    pub fn bucket_spread(&self) -> (usize, usize) {
        let max = self.bucket_histogram.iter().copied().max().unwrap_or(0);
        let min = self.bucket_histogram.iter().copied().min().unwrap_or(0);
        (min, max)
    }
}

impl std::fmt::Display for GroupSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (min, max) = self.bucket_spread();
        write!(
            f,
            "Group '{}': active={}/{} primitives={} animated={} buckets={} (min={} max={}) bounds={}",
            self.name,
            self.active_count,
            self.capacity,
            self.primitive_count,
            self.animated_primitives,
            self.bucket_histogram.len(),
            min,
            max,
            if self.has_world_bounds { "set" } else { "none" },
        )
    }
}
