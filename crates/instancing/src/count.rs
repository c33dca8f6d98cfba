/// Clamp a requested instance count to `[0, min(limits)]`.
///
/// Every size that bounds a copy (each primitive's slot count, the source
/// buffer's capacity) goes in `limits`, so one value governs every copy and
/// every draw count in the same call. No limits means no upper bound.
pub fn resolve_effective_count(requested: i64, limits: &[usize]) -> usize {
    let ceiling = limits.iter().copied().min().unwrap_or(usize::MAX);
    usize::try_from(requested.max(0))
        .unwrap_or(usize::MAX)
        .min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_clamps_to_zero() {
        assert_eq!(resolve_effective_count(-5, &[10]), 0);
        assert_eq!(resolve_effective_count(i64::MIN, &[10]), 0);
    }

    #[test]
    fn above_capacity_clamps_to_capacity() {
        assert_eq!(resolve_effective_count(110, &[10]), 10);
    }

    #[test]
    fn smallest_limit_wins() {
        assert_eq!(resolve_effective_count(300, &[512, 256, 384]), 256);
        assert_eq!(resolve_effective_count(100, &[512, 256, 384]), 100);
    }

    #[test]
    fn zero_limit_forces_zero() {
        assert_eq!(resolve_effective_count(7, &[10, 0]), 0);
    }

    #[test]
    fn no_limits_is_unbounded() {
        assert_eq!(resolve_effective_count(42, &[]), 42);
    }
}
