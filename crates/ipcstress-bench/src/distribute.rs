//! Even distribution of a batch across proxy targets.

/// Split `total` across `parts` targets as evenly as possible: each
/// target gets `total / parts`, and the remainder is spread one apiece
/// across the lowest-indexed targets.
pub fn split_evenly(total: u64, parts: usize) -> Vec<u64> {
    let parts = parts.max(1);
    let base = total / parts as u64;
    let extra = total % parts as u64;
    (0..parts)
        .map(|i| base + u64::from((i as u64) < extra))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remainder_goes_to_lowest_indices() {
        assert_eq!(split_evenly(10, 3), vec![4, 3, 3]);
        assert_eq!(split_evenly(11, 3), vec![4, 4, 3]);
        assert_eq!(split_evenly(12, 3), vec![4, 4, 4]);
    }

    #[test]
    fn test_sum_is_preserved_and_spread_is_tight() {
        for total in [0u64, 1, 7, 10, 999, 1000] {
            for parts in 1..=8usize {
                let split = split_evenly(total, parts);
                assert_eq!(split.len(), parts);
                assert_eq!(split.iter().sum::<u64>(), total);
                let max = *split.iter().max().unwrap();
                let min = *split.iter().min().unwrap();
                assert!(max - min <= 1, "uneven split {split:?}");
            }
        }
    }

    #[test]
    fn test_fewer_requests_than_targets() {
        // Trailing targets get zero and are later skipped entirely.
        assert_eq!(split_evenly(2, 5), vec![1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_single_target_degenerates_to_identity() {
        assert_eq!(split_evenly(110, 1), vec![110]);
    }
}
