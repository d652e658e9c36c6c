//! Completion percentage estimation from set cardinalities.

/// Percentage of `total` scheduled items that are no longer pending, rounded
/// half up. Zero when nothing was scheduled; pending beyond total saturates at
/// zero.
pub fn completion_pct(total: u64, pending: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = u128::from(total.saturating_sub(pending));
    let total = u128::from(total);
    // round(100 * done / total) without floating point
    let pct = (200 * done + total) / (2 * total);
    pct.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_run_is_zero() {
        assert_eq!(completion_pct(0, 0), 0);
        assert_eq!(completion_pct(0, 3), 0);
    }

    #[test]
    fn test_exact_percentages() {
        assert_eq!(completion_pct(5, 4), 20);
        assert_eq!(completion_pct(10, 5), 50);
        assert_eq!(completion_pct(4, 0), 100);
    }

    #[test]
    fn test_rounding() {
        // 1/3 = 33.3, 2/3 = 66.7, 1/8 = 12.5
        assert_eq!(completion_pct(3, 2), 33);
        assert_eq!(completion_pct(3, 1), 67);
        assert_eq!(completion_pct(8, 7), 13);
    }

    #[test]
    fn test_pending_beyond_total_saturates() {
        assert_eq!(completion_pct(2, 5), 0);
    }

    #[test]
    fn test_large_counts() {
        assert_eq!(completion_pct(u64::MAX, 0), 100);
    }
}
