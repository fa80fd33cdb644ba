// The 80% rule: a member may share a new post only if they liked
// at least that share of the posts shared since they joined.

use super::moderation_models::{CoverageVerdict, ItemRef};

pub const DEFAULT_REQUIRED_PERCENT: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoveragePolicy {
    required_percent: u8,
}

impl CoveragePolicy {
    /// `required_percent` is clamped to `0..=100`.
    pub fn new(required_percent: u8) -> Self {
        Self {
            required_percent: required_percent.min(100),
        }
    }

    /// Decide whether a sender with `total` posts in their window, of which
    /// `not_liked` were not liked, may post again.
    ///
    /// Integer math keeps the boundary exact: allow iff
    /// `liked * 100 >= total * required_percent`.
    pub fn decide(&self, total: usize, not_liked: &[ItemRef]) -> CoverageVerdict {
        if total == 0 || not_liked.is_empty() {
            return CoverageVerdict::allow();
        }

        let liked = total.saturating_sub(not_liked.len()) as u64;
        if liked * 100 >= total as u64 * u64::from(self.required_percent) {
            CoverageVerdict::allow()
        } else {
            CoverageVerdict::deny(not_liked.to_vec())
        }
    }
}

impl Default for CoveragePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_PERCENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: i64) -> Vec<ItemRef> {
        (1..=n).map(|i| ItemRef::new(-1, i)).collect()
    }

    #[test]
    fn test_empty_history_allows() {
        let verdict = CoveragePolicy::default().decide(0, &[]);
        assert!(verdict.allow);
        assert!(verdict.owed_items.is_empty());
    }

    #[test]
    fn test_exactly_eighty_percent_allows() {
        let verdict = CoveragePolicy::default().decide(10, &items(2));
        assert!(verdict.allow);
        assert!(verdict.owed_items.is_empty());
    }

    #[test]
    fn test_below_eighty_percent_denies_with_owed_items() {
        let owed = items(3);
        let verdict = CoveragePolicy::default().decide(10, &owed);
        assert!(!verdict.allow);
        assert_eq!(verdict.owed_items, owed);
    }

    #[test]
    fn test_single_post_history() {
        let policy = CoveragePolicy::default();
        assert!(policy.decide(1, &[]).allow);
        assert!(!policy.decide(1, &items(1)).allow);
    }

    #[test]
    fn test_small_history_rounds_up() {
        let policy = CoveragePolicy::default();
        // ceil(3 * 0.8) = 3, so a single miss is already too many
        assert!(!policy.decide(3, &items(1)).allow);
        // ceil(5 * 0.8) = 4
        assert!(policy.decide(5, &items(1)).allow);
        assert!(!policy.decide(5, &items(2)).allow);
    }

    #[test]
    fn test_owed_items_keep_order() {
        let owed = vec![ItemRef::new(-1, 9), ItemRef::new(-1, 3), ItemRef::new(-2, 5)];
        let verdict = CoveragePolicy::default().decide(4, &owed);
        assert_eq!(verdict.owed_items, owed);
    }

    #[test]
    fn test_custom_threshold() {
        let lenient = CoveragePolicy::new(50);
        assert!(lenient.decide(4, &items(2)).allow);
        assert!(!lenient.decide(4, &items(3)).allow);

        let strict = CoveragePolicy::new(250);
        assert!(!strict.decide(10, &items(1)).allow);
    }
}
