// Like verification - finds which of a user's candidate posts they haven't liked.
//
// Each round sends the current frontier as one like-check program. The
// program reports what it confirmed unliked and what its budget didn't
// reach; the latter becomes the next round's frontier.

use super::like_check::LikeCheckBatch;
use super::moderation_models::ItemRef;
use super::moderation_ports::{LikesScriptExecutor, PlatformError};
use crate::core::throttle::Throttle;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of one verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    /// Confirmed not liked, in confirmation order, without duplicates
    pub not_liked: Vec<ItemRef>,
    /// Program invocations it took
    pub rounds: usize,
}

pub struct LikeVerifier<E: LikesScriptExecutor> {
    executor: Arc<E>,
    throttle: Arc<Throttle>,
}

impl<E: LikesScriptExecutor> LikeVerifier<E> {
    /// `throttle` should be the same one the executor's client uses for its
    /// other calls so the platform sees a single call rate.
    pub fn new(executor: Arc<E>, throttle: Arc<Throttle>) -> Self {
        Self { executor, throttle }
    }

    pub async fn verify(
        &self,
        candidates: &[ItemRef],
        user_id: i64,
    ) -> Result<Verification, PlatformError> {
        let mut seen = HashSet::new();
        let mut unchecked: Vec<ItemRef> = candidates
            .iter()
            .copied()
            .filter(|item| seen.insert(*item))
            .collect();

        let mut confirmed = HashSet::new();
        let mut verification = Verification::default();

        while !unchecked.is_empty() {
            let batch = LikeCheckBatch::new(unchecked, user_id);
            let outcome = self
                .throttle
                .run(|| self.executor.run_like_check(&batch))
                .await?;
            verification.rounds += 1;

            // The first post of a round is always resolved or dropped, so a
            // frontier that doesn't shrink means the program misbehaved.
            if outcome.unchecked.len() >= batch.items.len() {
                return Err(PlatformError::Decode(format!(
                    "like check made no progress on {} posts",
                    batch.items.len()
                )));
            }

            for item in outcome.unliked {
                if confirmed.insert(item) {
                    verification.not_liked.push(item);
                }
            }

            tracing::debug!(
                user_id,
                round = verification.rounds,
                not_liked = verification.not_liked.len(),
                remaining = outcome.unchecked.len(),
                "Like check round finished"
            );

            unchecked = outcome.unchecked;
        }

        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::like_check::tests::FakeListing;
    use crate::core::moderation::like_check::LikeCheckOutcome;
    use crate::core::throttle::{RateLimiter, RetryPolicy};
    use async_trait::async_trait;
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn throttle() -> Arc<Throttle> {
        Arc::new(Throttle::new(
            RateLimiter::per_second(NonZeroU32::new(1000).unwrap()),
            RetryPolicy::new(10, Duration::from_millis(1)),
        ))
    }

    fn post(id: i64) -> ItemRef {
        ItemRef::new(-100, id)
    }

    /// Fails a fixed number of times before delegating to a listing.
    struct FlakyExecutor {
        failures_left: AtomicUsize,
        attempts: AtomicUsize,
        listing: FakeListing,
    }

    #[async_trait]
    impl LikesScriptExecutor for FlakyExecutor {
        async fn run_like_check(
            &self,
            batch: &LikeCheckBatch,
        ) -> Result<LikeCheckOutcome, PlatformError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(PlatformError::Transport("connection reset".to_string()));
            }
            self.listing.run_like_check(batch).await
        }
    }

    /// Always hands the whole batch back as unchecked.
    struct StalledExecutor;

    #[async_trait]
    impl LikesScriptExecutor for StalledExecutor {
        async fn run_like_check(
            &self,
            batch: &LikeCheckBatch,
        ) -> Result<LikeCheckOutcome, PlatformError> {
            Ok(LikeCheckOutcome {
                unliked: Vec::new(),
                unchecked: batch.items.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_make_no_calls() {
        let listing = Arc::new(FakeListing::default());
        let verifier = LikeVerifier::new(Arc::clone(&listing), throttle());

        let result = verifier.verify(&[], 42).await.unwrap();

        assert_eq!(result, Verification::default());
        assert_eq!(listing.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_liked_gives_full_coverage() {
        let listing = Arc::new(
            FakeListing::default()
                .with(post(1), [42])
                .with(post(2), [5, 42]),
        );
        let verifier = LikeVerifier::new(Arc::clone(&listing), throttle());

        let result = verifier.verify(&[post(1), post(2)], 42).await.unwrap();

        assert!(result.not_liked.is_empty());
        assert_eq!(result.rounds, 1);
    }

    #[tokio::test]
    async fn test_continues_across_rounds() {
        // 60 single-page posts: 25 + 25 + 10 listing calls
        let posts: Vec<ItemRef> = (1..=60).map(post).collect();
        let mut listing = FakeListing::default();
        for &p in &posts {
            let likers = if p.item_id % 2 == 0 { vec![42] } else { vec![1] };
            listing = listing.with(p, likers);
        }
        let listing = Arc::new(listing);
        let verifier = LikeVerifier::new(Arc::clone(&listing), throttle());

        let result = verifier.verify(&posts, 42).await.unwrap();

        let expected: Vec<ItemRef> = posts.iter().copied().filter(|p| p.item_id % 2 == 1).collect();
        assert_eq!(result.not_liked, expected);
        assert_eq!(result.rounds, 3);
        assert_eq!(listing.invocations.load(Ordering::SeqCst), 3);
        assert_eq!(listing.calls.load(Ordering::SeqCst), 60);
    }

    #[tokio::test]
    async fn test_duplicate_candidates_are_checked_once() {
        let listing = Arc::new(FakeListing::default().with(post(1), []));
        let verifier = LikeVerifier::new(Arc::clone(&listing), throttle());

        let result = verifier
            .verify(&[post(1), post(1), post(1)], 42)
            .await
            .unwrap();

        assert_eq!(result.not_liked, vec![post(1)]);
        assert_eq!(listing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_post_cut_off_mid_pagination_is_not_reported() {
        // 20 unliked single-page posts, then one with 9500 likers (not the
        // user) needing 10 pages. The budget runs out after its 5th page,
        // so it's dropped for the run.
        let mut posts: Vec<ItemRef> = (1..=20).map(post).collect();
        let mut listing = FakeListing::default();
        for &p in &posts {
            listing = listing.with(p, [1]);
        }
        let popular = post(500);
        listing = listing.with(popular, 1000..=10_499);
        posts.push(popular);
        let after = post(501);
        listing = listing.with(after, []);
        posts.push(after);

        let listing = Arc::new(listing);
        let verifier = LikeVerifier::new(Arc::clone(&listing), throttle());

        let result = verifier.verify(&posts, 42).await.unwrap();

        assert!(!result.not_liked.contains(&popular));
        assert_eq!(result.not_liked.len(), 21);
        assert_eq!(result.not_liked.last(), Some(&after));
        assert_eq!(result.rounds, 2);
        // 25 calls in round one (20 + 5 pages), 1 for `after` in round two
        assert_eq!(listing.calls.load(Ordering::SeqCst), 26);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let executor = Arc::new(FlakyExecutor {
            failures_left: AtomicUsize::new(3),
            attempts: AtomicUsize::new(0),
            listing: FakeListing::default().with(post(1), [7]),
        });
        let verifier = LikeVerifier::new(Arc::clone(&executor), throttle());

        let result = verifier.verify(&[post(1)], 42).await.unwrap();

        assert_eq!(result.not_liked, vec![post(1)]);
        assert_eq!(executor.attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_error() {
        let executor = Arc::new(FlakyExecutor {
            failures_left: AtomicUsize::new(100),
            attempts: AtomicUsize::new(0),
            listing: FakeListing::default(),
        });
        let verifier = LikeVerifier::new(Arc::clone(&executor), throttle());

        let err = verifier.verify(&[post(1)], 42).await.unwrap_err();

        assert_eq!(err, PlatformError::Transport("connection reset".to_string()));
        assert_eq!(executor.attempts.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_stalled_program_is_an_error() {
        let verifier = LikeVerifier::new(Arc::new(StalledExecutor), throttle());

        let err = verifier.verify(&[post(1), post(2)], 42).await.unwrap_err();

        assert!(matches!(err, PlatformError::Decode(_)));
    }
}
