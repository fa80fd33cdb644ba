// A like-check batch describes one server-side verification program:
// "check these posts for this user, spending at most `budget` listing calls".
//
// The infra layer turns a batch into VKScript. `evaluate` runs the same
// control flow locally against any listing source, so the budget rules can
// be tested without a live platform.

use super::moderation_models::ItemRef;

/// Listing calls allowed in a single program invocation, across all posts.
pub const SUB_REQUEST_BUDGET: u32 = 25;
/// Likers fetched per listing call.
pub const LIKES_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeCheckBatch {
    pub items: Vec<ItemRef>,
    pub user_id: i64,
    pub budget: u32,
    pub page_size: u32,
}

/// What one program invocation resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeCheckOutcome {
    /// Posts whose full liker list was read without finding the user
    pub unliked: Vec<ItemRef>,
    /// Posts the budget didn't reach; a later round resumes them
    pub unchecked: Vec<ItemRef>,
}

/// One page of "who liked this post".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikesPage {
    pub user_ids: Vec<i64>,
    /// Total likers the platform reports for the post
    pub total: u32,
}

/// Source of liker pages, oldest first.
pub trait LikesListing {
    fn page(&self, item: ItemRef, offset: u32, count: u32) -> LikesPage;
}

impl LikeCheckBatch {
    pub fn new(items: Vec<ItemRef>, user_id: i64) -> Self {
        Self {
            items,
            user_id,
            budget: SUB_REQUEST_BUDGET,
            page_size: LIKES_PAGE_SIZE,
        }
    }

    /// Run the program's control flow against `listing`.
    ///
    /// Posts are processed in order. A post the budget never reaches goes to
    /// `unchecked`. A post whose pagination is cut off by the budget lands in
    /// neither list and is dropped for this run.
    pub fn evaluate<L: LikesListing>(&self, listing: &L) -> LikeCheckOutcome {
        let mut outcome = LikeCheckOutcome::default();
        let mut calls = 0u32;

        for &item in &self.items {
            if calls >= self.budget {
                outcome.unchecked.push(item);
                continue;
            }

            let mut page_index = 0u32;
            while calls < self.budget {
                let offset = page_index * self.page_size;
                let page = listing.page(item, offset, self.page_size);
                calls += 1;

                if page.user_ids.contains(&self.user_id) {
                    break;
                }
                if offset as usize + page.user_ids.len() >= page.total as usize {
                    outcome.unliked.push(item);
                    break;
                }
                page_index += 1;
            }
        }

        outcome
    }
}
