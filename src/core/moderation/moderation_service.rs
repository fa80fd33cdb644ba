// Link moderation service - core business logic for the like-for-like rule.
//
// For every chat message with a wall link this service:
// - checks the post exists
// - skips the rule for conversation admins
// - verifies the sender liked enough of the posts shared since they joined
// - deletes the message and names the owed posts, or records the new post
//
// NO VK dependencies here - everything goes through the ports.

use super::coverage_policy::CoveragePolicy;
use super::like_verifier::LikeVerifier;
use super::moderation_models::{IncomingMessage, ItemRef, LinkError, ModerationOutcome};
use super::moderation_ports::{
    ChatClient, LikesScriptExecutor, PlatformError, PostStore, StoreError, WallClient,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Failures of a moderation flow. The display text is sent back to the sender.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("failed to fetch post {item}: {source}")]
    PostLookup { item: ItemRef, source: PlatformError },

    #[error("failed to get conversation info: {0}")]
    Membership(PlatformError),

    #[error("failed to get last posts: {0}")]
    History(StoreError),

    #[error("failed to get posts statistics: {0}")]
    Verification(PlatformError),

    #[error("failed to delete message: {0}")]
    Delete(PlatformError),

    #[error("failed to get nickname for user {user_id}: {source}")]
    Handle { user_id: i64, source: PlatformError },

    #[error("failed to send message: {0}")]
    Notify(PlatformError),

    #[error("failed to create post {item}: {source}")]
    Record { item: ItemRef, source: StoreError },
}

// ============================================================================
// CORE SERVICE
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ModerationSettings {
    /// How far back shared posts count toward the rule
    pub history_window: Duration,
    pub coverage: CoveragePolicy,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            history_window: Duration::days(7),
            coverage: CoveragePolicy::default(),
        }
    }
}

pub struct ModerationService<W, C, S>
where
    W: WallClient + LikesScriptExecutor,
    C: ChatClient,
    S: PostStore,
{
    wall: Arc<W>,
    verifier: LikeVerifier<W>,
    chat: C,
    posts: S,
    settings: ModerationSettings,
}

impl<W, C, S> ModerationService<W, C, S>
where
    W: WallClient + LikesScriptExecutor,
    C: ChatClient,
    S: PostStore,
{
    pub fn new(
        wall: Arc<W>,
        verifier: LikeVerifier<W>,
        chat: C,
        posts: S,
        settings: ModerationSettings,
    ) -> Self {
        Self {
            wall,
            verifier,
            chat,
            posts,
            settings,
        }
    }

    /// Moderate one message, replying with the error text if the flow fails.
    ///
    /// The message is never deleted on failure.
    pub async fn process_message(
        &self,
        msg: &IncomingMessage,
    ) -> Result<ModerationOutcome, ModerationError> {
        let result = self.moderate(msg).await;

        match &result {
            Ok(ModerationOutcome::Rejected { item, owed }) => {
                tracing::info!(
                    peer_id = msg.peer_id,
                    from_id = msg.from_id,
                    post = %item,
                    owed = owed.len(),
                    "Rejected post link"
                );
            }
            Ok(ModerationOutcome::Recorded { item, by_admin }) => {
                tracing::info!(
                    peer_id = msg.peer_id,
                    from_id = msg.from_id,
                    post = %item,
                    by_admin,
                    "Recorded post link"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    peer_id = msg.peer_id,
                    from_id = msg.from_id,
                    "Moderation failed: {}",
                    err
                );
                if let Err(reply_err) = self
                    .chat
                    .reply_to(&err.to_string(), msg.conversation_message_id, msg.peer_id)
                    .await
                {
                    tracing::error!("Failed to send error reply: {}", reply_err);
                }
            }
        }

        result
    }

    async fn moderate(&self, msg: &IncomingMessage) -> Result<ModerationOutcome, ModerationError> {
        let Some(item) = ItemRef::extract(&msg.text)? else {
            return Ok(ModerationOutcome::NotALink);
        };

        match self.wall.item_exists(item).await {
            Ok(true) => {}
            Ok(false) | Err(PlatformError::NotFound(_)) => {
                return Ok(ModerationOutcome::UnknownPost(item));
            }
            Err(source) => return Err(ModerationError::PostLookup { item, source }),
        }

        let member = self
            .chat
            .membership_info(msg.peer_id, msg.from_id)
            .await
            .map_err(ModerationError::Membership)?
            .unwrap_or_default();

        if !member.is_admin {
            // A window reaching past the representable range covers everything
            let window_start = Utc::now()
                .checked_sub_signed(self.settings.history_window)
                .unwrap_or(DateTime::UNIX_EPOCH);
            let since = window_start.max(member.joined_at);

            let history = self
                .posts
                .recent_items(msg.peer_id, since)
                .await
                .map_err(ModerationError::History)?;

            let verification = self
                .verifier
                .verify(&history, msg.from_id)
                .await
                .map_err(ModerationError::Verification)?;

            tracing::debug!(
                from_id = msg.from_id,
                history = history.len(),
                not_liked = verification.not_liked.len(),
                rounds = verification.rounds,
                "Like verification finished"
            );

            let verdict = self
                .settings
                .coverage
                .decide(history.len(), &verification.not_liked);

            if !verdict.allow {
                self.reject(msg, &verdict.owed_items).await?;
                return Ok(ModerationOutcome::Rejected {
                    item,
                    owed: verdict.owed_items,
                });
            }
        }

        self.posts
            .record_item(item, msg.peer_id)
            .await
            .map_err(|source| ModerationError::Record { item, source })?;

        Ok(ModerationOutcome::Recorded {
            item,
            by_admin: member.is_admin,
        })
    }

    /// Delete the message and tell the sender which posts they owe a like.
    async fn reject(&self, msg: &IncomingMessage, owed: &[ItemRef]) -> Result<(), ModerationError> {
        self.chat
            .delete_message(msg.conversation_message_id, msg.peer_id)
            .await
            .map_err(ModerationError::Delete)?;

        let handle = match self.wall.resolve_handle(msg.from_id).await {
            Ok(handle) => handle,
            Err(PlatformError::NotFound(_)) => format!("id{}", msg.from_id),
            Err(source) => {
                return Err(ModerationError::Handle {
                    user_id: msg.from_id,
                    source,
                })
            }
        };

        self.chat
            .send_message(&rejection_notice(&handle, owed), msg.peer_id)
            .await
            .map_err(ModerationError::Notify)
    }
}

fn rejection_notice(handle: &str, owed: &[ItemRef]) -> String {
    let links = owed
        .iter()
        .map(ItemRef::link)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Ссылка на пост удалена, так как @{} не лайкает чужие посты.\n\
         Посты, которые необходимо лайкнуть: {}",
        handle, links
    )
}

// ============================================================================
// TESTS
// ============================================================================
