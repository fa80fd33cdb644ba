// Ports the moderation service depends on.
// The infra layer implements these against VK and SQLite; tests use mocks.

use super::like_check::{LikeCheckBatch, LikeCheckOutcome};
use super::moderation_models::{ChatMember, ItemRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("VK API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("too many {0}")]
    Ambiguous(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

// ============================================================================
// PLATFORM PORTS
// ============================================================================

/// Wall and user lookups on the social platform.
#[async_trait]
pub trait WallClient: Send + Sync {
    /// `Ok(false)` when the post doesn't exist.
    /// `Err(PlatformError::Ambiguous)` when the id matches more than one post.
    async fn item_exists(&self, item: ItemRef) -> Result<bool, PlatformError>;

    /// Display handle used to mention a user in a notice.
    async fn resolve_handle(&self, user_id: i64) -> Result<String, PlatformError>;
}

/// Runs one server-side like-check program.
///
/// Implementations do a single raw call. Throttling and retries are applied
/// by the caller.
#[async_trait]
pub trait LikesScriptExecutor: Send + Sync {
    async fn run_like_check(
        &self,
        batch: &LikeCheckBatch,
    ) -> Result<LikeCheckOutcome, PlatformError>;
}

/// Group chat operations.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(&self, text: &str, peer_id: i64) -> Result<(), PlatformError>;

    async fn reply_to(
        &self,
        text: &str,
        conversation_message_id: i64,
        peer_id: i64,
    ) -> Result<(), PlatformError>;

    async fn delete_message(
        &self,
        conversation_message_id: i64,
        peer_id: i64,
    ) -> Result<(), PlatformError>;

    /// `Ok(None)` when the user isn't a member of the conversation.
    async fn membership_info(
        &self,
        peer_id: i64,
        user_id: i64,
    ) -> Result<Option<ChatMember>, PlatformError>;
}

// ============================================================================
// STORAGE PORT
// ============================================================================

/// Posts shared in each conversation.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert the post, or refresh its timestamp if already recorded for this peer.
    async fn record_item(&self, item: ItemRef, peer_id: i64) -> Result<(), StoreError>;

    /// Posts recorded for the peer at or after `since`, newest first.
    async fn recent_items(
        &self,
        peer_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<ItemRef>, StoreError>;
}
