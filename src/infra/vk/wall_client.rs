use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::sync::Arc;

use super::vk_api::VkApiClient;
use super::vk_script;
use crate::core::moderation::{
    ItemRef, LikeCheckBatch, LikeCheckOutcome, LikesScriptExecutor, PlatformError, WallClient,
};
use crate::core::throttle::Throttle;

/// Wall, user and `execute` calls, made with the user token.
pub struct VkWallClient {
    api: VkApiClient,
    throttle: Arc<Throttle>,
}

impl VkWallClient {
    pub fn new(api: VkApiClient, throttle: Arc<Throttle>) -> Self {
        Self { api, throttle }
    }
}

#[async_trait]
impl WallClient for VkWallClient {
    async fn item_exists(&self, item: ItemRef) -> Result<bool, PlatformError> {
        let params = [("posts", item.to_string())];
        // Only the number of matches matters
        let posts: Vec<IgnoredAny> = self
            .throttle
            .run(|| self.api.call("wall.getById", &params))
            .await?;

        match posts.len() {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(PlatformError::Ambiguous("posts".to_string())),
        }
    }

    async fn resolve_handle(&self, user_id: i64) -> Result<String, PlatformError> {
        let params = [
            ("user_ids", user_id.to_string()),
            ("fields", "screen_name".to_string()),
        ];
        let users: Vec<ApiUser> = self
            .throttle
            .run(|| self.api.call("users.get", &params))
            .await?;

        single_handle(users)
    }
}

#[async_trait]
impl LikesScriptExecutor for VkWallClient {
    async fn run_like_check(
        &self,
        batch: &LikeCheckBatch,
    ) -> Result<LikeCheckOutcome, PlatformError> {
        let params = [("code", vk_script::render(batch))];
        let outcome: ApiLikeCheck = self.api.call("execute", &params).await?;
        Ok(outcome.into())
    }
}

fn single_handle(users: Vec<ApiUser>) -> Result<String, PlatformError> {
    let mut users = users.into_iter();
    let user = users
        .next()
        .ok_or_else(|| PlatformError::NotFound("user".to_string()))?;
    if users.next().is_some() {
        return Err(PlatformError::Ambiguous("users".to_string()));
    }

    Ok(user.screen_name.unwrap_or_else(|| format!("id{}", user.id)))
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: i64,
    screen_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPostRef {
    owner_id: i64,
    item_id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiLikeCheck {
    #[serde(default)]
    unliked: Vec<ApiPostRef>,
    #[serde(default)]
    unchecked: Vec<ApiPostRef>,
}

impl From<ApiLikeCheck> for LikeCheckOutcome {
    fn from(api: ApiLikeCheck) -> Self {
        let convert = |refs: Vec<ApiPostRef>| -> Vec<ItemRef> {
            refs.into_iter()
                .map(|p| ItemRef::new(p.owner_id, p.item_id))
                .collect()
        };

        LikeCheckOutcome {
            unliked: convert(api.unliked),
            unchecked: convert(api.unchecked),
        }
    }
}
