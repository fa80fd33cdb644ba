use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::vk_api::VkApiClient;
use crate::core::moderation::{ChatClient, ChatMember, PlatformError};
use crate::core::throttle::Throttle;

// getConversationMembers page size
const MEMBERS_PAGE: usize = 200;

/// Conversation calls, made with the community token.
pub struct VkChatClient {
    api: VkApiClient,
    throttle: Arc<Throttle>,
}

impl VkChatClient {
    pub fn new(api: VkApiClient, throttle: Arc<Throttle>) -> Self {
        Self { api, throttle }
    }

    async fn send(&self, mut params: Vec<(&str, String)>) -> Result<(), PlatformError> {
        // Same random_id on every attempt so VK drops duplicates from retries
        params.push(("random_id", rand::random::<i32>().to_string()));

        let _: serde_json::Value = self
            .throttle
            .run(|| self.api.call("messages.send", &params))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatClient for VkChatClient {
    async fn send_message(&self, text: &str, peer_id: i64) -> Result<(), PlatformError> {
        self.send(vec![
            ("peer_id", peer_id.to_string()),
            ("message", text.to_string()),
        ])
        .await
    }

    async fn reply_to(
        &self,
        text: &str,
        conversation_message_id: i64,
        peer_id: i64,
    ) -> Result<(), PlatformError> {
        self.send(vec![
            ("peer_id", peer_id.to_string()),
            ("message", text.to_string()),
            ("forward", reply_forward(conversation_message_id, peer_id)),
        ])
        .await
    }

    async fn delete_message(
        &self,
        conversation_message_id: i64,
        peer_id: i64,
    ) -> Result<(), PlatformError> {
        let params = [
            ("peer_id", peer_id.to_string()),
            ("cmids", conversation_message_id.to_string()),
            ("delete_for_all", "1".to_string()),
        ];
        let _: serde_json::Value = self
            .throttle
            .run(|| self.api.call("messages.delete", &params))
            .await?;
        Ok(())
    }

    async fn membership_info(
        &self,
        peer_id: i64,
        user_id: i64,
    ) -> Result<Option<ChatMember>, PlatformError> {
        let mut offset = 0usize;

        loop {
            let params = [
                ("peer_id", peer_id.to_string()),
                ("offset", offset.to_string()),
                ("count", MEMBERS_PAGE.to_string()),
            ];
            let page: ApiConversationMembers = self
                .throttle
                .run(|| self.api.call("messages.getConversationMembers", &params))
                .await?;

            if let Some(member) = find_member(&page.items, user_id) {
                return Ok(Some(member));
            }

            offset += page.items.len();
            if page.items.is_empty() || offset >= page.count {
                return Ok(None);
            }
        }
    }
}

/// `forward` payload that makes `messages.send` a reply in a chat.
fn reply_forward(conversation_message_id: i64, peer_id: i64) -> String {
    json!({
        "peer_id": peer_id,
        "conversation_message_ids": [conversation_message_id],
        "is_reply": 1,
    })
    .to_string()
}

fn find_member(items: &[ApiMember], user_id: i64) -> Option<ChatMember> {
    items
        .iter()
        .find(|m| m.member_id == user_id)
        .map(|m| ChatMember {
            joined_at: DateTime::from_timestamp(m.join_date, 0).unwrap_or_default(),
            is_admin: m.is_admin,
        })
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiConversationMembers {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    items: Vec<ApiMember>,
}

#[derive(Debug, Deserialize)]
struct ApiMember {
    member_id: i64,
    #[serde(default)]
    join_date: i64,
    #[serde(default)]
    is_admin: bool,
}
