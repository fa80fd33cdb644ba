// Long poll event dispatch.

use crate::core::moderation::{IncomingMessage, ModerationService};
use crate::infra::posts::SqlitePostStore;
use crate::infra::vk::{VkChatClient, VkWallClient};
use std::sync::Arc;

pub type Moderation = ModerationService<VkWallClient, VkChatClient, SqlitePostStore>;

/// Shared state handed to every event.
pub struct Data {
    pub moderation: Arc<Moderation>,
}

// Group chat peer ids start here; anything below is a direct conversation
const CHAT_PEER_OFFSET: i64 = 2_000_000_000;

/// Only messages written by users inside group chats are moderated.
pub fn should_moderate(msg: &IncomingMessage) -> bool {
    msg.from_id > 0 && msg.peer_id >= CHAT_PEER_OFFSET
}

/// Moderate a message in its own task so a slow like check doesn't hold up
/// the poll loop.
pub fn handle_message(data: &Data, msg: IncomingMessage) {
    if !should_moderate(&msg) {
        tracing::trace!(
            peer_id = msg.peer_id,
            from_id = msg.from_id,
            "Ignoring message outside group chats"
        );
        return;
    }

    let moderation = Arc::clone(&data.moderation);
    tokio::spawn(async move {
        // Failures were already replied to and logged by the service
        let _ = moderation.process_message(&msg).await;
    });
}
