// This is the entry point of the like-for-like moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (VK API, SQLite)
// - `vk/` = VK event adapters
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the long poll loop

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "vk/vk_layer.rs"]
mod vk;

mod config;

use crate::config::BotConfig;
use crate::core::moderation::{CoveragePolicy, LikeVerifier, ModerationService, ModerationSettings};
use crate::core::throttle::{RateLimiter, RetryPolicy, Throttle};
use crate::infra::posts::SqlitePostStore;
use crate::infra::vk::{VkApiClient, VkChatClient, VkLongPoll, VkWallClient};
use crate::vk::events;
use crate::vk::Data;
use std::num::NonZeroU32;
use std::sync::Arc;

fn throttle(client: &str, per_second: NonZeroU32) -> Arc<Throttle> {
    let limiter = RateLimiter::per_second(per_second);
    let retry = RetryPolicy::default();
    tracing::debug!(
        client,
        per_second = limiter.rate().get(),
        attempts = retry.attempts(),
        delay_ms = retry.delay().as_millis() as u64,
        "Throttle configured"
    );
    Arc::new(Throttle::new(limiter, retry))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let post_store = SqlitePostStore::new(&config.database).await?;

    // Wall, likes and execute calls go out with the user token
    let wall_throttle = throttle("wall", config.wall_rate_limit);
    let wall_api = VkApiClient::new(config.vk_token.clone(), config.api_version.clone())?;
    let wall_client = Arc::new(VkWallClient::new(wall_api, Arc::clone(&wall_throttle)));
    let verifier = LikeVerifier::new(Arc::clone(&wall_client), wall_throttle);

    // Chat and long poll go out with the community token
    let chat_throttle = throttle("chat", config.chat_rate_limit);
    let chat_api = VkApiClient::new(config.api_key.clone(), config.api_version.clone())?;
    let chat_client = VkChatClient::new(chat_api.clone(), Arc::clone(&chat_throttle));

    let settings = ModerationSettings {
        history_window: chrono::Duration::days(config.history_window_days),
        coverage: CoveragePolicy::new(config.required_like_percent),
    };

    let moderation = Arc::new(ModerationService::new(
        wall_client,
        verifier,
        chat_client,
        post_store.clone(),
        settings,
    ));

    let data = Data { moderation };

    // Background prune of posts that fell out of every history window. Runs daily.
    let history_window = settings.history_window;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            let cutoff = chrono::Utc::now() - history_window;
            match post_store.prune_older_than(cutoff).await {
                Ok(removed) => tracing::info!("Pruned {} old posts", removed),
                Err(err) => tracing::warn!("Post prune failed: {}", err),
            }
        }
    });

    tracing::info!(
        group_id = config.group_id,
        window_days = config.history_window_days,
        required_percent = config.required_like_percent,
        "Bot is ready"
    );

    let long_poll = VkLongPoll::new(chat_api, chat_throttle, config.group_id, config.long_poll_wait);
    long_poll
        .run(|msg| events::handle_message(&data, msg))
        .await?;

    Ok(())
}
