// Bots Long Poll event source.
//
// groups.getLongPollServer hands out a (server, key, ts) triple; we then
// long-poll `server?act=a_check` and feed every `message_new` to the caller.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::vk_api::VkApiClient;
use crate::core::moderation::{IncomingMessage, PlatformError};
use crate::core::throttle::Throttle;

pub struct VkLongPoll {
    api: VkApiClient,
    throttle: Arc<Throttle>,
    group_id: u64,
    wait: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PollSession {
    server: String,
    key: String,
    ts: String,
}

/// What to do after one `a_check` response.
#[derive(Debug, PartialEq, Eq)]
enum PollStep {
    Deliver(Vec<IncomingMessage>),
    RefreshKey,
    Restart,
}

impl VkLongPoll {
    pub fn new(api: VkApiClient, throttle: Arc<Throttle>, group_id: u64, wait: u32) -> Self {
        Self {
            api,
            throttle,
            group_id,
            wait,
        }
    }

    /// Poll forever, handing each new chat message to `on_message`.
    pub async fn run<F>(&self, mut on_message: F) -> Result<(), PlatformError>
    where
        F: FnMut(IncomingMessage),
    {
        let mut session = self.open_session().await?;
        tracing::info!(group_id = self.group_id, "Long poll session opened");

        loop {
            let body = match self.check(&session).await {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!("Long poll request failed: {}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            match advance(&mut session, body) {
                PollStep::Deliver(messages) => {
                    for message in messages {
                        on_message(message);
                    }
                }
                PollStep::RefreshKey => {
                    tracing::debug!("Long poll key expired, refreshing");
                    session.key = self.open_session().await?.key;
                }
                PollStep::Restart => {
                    tracing::debug!("Long poll history lost, reopening session");
                    session = self.open_session().await?;
                }
            }
        }
    }

    async fn open_session(&self) -> Result<PollSession, PlatformError> {
        let params = [("group_id", self.group_id.to_string())];
        let server: ApiLongPollServer = self
            .throttle
            .run(|| self.api.call("groups.getLongPollServer", &params))
            .await?;

        Ok(PollSession {
            server: server.server,
            key: server.key,
            ts: ts_string(&server.ts),
        })
    }

    async fn check(&self, session: &PollSession) -> Result<ApiPollResponse, PlatformError> {
        let wait = self.wait.to_string();
        let resp = self
            .api
            .http()
            .get(&session.server)
            .query(&[
                ("act", "a_check"),
                ("key", session.key.as_str()),
                ("ts", session.ts.as_str()),
                ("wait", wait.as_str()),
            ])
            .timeout(Duration::from_secs(u64::from(self.wait) + 10))
            .send()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        resp.json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))
    }
}

/// Apply one poll response to the session.
fn advance(session: &mut PollSession, body: ApiPollResponse) -> PollStep {
    match body.failed {
        Some(1) => {
            if let Some(ts) = &body.ts {
                session.ts = ts_string(ts);
            }
            PollStep::Deliver(Vec::new())
        }
        Some(2) => PollStep::RefreshKey,
        Some(_) => PollStep::Restart,
        None => {
            if let Some(ts) = &body.ts {
                session.ts = ts_string(ts);
            }
            PollStep::Deliver(body.updates.into_iter().filter_map(parse_update).collect())
        }
    }
}

/// `ts` comes back as a string or a number depending on the endpoint.
fn ts_string(ts: &Value) -> String {
    match ts {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_update(update: ApiUpdate) -> Option<IncomingMessage> {
    if update.kind != "message_new" {
        return None;
    }

    // API 5.103+ nests the message; older versions put it directly in `object`
    let raw = update
        .object
        .get("message")
        .cloned()
        .unwrap_or(update.object);
    let message: ApiMessage = serde_json::from_value(raw).ok()?;

    Some(IncomingMessage {
        peer_id: message.peer_id,
        from_id: message.from_id,
        conversation_message_id: message.conversation_message_id,
        text: message.text,
    })
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiLongPollServer {
    key: String,
    server: String,
    ts: Value,
}

#[derive(Debug, Deserialize)]
struct ApiPollResponse {
    ts: Option<Value>,
    #[serde(default)]
    updates: Vec<ApiUpdate>,
    failed: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ApiUpdate {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: Value,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    peer_id: i64,
    from_id: i64,
    #[serde(default)]
    conversation_message_id: i64,
    #[serde(default)]
    text: String,
}
