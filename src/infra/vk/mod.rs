// VK infra layer.
// - `vk_api.rs` talks to the VK HTTP API.
// - `wall_client.rs` / `chat_client.rs` implement the core ports on top of it.
// - `vk_script.rs` renders like-check programs for `execute`.
// - `long_poll.rs` receives chat events.

pub mod chat_client;
pub mod long_poll;
pub mod vk_api;
pub mod vk_script;
pub mod wall_client;

pub use chat_client::VkChatClient;
pub use long_poll::VkLongPoll;
pub use vk_api::VkApiClient;
pub use wall_client::VkWallClient;
