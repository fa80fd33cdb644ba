// VK layer - adapts inbound chat events to the core moderation service.

#[path = "events.rs"]
pub mod events;

pub use events::Data;
