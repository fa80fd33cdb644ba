// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "vk/mod.rs"]
pub mod vk;

#[path = "posts/mod.rs"]
pub mod posts;
