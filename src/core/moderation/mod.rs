// Core moderation module - the like-for-like rule for shared wall posts.

pub mod coverage_policy;
pub mod like_check;
pub mod like_verifier;
pub mod moderation_models;
pub mod moderation_ports;
pub mod moderation_service;

pub use coverage_policy::CoveragePolicy;
pub use like_check::{LikeCheckBatch, LikeCheckOutcome};
pub use like_verifier::LikeVerifier;
pub use moderation_models::*;
pub use moderation_ports::*;
pub use moderation_service::*;
