// Startup configuration, read once from the environment (after `.env`).

use anyhow::{bail, Context};
use std::num::NonZeroU32;

use crate::core::moderation::coverage_policy::DEFAULT_REQUIRED_PERCENT;
use crate::infra::vk::vk_api::DEFAULT_API_VERSION;

/// Upper bound for `HISTORY_WINDOW_DAYS` (ten years).
pub const MAX_HISTORY_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Community token: chat calls and long poll
    pub api_key: String,
    /// User token: wall, likes, execute and users calls
    pub vk_token: String,
    pub group_id: u64,
    pub database: String,
    pub history_window_days: i64,
    pub wall_rate_limit: NonZeroU32,
    pub chat_rate_limit: NonZeroU32,
    pub long_poll_wait: u32,
    pub api_version: String,
    pub required_like_percent: u8,
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).with_context(|| format!("{} required", key));

        let api_key = required("API_KEY")?;
        let vk_token = required("VK_TOKEN")?;
        let database = required("DATABASE")?;

        let group_id: i64 = required("GROUP_ID")?
            .parse()
            .context("GROUP_ID must be an integer")?;
        if group_id <= 0 {
            bail!("GROUP_ID must be positive");
        }

        let history_window_days = parse_or(get("HISTORY_WINDOW_DAYS"), "HISTORY_WINDOW_DAYS", 7i64)?;
        if !(1..=MAX_HISTORY_WINDOW_DAYS).contains(&history_window_days) {
            bail!(
                "HISTORY_WINDOW_DAYS must be between 1 and {}",
                MAX_HISTORY_WINDOW_DAYS
            );
        }

        let wall_rate_limit = parse_or(get("WALL_RATE_LIMIT"), "WALL_RATE_LIMIT", 3u32)?;
        let chat_rate_limit = parse_or(get("CHAT_RATE_LIMIT"), "CHAT_RATE_LIMIT", 10u32)?;
        let long_poll_wait = parse_or(get("LONG_POLL_WAIT"), "LONG_POLL_WAIT", 25u32)?;

        let required_like_percent = parse_or(
            get("REQUIRED_LIKE_PERCENT"),
            "REQUIRED_LIKE_PERCENT",
            DEFAULT_REQUIRED_PERCENT,
        )?;
        if !(1..=100).contains(&required_like_percent) {
            bail!("REQUIRED_LIKE_PERCENT must be between 1 and 100");
        }

        Ok(Self {
            api_key,
            vk_token,
            group_id: group_id as u64,
            database,
            history_window_days,
            wall_rate_limit: NonZeroU32::new(wall_rate_limit)
                .context("WALL_RATE_LIMIT must be positive")?,
            chat_rate_limit: NonZeroU32::new(chat_rate_limit)
                .context("CHAT_RATE_LIMIT must be positive")?,
            long_poll_wait,
            api_version: get("VK_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            required_like_percent,
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<BotConfig> {
        let mut env: HashMap<String, String> = [
            ("API_KEY", "group-token"),
            ("VK_TOKEN", "user-token"),
            ("GROUP_ID", "12345"),
            ("DATABASE", "data/posts.db"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in vars {
            env.insert(k.to_string(), v.to_string());
        }
        BotConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();

        assert_eq!(cfg.api_key, "group-token");
        assert_eq!(cfg.group_id, 12345);
        assert_eq!(cfg.history_window_days, 7);
        assert_eq!(cfg.wall_rate_limit.get(), 3);
        assert_eq!(cfg.chat_rate_limit.get(), 10);
        assert_eq!(cfg.long_poll_wait, 25);
        assert_eq!(cfg.api_version, "5.131");
        assert_eq!(cfg.required_like_percent, 80);
    }

    #[test]
    fn test_overrides_are_trimmed() {
        let cfg = config(&[
            ("VK_TOKEN", "  spaced  "),
            ("HISTORY_WINDOW_DAYS", "3"),
            ("REQUIRED_LIKE_PERCENT", "50"),
            ("VK_API_VERSION", "5.199"),
        ])
        .unwrap();

        assert_eq!(cfg.vk_token, "spaced");
        assert_eq!(cfg.history_window_days, 3);
        assert_eq!(cfg.required_like_percent, 50);
        assert_eq!(cfg.api_version, "5.199");
    }

    #[test]
    fn test_missing_token() {
        let err = config(&[("API_KEY", "   ")]).unwrap_err();
        assert_eq!(err.to_string(), "API_KEY required");
    }

    #[test]
    fn test_group_id_must_be_positive() {
        let err = config(&[("GROUP_ID", "-5")]).unwrap_err();
        assert_eq!(err.to_string(), "GROUP_ID must be positive");

        let err = config(&[("GROUP_ID", "abc")]).unwrap_err();
        assert_eq!(err.to_string(), "GROUP_ID must be an integer");
    }

    #[test]
    fn test_history_window_bounds() {
        let err = config(&[("HISTORY_WINDOW_DAYS", "100000000")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "HISTORY_WINDOW_DAYS must be between 1 and 3650"
        );
        assert!(config(&[("HISTORY_WINDOW_DAYS", "0")]).is_err());
        assert_eq!(
            config(&[("HISTORY_WINDOW_DAYS", "3650")])
                .unwrap()
                .history_window_days,
            3650
        );
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let err = config(&[("WALL_RATE_LIMIT", "0")]).unwrap_err();
        assert_eq!(err.to_string(), "WALL_RATE_LIMIT must be positive");
    }

    #[test]
    fn test_percent_out_of_range() {
        assert!(config(&[("REQUIRED_LIKE_PERCENT", "0")]).is_err());
        assert!(config(&[("REQUIRED_LIKE_PERCENT", "101")]).is_err());
        assert!(config(&[("REQUIRED_LIKE_PERCENT", "many")]).is_err());
    }
}
