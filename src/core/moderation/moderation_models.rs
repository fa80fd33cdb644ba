// Moderation domain models - data structures for the like-for-like link rule.
//
// These are pure domain types with no VK dependencies.
// The infra layer converts API payloads into these.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static WALL_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://vk\.com/wall(-[0-9]+)_([0-9]+)").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("a post can only contain one link")]
    MultipleLinks,

    #[error("invalid post id in {0}")]
    InvalidId(String),
}

/// A shared wall post, identified by its owner and item ids.
///
/// Canonical text form is `<owner_id>_<item_id>`, e.g. `-123_456`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef {
    pub owner_id: i64,
    pub item_id: i64,
}

impl ItemRef {
    pub fn new(owner_id: i64, item_id: i64) -> Self {
        Self { owner_id, item_id }
    }

    /// Extract the single wall link contained in a chat message.
    ///
    /// # Returns
    /// - `Ok(None)` when the text has no wall link
    /// - `Ok(Some(item))` when it has exactly one
    /// - `Err(LinkError::MultipleLinks)` when it has more than one
    pub fn extract(text: &str) -> Result<Option<Self>, LinkError> {
        let mut matches = WALL_LINK.captures_iter(text);

        let Some(caps) = matches.next() else {
            return Ok(None);
        };
        if matches.next().is_some() {
            return Err(LinkError::MultipleLinks);
        }

        let owner_id = caps[1]
            .parse()
            .map_err(|_| LinkError::InvalidId(caps[0].to_string()))?;
        let item_id = caps[2]
            .parse()
            .map_err(|_| LinkError::InvalidId(caps[0].to_string()))?;

        Ok(Some(Self { owner_id, item_id }))
    }

    /// Full URL used in user-facing notices.
    pub fn link(&self) -> String {
        format!("https://vk.com/wall{}", self)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.owner_id, self.item_id)
    }
}

impl FromStr for ItemRef {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, item) = s
            .split_once('_')
            .ok_or_else(|| LinkError::InvalidId(s.to_string()))?;

        Ok(Self {
            owner_id: owner
                .parse()
                .map_err(|_| LinkError::InvalidId(s.to_string()))?,
            item_id: item
                .parse()
                .map_err(|_| LinkError::InvalidId(s.to_string()))?,
        })
    }
}

/// Role and timing facts about a user in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMember {
    pub joined_at: DateTime<Utc>,
    pub is_admin: bool,
}

impl Default for ChatMember {
    fn default() -> Self {
        Self {
            joined_at: DateTime::UNIX_EPOCH,
            is_admin: false,
        }
    }
}

/// Allow/deny result of the coverage rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageVerdict {
    pub allow: bool,
    /// Posts the sender still has to like. Empty when `allow` is true.
    pub owed_items: Vec<ItemRef>,
}

impl CoverageVerdict {
    pub fn allow() -> Self {
        Self {
            allow: true,
            owed_items: Vec::new(),
        }
    }

    pub fn deny(owed_items: Vec<ItemRef>) -> Self {
        Self {
            allow: false,
            owed_items,
        }
    }
}

/// A new chat message, reduced to what moderation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub peer_id: i64,
    pub from_id: i64,
    pub conversation_message_id: i64,
    pub text: String,
}

/// What the service did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOutcome {
    /// No wall link in the message
    NotALink,
    /// The linked post doesn't exist
    UnknownPost(ItemRef),
    /// The link was accepted and stored
    Recorded { item: ItemRef, by_admin: bool },
    /// The message was deleted and the sender was told what to like
    Rejected { item: ItemRef, owed: Vec<ItemRef> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_community_link() {
        let item = ItemRef::extract("look https://vk.com/wall-123_456 please")
            .unwrap()
            .unwrap();

        assert_eq!(item, ItemRef::new(-123, 456));
        assert_eq!(item.to_string(), "-123_456");
        assert_eq!(item.link(), "https://vk.com/wall-123_456");
    }

    #[test]
    fn test_extract_no_link() {
        assert_eq!(ItemRef::extract("hello there").unwrap(), None);
        // Personal walls are not part of the rule
        assert_eq!(ItemRef::extract("https://vk.com/wall123_456").unwrap(), None);
    }

    #[test]
    fn test_extract_two_links_is_rejected() {
        let err = ItemRef::extract("https://vk.com/wall-1_2 and https://vk.com/wall-3_4")
            .unwrap_err();
        assert_eq!(err, LinkError::MultipleLinks);
        assert_eq!(err.to_string(), "a post can only contain one link");
    }

    #[test]
    fn test_extract_overflowing_id() {
        let err = ItemRef::extract("https://vk.com/wall-1_99999999999999999999").unwrap_err();
        assert!(matches!(err, LinkError::InvalidId(_)));
    }

    #[test]
    fn test_canonical_form_parses_back() {
        let item: ItemRef = "-77_12".parse().unwrap();
        assert_eq!(item, ItemRef::new(-77, 12));
        assert!("garbage".parse::<ItemRef>().is_err());
        assert!("-1_x".parse::<ItemRef>().is_err());
    }
}
