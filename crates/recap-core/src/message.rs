use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snowflake::Snowflake;

/// A chat message as returned by the history endpoint.
///
/// Only `id` and `timestamp` are guaranteed; system messages and
/// attachment-only posts may lack an author or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
}

impl Message {
    /// The `username: text` pair when both are present.
    pub fn speaker_and_text(&self) -> Option<(&str, &str)> {
        let author = self.author.as_ref()?;
        let content = self.content.as_deref().filter(|c| !c.is_empty())?;
        Some((author.username.as_str(), content))
    }
}

/// Inclusive `[from, to]` range. `to = None` means "now" at fetch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn since(from: DateTime<Utc>) -> Self {
        Self { from, to: None }
    }

    /// True when an explicit end lies before the start. Equal bounds are fine.
    pub fn is_inverted(&self) -> bool {
        self.to.is_some_and(|to| to < self.from)
    }
}
