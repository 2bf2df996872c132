//! recap core: bounded-window channel history collection and summarization.
//!
//! - [`snowflake`]: instant <-> time-ordered id conversion for cursors
//! - [`history`]: single-page fetch with rate-limit recovery
//! - [`collector`]: backward scan over a time window
//! - [`summarize`]: transcript formatting and the completion client
//! - [`session`]: the end-to-end flow used by the CLI

use std::path::PathBuf;

pub mod collector;
pub mod config;
pub mod discord;
pub mod error;
pub mod history;
pub mod message;
pub mod progress;
pub mod session;
pub mod snowflake;
pub mod summarize;

#[cfg(test)]
mod testing;

pub use collector::{collect_window, CollectOptions};
pub use config::{DiscordConfig, RecapConfig, SummarizerConfig};
pub use discord::{Channel, ChannelInfo, DiscordClient, Guild};
pub use error::{RecapError, RecapResult};
pub use history::{fetch_page, FetchOutcome, PageRequest, PageSource, RateLimitPolicy};
pub use message::{Author, Message, TimeWindow};
pub use progress::{emit_progress, emit_result, JsonLineProgress, NoProgress, ProgressSink};
pub use session::{ChannelDirectory, SearchRecord, SearchRequest, Session, Summarizer};
pub use snowflake::{from_cursor, to_cursor, Snowflake};
pub use summarize::{build_prompt, format_transcript, Summary, SummaryClient, Usage};

/// On-disk locations.
#[derive(Debug, Clone)]
pub struct RecapPaths {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub store_path: PathBuf,
}

impl RecapPaths {
    /// `RECAP_DATA_DIR`, else `$HOME/.recap`, else `./.recap`.
    pub fn from_env() -> Self {
        if let Some(dir) = std::env::var_os("RECAP_DATA_DIR") {
            return Self::from_base(PathBuf::from(dir));
        }
        if let Some(home) = std::env::var_os("HOME") {
            return Self::from_base(PathBuf::from(home).join(".recap"));
        }
        Self::from_base(PathBuf::from(".recap"))
    }

    pub fn from_base(base_dir: PathBuf) -> Self {
        let config_path = base_dir.join("config.toml");
        let store_path = base_dir.join("store.json");
        Self {
            base_dir,
            config_path,
            store_path,
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base_dir)
    }
}
