//! One end-to-end search: remember credentials, look up channel names,
//! collect the window, summarize it and record the result in history.
//!
//! This is the only part of the crate that touches storage; the collector and
//! the summarizer stay storage-free.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use recap_store::{CredentialVault, Credentials, KeyValueStore, SearchHistory};

use crate::collector::{collect_window, CollectOptions};
use crate::discord::{ChannelInfo, DiscordClient};
use crate::error::{RecapError, RecapResult};
use crate::history::PageSource;
use crate::message::{Message, TimeWindow};
use crate::progress::ProgressSink;
use crate::snowflake::Snowflake;
use crate::summarize::{Summary, SummaryClient, Usage};

/// Resolves display names for a channel. Must not fail.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn channel_info(&self, channel_id: &str, token: &str) -> ChannelInfo;
}

#[async_trait]
impl ChannelDirectory for DiscordClient {
    async fn channel_info(&self, channel_id: &str, token: &str) -> ChannelInfo {
        self.fetch_channel_info(channel_id, token).await
    }
}

/// Produces a summary for an ordered message list.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        messages: &[Message],
        token: &str,
        progress: &dyn ProgressSink,
    ) -> RecapResult<Summary>;
}

#[async_trait]
impl Summarizer for SummaryClient {
    async fn summarize(
        &self,
        messages: &[Message],
        token: &str,
        progress: &dyn ProgressSink,
    ) -> RecapResult<Summary> {
        SummaryClient::summarize(self, messages, token, progress).await
    }
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub channel_id: String,
    pub chat_token: String,
    pub summary_token: String,
    pub from: DateTime<Utc>,
    /// `None` means "up to now".
    pub to: Option<DateTime<Utc>>,
    /// Zone the window was entered in, e.g. `+02:00`. Display only.
    pub timezone: String,
}

impl SearchRequest {
    pub fn validate(&self) -> RecapResult<()> {
        for (field, value) in [
            ("channel_id", &self.channel_id),
            ("chat_token", &self.chat_token),
            ("summary_token", &self.summary_token),
        ] {
            if value.trim().is_empty() {
                return Err(RecapError::InvalidInput(format!(
                    "{} is missing",
                    field
                )));
            }
        }
        self.channel_id
            .parse::<Snowflake>()
            .map_err(|_| RecapError::InvalidInput(format!("{:?} is not a channel id", self.channel_id)))?;
        if self.window().is_inverted() {
            return Err(RecapError::InvalidInput(
                "end date must be after start date".to_string(),
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.from, self.to)
    }
}

/// A finished search, as kept in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub channel_id: String,
    pub channel_name: String,
    pub server_name: String,
    pub messages: Vec<Message>,
    /// Timestamp of the oldest collected message.
    pub from_date: Option<DateTime<Utc>>,
    /// Timestamp of the newest collected message.
    pub to_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Zone the window was entered in. Empty for records saved without one.
    #[serde(default)]
    pub timezone: String,
    pub message_count: usize,
    pub summary: String,
    pub usage: Usage,
}

impl SearchRecord {
    pub fn new(
        request: &SearchRequest,
        info: ChannelInfo,
        messages: Vec<Message>,
        summary: Summary,
    ) -> Self {
        Self {
            channel_id: request.channel_id.clone(),
            channel_name: info.channel_name,
            server_name: info.server_name,
            from_date: messages.first().map(|m| m.timestamp),
            to_date: messages.last().map(|m| m.timestamp),
            created_at: Utc::now(),
            timezone: request.timezone.clone(),
            message_count: messages.len(),
            messages,
            summary: summary.summary,
            usage: summary.usage,
        }
    }
}

pub struct Session<'a> {
    source: &'a dyn PageSource,
    directory: &'a dyn ChannelDirectory,
    summarizer: &'a dyn Summarizer,
    store: &'a dyn KeyValueStore,
    options: CollectOptions,
}

impl<'a> Session<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        directory: &'a dyn ChannelDirectory,
        summarizer: &'a dyn Summarizer,
        store: &'a dyn KeyValueStore,
    ) -> Self {
        Self {
            source,
            directory,
            summarizer,
            store,
            options: CollectOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CollectOptions) -> Self {
        self.options = options;
        self
    }

    /// Run a full search and record it in history.
    pub async fn run(
        &self,
        request: &SearchRequest,
        progress: &dyn ProgressSink,
    ) -> RecapResult<SearchRecord> {
        request.validate()?;

        CredentialVault::new(self.store).save(&Credentials {
            channel_id: request.channel_id.clone(),
            chat_token: request.chat_token.clone(),
            summary_token: request.summary_token.clone(),
        })?;

        progress.report("Fetching channel information...");
        let info = self
            .directory
            .channel_info(&request.channel_id, &request.chat_token)
            .await;

        let messages = collect_window(
            self.source,
            &request.channel_id,
            &request.chat_token,
            request.window(),
            progress,
            &self.options,
        )
        .await?;

        progress.report(&format!(
            "Found {} unique messages. Starting summarization...",
            messages.len()
        ));
        let summary = self
            .summarizer
            .summarize(&messages, &request.summary_token, progress)
            .await?;

        let record = SearchRecord::new(request, info, messages, summary);
        info!(
            "Search complete: #{} ({}) {} messages",
            record.channel_name, record.server_name, record.message_count
        );

        if let Err(e) = SearchHistory::new(self.store).push(record.clone()) {
            warn!("Error saving search history: {}", e);
        }

        Ok(record)
    }
}
