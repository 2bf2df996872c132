//! Discord REST client.
//!
//! Reads channel history for the collector and the few lookups the CLI needs
//! (channel/guild names, guild and channel listings). Every request absorbs
//! 429 responses through [`call_with_backoff`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DiscordConfig;
use crate::error::{RecapError, RecapResult};
use crate::history::{call_with_backoff, FetchOutcome, PageRequest, PageSource, RateLimitPolicy};
use crate::message::Message;
use crate::snowflake::Snowflake;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Used when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Display names for a channel, as shown next to a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_name: String,
    pub server_name: String,
}

impl ChannelInfo {
    /// Placeholder used when the lookup fails.
    pub fn unknown() -> Self {
        Self {
            channel_name: "Unknown Channel".to_string(),
            server_name: "Unknown Server".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

impl Channel {
    /// Text-like channels that have a readable message history.
    pub fn is_text(&self) -> bool {
        // GUILD_TEXT, DM, GROUP_DM, GUILD_ANNOUNCEMENT, threads
        matches!(self.kind, 0 | 1 | 3 | 5 | 10 | 11 | 12)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    request_delay: Duration,
    default_retry_after: Duration,
    rate_limit: RateLimitPolicy,
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig) -> RecapResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &DiscordConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            request_delay: Duration::from_millis(config.page_delay_ms),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
            rate_limit: config.rate_limit(),
        }
    }

    /// Channel and server names. Never fails: lookup errors fall back to
    /// [`ChannelInfo::unknown`].
    pub async fn fetch_channel_info(&self, channel_id: &str, token: &str) -> ChannelInfo {
        match self.try_channel_info(channel_id, token).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Error fetching channel info for {}: {}", channel_id, e);
                ChannelInfo::unknown()
            }
        }
    }

    async fn try_channel_info(&self, channel_id: &str, token: &str) -> RecapResult<ChannelInfo> {
        let channel: Channel = self
            .get_json_retrying(&format!("/channels/{}", channel_id), token, &[])
            .await?;

        let Some(guild_id) = channel.guild_id else {
            return Ok(ChannelInfo {
                channel_name: channel.name.unwrap_or_else(|| "Direct Message".to_string()),
                server_name: "Private".to_string(),
            });
        };

        sleep(self.request_delay).await;
        let guild: Guild = self
            .get_json_retrying(&format!("/guilds/{}", guild_id), token, &[])
            .await?;

        Ok(ChannelInfo {
            channel_name: channel.name.unwrap_or_else(|| "Unknown Channel".to_string()),
            server_name: guild.name,
        })
    }

    /// Servers the token's user belongs to.
    pub async fn list_guilds(&self, token: &str) -> RecapResult<Vec<Guild>> {
        self.get_json_retrying("/users/@me/guilds", token, &[]).await
    }

    /// All channels of a server, in the API's order.
    pub async fn list_guild_channels(&self, guild_id: &str, token: &str) -> RecapResult<Vec<Channel>> {
        self.get_json_retrying(&format!("/guilds/{}/channels", guild_id), token, &[])
            .await
    }

    async fn get_json_retrying<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        query: &[(&'static str, String)],
    ) -> RecapResult<T> {
        call_with_backoff(path, self.rate_limit, || self.get_json(path, token, query)).await
    }

    /// One GET attempt. A 429 comes back as [`FetchOutcome::RateLimited`].
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        query: &[(&'static str, String)],
    ) -> RecapResult<FetchOutcome<T>> {
        let url = format!("{}{}", self.api_base, path);
        let response = self
            .http
            .get(&url)
            .header("Authorization", token)
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        debug!("GET {} -> {}", path, status);

        if status.is_success() {
            return Ok(FetchOutcome::Ready(response.json::<T>().await?));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let header = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok());
            return Ok(FetchOutcome::RateLimited(parse_retry_after(
                header,
                self.default_retry_after,
            )));
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }
}

#[async_trait]
impl PageSource for DiscordClient {
    async fn request_page(&self, request: &PageRequest) -> RecapResult<FetchOutcome<Vec<Message>>> {
        let path = format!("/channels/{}/messages", request.channel_id);
        self.get_json(&path, &request.auth_token, &request.query()).await
    }
}

/// `Retry-After` in whole seconds; absent or unparseable means `default`.
pub fn parse_retry_after(header: Option<&str>, default: Duration) -> Duration {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn error_for_status(status: StatusCode, body: &str) -> RecapError {
    match status.as_u16() {
        401 => RecapError::Auth,
        403 => RecapError::Permission,
        404 => RecapError::NotFound,
        code => match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(err) if !err.message.is_empty() => RecapError::Http {
                status: code,
                message: err.message,
            },
            _ => RecapError::http_status(code),
        },
    }
}
