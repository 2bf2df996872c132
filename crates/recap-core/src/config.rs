//! Configuration schema and loading.
//!
//! Settings live in `<data dir>/config.toml`. Every field has a default, so
//! a missing file or a partial file is fine:
//!
//! ```toml
//! [discord]
//! max_pages = 20
//!
//! [summarizer]
//! model = "anthropic/claude-3-haiku"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::collector::{CollectOptions, DEFAULT_MAX_PAGES};
use crate::discord::DEFAULT_API_BASE;
use crate::error::{RecapError, RecapResult};
use crate::history::RateLimitPolicy;
use crate::summarize::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecapConfig {
    pub discord: DiscordConfig,
    pub summarizer: SummarizerConfig,
}

/// Chat history API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub api_base: String,
    pub max_pages: usize,
    /// Courtesy pause between page requests.
    pub page_delay_ms: u64,
    /// Wait applied when a 429 has no usable `Retry-After`.
    pub default_retry_after_secs: u64,
    /// Absent means 429s are retried for as long as they keep coming.
    pub max_rate_limit_retries: Option<u32>,
    pub request_timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            page_delay_ms: 500,
            default_retry_after_secs: 5,
            max_rate_limit_retries: None,
            request_timeout_secs: 30,
        }
    }
}

impl DiscordConfig {
    pub fn rate_limit(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_retries: self.max_rate_limit_retries,
        }
    }

    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            max_pages: self.max_pages,
            page_delay: Duration::from_millis(self.page_delay_ms),
            rate_limit: self.rate_limit(),
        }
    }
}

/// Completion endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub endpoint: String,
    pub model: String,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Retry `n` waits `n * retry_base_delay_ms`.
    pub retry_base_delay_ms: u64,
    /// Sent as `HTTP-Referer` for endpoint-side attribution.
    pub referer: Option<String>,
    /// Sent as `X-Title`.
    pub title: String,
    pub request_timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_retries: 2,
            retry_base_delay_ms: 1000,
            referer: None,
            title: "Discord Message Summarizer".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl RecapConfig {
    /// Load from a TOML file, or defaults if it doesn't exist.
    pub fn load(path: &Path) -> RecapResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            RecapError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| RecapError::Config(format!("{} ({})", e, path.display())))
    }

    pub fn from_toml(contents: &str) -> RecapResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| RecapError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RecapResult<()> {
        for (field, value) in [
            ("discord.api_base", &self.discord.api_base),
            ("summarizer.endpoint", &self.summarizer.endpoint),
        ] {
            let url = Url::parse(value)
                .map_err(|e| RecapError::Config(format!("{} is not a valid URL: {}", field, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(RecapError::Config(format!(
                    "{} must be an http(s) URL, got {}",
                    field, value
                )));
            }
        }
        if self.summarizer.model.trim().is_empty() {
            return Err(RecapError::Config("summarizer.model must not be empty".to_string()));
        }
        Ok(())
    }
}
