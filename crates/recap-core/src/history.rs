//! One page of channel history, with rate-limit recovery.
//!
//! A [`PageSource`] performs a single attempt and reports a 429 as
//! [`FetchOutcome::RateLimited`] instead of failing. [`fetch_page`] turns that
//! into a retry loop governed by an explicit [`RateLimitPolicy`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{RecapError, RecapResult};
use crate::message::Message;
use crate::snowflake::Snowflake;

/// Page size requested from the history endpoint, and the provider's maximum.
pub const PAGE_LIMIT: usize = 100;

/// Parameters of a single history request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub channel_id: String,
    pub auth_token: String,
    /// Only messages older than this id.
    pub before: Option<Snowflake>,
    /// Only messages newer than this id.
    pub after: Option<Snowflake>,
}

impl PageRequest {
    pub fn before(channel_id: &str, auth_token: &str, cursor: Snowflake) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            auth_token: auth_token.to_string(),
            before: Some(cursor),
            after: None,
        }
    }

    /// Query string parameters for the request.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(before) = self.before {
            params.push(("before", before.to_string()));
        }
        if let Some(after) = self.after {
            params.push(("after", after.to_string()));
        }
        params
    }
}

/// Result of a single attempt.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Ready(T),
    /// The server asked us to wait this long before retrying.
    RateLimited(Duration),
}

/// Something that can fetch one page of history, newest message first.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn request_page(&self, request: &PageRequest) -> RecapResult<FetchOutcome<Vec<Message>>>;
}

/// How many consecutive 429s to absorb before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitPolicy {
    /// `None` retries until the server stops rate limiting.
    pub max_retries: Option<u32>,
}

impl RateLimitPolicy {
    pub const UNBOUNDED: Self = Self { max_retries: None };

    pub fn bounded(max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
        }
    }
}

/// Run `attempt` until it is not rate limited, sleeping as instructed between tries.
///
/// Errors from `attempt` propagate immediately. Exhausting a bounded policy
/// surfaces as `Http { status: 429 }`.
pub async fn call_with_backoff<T, F, Fut>(
    label: &str,
    policy: RateLimitPolicy,
    mut attempt: F,
) -> RecapResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RecapResult<FetchOutcome<T>>>,
{
    let mut retries: u32 = 0;

    loop {
        match attempt().await? {
            FetchOutcome::Ready(value) => {
                if retries > 0 {
                    debug!("{}: succeeded after {} rate-limit retries", label, retries);
                }
                return Ok(value);
            }
            FetchOutcome::RateLimited(wait) => {
                if let Some(max) = policy.max_retries {
                    if retries >= max {
                        return Err(RecapError::Http {
                            status: 429,
                            message: format!("{}: rate limited after {} retries", label, retries),
                        });
                    }
                }

                warn!("{}: rate limited, waiting {:?}", label, wait);
                sleep(wait).await;
                retries += 1;
            }
        }
    }
}

/// Fetch one page, absorbing rate limits according to `policy`.
pub async fn fetch_page(
    source: &dyn PageSource,
    request: &PageRequest,
    policy: RateLimitPolicy,
) -> RecapResult<Vec<Message>> {
    call_with_backoff("history", policy, || source.request_page(request)).await
}
