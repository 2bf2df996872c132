//! Summarization client: turns a message list into one prompt and asks a
//! chat-completion endpoint (OpenRouter by default) for a summary.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::SummarizerConfig;
use crate::error::{RecapError, RecapResult};
use crate::message::Message;
use crate::progress::ProgressSink;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "anthropic/claude-2";

const PROMPT_PREAMBLE: &str = "Please summarize the following Discord chat messages in a blog post style with paragraphs and bullet points where appropriate. Focus on the key discussions, decisions, and new information shared. Organize the content logically and highlight important points:";

/// Token and cost accounting reported by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    /// Model that actually served the request, when reported.
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    pub usage: Usage,
}

/// One `username: text` line per message that has both; others are skipped.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(Message::speaker_and_text)
        .map(|(username, text)| format!("{}: {}", username, text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(transcript: &str) -> String {
    format!("{}\n\n{}", PROMPT_PREAMBLE, transcript)
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct SummaryClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    max_retries: u32,
    base_delay: Duration,
    referer: Option<String>,
    title: String,
}

impl SummaryClient {
    pub fn new(config: &SummarizerConfig) -> RecapResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &SummarizerConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            referer: config.referer.clone(),
            title: config.title.clone(),
        }
    }

    /// Summarize `messages` (expected oldest first).
    ///
    /// Fails fast with `EmptyInput` / `MissingToken` before any request.
    pub async fn summarize(
        &self,
        messages: &[Message],
        token: &str,
        progress: &dyn ProgressSink,
    ) -> RecapResult<Summary> {
        if messages.is_empty() {
            return Err(RecapError::EmptyInput);
        }
        if token.trim().is_empty() {
            return Err(RecapError::MissingToken);
        }

        progress.report(&format!(
            "Preparing {} messages for summarization...",
            messages.len()
        ));
        let prompt = build_prompt(&format_transcript(messages));

        progress.report("Requesting summary from AI model...");
        let summary = self.submit(&prompt, token).await?;

        progress.report("Processing AI response...");
        info!(
            "Summary received: {} prompt + {} completion tokens",
            summary.usage.prompt_tokens, summary.usage.completion_tokens
        );
        Ok(summary)
    }

    /// Send `prompt` as a single user message and return the completion.
    pub async fn submit(&self, prompt: &str, token: &str) -> RecapResult<Summary> {
        let body = self.send_with_retry(prompt, token).await?;
        parse_completion(&body)
    }

    async fn send_with_retry(&self, prompt: &str, token: &str) -> RecapResult<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt: u32 = 0;
        loop {
            match self.send_once(&request, token).await {
                Ok(body) => return Ok(body),
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.base_delay * attempt;
                    warn!(
                        "Completion attempt {} failed ({}), retrying in {:?}",
                        attempt, e, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: &CompletionRequest<'_>, token: &str) -> RecapResult<String> {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("X-Title", &self.title)
            .json(request);
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("POST {} -> {} ({} bytes)", self.endpoint, status, body.len());

        if status.is_success() {
            return Ok(body);
        }
        Err(completion_error(status, &body))
    }
}

/// 429 and transport failures are worth another try; everything else is final.
fn is_retryable(error: &RecapError) -> bool {
    matches!(
        error,
        RecapError::Http { status: 429, .. } | RecapError::Network(_)
    )
}

fn completion_error(status: StatusCode, body: &str) -> RecapError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
    RecapError::Http {
        status: status.as_u16(),
        message,
    }
}

fn parse_completion(body: &str) -> RecapResult<Summary> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|_| RecapError::MalformedResponse)?;

    let summary = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.is_empty())
        .ok_or(RecapError::MalformedResponse)?;

    let usage = response.usage.unwrap_or_default();
    let count = |key: &str| usage[key].as_u64().unwrap_or(0);

    Ok(Summary {
        summary,
        usage: Usage {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
            cost_usd: usage["cost"].as_f64().unwrap_or(0.0),
            model: response.model,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Author;
    use crate::progress::NoProgress;
    use crate::testing::message;

    #[test]
    fn test_transcript_skips_incomplete_messages() {
        let mut no_author = message(2, 2);
        no_author.author = None;
        let mut no_content = message(3, 3);
        no_content.content = None;
        let mut padded = message(4, 4);
        padded.author = Some(Author {
            username: "carol".to_string(),
        });
        padded.content = Some("  spaced out \n".to_string());

        let transcript = format_transcript(&[message(1, 1), no_author, no_content, padded]);
        assert_eq!(transcript, "user1: message 1\ncarol: spaced out");
    }

    #[test]
    fn test_prompt_wraps_transcript() {
        let prompt = build_prompt("alice: hi");
        assert!(prompt.starts_with("Please summarize the following Discord chat messages"));
        assert!(prompt.ends_with("\n\nalice: hi"));
    }

    #[test]
    fn test_parse_completion_with_usage() {
        let body = r#"{
            "model": "anthropic/claude-2",
            "choices": [{"message": {"role": "assistant", "content": "A summary."}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150, "cost": 0.0042}
        }"#;
        let summary = parse_completion(body).unwrap();
        assert_eq!(summary.summary, "A summary.");
        assert_eq!(summary.usage.total_tokens, 150);
        assert!((summary.usage.cost_usd - 0.0042).abs() < f64::EPSILON);
        assert_eq!(summary.usage.model.as_deref(), Some("anthropic/claude-2"));
    }

    #[test]
    fn test_parse_completion_defaults_missing_usage() {
        let body = r#"{"choices": [{"message": {"content": "ok"}}], "usage": {"total_tokens": 9}}"#;
        let summary = parse_completion(body).unwrap();
        assert_eq!(summary.usage.prompt_tokens, 0);
        assert_eq!(summary.usage.completion_tokens, 0);
        assert_eq!(summary.usage.total_tokens, 9);
        assert_eq!(summary.usage.cost_usd, 0.0);
        assert_eq!(summary.usage.model, None);
    }

    #[test]
    fn test_parse_completion_missing_content_is_malformed() {
        for body in [
            r#"{"choices": []}"#,
            r#"{"choices": [{"message": {}}]}"#,
            r#"{"choices": [{"message": {"content": ""}}]}"#,
            r#"{"id": "gen-1"}"#,
            "not json",
        ] {
            assert!(
                matches!(parse_completion(body), Err(RecapError::MalformedResponse)),
                "body {:?} should be malformed",
                body
            );
        }
    }

    #[test]
    fn test_completion_error_message() {
        let err = completion_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "No auth credentials found", "code": 401}}"#,
        );
        assert!(
            matches!(err, RecapError::Http { status: 401, ref message } if message == "No auth credentials found")
        );

        let err = completion_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(
            matches!(err, RecapError::Http { status: 500, ref message } if message == "HTTP error! status: 500")
        );
    }

    #[tokio::test]
    async fn test_preconditions_fail_before_any_request() {
        let config = SummarizerConfig {
            // Nothing listens here; reaching the network would fail differently.
            endpoint: "http://127.0.0.1:9/never".to_string(),
            ..SummarizerConfig::default()
        };
        let client = SummaryClient::new(&config).unwrap();

        let err = client.summarize(&[], "token", &NoProgress).await.unwrap_err();
        assert!(matches!(err, RecapError::EmptyInput));

        let err = client
            .summarize(&[message(1, 1)], "  ", &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, RecapError::MissingToken));
    }
}
