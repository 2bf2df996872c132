//! Window collector: walks channel history backwards from the end of a time
//! window until it passes the start, one page at a time.
//!
//! Cost is proportional to the number of messages at or after `from`, not to
//! the size of the channel: the scan stops at the first message older than the
//! window, at the first short page, or after `max_pages` pages.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::RecapResult;
use crate::history::{fetch_page, PageRequest, PageSource, RateLimitPolicy, PAGE_LIMIT};
use crate::message::{Message, TimeWindow};
use crate::progress::ProgressSink;
use crate::snowflake::{to_cursor, Snowflake};

pub const DEFAULT_MAX_PAGES: usize = 50;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOptions {
    /// Upper bound on pages requested.
    pub max_pages: usize,
    /// Pause between consecutive page requests, on top of any 429 wait.
    pub page_delay: Duration,
    pub rate_limit: RateLimitPolicy,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: DEFAULT_PAGE_DELAY,
            rate_limit: RateLimitPolicy::UNBOUNDED,
        }
    }
}

/// Per-call scan state. Lives only for one [`collect_window`] call.
struct CollectorState {
    accumulator: HashMap<Snowflake, Message>,
    cursor: Snowflake,
    pages_fetched: usize,
    terminated: bool,
}

impl CollectorState {
    fn new(cursor: Snowflake) -> Self {
        Self {
            accumulator: HashMap::new(),
            cursor,
            pages_fetched: 0,
            terminated: false,
        }
    }

    /// Keep in-window messages from a newest-first page. Stops at the first
    /// message older than `from`; everything after it is older still.
    fn absorb(&mut self, page: Vec<Message>, from: DateTime<Utc>, to: DateTime<Utc>) {
        for msg in page {
            if msg.timestamp < from {
                self.terminated = true;
                break;
            }
            if msg.timestamp <= to {
                self.accumulator.insert(msg.id, msg);
            }
        }
    }

    fn into_sorted(self) -> Vec<Message> {
        let mut messages: Vec<Message> = self.accumulator.into_values().collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        messages
    }
}

/// Collect every message of `channel_id` inside `window`, oldest first.
///
/// Any fetch error aborts the whole collection; nothing partial is returned.
pub async fn collect_window(
    source: &dyn PageSource,
    channel_id: &str,
    auth_token: &str,
    window: TimeWindow,
    progress: &dyn ProgressSink,
    options: &CollectOptions,
) -> RecapResult<Vec<Message>> {
    let effective_to = window.to.unwrap_or_else(Utc::now);
    info!(
        "Fetching messages for channel {} from {} to {}",
        channel_id,
        window.from.to_rfc3339(),
        effective_to.to_rfc3339()
    );

    let mut state = CollectorState::new(to_cursor(effective_to)?);
    let mut has_more = true;

    while has_more && state.pages_fetched < options.max_pages && !state.terminated {
        progress.report(&format!("Fetching page {}...", state.pages_fetched + 1));

        if state.pages_fetched > 0 {
            sleep(options.page_delay).await;
        }

        let request = PageRequest::before(channel_id, auth_token, state.cursor);
        let page = fetch_page(source, &request, options.rate_limit).await?;

        if page.is_empty() {
            has_more = false;
            continue;
        }

        let page_len = page.len();
        let oldest = page.last().map(|m| m.id);
        debug!(
            "Page {}: {} messages before {}",
            state.pages_fetched + 1,
            page_len,
            state.cursor
        );
        state.absorb(page, window.from, effective_to);

        match oldest {
            Some(oldest) if !state.terminated && page_len == PAGE_LIMIT => {
                state.cursor = oldest;
                state.pages_fetched += 1;
            }
            _ => has_more = false,
        }
    }

    let pages_searched = state.pages_fetched + 1;
    let stopped_early = state.terminated;
    let messages = state.into_sorted();

    info!(
        "Fetch complete: {} messages, {} pages searched, stopped early: {}",
        messages.len(),
        pages_searched,
        stopped_early
    );
    progress.report(&format!("Found {} unique messages", messages.len()));

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecapError;
    use crate::history::FetchOutcome;
    use crate::progress::NoProgress;
    use crate::testing::{at, message, page, ScriptedSource};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn ids(messages: &[Message]) -> Vec<u64> {
        messages.iter().map(|m| m.id.get()).collect()
    }

    async fn collect(
        source: &ScriptedSource,
        window: TimeWindow,
        options: CollectOptions,
    ) -> RecapResult<Vec<Message>> {
        collect_window(source, "chan", "token", window, &NoProgress, &options).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_boundaries_are_inclusive() {
        // t0 = 1000 (newest) .. t99 = 901, then 40 older messages.
        let source = ScriptedSource::pages(vec![page(1000, 100), page(900, 40)]);
        let window = TimeWindow::new(at(999), Some(at(1000)));

        let messages = collect(&source, window, CollectOptions::default()).await.unwrap();

        assert_eq!(ids(&messages), vec![999, 1000]);
        let requests = source.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].before, Some(to_cursor(at(1000)).unwrap()));
        assert_eq!(requests[0].after, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_message_stops_before_next_page() {
        let source = ScriptedSource::pages(vec![page(1000, 100), page(900, 100)]);
        let window = TimeWindow::new(at(951), Some(at(1000)));

        let messages = collect(&source, window, CollectOptions::default()).await.unwrap();

        assert_eq!(messages.len(), 50);
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_max_pages() {
        let pages = (0..5).map(|i| page(10_000 - i * 100, 100)).collect();
        let source = ScriptedSource::pages(pages);
        let window = TimeWindow::new(at(0), Some(at(10_000)));
        let options = CollectOptions {
            max_pages: 3,
            ..CollectOptions::default()
        };

        let messages = collect(&source, window, options).await.unwrap();

        assert_eq!(messages.len(), 300);
        let requests = source.requests();
        assert_eq!(requests.len(), 3);
        // Each page starts below the oldest id of the previous one.
        assert_eq!(requests[1].before, Some(Snowflake::new(9_901)));
        assert_eq!(requests[2].before, Some(Snowflake::new(9_801)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_pages_fetches_nothing() {
        let source = ScriptedSource::pages(vec![page(1000, 100)]);
        let window = TimeWindow::new(at(0), Some(at(1000)));
        let options = CollectOptions {
            max_pages: 0,
            ..CollectOptions::default()
        };

        let messages = collect(&source, window, options).await.unwrap();
        assert!(messages.is_empty());
        assert!(source.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_pages_are_deduplicated() {
        // Second page repeats id 901, the oldest of the first page.
        let source = ScriptedSource::pages(vec![page(1000, 100), page(901, 100)]);
        let window = TimeWindow::new(at(0), Some(at(1000)));

        let messages = collect(&source, window, CollectOptions::default()).await.unwrap();

        assert_eq!(messages.len(), 199);
        assert_eq!(ids(&messages).iter().filter(|&&id| id == 901).count(), 1);
        assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_first_page() {
        let source = ScriptedSource::pages(vec![Vec::new()]);
        let window = TimeWindow::new(at(0), Some(at(1000)));

        let messages = collect(&source, window, CollectOptions::default()).await.unwrap();

        assert!(messages.is_empty());
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_page_ends_scan() {
        let source = ScriptedSource::pages(vec![page(1000, 40), page(960, 100)]);
        let window = TimeWindow::new(at(0), Some(at(1000)));

        let messages = collect(&source, window, CollectOptions::default()).await.unwrap();

        assert_eq!(messages.len(), 40);
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_after_window_end_are_dropped() {
        let source = ScriptedSource::pages(vec![vec![
            message(3, 30),
            message(2, 20),
            message(1, 10),
        ]]);
        let window = TimeWindow::new(at(10), Some(at(20)));

        let messages = collect(&source, window, CollectOptions::default()).await.unwrap();

        assert_eq!(ids(&messages), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inverted_window_is_empty() {
        let source = ScriptedSource::pages(vec![page(1000, 100)]);
        let window = TimeWindow::new(at(2000), Some(at(1000)));

        let messages = collect(&source, window, CollectOptions::default()).await.unwrap();

        assert!(messages.is_empty());
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_discards_partial_results() {
        let source = ScriptedSource::new(vec![
            Ok(FetchOutcome::Ready(page(1000, 100))),
            Err(RecapError::Auth),
        ]);
        let window = TimeWindow::new(at(0), Some(at(1000)));

        let err = collect(&source, window, CollectOptions::default()).await.unwrap_err();
        assert!(matches!(err, RecapError::Auth));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_delay_applies_between_pages_only() {
        let source = ScriptedSource::pages(vec![page(1000, 100), page(900, 100), page(800, 100)]);
        let window = TimeWindow::new(at(0), Some(at(1000)));

        let start = Instant::now();
        collect(&source, window, CollectOptions::default()).await.unwrap();

        // Three full pages, then the empty one that ends the scan.
        assert_eq!(source.requests().len(), 4);
        assert!(start.elapsed() >= DEFAULT_PAGE_DELAY * 3);
        assert!(start.elapsed() < DEFAULT_PAGE_DELAY * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_wait_adds_to_page_delay() {
        let source = ScriptedSource::new(vec![
            Ok(FetchOutcome::Ready(page(1000, 100))),
            Ok(FetchOutcome::RateLimited(Duration::from_secs(2))),
            Ok(FetchOutcome::Ready(page(900, 10))),
        ]);
        let window = TimeWindow::new(at(0), Some(at(1000)));

        let start = Instant::now();
        let messages = collect(&source, window, CollectOptions::default()).await.unwrap();

        assert_eq!(messages.len(), 110);
        assert!(start.elapsed() >= Duration::from_secs(2) + DEFAULT_PAGE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_messages() {
        let source = ScriptedSource::pages(vec![page(1000, 100), page(900, 5)]);
        let window = TimeWindow::new(at(0), Some(at(1000)));
        let seen = Mutex::new(Vec::new());
        let sink = |m: &str| seen.lock().unwrap().push(m.to_string());

        collect_window(&source, "chan", "token", window, &sink, &CollectOptions::default())
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "Fetching page 1...",
                "Fetching page 2...",
                "Found 105 unique messages",
            ]
        );
    }
}
