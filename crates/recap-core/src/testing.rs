//! Fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::RecapResult;
use crate::history::{FetchOutcome, PageRequest, PageSource};
use crate::message::{Author, Message};
use crate::snowflake::Snowflake;

/// 2024-01-01T00:00:00Z plus `secs`.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
}

pub fn message(id: u64, secs: i64) -> Message {
    Message {
        id: Snowflake::new(id),
        timestamp: at(secs),
        author: Some(Author {
            username: format!("user{}", id % 3),
        }),
        content: Some(format!("message {}", id)),
    }
}

/// `count` messages newest first, the newest at `newest_secs`, one second apart.
/// Ids equal their timestamp offset so they stay unique across pages.
pub fn page(newest_secs: i64, count: usize) -> Vec<Message> {
    (0..count as i64)
        .map(|i| message((newest_secs - i) as u64, newest_secs - i))
        .collect()
}

/// Replays a fixed script of outcomes and records every request.
/// Once the script runs out every request gets an empty page.
pub struct ScriptedSource {
    script: Mutex<VecDeque<RecapResult<FetchOutcome<Vec<Message>>>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<RecapResult<FetchOutcome<Vec<Message>>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn pages(pages: Vec<Vec<Message>>) -> Self {
        Self::new(pages.into_iter().map(|p| Ok(FetchOutcome::Ready(p))).collect())
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn request_page(&self, request: &PageRequest) -> RecapResult<FetchOutcome<Vec<Message>>> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(FetchOutcome::Ready(Vec::new())))
    }
}
