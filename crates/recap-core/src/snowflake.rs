//! Time-ordered message ids ("snowflakes").
//!
//! The high 42 bits of an id hold milliseconds since [`EPOCH_MS`]. Ids built
//! here leave the low 22 bits (worker, process, increment) zeroed: they only
//! ever bound a range, never name a real message.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RecapError, RecapResult};

/// 2015-01-01T00:00:00Z in Unix milliseconds.
pub const EPOCH_MS: i64 = 1_420_070_400_000;

const TIMESTAMP_SHIFT: u32 = 22;
const MAX_TIMESTAMP_MS: i64 = (1 << 42) - 1;

/// A 64-bit time-ordered id. Serialized as a decimal string, as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Snowflake(u64);

impl Snowflake {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Creation instant encoded in this id.
    pub fn timestamp(self) -> RecapResult<DateTime<Utc>> {
        from_cursor(self)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = RecapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Snowflake)
            .map_err(|_| RecapError::InvalidCursor(format!("not a snowflake: {:?}", s)))
    }
}

impl TryFrom<String> for Snowflake {
    type Error = RecapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Snowflake> for String {
    fn from(value: Snowflake) -> Self {
        value.0.to_string()
    }
}

/// Smallest id created at or after `instant`.
///
/// Fails for instants before the epoch or past the 42-bit timestamp range.
pub fn to_cursor(instant: DateTime<Utc>) -> RecapResult<Snowflake> {
    let offset = instant.timestamp_millis() - EPOCH_MS;
    if !(0..=MAX_TIMESTAMP_MS).contains(&offset) {
        return Err(RecapError::InvalidCursor(format!(
            "{} is outside the snowflake time range",
            instant.to_rfc3339()
        )));
    }
    Ok(Snowflake((offset as u64) << TIMESTAMP_SHIFT))
}

/// Instant encoded in `cursor`, at millisecond precision.
pub fn from_cursor(cursor: Snowflake) -> RecapResult<DateTime<Utc>> {
    let offset = (cursor.0 >> TIMESTAMP_SHIFT) as i64;
    EPOCH_MS
        .checked_add(offset)
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .ok_or_else(|| RecapError::InvalidCursor(format!("{} decodes to no valid instant", cursor)))
}
