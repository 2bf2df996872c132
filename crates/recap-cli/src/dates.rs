//! Parsing of `--from` / `--to` values.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// RFC 3339 (explicit offset), or `YYYY-MM-DD HH:MM` / `YYYY-MM-DD` in local time.
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return local_to_utc(naive, input);
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return local_to_utc(date.and_time(NaiveTime::MIN), input);
    }

    bail!(
        "Cannot read {:?} as a date. Use RFC 3339, \"YYYY-MM-DD HH:MM\" or \"YYYY-MM-DD\".",
        input
    )
}

// Ambiguous local times (DST fall-back) resolve to the earlier instant.
fn local_to_utc(naive: NaiveDateTime, input: &str) -> Result<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("{:?} does not exist in the local time zone", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3339_keeps_offset() {
        let parsed = parse_instant("2024-03-01T09:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap());

        let parsed = parse_instant(" 2024-03-01T09:30:00Z ").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_local_forms() {
        let expected = Local
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_instant("2024-03-01 09:30").unwrap(), expected);

        let midnight = Local
            .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_instant("2024-03-01").unwrap(), midnight);
    }

    #[test]
    fn test_rejects_other_formats() {
        for input in ["yesterday", "03/01/2024", "2024-13-01", ""] {
            assert!(parse_instant(input).is_err(), "{:?} should not parse", input);
        }
    }
}
