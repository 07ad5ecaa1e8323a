//! Sync checkpoint timestamp.
//!
//! A checkpoint is the high-water mark of `updated_at` values already pushed
//! into the search index. Rows strictly newer than the checkpoint are picked up
//! by the next pass.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a checkpoint string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid checkpoint timestamp '{0}'")]
pub struct CheckpointParseError(pub String);

/// Last processed modification timestamp.
///
/// Serialized as an RFC 3339 string with microsecond precision, which matches
/// the resolution of Postgres `timestamptz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(DateTime<Utc>);

impl Checkpoint {
    /// Create a checkpoint from a UTC timestamp.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// The Unix epoch, used when nothing else is configured.
    pub fn epoch() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// The underlying timestamp, bound as the `since` query parameter.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parse a checkpoint from its textual form.
    ///
    /// Accepts RFC 3339 (`2021-06-16T20:14:09.221838Z`), the Postgres text
    /// form (`2021-06-16 20:14:09.221838+00`), a naive timestamp which is
    /// read as UTC, or a bare date meaning midnight UTC.
    pub fn parse(value: &str) -> Result<Self, CheckpointParseError> {
        let value = value.trim();

        if let Ok(at) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self(at.with_timezone(&Utc)));
        }

        if let Ok(at) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
            return Ok(Self(at.with_timezone(&Utc)));
        }

        if let Ok(at) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(Self(at.and_utc()));
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|at| Self(at.and_utc()))
            .ok_or_else(|| CheckpointParseError(value.to_string()))
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::epoch()
    }
}

impl From<DateTime<Utc>> for Checkpoint {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl FromStr for Checkpoint {
    type Err = CheckpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl Serialize for Checkpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Checkpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339() {
        let checkpoint = Checkpoint::parse("2021-06-16T20:14:09.221838Z").unwrap();
        assert_eq!(checkpoint.to_string(), "2021-06-16T20:14:09.221838Z");
    }

    #[test]
    fn test_parse_postgres_text_form() {
        let checkpoint = Checkpoint::parse("2021-06-16 20:14:09.221838+00").unwrap();
        assert_eq!(checkpoint.to_string(), "2021-06-16T20:14:09.221838Z");

        let shifted = Checkpoint::parse("2021-06-16 23:14:09+03").unwrap();
        assert_eq!(shifted.to_string(), "2021-06-16T20:14:09.000000Z");
    }

    #[test]
    fn test_parse_bare_date() {
        let checkpoint = Checkpoint::parse("1970-01-01").unwrap();
        assert_eq!(checkpoint, Checkpoint::epoch());
    }

    #[test]
    fn test_parse_invalid() {
        let result = Checkpoint::parse("yesterday");
        assert_eq!(
            result.unwrap_err(),
            CheckpointParseError("yesterday".to_string())
        );
    }

    #[test]
    fn test_ordering_follows_time() {
        let earlier = Checkpoint::new(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let later = Checkpoint::new(Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap());
        assert!(earlier < later);
        assert_eq!(earlier.max(later), later);
    }

    #[test]
    fn test_serde_as_string() {
        let checkpoint = Checkpoint::parse("2023-05-01T10:00:00Z").unwrap();
        let json = serde_json::to_string(&checkpoint).unwrap();
        assert_eq!(json, "\"2023-05-01T10:00:00.000000Z\"");

        let back: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, checkpoint);
    }
}
