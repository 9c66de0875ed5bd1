//! Date and timestamp helpers.
//!
//! Outgoing values use the API's plain formats (`YYYY-MM-DDTHH:MM:SS` and
//! `YYYY-MM-DD`). When no value is given the current time is taken at the
//! caller's configured UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current wall-clock time at `offset`.
pub fn now_at(offset: &FixedOffset) -> NaiveDateTime {
    Utc::now().with_timezone(offset).naive_local()
}

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Render `dt` as `YYYY-MM-DDTHH:MM:SS`, defaulting to now at `offset`.
pub fn datetime_to_string(dt: Option<NaiveDateTime>, offset: &FixedOffset) -> String {
    format_datetime(&dt.unwrap_or_else(|| now_at(offset)))
}

/// Render `date` as `YYYY-MM-DD`, defaulting to today at `offset`.
pub fn date_to_string(date: Option<NaiveDate>, offset: &FixedOffset) -> String {
    format_date(&date.unwrap_or_else(|| now_at(offset).date()))
}

/// Parse a timestamp as sent by the API.
///
/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates
/// (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| format!("invalid timestamp: {raw:?}"))
}

/// Serde adapter for optional record timestamps.
pub mod timestamp_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse_timestamp(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Serialize an optional date in request bodies as `YYYY-MM-DD`.
pub(crate) fn serialize_date_opt<S: Serializer>(
    value: &Option<NaiveDate>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(date) => serializer.serialize_str(&format_date(date)),
        None => serializer.serialize_none(),
    }
}
