//! Time handling for dataset timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse a dataset timestamp.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (assumed UTC) or a
/// bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Format an instant the way dataset dates are keyed (`YYYY-MM-DD`).
pub fn date_key(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Index of the timestamp closest to `target`.
///
/// Linear scan; on equal distance the earlier index wins. Returns `None`
/// only for an empty slice.
pub fn nearest_index(times: &[DateTime<Utc>], target: DateTime<Utc>) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;

    for (i, t) in times.iter().enumerate() {
        let diff = (*t - target).num_milliseconds().abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((i, diff)),
        }
    }

    best.map(|(i, _)| i)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}
