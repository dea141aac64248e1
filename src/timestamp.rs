use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a client-supplied ISO-8601 timestamp. Values with `Z` or a numeric
/// offset are converted to UTC; naive date-times and bare dates are taken as
/// UTC.
pub fn parse_client_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Creation time for a new record: the parsed client value, or `now` when it
/// is absent or unparsable.
pub fn resolve_created_at(input: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match input {
        None => now,
        Some(raw) => parse_client_timestamp(raw).unwrap_or_else(|| {
            tracing::error!("Unparsable created_at {raw:?}; using current time");
            now
        }),
    }
}
