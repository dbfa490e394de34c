use chrono::{DateTime, Utc};

/// Formats a millisecond UTC timestamp as the `YYYY-MM-DD` key `CarryoverStore`
/// and the midnight-rollover logic in `StepIntegrator` key off of.
pub fn date_key_for_ts_ms(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp_millis(0).unwrap())
        .format("%Y-%m-%d")
        .to_string()
}
