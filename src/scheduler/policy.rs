use chrono::{DateTime, Utc};

use crate::db::models::TrackingRecord;

/// The show decision, evaluated once per session.
///
/// Show iff no record exists for the fingerprint, or the most recent record
/// has not converted and its `last_shown` is older than the cooldown window.
/// A record with `email_captured` set suppresses forever, regardless of age.
pub fn should_show(
    record: Option<&TrackingRecord>,
    now: DateTime<Utc>,
    cooldown_ms: u64,
) -> bool {
    match record {
        None => true,
        Some(record) if record.email_captured => false,
        Some(record) => {
            let elapsed_ms = now
                .signed_duration_since(record.last_shown)
                .num_milliseconds();
            elapsed_ms > cooldown_ms as i64
        }
    }
}
