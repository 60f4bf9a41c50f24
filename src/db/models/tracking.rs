//! Popup tracking data model.
//!
//! One row per shown popup, keyed by fingerprint. The table is append-only;
//! the most recent row for a fingerprint is the authoritative one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub fingerprint: String,
    pub last_shown: DateTime<Utc>,
    pub email_captured: bool,
}
