//! Tracking Store contract.
//!
//! The scheduler only needs three operations from whatever persists popup
//! history. The table is append-only in practice: `record_shown` always
//! inserts, and readers treat the most recent row per fingerprint as
//! authoritative.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use crate::db::models::TrackingRecord;

#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Fetch the most recent record for a fingerprint. Ordering by
    /// `last_shown` descending and the limit of one are part of the
    /// contract, not an assumption about insertion order.
    async fn latest_for_fingerprint(&self, fingerprint: &str)
        -> Result<Option<TrackingRecord>>;

    /// Append a new shown record. Never updates existing rows.
    async fn record_shown(&self, fingerprint: &str, shown_at: DateTime<Utc>) -> Result<()>;

    /// Flip `email_captured` on the most recent record for a fingerprint.
    /// Called by the capture flow after a successful email submission.
    async fn mark_email_captured(&self, fingerprint: &str) -> Result<()>;
}
