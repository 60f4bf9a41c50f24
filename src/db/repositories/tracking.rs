use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::parse_datetime, models::TrackingRecord};
use crate::store::TrackingStore;

fn row_to_record(row: &Row) -> Result<TrackingRecord> {
    let last_shown: String = row.get("last_shown")?;

    Ok(TrackingRecord {
        fingerprint: row.get("fingerprint")?,
        last_shown: parse_datetime(&last_shown, "last_shown")?,
        email_captured: row.get("email_captured")?,
    })
}

impl Database {
    /// Most recent tracking row for a fingerprint. The ordering and the limit
    /// are the contract; insertion order is never assumed.
    pub async fn latest_tracking_for_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<TrackingRecord>> {
        let fingerprint = fingerprint.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT fingerprint, last_shown, email_captured
                 FROM email_popup_tracking
                 WHERE fingerprint = ?1
                 ORDER BY last_shown DESC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query(params![fingerprint])?;
            let record = match rows.next()? {
                Some(row) => Some(row_to_record(row)?),
                None => None,
            };
            Ok(record)
        })
        .await
    }

    /// Append a shown row. The table is append-only; older rows stay behind
    /// and are ignored by readers.
    pub async fn insert_tracking_shown(
        &self,
        fingerprint: &str,
        shown_at: DateTime<Utc>,
    ) -> Result<()> {
        let fingerprint = fingerprint.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO email_popup_tracking (fingerprint, last_shown, email_captured, created_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![
                    fingerprint,
                    shown_at.to_rfc3339(),
                    shown_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Flip `email_captured` on the most recent row for a fingerprint.
    pub async fn mark_tracking_captured(&self, fingerprint: &str) -> Result<()> {
        let fingerprint = fingerprint.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE email_popup_tracking
                 SET email_captured = 1
                 WHERE id = (SELECT id FROM email_popup_tracking
                             WHERE fingerprint = ?1
                             ORDER BY last_shown DESC
                             LIMIT 1)",
                params![fingerprint],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl TrackingStore for Database {
    async fn latest_for_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<TrackingRecord>> {
        self.latest_tracking_for_fingerprint(fingerprint).await
    }

    async fn record_shown(&self, fingerprint: &str, shown_at: DateTime<Utc>) -> Result<()> {
        self.insert_tracking_shown(fingerprint, shown_at).await
    }

    async fn mark_email_captured(&self, fingerprint: &str) -> Result<()> {
        self.mark_tracking_captured(fingerprint).await
    }
}
