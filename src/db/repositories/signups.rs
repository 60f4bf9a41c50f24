use anyhow::Result;
use rusqlite::params;

use crate::db::{connection::Database, helpers::parse_datetime, models::EmailSignup};

impl Database {
    pub async fn insert_signup(&self, signup: &EmailSignup) -> Result<()> {
        let record = signup.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO email_signups (id, email, fingerprint, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    record.email,
                    record.fingerprint,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn signups_for_fingerprint(&self, fingerprint: &str) -> Result<Vec<EmailSignup>> {
        let fingerprint = fingerprint.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, fingerprint, created_at
                 FROM email_signups
                 WHERE fingerprint = ?1
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query(params![fingerprint])?;
            let mut signups = Vec::new();
            while let Some(row) = rows.next()? {
                let created_at: String = row.get("created_at")?;
                signups.push(EmailSignup {
                    id: row.get("id")?,
                    email: row.get("email")?,
                    fingerprint: row.get("fingerprint")?,
                    created_at: parse_datetime(&created_at, "created_at")?,
                });
            }
            Ok(signups)
        })
        .await
    }
}
