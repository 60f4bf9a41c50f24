use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A captured email submission, written by the capture flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSignup {
    pub id: String,
    pub email: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl EmailSignup {
    pub fn new(email: String, fingerprint: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            fingerprint,
            created_at: Utc::now(),
        }
    }
}
