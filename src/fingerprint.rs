//! Session fingerprint derivation.
//!
//! The fingerprint is a low-entropy tracking key, not an identity: two devices
//! with identical specs collide, and that is accepted. It only has to be
//! deterministic for one browser/device/timezone combination.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// The observable traits of a visiting session that feed the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    pub user_agent: String,
    pub language: String,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Timezone offset in minutes, as reported by the client
    pub timezone_offset_min: i32,
}

impl SessionProfile {
    /// Derive the opaque tracking token for this profile.
    pub fn fingerprint(&self) -> String {
        let raw = format!(
            "{}-{}-{}-{}-{}",
            self.user_agent,
            self.language,
            self.screen_width,
            self.screen_height,
            self.timezone_offset_min
        );
        STANDARD.encode(raw)
    }
}
