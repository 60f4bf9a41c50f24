use serde::{Deserialize, Serialize};

/// Tunable thresholds for the popup scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Vertical scroll offset (px) that arms the show pipeline
    pub scroll_threshold_px: f64,

    /// Delay between arming and evaluating the show decision
    pub arm_delay_ms: u64,

    /// Minimum elapsed time before a previously-shown, non-converted
    /// fingerprint may be re-prompted
    pub cooldown_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scroll_threshold_px: 100.0,
            arm_delay_ms: 3_000,
            cooldown_ms: 86_400_000,
        }
    }
}
