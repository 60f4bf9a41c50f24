use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PopupPhase {
    Idle,
    Armed,
    Deciding,
    Shown,
    Suppressed,
    Closed,
}

impl Default for PopupPhase {
    fn default() -> Self {
        PopupPhase::Idle
    }
}

/// Per-session scheduler state. One instance per page session; never shared
/// across mounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupState {
    pub phase: PopupPhase,
    /// Sticky for the session: once true, further scroll traffic is ignored.
    pub has_scrolled: bool,
    pub armed_at: Option<DateTime<Utc>>,
    pub shown_at: Option<DateTime<Utc>>,
}

impl Default for PopupState {
    fn default() -> Self {
        Self {
            phase: PopupPhase::Idle,
            has_scrolled: false,
            armed_at: None,
            shown_at: None,
        }
    }
}

impl PopupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Armed. Returns false (and changes nothing) once the session
    /// has already scrolled.
    pub fn arm(&mut self, now: DateTime<Utc>) -> bool {
        if self.has_scrolled || self.phase != PopupPhase::Idle {
            return false;
        }
        self.has_scrolled = true;
        self.phase = PopupPhase::Armed;
        self.armed_at = Some(now);
        true
    }

    pub fn begin_decision(&mut self) {
        if self.phase == PopupPhase::Armed {
            self.phase = PopupPhase::Deciding;
        }
    }

    pub fn show(&mut self, now: DateTime<Utc>) {
        self.phase = PopupPhase::Shown;
        self.shown_at = Some(now);
    }

    pub fn suppress(&mut self) {
        self.phase = PopupPhase::Suppressed;
    }

    /// Shown -> Closed, driven by the UI. Returns false from any other phase;
    /// the scheduler never re-arms afterwards.
    pub fn close(&mut self) -> bool {
        if self.phase != PopupPhase::Shown {
            return false;
        }
        self.phase = PopupPhase::Closed;
        true
    }
}
