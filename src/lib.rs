//! Scroll-gated email capture popup scheduler.
//!
//! One `PopupScheduler` per page session consumes a scroll-offset signal,
//! waits out a short delay after the first meaningful scroll, then asks the
//! Tracking Store whether this fingerprint should see the email modal again.
//! Store failures degrade to "don't show"; a failed tracking write never
//! takes back an already-shown popup.

pub mod config;
pub mod db;
pub mod fingerprint;
pub mod scheduler;
pub mod settings;
pub mod store;
mod utils;

pub use config::SchedulerConfig;
pub use db::Database;
pub use fingerprint::SessionProfile;
pub use scheduler::{scroll_channel, PopupPhase, PopupScheduler};
pub use settings::SettingsStore;
pub use store::{TrackingRecord, TrackingStore};
pub use utils::logging::init as init_logging;
