pub mod controller;
pub mod policy;
mod session_loop;
pub mod state;

pub use controller::{scroll_channel, PopupScheduler};
pub use state::{PopupPhase, PopupState};
