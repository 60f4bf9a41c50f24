pub mod signup;
pub mod tracking;

pub use signup::EmailSignup;
pub use tracking::TrackingRecord;
