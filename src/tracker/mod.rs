pub mod controller;
pub mod format;
pub mod state;

pub use controller::SleepTrackerController;
pub use state::{TrackerSnapshot, TrackerState};
