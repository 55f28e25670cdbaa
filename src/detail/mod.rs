pub mod controller;

pub use controller::SleepDetailController;
