pub mod session;

pub use session::{InvalidQuality, SessionRecord, SleepQuality, UNRATED};
