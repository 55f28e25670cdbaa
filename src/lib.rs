pub mod clock;
pub mod config;
mod console;
pub mod db;
pub mod detail;
pub mod event;
pub mod operation;
pub mod quality;
pub mod store;
pub mod tracker;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use clock::SystemClock;
use config::Config;
use db::Database;
use store::{MemoryStore, SleepStore};
use tokio_util::sync::CancellationToken;

pub use clock::Clock;
pub use db::{SessionRecord, SleepQuality};
pub use detail::SleepDetailController;
pub use event::{EventReceiver, OneShot};
pub use operation::{Completion, Operation, StoreFailure};
pub use quality::SleepQualityController;
pub use store::{StoreError, StoreResult};
pub use tracker::{SleepTrackerController, TrackerSnapshot};

pub fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Initialize logging (reads RUST_LOG env var)
    let default_level = if config.verbose() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    log::info!("Sleep tracker starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let store: Arc<dyn SleepStore> = if config.settings.in_memory {
            log::warn!("Using in-memory storage; nights will not survive a restart");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(Database::new(config.database_path())?)
        };

        let scope = CancellationToken::new();
        let result = console::run_console(store, Arc::new(SystemClock), &scope).await;
        scope.cancel();
        result
    })
}
