//! The persistence contract the controllers depend on.
//!
//! Controllers only ever see `Arc<dyn SleepStore>`; the SQLite-backed
//! [`crate::db::Database`] and the in-process [`MemoryStore`] both implement it.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::db::SessionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The underlying medium could not be reached or the statement failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("session {0} not found")]
    NotFound(i64),
    /// The caller's scope was torn down before the operation finished.
    #[error("operation cancelled")]
    Cancelled,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SleepStore: Send + Sync + 'static {
    /// Inserts `record` and returns the id assigned to it.
    async fn insert(&self, record: SessionRecord) -> StoreResult<i64>;

    /// Replaces the stored record with the same id.
    async fn update(&self, record: &SessionRecord) -> StoreResult<()>;

    /// The record with the greatest start time, if any.
    async fn fetch_latest(&self) -> StoreResult<Option<SessionRecord>>;

    async fn fetch_by_id(&self, id: i64) -> StoreResult<Option<SessionRecord>>;

    /// Live view of every record, newest first. Refreshed after each
    /// successful mutation.
    fn observe_all(&self) -> watch::Receiver<Vec<SessionRecord>>;

    async fn clear_all(&self) -> StoreResult<()>;
}
