use async_trait::async_trait;
use tokio::sync::watch;

use crate::store::{SleepStore, StoreError, StoreResult};

use super::{connection::Database, models::SessionRecord};

fn unavailable(err: anyhow::Error) -> StoreError {
    StoreError::Unavailable(format!("{err:#}"))
}

#[async_trait]
impl SleepStore for Database {
    async fn insert(&self, record: SessionRecord) -> StoreResult<i64> {
        self.insert_night(&record).await.map_err(unavailable)
    }

    async fn update(&self, record: &SessionRecord) -> StoreResult<()> {
        match self.update_night(record).await.map_err(unavailable)? {
            0 => Err(StoreError::NotFound(record.id)),
            _ => Ok(()),
        }
    }

    async fn fetch_latest(&self) -> StoreResult<Option<SessionRecord>> {
        self.get_latest_night().await.map_err(unavailable)
    }

    async fn fetch_by_id(&self, id: i64) -> StoreResult<Option<SessionRecord>> {
        self.get_night(id).await.map_err(unavailable)
    }

    fn observe_all(&self) -> watch::Receiver<Vec<SessionRecord>> {
        self.feed().subscribe()
    }

    async fn clear_all(&self) -> StoreResult<()> {
        self.clear_nights().await.map_err(unavailable)
    }
}
