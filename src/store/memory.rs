use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use crate::db::SessionRecord;

use super::{SleepStore, StoreError, StoreResult};

struct MemoryInner {
    next_id: i64,
    records: BTreeMap<i64, SessionRecord>,
}

/// Process-local store with the same ordering rules as the SQLite one.
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    feed: watch::Sender<Vec<SessionRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Self {
            inner: Mutex::new(MemoryInner {
                next_id: 1,
                records: BTreeMap::new(),
            }),
            feed,
        }
    }

    fn publish(&self, inner: &MemoryInner) {
        self.feed.send_replace(newest_first(inner));
    }
}

fn newest_first(inner: &MemoryInner) -> Vec<SessionRecord> {
    let mut records: Vec<SessionRecord> = inner.records.values().cloned().collect();
    records.sort_by(|a, b| {
        b.start_time_ms
            .cmp(&a.start_time_ms)
            .then_with(|| b.id.cmp(&a.id))
    });
    records
}

#[async_trait]
impl SleepStore for MemoryStore {
    async fn insert(&self, record: SessionRecord) -> StoreResult<i64> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.records.insert(id, SessionRecord { id, ..record });
        self.publish(&inner);
        Ok(id)
    }

    async fn update(&self, record: &SessionRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        match inner.records.get_mut(&record.id) {
            Some(stored) => *stored = record.clone(),
            None => return Err(StoreError::NotFound(record.id)),
        }
        self.publish(&inner);
        Ok(())
    }

    async fn fetch_latest(&self) -> StoreResult<Option<SessionRecord>> {
        let inner = self.inner.lock().await;
        Ok(newest_first(&inner).into_iter().next())
    }

    async fn fetch_by_id(&self, id: i64) -> StoreResult<Option<SessionRecord>> {
        Ok(self.inner.lock().await.records.get(&id).cloned())
    }

    fn observe_all(&self) -> watch::Receiver<Vec<SessionRecord>> {
        self.feed.subscribe()
    }

    async fn clear_all(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.records.clear();
        self.publish(&inner);
        Ok(())
    }
}
