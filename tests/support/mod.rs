#![allow(dead_code)]

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use sleeptracker_lib::{
    store::{MemoryStore, SleepStore, StoreError, StoreResult},
    Clock, SessionRecord,
};
use tokio::sync::{watch, Notify};

pub const T0: i64 = 1_700_000_000_000;

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn at(now_ms: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now_ms)))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Memory store that counts calls, can hold inserts until released and can
/// fail writes on demand.
#[derive(Default)]
pub struct TestStore {
    pub inner: MemoryStore,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub fetches: AtomicUsize,
    pub clears: AtomicUsize,
    gate_inserts: AtomicBool,
    pub insert_entered: Notify,
    pub insert_release: Notify,
    fail_writes: AtomicBool,
}

impl TestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gate_inserts(&self) {
        self.gate_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk unplugged".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SleepStore for TestStore {
    async fn insert(&self, record: SessionRecord) -> StoreResult<i64> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.gate_inserts.load(Ordering::SeqCst) {
            self.insert_entered.notify_one();
            self.insert_release.notified().await;
        }
        self.check_writable()?;
        self.inner.insert(record).await
    }

    async fn update(&self, record: &SessionRecord) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.update(record).await
    }

    async fn fetch_latest(&self) -> StoreResult<Option<SessionRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_latest().await
    }

    async fn fetch_by_id(&self, id: i64) -> StoreResult<Option<SessionRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_by_id(id).await
    }

    fn observe_all(&self) -> watch::Receiver<Vec<SessionRecord>> {
        self.inner.observe_all()
    }

    async fn clear_all(&self) -> StoreResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.clear_all().await
    }
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}
