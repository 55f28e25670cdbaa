use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    db::SessionRecord,
    event::{EventReceiver, OneShot},
    operation::ControllerScope,
    store::SleepStore,
};

fn find(records: &[SessionRecord], session_id: i64) -> Option<SessionRecord> {
    records.iter().find(|night| night.id == session_id).cloned()
}

/// Read-only view of one past session plus a "close" navigation event.
pub struct SleepDetailController {
    session_id: i64,
    session: watch::Receiver<Option<SessionRecord>>,
    navigate_to_tracker: Arc<OneShot<()>>,
    scope: ControllerScope,
}

impl SleepDetailController {
    pub fn new(session_id: i64, store: Arc<dyn SleepStore>, parent: &CancellationToken) -> Self {
        let mut feed = store.observe_all();
        let initial = find(&feed.borrow_and_update(), session_id);
        let (session_tx, session_rx) = watch::channel(initial);

        let scope = ControllerScope::spawn(parent, move |token| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    changed = feed.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let night = find(&feed.borrow_and_update(), session_id);
                        session_tx.send_if_modified(|current| {
                            if *current == night {
                                return false;
                            }
                            *current = night;
                            true
                        });
                    }
                }
            }
        });

        Self {
            session_id,
            session: session_rx,
            navigate_to_tracker: OneShot::shared(),
            scope,
        }
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// The session as currently stored; `None` once it has been deleted.
    pub fn session(&self) -> Option<SessionRecord> {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionRecord>> {
        self.session.clone()
    }

    pub fn close(&self) {
        self.navigate_to_tracker.fire(());
    }

    pub fn navigation_event(&self) -> bool {
        self.navigate_to_tracker.is_pending()
    }

    pub fn navigation_events(&self) -> EventReceiver<()> {
        self.navigate_to_tracker.subscribe()
    }

    pub fn acknowledge_navigation(&self) -> bool {
        self.navigate_to_tracker.acknowledge()
    }

    pub async fn shutdown(mut self) {
        self.scope.shutdown().await;
    }
}
