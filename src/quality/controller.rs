use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    db::SleepQuality,
    event::{EventReceiver, OneShot},
    operation::{completion, guarded, Completion, ControllerScope, Done, Operation, StoreFailure},
    store::{SleepStore, StoreError, StoreResult},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

struct RateCommand {
    quality: SleepQuality,
    done: Done,
}

#[derive(Default)]
struct QualityEvents {
    navigate_to_tracker: OneShot<()>,
    failure: OneShot<StoreFailure>,
}

/// Rates one past session, then signals the display to return to the tracker.
pub struct SleepQualityController {
    session_id: i64,
    commands: mpsc::UnboundedSender<RateCommand>,
    events: Arc<QualityEvents>,
    scope: ControllerScope,
}

impl SleepQualityController {
    pub fn new(session_id: i64, store: Arc<dyn SleepStore>, parent: &CancellationToken) -> Self {
        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel::<RateCommand>();
        let events = Arc::new(QualityEvents::default());

        let worker_events = Arc::clone(&events);
        let scope = ControllerScope::spawn(parent, move |token| async move {
            loop {
                let command = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    command = commands_rx.recv() => match command {
                        Some(command) => command,
                        None => break,
                    },
                };

                match rate(&token, store.as_ref(), session_id, command.quality).await {
                    Ok(true) => worker_events.navigate_to_tracker.fire(()),
                    Ok(false) => {}
                    Err(StoreError::Cancelled) => {
                        log_debug!("rating of session {session_id} abandoned by teardown");
                        break;
                    }
                    Err(StoreError::NotFound(id)) => {
                        log_warn!("rating dropped: session {id} no longer exists");
                    }
                    Err(StoreError::Unavailable(message)) => {
                        log_error!("rating session {session_id} failed: {message}");
                        worker_events.failure.fire(StoreFailure {
                            operation: Operation::Rate,
                            message,
                        });
                    }
                }
                let _ = command.done.send(());
            }
        });

        Self {
            session_id,
            commands: commands_tx,
            events,
            scope,
        }
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// Silently dropped when the session was deleted in the meantime.
    pub fn set_rating(&self, quality: SleepQuality) -> Completion {
        let (done, completion) = completion();
        if self.scope.is_cancelled() {
            log_warn!("quality controller already torn down; ignoring rating");
            return completion;
        }
        if self.commands.send(RateCommand { quality, done }).is_err() {
            log_warn!("quality worker gone; dropping rating");
        }
        completion
    }

    /// `true` once the rating was stored and the display should go back.
    pub fn navigation_event(&self) -> bool {
        self.events.navigate_to_tracker.is_pending()
    }

    pub fn navigation_events(&self) -> EventReceiver<()> {
        self.events.navigate_to_tracker.subscribe()
    }

    pub fn acknowledge_navigation(&self) -> bool {
        self.events.navigate_to_tracker.acknowledge()
    }

    pub fn failure_event(&self) -> Option<StoreFailure> {
        self.events.failure.pending()
    }

    pub fn failure_events(&self) -> EventReceiver<StoreFailure> {
        self.events.failure.subscribe()
    }

    pub fn acknowledge_failure(&self) -> bool {
        self.events.failure.acknowledge()
    }

    pub async fn shutdown(mut self) {
        self.scope.shutdown().await;
    }
}

/// Returns `Ok(false)` when the session is gone and nothing was written.
async fn rate(
    token: &CancellationToken,
    store: &dyn SleepStore,
    session_id: i64,
    quality: SleepQuality,
) -> StoreResult<bool> {
    let Some(mut night) = guarded(token, store.fetch_by_id(session_id)).await? else {
        log_warn!("rating dropped: session {session_id} no longer exists");
        return Ok(false);
    };

    night.quality = quality.as_i32();
    guarded(token, store.update(&night)).await?;
    log_info!("Rated sleep session {session_id} as {quality}");
    Ok(true)
}
