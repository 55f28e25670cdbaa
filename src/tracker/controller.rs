use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    db::SessionRecord,
    event::{EventReceiver, OneShot},
    operation::{completion, guarded, Completion, ControllerScope, Done, Operation, StoreFailure},
    store::{SleepStore, StoreError, StoreResult},
};

use super::{TrackerSnapshot, TrackerState};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

enum Command {
    Start(Done),
    Stop(Done),
    Clear(Done),
}

impl Command {
    fn operation(&self) -> Operation {
        match self {
            Command::Start(_) => Operation::Start,
            Command::Stop(_) => Operation::Stop,
            Command::Clear(_) => Operation::Clear,
        }
    }
}

#[derive(Default)]
struct TrackerEvents {
    navigate_to_quality: OneShot<SessionRecord>,
    show_cleared: OneShot<()>,
    navigate_to_detail: OneShot<i64>,
    failure: OneShot<StoreFailure>,
}

/// Coordinates the tracked sleep session between the display and the store.
///
/// Mutating calls return immediately; the work runs on the controller's own
/// worker task, one operation at a time in submission order. Dropping the
/// controller (or cancelling the parent scope) abandons whatever is still in
/// flight without applying partial state.
pub struct SleepTrackerController {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<TrackerSnapshot>,
    events: Arc<TrackerEvents>,
    scope: ControllerScope,
}

impl SleepTrackerController {
    pub fn new(
        store: Arc<dyn SleepStore>,
        clock: Arc<dyn Clock>,
        parent: &CancellationToken,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(TrackerSnapshot::default());
        let events = Arc::new(TrackerEvents::default());

        let worker_events = Arc::clone(&events);
        let scope = ControllerScope::spawn(parent, move |token| {
            let feed = store.observe_all();
            let worker = TrackerWorker {
                store,
                clock,
                state: TrackerState::new(),
                feed,
                feed_open: true,
                snapshot_tx,
                events: worker_events,
                token,
            };
            worker.run(commands_rx)
        });

        Self {
            commands: commands_tx,
            snapshot: snapshot_rx,
            events,
            scope,
        }
    }

    /// Waits until the startup lookup of an in-flight session has finished.
    pub async fn ready(&self) {
        let mut rx = self.snapshot.clone();
        let _ = rx.wait_for(|snapshot| snapshot.initialized).await;
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshot.clone()
    }

    pub fn current(&self) -> Option<SessionRecord> {
        self.snapshot.borrow().current.clone()
    }

    pub fn history(&self) -> Vec<SessionRecord> {
        self.snapshot.borrow().history.clone()
    }

    pub fn formatted_history(&self) -> Vec<String> {
        self.snapshot.borrow().formatted_history.clone()
    }

    pub fn can_start(&self) -> bool {
        self.snapshot.borrow().can_start
    }

    pub fn can_stop(&self) -> bool {
        self.snapshot.borrow().can_stop
    }

    pub fn can_clear(&self) -> bool {
        self.snapshot.borrow().can_clear
    }

    pub fn start(&self) -> Completion {
        self.submit(Command::Start)
    }

    /// No-op when no session is active at the time the command runs.
    pub fn stop(&self) -> Completion {
        self.submit(Command::Stop)
    }

    pub fn clear(&self) -> Completion {
        self.submit(Command::Clear)
    }

    /// Ended session waiting to be handed to the rating step.
    pub fn navigation_event(&self) -> Option<SessionRecord> {
        self.events.navigate_to_quality.pending()
    }

    pub fn navigation_events(&self) -> EventReceiver<SessionRecord> {
        self.events.navigate_to_quality.subscribe()
    }

    pub fn acknowledge_navigation(&self) -> bool {
        self.events.navigate_to_quality.acknowledge()
    }

    /// `true` while a "history cleared" message is waiting to be shown.
    pub fn notification_event(&self) -> bool {
        self.events.show_cleared.is_pending()
    }

    pub fn notification_events(&self) -> EventReceiver<()> {
        self.events.show_cleared.subscribe()
    }

    pub fn acknowledge_notification(&self) -> bool {
        self.events.show_cleared.acknowledge()
    }

    /// Requests navigation to the detail view of a past session.
    pub fn select_session(&self, session_id: i64) {
        self.events.navigate_to_detail.fire(session_id);
    }

    pub fn detail_event(&self) -> Option<i64> {
        self.events.navigate_to_detail.pending()
    }

    pub fn detail_events(&self) -> EventReceiver<i64> {
        self.events.navigate_to_detail.subscribe()
    }

    pub fn acknowledge_detail_navigation(&self) -> bool {
        self.events.navigate_to_detail.acknowledge()
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

    /// Cancels outstanding work and waits for the worker to exit.
    pub async fn shutdown(mut self) {
        self.scope.shutdown().await;
    }

    fn submit(&self, command: fn(Done) -> Command) -> Completion {
        let (done, completion) = completion();
        let command = command(done);
        if self.scope.is_cancelled() {
            log_warn!("sleep tracker already torn down; ignoring {}", command.operation());
            return completion;
        }
        if let Err(err) = self.commands.send(command) {
            log_warn!(
                "sleep tracker worker gone; dropping {}",
                err.0.operation()
            );
        }
        completion
    }
}

struct TrackerWorker {
    store: Arc<dyn SleepStore>,
    clock: Arc<dyn Clock>,
    state: TrackerState,
    feed: watch::Receiver<Vec<SessionRecord>>,
    feed_open: bool,
    snapshot_tx: watch::Sender<TrackerSnapshot>,
    events: Arc<TrackerEvents>,
    token: CancellationToken,
}

impl TrackerWorker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        if !self.initialize().await {
            return;
        }

        let token = self.token.clone();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                changed = self.feed.changed(), if self.feed_open => {
                    if changed.is_err() {
                        log_warn!("store feed closed; history will no longer update");
                        self.feed_open = false;
                        continue;
                    }
                    self.publish();
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }

        log_debug!("sleep tracker worker exiting");
    }

    /// Seeds `current` from the store before any queued command runs.
    /// Returns `false` when torn down first.
    async fn initialize(&mut self) -> bool {
        let result = guarded(&self.token, self.store.fetch_latest()).await;
        match result {
            Ok(latest) => {
                if let Some(active) = latest.as_ref().filter(|night| night.is_active()) {
                    log_info!("Resuming active sleep session {}", active.id);
                }
                self.state.seed_current(latest);
            }
            Err(StoreError::Cancelled) => return false,
            Err(err) => self.report(Operation::Initialize, err),
        }
        self.state.initialized = true;
        self.publish();
        true
    }

    async fn handle(&mut self, command: Command) {
        let operation = command.operation();
        let (result, done) = match command {
            Command::Start(done) => (self.start().await, done),
            Command::Stop(done) => (self.stop().await, done),
            Command::Clear(done) => (self.clear().await, done),
        };

        if let Err(err) = result {
            if err == StoreError::Cancelled {
                log_debug!("{operation} abandoned by teardown");
                return;
            }
            self.report(operation, err);
        }
        let _ = done.send(());
    }

    async fn start(&mut self) -> StoreResult<()> {
        let night = SessionRecord::begin(self.clock.now_ms());
        let id = guarded(&self.token, self.store.insert(night)).await?;
        log_info!("Started sleep session {id}");

        let latest = guarded(&self.token, self.store.fetch_latest()).await?;
        self.state.seed_current(latest);
        self.publish();
        Ok(())
    }

    async fn stop(&mut self) -> StoreResult<()> {
        let Some(current) = self.state.current.clone() else {
            log_debug!("stop ignored: no active sleep session");
            return Ok(());
        };

        // An end equal to the start would still read as active.
        let mut ended = current;
        ended.end_time_ms = self.clock.now_ms().max(ended.start_time_ms + 1);
        guarded(&self.token, self.store.update(&ended)).await?;
        log_info!(
            "Stopped sleep session {} after {}ms",
            ended.id,
            ended.duration_ms()
        );

        // The event is pending before the flags flip.
        self.state.current = None;
        self.events.navigate_to_quality.fire(ended);
        self.publish();
        Ok(())
    }

    async fn clear(&mut self) -> StoreResult<()> {
        guarded(&self.token, self.store.clear_all()).await?;
        log_info!("Cleared all sleep sessions");

        self.state.current = None;
        self.events.show_cleared.fire(());
        self.publish();
        Ok(())
    }

    fn report(&self, operation: Operation, err: StoreError) {
        match err {
            StoreError::Cancelled => {}
            StoreError::NotFound(id) => {
                log_warn!("{operation} skipped: session {id} no longer exists");
            }
            StoreError::Unavailable(message) => {
                log_error!("{operation} failed: {message}");
                self.events.failure.fire(StoreFailure { operation, message });
            }
        }
    }

    /// Folds in any pending history change and publishes a fresh snapshot.
    fn publish(&mut self) {
        if self.feed_open {
            let history = self.feed.borrow_and_update().clone();
            self.state.set_history(history);
        }
        self.snapshot_tx.send_replace(self.state.snapshot());
    }
}
