mod support;

use std::sync::Arc;

use sleeptracker_lib::{
    store::SleepStore, Operation, SessionRecord, SleepQuality, SleepQualityController,
    SleepTrackerController,
};
use support::{within, ManualClock, TestStore, T0};
use tokio_util::sync::CancellationToken;

async fn tracker(
    store: &Arc<TestStore>,
    clock: &Arc<ManualClock>,
    scope: &CancellationToken,
) -> SleepTrackerController {
    let controller = SleepTrackerController::new(store.clone(), clock.clone(), scope);
    within(controller.ready()).await;
    controller
}

#[tokio::test]
async fn start_stop_rate_scenario() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    assert!(within(controller.start().wait()).await);
    let stored = store.inner.fetch_latest().await.unwrap().unwrap();
    assert_eq!(
        (stored.start_time_ms, stored.end_time_ms, stored.quality),
        (T0, T0, -1)
    );
    assert!(!controller.can_start());
    assert!(controller.can_stop());
    assert_eq!(controller.current(), Some(stored.clone()));

    clock.set(T0 + 5000);
    assert!(within(controller.stop().wait()).await);
    let ended = store.inner.fetch_by_id(stored.id).await.unwrap().unwrap();
    assert_eq!(ended.end_time_ms, T0 + 5000);
    assert_eq!(controller.navigation_event(), Some(ended.clone()));
    assert!(controller.can_start());
    assert!(!controller.can_stop());

    let rating = SleepQualityController::new(ended.id, store.clone(), &scope);
    assert!(within(rating.set_rating(SleepQuality::PrettyGood).wait()).await);
    let rated = store.inner.fetch_by_id(ended.id).await.unwrap().unwrap();
    assert_eq!(rated.quality, 4);
    assert!(rating.navigation_event());

    rating.shutdown().await;
    controller.shutdown().await;
}

#[tokio::test]
async fn start_and_stop_flags_stay_complementary() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    assert!(controller.can_start() ^ controller.can_stop());
    for _ in 0..3 {
        within(controller.start().wait()).await;
        assert!(controller.can_start() ^ controller.can_stop());
        clock.advance(60_000);
        within(controller.stop().wait()).await;
        assert!(controller.can_start() ^ controller.can_stop());
        controller.acknowledge_navigation();
        clock.advance(60_000);
    }

    assert_eq!(controller.history().len(), 3);
    assert!(controller.history().iter().all(|night| !night.is_active()));
    controller.shutdown().await;
}

#[tokio::test]
async fn stop_without_active_session_touches_nothing() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;
    let fetches_after_init = TestStore::count(&store.fetches);

    assert!(!controller.can_stop());
    assert!(within(controller.stop().wait()).await);

    assert_eq!(TestStore::count(&store.updates), 0);
    assert_eq!(TestStore::count(&store.inserts), 0);
    assert_eq!(TestStore::count(&store.fetches), fetches_after_init);
    assert_eq!(controller.navigation_event(), None);
    controller.shutdown().await;
}

#[tokio::test]
async fn navigation_event_is_consumed_once() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    within(controller.start().wait()).await;
    clock.advance(8 * 3_600_000);
    within(controller.stop().wait()).await;

    let ended = controller.navigation_event().expect("navigation pending");
    assert!(ended.end_time_ms > ended.start_time_ms);

    // A display recreated before acknowledging still gets the event.
    let mut observer = controller.navigation_events();
    assert_eq!(within(observer.next()).await, Some(ended));

    assert!(controller.acknowledge_navigation());
    assert!(!controller.acknowledge_navigation());
    assert_eq!(controller.navigation_event(), None);
    assert_eq!(observer.peek(), None);
    controller.shutdown().await;
}

#[tokio::test]
async fn stop_in_the_same_millisecond_still_ends_the_session() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    within(controller.start().wait()).await;
    within(controller.stop().wait()).await;

    let ended = controller.navigation_event().expect("navigation pending");
    assert!(!ended.is_active());
    assert!(controller.can_start());
    controller.shutdown().await;
}

#[tokio::test]
async fn clear_fires_notification_once_per_call() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    within(controller.start().wait()).await;
    assert!(controller.can_clear());

    assert!(within(controller.clear().wait()).await);
    assert_eq!(store.inner.fetch_latest().await.unwrap(), None);
    assert!(controller.notification_event());
    assert!(controller.can_start());
    assert!(!controller.can_clear());
    assert!(controller.formatted_history().is_empty());

    assert!(controller.acknowledge_notification());
    assert!(!controller.acknowledge_notification());
    assert!(!controller.notification_event());

    within(controller.clear().wait()).await;
    assert!(controller.notification_event());
    assert_eq!(TestStore::count(&store.clears), 2);
    controller.shutdown().await;
}

#[tokio::test]
async fn teardown_during_start_inserts_nothing() {
    let store = TestStore::new();
    store.gate_inserts();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    let completion = controller.start();
    within(store.insert_entered.notified()).await;

    let snapshot = controller.subscribe();
    controller.shutdown().await;
    store.insert_release.notify_one();

    assert!(!within(completion.wait()).await);
    assert_eq!(store.inner.fetch_latest().await.unwrap(), None);
    assert_eq!(snapshot.borrow().current, None);
}

#[tokio::test]
async fn operations_run_in_submission_order() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    // Queued back to back without waiting: the stop must see the started session.
    let started = controller.start();
    let stopped = controller.stop();
    let cleared = controller.clear();
    assert!(within(started.wait()).await);
    assert!(within(stopped.wait()).await);
    assert!(within(cleared.wait()).await);

    assert_eq!(TestStore::count(&store.inserts), 1);
    assert_eq!(TestStore::count(&store.updates), 1);
    assert!(controller.navigation_event().is_some());
    assert!(controller.notification_event());
    assert!(controller.can_start());
    controller.shutdown().await;
}

#[tokio::test]
async fn restart_resumes_an_active_session() {
    let store = TestStore::new();
    store.inner.insert(SessionRecord::begin(T0)).await.unwrap();
    let clock = ManualClock::at(T0 + 1_000);
    let scope = CancellationToken::new();

    let controller = tracker(&store, &clock, &scope).await;
    let current = controller.current().expect("active session resumed");
    assert_eq!(current.start_time_ms, T0);
    assert!(controller.can_stop());
    assert_eq!(controller.history().len(), 1);
    controller.shutdown().await;
}

#[tokio::test]
async fn restart_after_finished_session_starts_idle() {
    let store = TestStore::new();
    let mut finished = SessionRecord::begin(T0);
    finished.id = store.inner.insert(finished.clone()).await.unwrap();
    finished.end_time_ms = T0 + 60_000;
    store.inner.update(&finished).await.unwrap();

    let clock = ManualClock::at(T0 + 120_000);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    assert_eq!(controller.current(), None);
    assert!(controller.can_start());
    assert!(controller.can_clear());
    controller.shutdown().await;
}

#[tokio::test]
async fn unavailable_store_is_reported_without_partial_state() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    store.fail_writes(true);
    assert!(within(controller.start().wait()).await);

    let failure = controller.failure_event().expect("failure surfaced");
    assert_eq!(failure.operation, Operation::Start);
    assert_eq!(controller.current(), None);
    assert!(controller.can_start());
    assert!(controller.acknowledge_failure());
    assert!(!controller.acknowledge_failure());

    store.fail_writes(false);
    within(controller.start().wait()).await;
    store.fail_writes(true);
    clock.advance(1_000);
    within(controller.stop().wait()).await;

    assert_eq!(
        controller.failure_event().map(|failure| failure.operation),
        Some(Operation::Stop)
    );
    assert!(controller.can_stop());
    assert_eq!(controller.navigation_event(), None);
    controller.shutdown().await;
}

#[tokio::test]
async fn stop_after_concurrent_clear_leaves_state_unchanged() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    within(controller.start().wait()).await;
    // Another display cleared the store behind this controller's back.
    store.inner.clear_all().await.unwrap();
    clock.advance(1_000);
    assert!(within(controller.stop().wait()).await);

    assert_eq!(controller.navigation_event(), None);
    assert_eq!(controller.failure_event(), None);
    assert!(controller.current().is_some());
    controller.shutdown().await;
}

#[tokio::test]
async fn cancelling_parent_scope_abandons_queued_work() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    scope.cancel();
    assert!(!within(controller.start().wait()).await);
    assert_eq!(TestStore::count(&store.inserts), 0);
}

#[tokio::test]
async fn selecting_a_session_requests_detail_navigation() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    controller.select_session(7);
    assert_eq!(controller.detail_event(), Some(7));
    assert!(controller.acknowledge_detail_navigation());
    assert_eq!(controller.detail_event(), None);
    controller.shutdown().await;
}

#[tokio::test]
async fn formatted_history_follows_the_store() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    within(controller.start().wait()).await;
    let lines = controller.formatted_history();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("| sleeping"));

    clock.advance(2 * 3_600_000);
    within(controller.stop().wait()).await;
    let lines = controller.formatted_history();
    assert!(lines[0].contains("2 hours on"));
    assert!(lines[0].ends_with("| --"));
    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn events_are_pending_before_flags_flip() {
    let store = TestStore::new();
    let clock = ManualClock::at(T0);
    let scope = CancellationToken::new();
    let controller = tracker(&store, &clock, &scope).await;

    for _ in 0..20 {
        within(controller.start().wait()).await;
        clock.advance(1_000);

        let mut snapshots = controller.subscribe();
        let _ = controller.stop();
        within(snapshots.wait_for(|snapshot| snapshot.can_start))
            .await
            .unwrap();
        assert!(controller.navigation_event().is_some());
        controller.acknowledge_navigation();

        let _ = controller.clear();
        within(snapshots.wait_for(|snapshot| !snapshot.can_clear))
            .await
            .unwrap();
        assert!(controller.notification_event());
        controller.acknowledge_notification();
        clock.advance(1_000);
    }
    controller.shutdown().await;
}
