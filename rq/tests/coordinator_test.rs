//! Integration tests for request coordination
//!
//! End-to-end scenarios through the public `Coordinator` API.

use std::sync::Arc;
use std::time::Duration;

use reqsync::{
    CallTemplate, Coordinator, Decision, ManualClock, Mode, RejectionReason, SyncError, SyncPolicy, Verb,
};
use tokio_util::sync::CancellationToken;

fn coordinator(policy: SyncPolicy) -> (Coordinator, ManualClock) {
    let clock = ManualClock::default();
    (Coordinator::with_clock(policy, Arc::new(clock.clone())), clock)
}

fn get_abort_post_prevent() -> SyncPolicy {
    SyncPolicy::default()
        .with_mode(Verb::Get, Mode::Abort)
        .with_mode(Verb::Post, Mode::Prevent)
}

// =============================================================================
// Prevent
// =============================================================================

#[tokio::test]
async fn test_post_double_submit_is_rejected_until_first_completes() {
    let (coord, _) = coordinator(get_abort_post_prevent());

    let (first, decision) = coord.begin(CallTemplate::post("/foo")).await;
    assert_eq!(decision, Decision::Admitted);

    let (second, decision) = coord.begin(CallTemplate::post("/foo")).await;
    assert_eq!(decision, Decision::Rejected(RejectionReason::Duplicate));
    assert_eq!(second.rejection(), Some(RejectionReason::Duplicate));

    let pendings = coord.pendings(Verb::Post, "/foo").await;
    assert_eq!(pendings.len(), 1);
    assert_eq!(pendings[0].call(), &first);

    coord.end(&first).await;
    assert!(coord.pendings(Verb::Post, "/foo").await.is_empty());

    let (_, decision) = coord.begin(CallTemplate::post("/foo")).await;
    assert_eq!(decision, Decision::Admitted);
}

// =============================================================================
// Abort
// =============================================================================

#[tokio::test]
async fn test_get_supersedes_previous_get() {
    let (coord, _) = coordinator(get_abort_post_prevent());

    let (first, decision) = coord.begin(CallTemplate::get("/foo")).await;
    assert_eq!(decision, Decision::Admitted);
    let h1 = first.cancellation_token();
    assert!(!h1.is_cancelled());

    let (second, decision) = coord.begin(CallTemplate::get("/foo")).await;
    assert_eq!(decision, Decision::Admitted);
    assert!(h1.is_cancelled());
    assert_eq!(first.rejection(), Some(RejectionReason::Superseded));
    assert!(!second.is_cancelled());

    let pendings = coord.pendings(Verb::Get, "/foo").await;
    assert_eq!(pendings.len(), 1);
    assert_eq!(pendings[0].call(), &second);

    coord.end(&second).await;
    assert!(coord.pendings(Verb::Get, "/foo").await.is_empty());

    // The superseded call settling late is harmless
    coord.end(&first).await;
    assert!(!coord.contains(Verb::Get, "/foo").await);
}

#[tokio::test]
async fn test_superseded_transport_observes_cancellation() {
    let coord = Arc::new(Coordinator::new(SyncPolicy::default().surface_rejections(true)));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel();

    let first = tokio::spawn({
        let coord = Arc::clone(&coord);
        async move {
            coord
                .execute(CallTemplate::get("/feed"), |call| async move {
                    let _ = started_tx.send(());
                    call.cancellation_token().cancelled().await;
                    Err::<(), _>("transport aborted")
                })
                .await
        }
    });

    started_rx.await.unwrap();
    let second: Result<Option<&str>, SyncError<&str>> =
        coord.execute(CallTemplate::get("/feed"), |_| async { Ok("fresh") }).await;

    assert_eq!(second.unwrap(), Some("fresh"));
    let first = first.await.unwrap();
    assert_eq!(
        first.unwrap_err().rejection_reason(),
        Some(RejectionReason::Superseded)
    );
    assert!(!coord.contains(Verb::Get, "/feed").await);
}

// =============================================================================
// Force
// =============================================================================

#[tokio::test]
async fn test_force_admits_all_in_insertion_order() {
    let (coord, clock) = coordinator(SyncPolicy::default().with_mode(Verb::Head, Mode::Force));

    let (c1, d1) = coord.begin(CallTemplate::head("/ping")).await;
    clock.advance_ms(1);
    let (c2, d2) = coord.begin(CallTemplate::head("/ping")).await;

    assert_eq!(d1, Decision::Admitted);
    assert_eq!(d2, Decision::Admitted);

    let pendings = coord.pendings(Verb::Head, "/ping").await;
    assert_eq!(pendings.len(), 2);
    assert_eq!(pendings[0].call(), &c1);
    assert_eq!(pendings[1].call(), &c2);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_end_twice_matches_end_once() {
    let (coord, _) = coordinator(SyncPolicy::default());
    let (keep, _) = coord.begin(CallTemplate::patch("/a").with_mode(Mode::Force)).await;
    let (call, _) = coord.begin(CallTemplate::patch("/a").with_mode(Mode::Force)).await;

    coord.end(&call).await;
    let once = coord.pendings(Verb::Patch, "/a").await;
    coord.end(&call).await;
    let twice = coord.pendings(Verb::Patch, "/a").await;

    assert_eq!(once.len(), 1);
    assert_eq!(twice.len(), 1);
    assert_eq!(twice[0].call(), &keep);
}

#[tokio::test]
async fn test_staleness_threshold() {
    let (coord, clock) = coordinator(SyncPolicy::default().with_stale_after_ms(10));

    coord.begin(CallTemplate::post("/foo")).await;

    clock.advance_ms(9);
    assert!(coord.contains(Verb::Post, "/foo").await);

    clock.advance_ms(1);
    assert!(!coord.contains(Verb::Post, "/foo").await);
}

#[tokio::test]
async fn test_independent_coordinators_do_not_share_state() {
    let (a, _) = coordinator(SyncPolicy::default());
    let (b, _) = coordinator(SyncPolicy::default());

    a.begin(CallTemplate::post("/foo")).await;
    let (_, decision) = b.begin(CallTemplate::post("/foo")).await;

    assert_eq!(decision, Decision::Admitted);
}

#[tokio::test]
async fn test_caller_cancellation_is_not_a_rejection() {
    let coord = Coordinator::new(SyncPolicy::default().surface_rejections(true));
    let caller = CancellationToken::new();
    let cancel = caller.clone();

    let result: Result<Option<()>, SyncError<String>> = coord
        .execute(
            CallTemplate::get("/report").with_cancellation(caller.clone()),
            |_| async move {
                cancel.cancel();
                std::future::pending::<Result<(), String>>().await
            },
        )
        .await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(caller.is_cancelled());
    assert!(!coord.contains(Verb::Get, "/report").await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_prevent_admits_exactly_one() {
    let coord = Arc::new(Coordinator::new(SyncPolicy::default()));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let coord = Arc::clone(&coord);
            tokio::spawn(async move { coord.begin(CallTemplate::delete("/items/7")).await.1 })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap().is_admitted() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(coord.stats().await.total_duplicates, 15);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fires_and_is_disposed() {
    let coord = Coordinator::new(SyncPolicy::default());

    let result: Result<Option<()>, SyncError<String>> = coord
        .execute(
            CallTemplate::post("/slow").with_timeout(Duration::from_millis(30)),
            |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

    assert!(matches!(result, Err(SyncError::Cancelled)));

    // The key is free again straight after the timeout
    let (_, decision) = coord.begin(CallTemplate::post("/slow")).await;
    assert_eq!(decision, Decision::Admitted);
}
