use crate::batch::test_helpers::{
    MockBehavior, create_test_downloader, drain_until_batch_complete, output_dir,
};
use crate::types::{Event, JobKind, JobSpec, Status};

fn spec(url: &str) -> JobSpec {
    JobSpec::new(url, JobKind::Video, "best")
}

// --- stop() tests ---

#[tokio::test]
async fn stop_mid_job_cancels_in_flight_and_leaves_remainder_pending() {
    let (downloader, executor, temp_dir) = create_test_downloader().await;
    let blocked = "https://example.com/blocked";
    executor.set_behavior(blocked, MockBehavior::BlockUntilCancelled);

    let mut events = downloader.subscribe();
    downloader
        .add_jobs(
            &[
                spec(blocked),
                spec("https://example.com/2"),
                spec("https://example.com/3"),
                spec("https://example.com/4"),
                spec("https://example.com/5"),
            ],
            output_dir(&temp_dir),
        )
        .await;

    downloader.start().await;
    executor.started.notified().await;
    downloader.stop().await;

    let events = drain_until_batch_complete(&mut events).await;

    match events.last().unwrap() {
        Event::BatchComplete { summary } => {
            assert_eq!(summary.cancelled, 1, "the in-flight job was cancelled");
            assert_eq!(summary.pending, 4, "untouched remainder stays pending");
            assert_eq!(summary.downloading, 0);
            assert_eq!(summary.completed, 0);
        }
        _ => unreachable!(),
    }

    let summary = downloader.summary().await;
    assert_eq!(summary.downloading, 0, "no job is downloading after the worker exits");
    assert!(!downloader.is_running());
    assert_eq!(
        executor.total_calls(),
        1,
        "no further jobs may start after a stop request"
    );
}

#[tokio::test]
async fn cancelled_job_is_cancelled_not_failed() {
    let (downloader, executor, temp_dir) = create_test_downloader().await;
    let blocked = "https://example.com/blocked";
    executor.set_behavior(blocked, MockBehavior::BlockUntilCancelled);

    let mut events = downloader.subscribe();
    downloader.add_jobs(&[spec(blocked)], output_dir(&temp_dir)).await;
    downloader.start().await;
    executor.started.notified().await;
    downloader.stop().await;

    let events = drain_until_batch_complete(&mut events).await;

    let job = events
        .iter()
        .find_map(|event| match event {
            Event::JobComplete { job, .. } => Some(job.clone()),
            _ => None,
        })
        .expect("cancelled job still gets a terminal event");

    assert_eq!(
        job.status,
        Status::Cancelled,
        "cancellation must not be conflated with failure"
    );
    assert_eq!(job.retry_count, 0, "cancellation consumes no retry budget");

    let summary = downloader.summary().await;
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.cancelled, 1);
}

#[tokio::test]
async fn stopped_batch_can_be_resumed_with_start() {
    let (downloader, executor, temp_dir) = create_test_downloader().await;
    let blocked = "https://example.com/blocked";
    executor.set_behavior(blocked, MockBehavior::BlockUntilCancelled);

    let mut events = downloader.subscribe();
    downloader
        .add_jobs(
            &[spec(blocked), spec("https://example.com/rest")],
            output_dir(&temp_dir),
        )
        .await;

    downloader.start().await;
    executor.started.notified().await;
    downloader.stop().await;
    drain_until_batch_complete(&mut events).await;

    // The untouched job is still pending; a fresh start drains it
    assert!(downloader.start().await);
    drain_until_batch_complete(&mut events).await;

    let summary = downloader.summary().await;
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.pending, 0);
}

#[tokio::test]
async fn stop_when_idle_is_a_no_op() {
    let (downloader, _executor, _temp_dir) = create_test_downloader().await;
    downloader.stop().await;
    assert!(!downloader.is_running());
    assert_eq!(downloader.summary().await.total, 0);
}

// --- clear() tests ---

#[tokio::test]
async fn clear_empties_the_batch_and_start_refuses() {
    let (downloader, _executor, temp_dir) = create_test_downloader().await;

    downloader
        .add_jobs(
            &[spec("https://example.com/a"), spec("https://example.com/b")],
            output_dir(&temp_dir),
        )
        .await;
    assert_eq!(downloader.summary().await.total, 2);

    downloader.clear().await;

    let summary = downloader.summary().await;
    assert_eq!(summary.total, 0);
    assert_eq!(summary.pending, 0);
    assert_eq!(summary.current_index, 0);
    assert!(
        !downloader.start().await,
        "start on a cleared engine must return false"
    );
}

#[tokio::test]
async fn clear_emits_cleared_event() {
    let (downloader, _executor, temp_dir) = create_test_downloader().await;
    let mut events = downloader.subscribe();

    downloader
        .add_jobs(&[spec("https://example.com/a")], output_dir(&temp_dir))
        .await;
    downloader.clear().await;

    // First event is Queued, second must be Cleared
    let _queued = events.recv().await.unwrap();
    let event = events.recv().await.unwrap();
    assert!(matches!(event, Event::Cleared));
}

#[tokio::test]
async fn clear_is_idempotent() {
    let (downloader, _executor, temp_dir) = create_test_downloader().await;

    downloader
        .add_jobs(&[spec("https://example.com/a")], output_dir(&temp_dir))
        .await;
    downloader.clear().await;
    downloader.clear().await;

    assert_eq!(downloader.summary().await.total, 0);
}

#[tokio::test]
async fn clear_while_worker_is_draining_does_not_crash_it() {
    let (downloader, executor, temp_dir) = create_test_downloader().await;
    let blocked = "https://example.com/blocked";
    executor.set_behavior(blocked, MockBehavior::BlockUntilCancelled);

    let mut events = downloader.subscribe();
    downloader
        .add_jobs(
            &[spec(blocked), spec("https://example.com/b")],
            output_dir(&temp_dir),
        )
        .await;
    downloader.start().await;
    executor.started.notified().await;

    // Wipes the arena while the cancelled job is still settling; the worker
    // must tolerate its record vanishing
    downloader.clear().await;
    drain_until_batch_complete(&mut events).await;

    let summary = downloader.summary().await;
    assert_eq!(summary.total, 0);
    assert!(!downloader.is_running());
}

// --- shutdown() tests ---

#[tokio::test]
async fn shutdown_emits_shutdown_event_after_worker_exits() {
    let (downloader, executor, temp_dir) = create_test_downloader().await;
    let blocked = "https://example.com/blocked";
    executor.set_behavior(blocked, MockBehavior::BlockUntilCancelled);

    let mut events = downloader.subscribe();
    downloader.add_jobs(&[spec(blocked)], output_dir(&temp_dir)).await;
    downloader.start().await;
    executor.started.notified().await;

    downloader.shutdown().await;

    assert!(!downloader.is_running());

    // Collect everything up to Shutdown; BatchComplete must come first
    let mut seen_batch_complete = false;
    loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for shutdown event")
            .unwrap();
        match event {
            Event::BatchComplete { .. } => seen_batch_complete = true,
            Event::Shutdown => break,
            _ => {}
        }
    }
    assert!(
        seen_batch_complete,
        "worker's BatchComplete precedes the Shutdown event"
    );
}

#[tokio::test]
async fn shutdown_when_idle_still_emits_shutdown() {
    let (downloader, _executor, _temp_dir) = create_test_downloader().await;
    let mut events = downloader.subscribe();

    downloader.shutdown().await;

    let event = events.recv().await.unwrap();
    assert!(matches!(event, Event::Shutdown));
}
