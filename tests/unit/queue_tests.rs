//! Unit tests for the command queue: strict ordering, failure isolation,
//! and shutdown behavior.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use compose_pilot::activity::ActivityLog;
use compose_pilot::catalog::ManifestCatalog;
use compose_pilot::engine::ComposeEngine;
use compose_pilot::events::{UiEvent, UiSink};
use compose_pilot::exec::{CommandQueue, ProcessRunner, QueueContext};
use compose_pilot::fetch::ArtifactFetcher;
use compose_pilot::reconcile::ContainerView;
use compose_pilot::session::ComposeSession;
use compose_pilot::{AppError, Config, Result};

fn test_context() -> (
    QueueContext,
    mpsc::UnboundedReceiver<UiEvent>,
    tempfile::TempDir,
) {
    let scratch = tempfile::tempdir().expect("scratch root");
    let config = Arc::new(Config {
        dev_mode: true,
        scratch_root: Some(scratch.path().to_path_buf()),
        ..Config::default()
    });
    let (ui, events) = UiSink::channel();
    let log = Arc::new(ActivityLog::new(ui.clone(), None).expect("no log directory"));
    let runner = ProcessRunner::new(Arc::clone(&log));
    let ctx = QueueContext {
        session: ComposeSession::new(&config.scratch_root()),
        engine: ComposeEngine::new(&config, runner.clone()),
        fetcher: ArtifactFetcher::new(&config, runner, Arc::clone(&log)),
        catalog: Arc::new(ManifestCatalog::default()),
        containers: Arc::new(ContainerView::new()),
        log,
        ui,
        config,
    };
    (ctx, events, scratch)
}

async fn record(
    _ctx: &mut QueueContext,
    order: Arc<Mutex<Vec<usize>>>,
    done: mpsc::UnboundedSender<usize>,
    index: usize,
) -> Result<()> {
    tokio::time::sleep(Duration::from_millis(5)).await;
    order.lock().expect("order lock").push(index);
    let _ = done.send(index);
    Ok(())
}

async fn explode(_ctx: &mut QueueContext) -> Result<()> {
    Err(AppError::Fetch("boom".to_owned()))
}

async fn probe_overlap(
    _ctx: &mut QueueContext,
    busy: Arc<AtomicBool>,
    violations: Arc<AtomicUsize>,
    done: mpsc::UnboundedSender<usize>,
) -> Result<()> {
    if busy.swap(true, Ordering::SeqCst) {
        violations.fetch_add(1, Ordering::SeqCst);
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    busy.store(false, Ordering::SeqCst);
    let _ = done.send(0);
    Ok(())
}

async fn finish_after(_ctx: &mut QueueContext, flag: Arc<AtomicBool>) -> Result<()> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    flag.store(true, Ordering::SeqCst);
    Ok(())
}

async fn hang(_ctx: &mut QueueContext) -> Result<()> {
    tokio::time::sleep(Duration::from_secs(600)).await;
    Ok(())
}

async fn noop(_ctx: &mut QueueContext) -> Result<()> {
    Ok(())
}

fn drain(events: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

#[tokio::test]
async fn tasks_run_in_submission_order() {
    let (ctx, _events, _scratch) = test_context();
    let (queue, runtime) = CommandQueue::start(ctx);
    let order = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    for index in 1..=3 {
        let order = Arc::clone(&order);
        let done = done_tx.clone();
        queue.submit(
            "record",
            Box::new(move |ctx| Box::pin(record(ctx, order, done, index))),
        );
    }
    for _ in 0..3 {
        done_rx.recv().await.expect("task completion");
    }

    assert_eq!(*order.lock().expect("order lock"), vec![1, 2, 3]);
    runtime.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn failing_task_is_reported_and_the_queue_continues() {
    let (ctx, mut events, _scratch) = test_context();
    let (queue, runtime) = CommandQueue::start(ctx);
    let order = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    queue.submit("explode", Box::new(|ctx| Box::pin(explode(ctx))));
    let recorder = Arc::clone(&order);
    queue.submit(
        "record",
        Box::new(move |ctx| Box::pin(record(ctx, recorder, done_tx, 1))),
    );
    done_rx.recv().await.expect("follow-up task completion");
    runtime.shutdown(Duration::from_secs(1)).await;

    // The failure reached both the error channel and the activity log.
    let events = drain(&mut events);
    assert!(events.iter().any(
        |event| matches!(event, UiEvent::Error(message) if message.contains("boom"))
    ));
    assert!(events.iter().any(|event| matches!(
        event,
        UiEvent::Log(line) if line.contains("ERROR:") && line.contains("boom")
    )));
    assert_eq!(*order.lock().expect("order lock"), vec![1]);
}

#[tokio::test]
async fn tasks_never_overlap() {
    let (ctx, _events, _scratch) = test_context();
    let (queue, runtime) = CommandQueue::start(ctx);
    let busy = Arc::new(AtomicBool::new(false));
    let violations = Arc::new(AtomicUsize::new(0));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    for _ in 0..5 {
        let busy = Arc::clone(&busy);
        let violations = Arc::clone(&violations);
        let done = done_tx.clone();
        queue.submit(
            "overlap-probe",
            Box::new(move |ctx| Box::pin(probe_overlap(ctx, busy, violations, done))),
        );
    }
    for _ in 0..5 {
        done_rx.recv().await.expect("task completion");
    }

    assert_eq!(violations.load(Ordering::SeqCst), 0);
    runtime.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn busy_events_bracket_each_task() {
    let (ctx, mut events, _scratch) = test_context();
    let (queue, runtime) = CommandQueue::start(ctx);
    let order = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    queue.submit(
        "record",
        Box::new(move |ctx| Box::pin(record(ctx, order, done_tx, 1))),
    );
    done_rx.recv().await.expect("task completion");
    runtime.shutdown(Duration::from_secs(1)).await;

    let busy: Vec<bool> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            UiEvent::Busy(flag) => Some(flag),
            _ => None,
        })
        .collect();
    assert_eq!(busy, vec![true, false]);
}

#[tokio::test]
async fn shutdown_lets_a_short_task_finish_inside_the_grace_period() {
    let (ctx, _events, _scratch) = test_context();
    let (queue, runtime) = CommandQueue::start(ctx);
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);

    queue.submit(
        "short",
        Box::new(move |ctx| Box::pin(finish_after(ctx, flag))),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    runtime.shutdown(Duration::from_secs(5)).await;

    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn shutdown_aborts_a_task_that_overruns_the_grace_period() {
    let (ctx, _events, _scratch) = test_context();
    let (queue, runtime) = CommandQueue::start(ctx);

    queue.submit("hang", Box::new(|ctx| Box::pin(hang(ctx))));
    tokio::time::sleep(Duration::from_millis(20)).await;

    tokio::time::timeout(Duration::from_secs(2), runtime.shutdown(Duration::from_millis(50)))
        .await
        .expect("shutdown is bounded by the grace period");
}

#[tokio::test]
async fn submissions_after_shutdown_are_dropped() {
    let (ctx, _events, _scratch) = test_context();
    let (queue, runtime) = CommandQueue::start(ctx);
    runtime.shutdown(Duration::from_secs(1)).await;

    // The worker is gone; this must neither panic nor block.
    queue.submit("late", Box::new(|ctx| Box::pin(noop(ctx))));
}
