// tests/scheduler_scenarios.rs

use std::error::Error;
use std::time::Duration;

use tokio::time::timeout;

use taskqueue::scheduler::{ScheduleOutcome, StartFeed, start, start_with_report};
use taskqueue::tasks::{Task, TaskSet};
use taskqueue_test_utils::builders::TaskSetBuilder;
use taskqueue_test_utils::init_tracing;
use taskqueue_test_utils::worker::ScriptedWorker;

type TestResult = Result<(), Box<dyn Error>>;

/// Receive the next start event; fails the test if the feed stays silent.
async fn expect_start(feed: &mut StartFeed) -> String {
    match timeout(Duration::from_secs(1), feed.recv()).await {
        Ok(Some(name)) => name,
        Ok(None) => panic!("start feed closed, expected an event"),
        Err(_) => panic!("start feed did not emit"),
    }
}

/// Assert the feed is closed (not merely silent).
async fn expect_closed(feed: &mut StartFeed) {
    match timeout(Duration::from_secs(1), feed.recv()).await {
        Ok(None) => {}
        Ok(Some(name)) => panic!("expected closed start feed, got {name:?}"),
        Err(_) => panic!("start feed was not closed"),
    }
}

/// Assert nothing is emitted for a short while.
async fn expect_silence(feed: &mut StartFeed) {
    if let Ok(event) = timeout(Duration::from_millis(100), feed.recv()).await {
        panic!("expected no start event, got {event:?}");
    }
}

#[tokio::test]
async fn starts_tasks_in_dependency_order() -> TestResult {
    init_tracing();

    let tasks = TaskSetBuilder::new()
        .task("task1", &[])
        .task("task2", &["task1"])
        .build_unchecked();
    let (mut feed, sink) = start(tasks);

    assert_eq!(expect_start(&mut feed).await, "task1");
    expect_silence(&mut feed).await;

    sink.complete("task1")?;
    assert_eq!(expect_start(&mut feed).await, "task2");

    sink.complete("task2")?;
    expect_closed(&mut feed).await;
    Ok(())
}

#[tokio::test]
async fn unsatisfiable_tasks_end_the_schedule() -> TestResult {
    init_tracing();

    let tasks = TaskSet::from_list(vec![
        Task::new("init"),
        Task::new("partA").after("init"),
        Task::new("partB").after("partB"),
        Task::new("finalize").after("partA").after("partB"),
    ])?;
    let (mut feed, sink, handle) = start_with_report(tasks);

    assert_eq!(expect_start(&mut feed).await, "init");
    sink.complete("init")?;
    assert_eq!(expect_start(&mut feed).await, "partA");
    sink.complete("partA")?;
    expect_closed(&mut feed).await;

    let report = handle.report().await?;
    assert_eq!(report.outcome, ScheduleOutcome::Deadlocked);
    assert_eq!(report.unfinished, vec!["finalize".to_string(), "partB".to_string()]);
    Ok(())
}

#[tokio::test]
async fn unknown_completions_are_ignored() -> TestResult {
    init_tracing();

    let tasks = TaskSetBuilder::new()
        .task("a", &[])
        .task("b", &["a"])
        .build();
    let (mut feed, sink, handle) = start_with_report(tasks);

    sink.complete("ghost")?;
    assert_eq!(expect_start(&mut feed).await, "a");
    sink.complete("phantom")?;
    expect_silence(&mut feed).await;

    sink.complete("a")?;
    assert_eq!(expect_start(&mut feed).await, "b");
    sink.complete("b")?;
    expect_closed(&mut feed).await;

    let report = handle.report().await?;
    assert!(report.is_finished());
    assert!(report.completed.contains("ghost"));
    Ok(())
}

#[tokio::test]
async fn closing_the_sink_stops_the_schedule() -> TestResult {
    init_tracing();

    let tasks = TaskSetBuilder::new()
        .task("a", &[])
        .task("b", &["a"])
        .build();
    let (mut feed, sink, handle) = start_with_report(tasks);

    assert_eq!(expect_start(&mut feed).await, "a");
    drop(sink);
    expect_closed(&mut feed).await;

    let report = handle.report().await?;
    assert_eq!(report.outcome, ScheduleOutcome::Cancelled);
    assert_eq!(report.unfinished, vec!["a".to_string(), "b".to_string()]);
    Ok(())
}

#[tokio::test]
async fn every_sink_clone_must_close() -> TestResult {
    init_tracing();

    let tasks = TaskSetBuilder::new()
        .task("a", &[])
        .task("b", &["a"])
        .build();
    let (mut feed, mut sink) = start(tasks);
    let worker_sink = sink.clone();

    assert_eq!(expect_start(&mut feed).await, "a");
    sink.close();
    expect_silence(&mut feed).await;

    worker_sink.complete("a")?;
    assert_eq!(expect_start(&mut feed).await, "b");
    drop(worker_sink);
    expect_closed(&mut feed).await;
    Ok(())
}

#[tokio::test]
async fn same_group_tasks_start_together() -> TestResult {
    init_tracing();

    let tasks = TaskSetBuilder::new()
        .grouped("one-a", "one", &[])
        .grouped("one-b", "one", &[])
        .grouped("two-a", "two", &[])
        .build();
    let (mut feed, sink) = start(tasks);

    // "one" has more ready tasks, so it goes first, as a burst.
    assert_eq!(expect_start(&mut feed).await, "one-a");
    assert_eq!(expect_start(&mut feed).await, "one-b");
    expect_silence(&mut feed).await;

    // "two" must wait until every "one" task has completed.
    sink.complete("one-b")?;
    expect_silence(&mut feed).await;
    sink.complete("one-a")?;
    assert_eq!(expect_start(&mut feed).await, "two-a");

    sink.complete("two-a")?;
    expect_closed(&mut feed).await;
    Ok(())
}

#[tokio::test]
async fn group_ties_are_broken_by_label() -> TestResult {
    init_tracing();

    let tasks = TaskSetBuilder::new()
        .grouped("z1", "zulu", &[])
        .grouped("a1", "alpha", &[])
        .build();
    let (mut feed, sink) = start(tasks);

    assert_eq!(expect_start(&mut feed).await, "a1");
    sink.complete("a1")?;
    assert_eq!(expect_start(&mut feed).await, "z1");
    sink.complete("z1")?;
    expect_closed(&mut feed).await;
    Ok(())
}

#[tokio::test]
async fn dependencies_cross_groups() -> TestResult {
    init_tracing();

    let tasks = TaskSetBuilder::new()
        .grouped("fetch", "net", &[])
        .grouped("build", "cpu", &["fetch"])
        .grouped("upload", "net", &["build"])
        .build();

    let worker = ScriptedWorker::immediate();
    let (feed, sink) = start(tasks);
    worker.run(feed, sink).await;

    assert_eq!(worker.started(), vec!["fetch", "build", "upload"]);
    Ok(())
}

#[tokio::test]
async fn schedule_is_deterministic() -> TestResult {
    init_tracing();

    let build = || {
        TaskSetBuilder::new()
            .task("root", &[])
            .task("left", &["root"])
            .task("right", &["root"])
            .task("join", &["left", "right"])
            .build()
    };

    let first = ScriptedWorker::immediate();
    let (feed, sink) = start(build());
    first.run(feed, sink).await;

    let second = ScriptedWorker::immediate();
    let (feed, sink) = start(build());
    second.run(feed, sink).await;

    assert_eq!(first.started(), vec!["root", "left", "right", "join"]);
    assert_eq!(first.log(), second.log());
    Ok(())
}

#[tokio::test]
async fn dangling_dependencies_never_block() -> TestResult {
    init_tracing();

    let tasks = TaskSetBuilder::new()
        .task("a", &["not-in-set"])
        .task("b", &["a"])
        .build_unchecked();
    let (mut feed, sink, handle) = start_with_report(tasks);

    assert_eq!(expect_start(&mut feed).await, "a");
    sink.complete("a")?;
    assert_eq!(expect_start(&mut feed).await, "b");
    sink.complete("b")?;
    expect_closed(&mut feed).await;

    assert!(handle.report().await?.is_finished());
    Ok(())
}

#[test]
fn blocking_feed_works_outside_async_code() -> TestResult {
    let runtime = tokio::runtime::Runtime::new()?;
    let tasks = TaskSetBuilder::new()
        .task("a", &[])
        .task("b", &["a"])
        .build();

    let (mut feed, sink) = {
        let _guard = runtime.enter();
        start(tasks)
    };

    let mut order = Vec::new();
    while let Some(name) = feed.blocking_recv() {
        sink.complete(name.clone())?;
        order.push(name);
    }

    assert_eq!(order, vec!["a", "b"]);
    Ok(())
}
