// src/scheduler/mod.rs

//! Dependency- and group-aware scheduling loop.
//!
//! [`start`] spawns the loop for a [`TaskSet`] and hands back two endpoints:
//!
//! - a [`StartFeed`] yielding names of tasks that may start now, closed once
//!   nothing more is schedulable (all done, or deadlocked);
//! - a [`CompletionSink`] on which the caller reports each started task when
//!   it finishes. Closing every sink handle stops the loop.
//!
//! Tasks from different groups never overlap: the active group only changes
//! once every task started from it has been reported complete.
//!
//! Module layout:
//! - [`state`] is the pure state machine (readiness, group choice).
//! - [`driver`] is the async loop around it.
//! - [`peek`] is the one-slot completion lookahead used by the driver.
//! - [`report`] describes how a schedule ended.

mod driver;
pub mod peek;
pub mod report;
pub mod state;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::errors::SinkClosed;
use crate::tasks::TaskSet;
use crate::types::TaskName;

use driver::Driver;

pub use report::{ScheduleOutcome, ScheduleReport};
pub use state::SchedulerState;

/// Receiving end of start events.
///
/// Yields each task name at most once and returns `None` once the scheduler
/// has exited. Dropping the feed stops the scheduler.
#[derive(Debug)]
pub struct StartFeed {
    rx: mpsc::Receiver<TaskName>,
}

impl StartFeed {
    /// Next task to start, or `None` when the schedule is over.
    pub async fn recv(&mut self) -> Option<TaskName> {
        self.rx.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for use outside async code.
    ///
    /// Panics if called from within an async execution context, like
    /// `tokio::sync::mpsc::Receiver::blocking_recv`.
    pub fn blocking_recv(&mut self) -> Option<TaskName> {
        self.rx.blocking_recv()
    }
}

/// Sending end of completion events.
///
/// Cheap to clone and safe to use from many workers at once. The scheduler
/// sees the sink as closed once every clone is dropped or
/// [`close`](Self::close)d.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    tx: Option<mpsc::UnboundedSender<TaskName>>,
}

impl CompletionSink {
    /// Report that `name` has finished (successfully or not).
    ///
    /// Never blocks. Fails only when the scheduler is gone or this handle was
    /// closed.
    pub fn complete(&self, name: impl Into<TaskName>) -> Result<(), SinkClosed> {
        let name = name.into();
        match &self.tx {
            Some(tx) => tx.send(name).map_err(|e| SinkClosed(e.0)),
            None => Err(SinkClosed(name)),
        }
    }

    /// Release this handle's side of the channel.
    pub fn close(&mut self) {
        self.tx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(|tx| tx.is_closed())
    }
}

/// Handle on a running scheduling loop.
#[derive(Debug)]
pub struct ScheduleHandle {
    handle: JoinHandle<ScheduleReport>,
}

impl ScheduleHandle {
    /// Wait for the loop to exit and return its report.
    pub async fn report(self) -> Result<ScheduleReport, JoinError> {
        self.handle.await
    }

    /// Whether the loop has already exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Start scheduling `tasks` on the current Tokio runtime.
///
/// Must be called from within a Tokio runtime.
pub fn start(tasks: TaskSet) -> (StartFeed, CompletionSink) {
    let (feed, sink, _handle) = start_with_report(tasks);
    (feed, sink)
}

/// Like [`start`], but also returns a handle that resolves to a
/// [`ScheduleReport`] once the loop exits.
pub fn start_with_report(tasks: TaskSet) -> (StartFeed, CompletionSink, ScheduleHandle) {
    // Room for every task, so the loop never waits on a slow consumer.
    let capacity = tasks.len().max(1);
    let (start_tx, start_rx) = mpsc::channel(capacity);
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    let driver = Driver::new(Arc::new(tasks), start_tx, done_rx);
    let handle = tokio::spawn(driver.run());

    (
        StartFeed { rx: start_rx },
        CompletionSink { tx: Some(done_tx) },
        ScheduleHandle { handle },
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::tasks::Task;

    async fn next(feed: &mut StartFeed) -> Option<TaskName> {
        timeout(Duration::from_secs(1), feed.recv())
            .await
            .expect("start feed did not emit or close")
    }

    #[tokio::test]
    async fn starts_single_task() {
        let set = TaskSet::from_list(vec![Task::new("name")]).unwrap();
        let (mut feed, sink) = start(set);

        assert_eq!(next(&mut feed).await.as_deref(), Some("name"));
        sink.complete("name").unwrap();
        assert_eq!(next(&mut feed).await, None);
    }

    #[tokio::test]
    async fn empty_set_closes_immediately() {
        let (mut feed, _sink, handle) = start_with_report(TaskSet::default());
        assert_eq!(next(&mut feed).await, None);
        assert_eq!(handle.report().await.unwrap().outcome, ScheduleOutcome::Finished);
    }

    #[tokio::test]
    async fn closed_sink_handle_rejects_completions() {
        let set = TaskSet::from_list(vec![Task::new("a")]).unwrap();
        let (_feed, mut sink) = start(set);
        let other = sink.clone();

        sink.close();
        assert!(sink.is_closed());
        assert_eq!(sink.complete("a"), Err(SinkClosed("a".to_string())));
        assert!(!other.is_closed());
    }

    #[tokio::test]
    async fn dropping_feed_stops_scheduler() {
        let set = TaskSet::from_list(vec![Task::new("a"), Task::new("b").after("a")]).unwrap();
        let (feed, sink, handle) = start_with_report(set);
        drop(feed);

        let report = timeout(Duration::from_secs(1), handle.report())
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(report.outcome, ScheduleOutcome::Cancelled);
        assert!(sink.is_closed());
    }
}
