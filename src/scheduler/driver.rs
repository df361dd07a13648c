// src/scheduler/driver.rs

//! Async shell around [`SchedulerState`].
//!
//! The driver owns the state machine, the sending half of the start feed and
//! the receiving half of the completion channel. It runs as a single Tokio
//! task; nothing else ever touches its state, so there are no locks.
//!
//! It only suspends in two places:
//! - racing a start-feed send against an incoming completion
//!   ([`Driver::try_dispatch`]),
//! - waiting for a completion when nothing else can be dispatched
//!   ([`Driver::wait_for_completion`]).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info};

use crate::scheduler::peek::PeekBuffer;
use crate::scheduler::report::ScheduleReport;
use crate::scheduler::state::{CompletionKind, SchedulerState};
use crate::tasks::TaskSet;
use crate::types::TaskName;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Nothing ready in the active group and nothing running.
    Exhausted,
    /// Every completion sender is gone; no worker can make progress.
    CompletionsClosed,
    /// The start feed was dropped; nobody can receive start events.
    FeedDropped,
}

pub(crate) struct Driver {
    state: SchedulerState,
    start_tx: mpsc::Sender<TaskName>,
    done_rx: mpsc::UnboundedReceiver<TaskName>,
    peeked: PeekBuffer,
}

impl Driver {
    pub(crate) fn new(
        tasks: Arc<TaskSet>,
        start_tx: mpsc::Sender<TaskName>,
        done_rx: mpsc::UnboundedReceiver<TaskName>,
    ) -> Self {
        Self {
            state: SchedulerState::new(tasks),
            start_tx,
            done_rx,
            peeked: PeekBuffer::new(),
        }
    }

    /// Main scheduling loop.
    ///
    /// Returns once no further work is schedulable or an endpoint closed.
    /// The start feed is closed when `self` (and with it the sender) is
    /// dropped at the end of this function.
    pub(crate) async fn run(mut self) -> ScheduleReport {
        info!(tasks = self.state.tasks().len(), "scheduler started");

        let stop = loop {
            if let Some(stop) = self.drain_completions() {
                break stop;
            }

            let newly_ready = self.state.refresh_ready();
            if newly_ready > 0 {
                debug!(
                    newly_ready,
                    ready = self.state.ready().len(),
                    "tasks became ready"
                );
            }

            self.state.select_group();

            if let Some(candidate) = self.state.next_candidate().map(str::to_string) {
                if let Some(stop) = self.try_dispatch(candidate).await {
                    break stop;
                }
                continue;
            }

            if self.state.has_started() {
                if let Some(stop) = self.wait_for_completion().await {
                    break stop;
                }
                continue;
            }

            break Stop::Exhausted;
        };

        let report = self.state.into_report(stop != Stop::Exhausted);
        info!(
            reason = ?stop,
            outcome = ?report.outcome,
            completed = report.completed.len(),
            unfinished = report.unfinished.len(),
            "scheduler finished; closing start feed"
        );
        report
    }

    /// Apply every completion that is available without waiting.
    fn drain_completions(&mut self) -> Option<Stop> {
        loop {
            let name = match self.peeked.take() {
                Some(name) => name,
                None => match self.done_rx.try_recv() {
                    Ok(name) => name,
                    Err(TryRecvError::Empty) => return None,
                    Err(TryRecvError::Disconnected) => return Some(Stop::CompletionsClosed),
                },
            };

            match self.state.record_completion(name.clone()) {
                CompletionKind::Started => {
                    debug!(
                        task = %name,
                        outstanding = self.state.started_in_current_group(),
                        "task completed"
                    );
                }
                CompletionKind::Unexpected => {
                    debug!(task = %name, "completion for task that was not running; recorded");
                }
            }
        }
    }

    /// Try to hand `candidate` to the start feed while watching for
    /// completions.
    ///
    /// A completion that wins the race is stashed and the candidate stays
    /// ready for the next iteration.
    async fn try_dispatch(&mut self, candidate: TaskName) -> Option<Stop> {
        tokio::select! {
            biased;

            completion = self.done_rx.recv() => match completion {
                Some(name) => {
                    self.peeked.stash(name);
                    None
                }
                None => Some(Stop::CompletionsClosed),
            },

            permit = self.start_tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(candidate.clone());
                    self.state.mark_started(&candidate);
                    info!(
                        task = %candidate,
                        group = %self.state.current_group().unwrap_or_default(),
                        running = self.state.started_in_current_group(),
                        "dispatched task"
                    );
                    None
                }
                Err(_) => Some(Stop::FeedDropped),
            },
        }
    }

    /// Block until the next completion arrives and stash it.
    async fn wait_for_completion(&mut self) -> Option<Stop> {
        debug!(
            running = self.state.started().len(),
            "nothing dispatchable; waiting for a completion"
        );

        match self.done_rx.recv().await {
            Some(name) => {
                self.peeked.stash(name);
                None
            }
            None => Some(Stop::CompletionsClosed),
        }
    }
}
