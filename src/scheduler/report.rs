// src/scheduler/report.rs

use std::collections::BTreeSet;

use crate::types::TaskName;

/// How a schedule ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Every task in the set completed.
    Finished,
    /// Nothing was left to dispatch or wait for, but some tasks never became
    /// ready (a cycle or an unsatisfiable dependency).
    Deadlocked,
    /// The completion sink or the start feed was closed before the schedule
    /// could finish.
    Cancelled,
}

/// Summary of a finished scheduling loop.
///
/// The feed itself only ever closes; this report is how a caller tells a
/// successful schedule from a deadlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    pub outcome: ScheduleOutcome,
    /// Every name reported on the completion sink, including names that were
    /// never part of the task set.
    pub completed: BTreeSet<TaskName>,
    /// Tasks of the set that never completed, in name order.
    pub unfinished: Vec<TaskName>,
}

impl ScheduleReport {
    pub fn is_finished(&self) -> bool {
        self.outcome == ScheduleOutcome::Finished
    }
}
