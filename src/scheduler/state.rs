// src/scheduler/state.rs

//! Pure scheduling state machine.
//!
//! [`SchedulerState`] contains every mutable piece of scheduling state and
//! all of the decision logic: readiness, group selection and candidate
//! choice. It has no channels and performs no IO; the async shell in
//! [`crate::scheduler::driver`] feeds it completions and asks it what to
//! dispatch next.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::scheduler::report::{ScheduleOutcome, ScheduleReport};
use crate::tasks::TaskSet;
use crate::types::{GroupName, TaskName};

/// How a completion report related to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// The task was started and is now finished.
    Started,
    /// The task was never started (or already finished). Recorded as
    /// completed and otherwise ignored.
    Unexpected,
}

#[derive(Debug)]
pub struct SchedulerState {
    tasks: Arc<TaskSet>,
    ready: BTreeSet<TaskName>,
    ready_count_by_group: BTreeMap<GroupName, usize>,
    started: BTreeSet<TaskName>,
    completed: BTreeSet<TaskName>,
    /// `None` until the first group selection.
    current_group: Option<GroupName>,
    started_in_current_group: usize,
}

impl SchedulerState {
    pub fn new(tasks: Arc<TaskSet>) -> Self {
        Self {
            tasks,
            ready: BTreeSet::new(),
            ready_count_by_group: BTreeMap::new(),
            started: BTreeSet::new(),
            completed: BTreeSet::new(),
            current_group: None,
            started_in_current_group: 0,
        }
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn ready(&self) -> &BTreeSet<TaskName> {
        &self.ready
    }

    pub fn started(&self) -> &BTreeSet<TaskName> {
        &self.started
    }

    pub fn completed(&self) -> &BTreeSet<TaskName> {
        &self.completed
    }

    pub fn current_group(&self) -> Option<&str> {
        self.current_group.as_deref()
    }

    pub fn started_in_current_group(&self) -> usize {
        self.started_in_current_group
    }

    /// Whether any dispatched task is still outstanding.
    pub fn has_started(&self) -> bool {
        !self.started.is_empty()
    }

    /// Record that `name` finished.
    ///
    /// Every name is added to `completed`, including names that were never
    /// started; only started tasks free capacity in the current group.
    pub fn record_completion(&mut self, name: TaskName) -> CompletionKind {
        let was_started = self.started.remove(&name);
        self.completed.insert(name);

        if was_started {
            // Everything in `started` belongs to the current group.
            self.started_in_current_group = self.started_in_current_group.saturating_sub(1);
            CompletionKind::Started
        } else {
            CompletionKind::Unexpected
        }
    }

    /// Move every task whose dependencies are all completed into `ready`.
    ///
    /// Dependencies on names that are not in the task set never block.
    /// Returns the number of newly ready tasks.
    pub fn refresh_ready(&mut self) -> usize {
        let mut newly_ready = 0;

        for (name, task) in self.tasks.iter() {
            if self.completed.contains(name)
                || self.ready.contains(name)
                || self.started.contains(name)
            {
                continue;
            }

            let blocked = task
                .deps
                .iter()
                .any(|dep| self.tasks.contains(dep) && !self.completed.contains(dep));
            if blocked {
                continue;
            }

            self.ready.insert(name.to_string());
            *self
                .ready_count_by_group
                .entry(task.group.clone())
                .or_insert(0) += 1;
            newly_ready += 1;
        }

        newly_ready
    }

    /// If the current group has nothing outstanding, switch to the group
    /// with the most ready tasks. Ties go to the smallest label.
    ///
    /// Returns `true` if the active group changed.
    pub fn select_group(&mut self) -> bool {
        if self.started_in_current_group != 0 {
            return false;
        }

        let mut best: Option<(&GroupName, usize)> = None;
        for (group, &count) in &self.ready_count_by_group {
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((group, count)),
            }
        }

        let Some((group, count)) = best else {
            return false;
        };
        if self.current_group.as_ref() == Some(group) {
            return false;
        }

        debug!(
            from = ?self.current_group,
            to = %group,
            ready = count,
            "switching active group"
        );
        self.current_group = Some(group.clone());
        true
    }

    /// The smallest ready task name in the current group, if any.
    pub fn next_candidate(&self) -> Option<&str> {
        let current = self.current_group.as_deref()?;
        self.ready
            .iter()
            .find(|name| {
                self.tasks
                    .get(name)
                    .is_some_and(|task| task.group == current)
            })
            .map(|s| s.as_str())
    }

    /// Move `name` from `ready` to `started`.
    ///
    /// Names that are not ready are ignored.
    pub fn mark_started(&mut self, name: &str) {
        if !self.ready.remove(name) {
            return;
        }

        if let Some(task) = self.tasks.get(name) {
            if let Some(count) = self.ready_count_by_group.get_mut(&task.group) {
                *count = count.saturating_sub(1);
            }
        }
        self.started.insert(name.to_string());
        self.started_in_current_group += 1;
    }

    /// Consume the state into a report.
    ///
    /// `cancelled` says whether the loop stopped because its endpoints were
    /// closed rather than because nothing was left to schedule.
    pub fn into_report(self, cancelled: bool) -> ScheduleReport {
        let unfinished: Vec<TaskName> = self
            .tasks
            .names()
            .filter(|name| !self.completed.contains(*name))
            .map(str::to_string)
            .collect();

        let outcome = if unfinished.is_empty() {
            ScheduleOutcome::Finished
        } else if cancelled {
            ScheduleOutcome::Cancelled
        } else {
            ScheduleOutcome::Deadlocked
        };

        ScheduleReport {
            outcome,
            completed: self.completed,
            unfinished,
        }
    }
}
