// src/tasks/task.rs

use crate::types::{GroupName, TaskName};

/// A named unit of work with dependencies and a group label.
///
/// Tasks in different groups never run at the same time; tasks sharing a
/// group may. The empty group label is the default group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    /// Names of tasks that must complete before this one can start.
    pub deps: Vec<TaskName>,
    pub group: GroupName,
}

impl Task {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a dependency on `dep`.
    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.deps.push(dep.into());
        self
    }

    /// Put the task into `group`.
    pub fn in_group(mut self, group: impl Into<GroupName>) -> Self {
        self.group = group.into();
        self
    }
}
