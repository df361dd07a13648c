#![allow(dead_code)]

use std::collections::BTreeMap;

use taskqueue::tasks::{Task, TaskSet};

/// Builder for `TaskSet` to simplify test setup.
///
/// Builds validated sets by default; [`TaskSetBuilder::build_unchecked`]
/// keeps dangling dependencies.
pub struct TaskSetBuilder {
    tasks: BTreeMap<String, Task>,
}

impl TaskSetBuilder {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
        }
    }

    /// Add a task in the default group.
    pub fn task(self, name: &str, deps: &[&str]) -> Self {
        self.grouped(name, "", deps)
    }

    /// Add a task in `group`.
    pub fn grouped(mut self, name: &str, group: &str, deps: &[&str]) -> Self {
        let task = Task {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            group: group.to_string(),
        };
        self.tasks.insert(name.to_string(), task);
        self
    }

    pub fn build(self) -> TaskSet {
        TaskSet::from_map(self.tasks).expect("Failed to build valid task set from builder")
    }

    pub fn build_unchecked(self) -> TaskSet {
        TaskSet::from_map_unchecked(self.tasks)
    }
}

impl Default for TaskSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
