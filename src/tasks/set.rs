// src/tasks/set.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::TaskSetError;
use crate::tasks::task::Task;
use crate::types::{GroupName, TaskName};

/// Immutable mapping of task name to [`Task`].
///
/// Built once before scheduling starts and never mutated afterwards. The
/// validating constructors guarantee:
/// - no empty names
/// - no duplicate names
/// - every dependency refers to a task in the set
///
/// [`TaskSet::from_map_unchecked`] skips all of that; the scheduler treats
/// dependencies on absent names as already satisfied.
///
/// Keys are kept in a `BTreeMap` so iteration (and therefore scheduling
/// order) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: BTreeMap<TaskName, Task>,
}

impl TaskSet {
    /// Wrap a mapping without any validation.
    pub fn from_map_unchecked(tasks: BTreeMap<TaskName, Task>) -> Self {
        Self { tasks }
    }

    /// Build a set from a name -> task mapping.
    ///
    /// A task whose own `name` is empty takes its key as name; a non-empty
    /// name that disagrees with the key is rejected.
    pub fn from_map(tasks: BTreeMap<TaskName, Task>) -> Result<Self, TaskSetError> {
        let mut set = BTreeMap::new();

        for (key, mut task) in tasks {
            if key.is_empty() {
                return Err(TaskSetError::EmptyName);
            }
            if task.name.is_empty() {
                task.name = key.clone();
            } else if task.name != key {
                return Err(TaskSetError::NameMismatch {
                    key,
                    name: task.name,
                });
            }
            set.insert(key, task);
        }

        check_dependencies(&set)?;
        debug!(tasks = set.len(), "built task set from map");
        Ok(Self { tasks: set })
    }

    /// Build a set from a list of tasks, keyed by their names.
    pub fn from_list(tasks: impl IntoIterator<Item = Task>) -> Result<Self, TaskSetError> {
        let mut set = BTreeMap::new();

        for task in tasks {
            insert_unique(&mut set, task)?;
        }

        check_dependencies(&set)?;
        debug!(tasks = set.len(), "built task set from list");
        Ok(Self { tasks: set })
    }

    /// Build a set from arbitrary items using extractor functions.
    ///
    /// Without a `deps` extractor no task has dependencies; without a
    /// `group` extractor every task lands in the default group.
    pub fn from_mapper<T, N, D, G>(
        items: impl IntoIterator<Item = T>,
        name: N,
        deps: Option<D>,
        group: Option<G>,
    ) -> Result<Self, TaskSetError>
    where
        N: Fn(&T) -> TaskName,
        D: Fn(&T) -> Vec<TaskName>,
        G: Fn(&T) -> GroupName,
    {
        let mut set = BTreeMap::new();

        for item in items {
            let task = Task {
                name: name(&item),
                deps: deps.as_ref().map(|f| f(&item)).unwrap_or_default(),
                group: group.as_ref().map(|f| f(&item)).unwrap_or_default(),
            };
            insert_unique(&mut set, task)?;
        }

        check_dependencies(&set)?;
        debug!(tasks = set.len(), "built task set from mapper");
        Ok(Self { tasks: set })
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All task names, in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.tasks.iter().map(|(name, task)| (name.as_str(), task))
    }

    /// Distinct group labels used by the tasks (the default group shows up
    /// as `""`).
    pub fn groups(&self) -> BTreeSet<&str> {
        self.tasks.values().map(|t| t.group.as_str()).collect()
    }

    /// Immediate dependencies of a task; empty for unknown names.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.tasks
            .get(name)
            .map(|t| t.deps.as_slice())
            .unwrap_or(&[])
    }
}

fn insert_unique(set: &mut BTreeMap<TaskName, Task>, task: Task) -> Result<(), TaskSetError> {
    if task.name.is_empty() {
        return Err(TaskSetError::EmptyName);
    }
    if set.contains_key(&task.name) {
        return Err(TaskSetError::DuplicateName(task.name));
    }
    set.insert(task.name.clone(), task);
    Ok(())
}

fn check_dependencies(set: &BTreeMap<TaskName, Task>) -> Result<(), TaskSetError> {
    for (name, task) in set {
        for dep in &task.deps {
            if !set.contains_key(dep) {
                return Err(TaskSetError::UnknownDependency {
                    task: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}
