// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::tasks::TaskSet;
use crate::types::{GroupName, TaskName};

/// Task file exactly as read from TOML.
///
/// ```toml
/// [config]
/// max_concurrency = 4
/// cancel_on_error = true
///
/// [task.fetch]
/// cmd = "git fetch"
/// group = "net"
///
/// [task.build]
/// cmd = "cargo build"
/// after = ["fetch"]
/// ```
///
/// All sections are optional at this stage; [`ConfigFile`] is the validated
/// form.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keys are the task names.
    #[serde(default)]
    pub task: BTreeMap<TaskName, TaskConfig>,
}

/// `[config]` section: how the worker pool behaves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of task processes running at once. Unlimited when
    /// absent.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Stop launching tasks (and kill running ones) after the first failure.
    #[serde(default)]
    pub cancel_on_error: bool,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command to execute.
    pub cmd: String,

    /// Tasks that must complete before this one starts.
    #[serde(default)]
    pub after: Vec<TaskName>,

    /// Tasks in different groups never run at the same time.
    #[serde(default)]
    pub group: GroupName,
}

/// Validated task file.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holding one means the task set was built successfully.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<TaskName, TaskConfig>,
    tasks: TaskSet,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: BTreeMap<TaskName, TaskConfig>,
        tasks: TaskSet,
    ) -> Self {
        Self {
            config,
            task,
            tasks,
        }
    }

    /// The scheduling view of the configured tasks.
    pub fn task_set(&self) -> &TaskSet {
        &self.tasks
    }

    /// Task name -> command, for handing to worker handlers.
    pub fn commands(&self) -> BTreeMap<TaskName, String> {
        self.task
            .iter()
            .map(|(name, t)| (name.clone(), t.cmd.clone()))
            .collect()
    }
}
