// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskQueueError};
use crate::tasks::{Task, TaskSet};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskQueueError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let tasks = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task, tasks))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<TaskSet> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_commands(cfg)?;
    build_task_set(cfg)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskQueueError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_concurrency == Some(0) {
        return Err(TaskQueueError::ConfigError(
            "[config].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(TaskQueueError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}

/// Name, dependency and duplicate checks are the task set's own; cycles are
/// allowed here and surface as a deadlocked schedule.
fn build_task_set(cfg: &RawConfigFile) -> Result<TaskSet> {
    let tasks: BTreeMap<_, _> = cfg
        .task
        .iter()
        .map(|(name, tc)| {
            let task = Task {
                name: name.clone(),
                deps: tc.after.clone(),
                group: tc.group.clone(),
            };
            (name.clone(), task)
        })
        .collect();

    Ok(TaskSet::from_map(tasks)?)
}
