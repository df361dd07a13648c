// src/errors.rs

//! Crate-wide error types.
//!
//! [`TaskSetError`] is the construction-time error for task sets; the
//! scheduler itself never fails. [`TaskQueueError`] wraps everything the
//! config layer can run into.

use thiserror::Error;

use crate::types::TaskName;

/// Why a task set could not be built.
///
/// Construction is all-or-nothing: when any of these is returned no partial
/// set exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskSetError {
    #[error("task name is empty")]
    EmptyName,

    #[error("duplicate task name {0:?}")]
    DuplicateName(TaskName),

    #[error("task name mismatch: {name:?} != {key:?}")]
    NameMismatch { key: TaskName, name: TaskName },

    #[error("unknown dependency name {dependency:?} on task {task:?}")]
    UnknownDependency { task: TaskName, dependency: TaskName },
}

/// A completion could not be delivered: the scheduler has exited, or this
/// sink handle was closed. Carries the rejected name back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("completion sink is closed; dropped completion of {0:?}")]
pub struct SinkClosed(pub TaskName);

#[derive(Error, Debug)]
pub enum TaskQueueError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid task set: {0}")]
    TaskSet(#[from] TaskSetError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TaskQueueError>;
