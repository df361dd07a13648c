// src/types.rs

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Group label. The empty string is the default group.
pub type GroupName = String;

/// Label of the group every task belongs to unless it says otherwise.
pub const DEFAULT_GROUP: &str = "";
