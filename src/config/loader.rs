// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a task file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Read a task file and validate it into a [`ConfigFile`].
///
/// Fails on unreadable files, malformed TOML, bad `[config]` values, empty
/// commands, and anything [`TaskSet::from_map`](crate::tasks::TaskSet::from_map)
/// rejects.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    debug!(
        path = %path.as_ref().display(),
        tasks = config.task_set().len(),
        "loaded task file"
    );
    Ok(config)
}

/// `Taskqueue.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskqueue.toml")
}
