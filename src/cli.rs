// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `taskqueue`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskqueue",
    version,
    about = "Run shell tasks in dependency order, one group at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKQUEUE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print tasks and detected cycles, but don't run
    /// anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum number of tasks running at once (overrides
    /// `[config].max_concurrency`).
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Stop after the first failing task (overrides
    /// `[config].cancel_on_error`).
    #[arg(long)]
    pub fail_fast: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive applying this level to every target.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
