// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod scheduler;
pub mod tasks;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::exec::{WorkerPool, run_command, run_on_context_pool};
use crate::scheduler::{ScheduleOutcome, ScheduleReport};
use crate::types::TaskName;

pub use crate::scheduler::{CompletionSink, StartFeed, start, start_with_report};
pub use crate::tasks::{Task, TaskSet};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading
/// - scheduler
/// - worker pool running shell commands
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading task file {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    for cycle in cfg.task_set().find_cycles() {
        warn!(
            ?cycle,
            "dependency cycle; these tasks and their dependents will never run"
        );
    }

    let pool = pool_from_config(&cfg, &args);

    // Ctrl-C → stop launching tasks and kill running ones.
    {
        let token = pool.cancellation_token();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; cancelling");
            token.cancel();
        });
    }

    let summary = run_tasks(&cfg, pool).await?;
    summary.ensure_success()
}

/// Result of running every task of a task file once.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: ScheduleReport,
    /// Tasks whose command failed, with the reason.
    pub failures: Vec<(TaskName, String)>,
}

impl RunSummary {
    /// Turn failed tasks, deadlocks and cancellation into an error.
    pub fn ensure_success(&self) -> Result<()> {
        if !self.failures.is_empty() {
            let list = self
                .failures
                .iter()
                .map(|(task, err)| format!("{task} ({err})"))
                .collect::<Vec<_>>()
                .join(", ");
            bail!("{} task(s) failed: {list}", self.failures.len());
        }

        match self.report.outcome {
            ScheduleOutcome::Finished => Ok(()),
            ScheduleOutcome::Deadlocked => bail!(
                "deadlock: tasks never became ready: {}",
                self.report.unfinished.join(", ")
            ),
            ScheduleOutcome::Cancelled => bail!(
                "cancelled before completion; unfinished: {}",
                self.report.unfinished.join(", ")
            ),
        }
    }
}

/// Schedule every task of `cfg` and run its command on `pool`.
///
/// Returns once the schedule has ended and every launched command has
/// exited. Task failures are collected, not returned as errors.
pub async fn run_tasks(cfg: &ConfigFile, pool: WorkerPool) -> Result<RunSummary> {
    let commands = Arc::new(cfg.commands());
    let (feed, sink, schedule) = start_with_report(cfg.task_set().clone());

    let pooled = run_on_context_pool(feed, sink, pool, move |cancel, name| {
        let commands = Arc::clone(&commands);
        async move {
            match commands.get(&name) {
                Some(cmd) => run_command(&name, cmd, cancel).await,
                None => {
                    warn!(task = %name, "no command configured; treating as done");
                    Ok(())
                }
            }
        }
    })
    .await;

    let report = schedule
        .report()
        .await
        .context("scheduler task did not finish cleanly")?;

    let failures = match pooled {
        Ok(()) => Vec::new(),
        Err(err) => err
            .errors
            .into_iter()
            .map(|(task, e)| (task, e.to_string()))
            .collect(),
    };

    info!(
        outcome = ?report.outcome,
        completed = report.completed.len(),
        failed = failures.len(),
        "run finished"
    );
    if !report.unfinished.is_empty() {
        debug!(unfinished = ?report.unfinished, "tasks that never completed");
    }

    Ok(RunSummary { report, failures })
}

/// Worker pool settings: CLI flags win over `[config]`.
fn pool_from_config(cfg: &ConfigFile, args: &CliArgs) -> WorkerPool {
    let mut pool =
        WorkerPool::new().with_cancel_on_error(args.fail_fast || cfg.config.cancel_on_error);

    if let Some(limit) = args.max_concurrency.or(cfg.config.max_concurrency) {
        pool = pool.with_max_concurrency(limit);
    }
    pool
}

/// Simple dry-run output: print tasks, groups, deps and cycles.
fn print_dry_run(cfg: &ConfigFile) {
    println!("taskqueue dry-run");
    println!("  config.max_concurrency = {:?}", cfg.config.max_concurrency);
    println!("  config.cancel_on_error = {}", cfg.config.cancel_on_error);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        if !task.group.is_empty() {
            println!("      group: {}", task.group);
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }

    let cycles = cfg.task_set().find_cycles();
    if !cycles.is_empty() {
        println!();
        println!("cycles ({}); these tasks and their dependents will never run:", cycles.len());
        for cycle in cycles {
            println!("  - {}", cycle.join(" -> "));
        }
    }

    debug!("dry-run complete (no execution)");
}
