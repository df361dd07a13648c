// src/exec/mod.rs

//! Execution layer.
//!
//! - [`pool`] connects a scheduler's start feed and completion sink to a
//!   worker pool running arbitrary handlers.
//! - [`command`] runs a task's shell command with `tokio::process`; the CLI
//!   uses it as its handler.

pub mod command;
pub mod pool;

pub use command::{CommandError, run_command};
pub use pool::{
    HandlerError, PoolError, PoolOutcome, TaskContext, WorkerPool, run_on_context_pool,
    run_on_error_pool, run_on_pool, run_on_result_context_pool, run_on_result_error_pool,
    run_on_result_pool, run_with,
};
