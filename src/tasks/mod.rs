// src/tasks/mod.rs

//! Task definitions and validated task sets.
//!
//! - [`task`] holds the [`Task`] value type.
//! - [`set`] holds [`TaskSet`], the immutable name -> task mapping the
//!   scheduler consumes, together with its validating constructors.
//! - [`cycles`] offers cycle diagnostics for a built set.

pub mod cycles;
pub mod set;
pub mod task;

pub use set::TaskSet;
pub use task::Task;
