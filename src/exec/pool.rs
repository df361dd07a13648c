// src/exec/pool.rs

//! Run scheduled tasks on a worker pool.
//!
//! The scheduler only emits names and waits for names to come back. This
//! module closes that loop: every name read from a [`StartFeed`] is handed to
//! a handler running on a Tokio [`JoinSet`], and when the handler finishes,
//! however it finishes, the name is reported on the [`CompletionSink`].
//!
//! There is one adapter, [`run_with`], parameterised over what a handler can
//! do:
//!
//! | entry point                    | token | fallible | result |
//! |--------------------------------|-------|----------|--------|
//! | [`run_on_pool`]                |       |          |        |
//! | [`run_on_error_pool`]          |       | yes      |        |
//! | [`run_on_context_pool`]        | yes   | yes      |        |
//! | [`run_on_result_pool`]         |       |          | yes    |
//! | [`run_on_result_error_pool`]   |       | yes      | yes    |
//! | [`run_on_result_context_pool`] | yes   | yes      | yes    |
//!
//! Once the pool's cancellation token fires (explicitly, or after the first
//! error with `cancel_on_error`), no further tasks are launched: the feed is
//! dropped, which stops the scheduler, and the adapter waits for handlers
//! that are already running.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::scheduler::{CompletionSink, StartFeed};
use crate::types::TaskName;

/// Pool configuration shared by every adapter entry point.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    max_concurrency: Option<usize>,
    cancel_on_error: bool,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Unbounded pool that keeps going after errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run at most `limit` handlers at once (a limit of 0 is treated as 1).
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }

    /// Cancel the pool's token as soon as a handler fails or panics.
    pub fn with_cancel_on_error(mut self, cancel_on_error: bool) -> Self {
        self.cancel_on_error = cancel_on_error;
        self
    }

    /// Use `token` as the pool's cancellation token, e.g. a child of an
    /// application-wide shutdown token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// What a handler gets to know about the task it runs.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub name: TaskName,
    /// Fires when the pool is cancelled.
    pub cancel: CancellationToken,
}

/// Failure of a single handler.
#[derive(Error, Debug)]
pub enum HandlerError<E> {
    #[error("{0}")]
    Failed(E),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Every handler failure of one pool run, in the order they finished.
#[derive(Debug)]
pub struct PoolError<E> {
    pub errors: Vec<(TaskName, HandlerError<E>)>,
}

impl<E: fmt::Display> fmt::Display for PoolError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task handler(s) failed", self.errors.len())?;
        for (i, (task, err)) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{task}: {err}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for PoolError<E> {}

/// Everything collected by [`run_with`].
#[derive(Debug)]
pub struct PoolOutcome<T, E> {
    /// Results of successful handlers, in the order they finished.
    pub results: Vec<T>,
    pub errors: Vec<(TaskName, HandlerError<E>)>,
}

impl<T, E> Default for PoolOutcome<T, E> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T, E> PoolOutcome<T, E> {
    pub fn into_result(self) -> Result<Vec<T>, PoolError<E>> {
        if self.errors.is_empty() {
            Ok(self.results)
        } else {
            Err(PoolError {
                errors: self.errors,
            })
        }
    }
}

type Joined<T, E> = (TaskName, Result<Result<T, E>, JoinError>);

/// Core adapter: run `handler` for every name the feed yields.
///
/// Each name is reported on `sink` exactly once, after its handler returned,
/// failed or panicked. The adapter's sink is closed when the feed is
/// exhausted and every handler has finished.
pub async fn run_with<H, Fut, T, E>(
    mut feed: StartFeed,
    sink: CompletionSink,
    pool: WorkerPool,
    handler: H,
) -> PoolOutcome<T, E>
where
    H: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let handler = Arc::new(handler);
    let limit = pool.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
    let mut running: JoinSet<Joined<T, E>> = JoinSet::new();
    let mut outcome = PoolOutcome::default();

    info!(
        max_concurrency = ?pool.max_concurrency,
        cancel_on_error = pool.cancel_on_error,
        "worker pool started"
    );

    loop {
        tokio::select! {
            biased;

            _ = pool.cancel.cancelled() => {
                info!("worker pool cancelled; not launching further tasks");
                break;
            }

            Some(joined) = running.join_next(), if !running.is_empty() => {
                absorb(&mut outcome, &pool, joined);
            }

            next = feed.recv() => match next {
                Some(name) => {
                    launch(&mut running, &handler, &limit, &pool, &sink, name);
                }
                None => {
                    debug!("start feed closed; draining worker pool");
                    break;
                }
            },
        }
    }

    // Stops the scheduler if it is still running (cancellation case).
    drop(feed);

    while let Some(joined) = running.join_next().await {
        absorb(&mut outcome, &pool, joined);
    }

    info!(
        succeeded = outcome.results.len(),
        failed = outcome.errors.len(),
        "worker pool drained"
    );
    outcome
}

fn launch<H, Fut, T, E>(
    running: &mut JoinSet<Joined<T, E>>,
    handler: &Arc<H>,
    limit: &Option<Arc<Semaphore>>,
    pool: &WorkerPool,
    sink: &CompletionSink,
    name: TaskName,
) where
    H: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let handler = Arc::clone(handler);
    let limit = limit.clone();
    let sink = sink.clone();
    let ctx = TaskContext {
        name: name.clone(),
        cancel: pool.cancel.clone(),
    };

    debug!(task = %name, "launching task handler");

    running.spawn(async move {
        // Reports `name` however this task ends, even if it is aborted.
        let guard = CompletionGuard {
            sink,
            name: name.clone(),
        };

        let _permit = match limit {
            Some(sem) => sem.acquire_owned().await.ok(),
            None => None,
        };

        // The handler is invoked inside the inner task, so a panic while
        // building its future is caught as well.
        let result = tokio::spawn(async move { handler(ctx).await }).await;

        drop(guard);
        (name, result)
    });
}

/// Reports a task on the completion sink when dropped.
struct CompletionGuard {
    sink: CompletionSink,
    name: TaskName,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Err(err) = self.sink.complete(std::mem::take(&mut self.name)) {
            debug!(task = %err.0, "scheduler gone before completion was reported");
        }
    }
}

fn absorb<T, E>(
    outcome: &mut PoolOutcome<T, E>,
    pool: &WorkerPool,
    joined: Result<Joined<T, E>, JoinError>,
) {
    let (name, result) = match joined {
        Ok(joined) => joined,
        Err(err) => {
            error!(error = %err, "worker pool task aborted");
            return;
        }
    };

    let failure = match result {
        Ok(Ok(value)) => {
            debug!(task = %name, "task handler succeeded");
            outcome.results.push(value);
            return;
        }
        Ok(Err(err)) => {
            warn!(task = %name, "task handler failed");
            HandlerError::Failed(err)
        }
        Err(err) => {
            error!(task = %name, error = %err, "task handler panicked");
            HandlerError::Panicked(err.to_string())
        }
    };

    outcome.errors.push((name, failure));
    if pool.cancel_on_error && !pool.cancel.is_cancelled() {
        info!("cancelling worker pool after first failure");
        pool.cancel.cancel();
    }
}

/// Run infallible handlers. Panics are logged and otherwise ignored.
pub async fn run_on_pool<H, Fut>(
    feed: StartFeed,
    sink: CompletionSink,
    pool: WorkerPool,
    handler: H,
) where
    H: Fn(TaskName) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let _: PoolOutcome<(), Infallible> = run_with(feed, sink, pool, move |ctx: TaskContext| {
        let fut = handler(ctx.name);
        async move {
            fut.await;
            Ok(())
        }
    })
    .await;
}

pub async fn run_on_error_pool<H, Fut, E>(
    feed: StartFeed,
    sink: CompletionSink,
    pool: WorkerPool,
    handler: H,
) -> Result<(), PoolError<E>>
where
    H: Fn(TaskName) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    run_with(feed, sink, pool, move |ctx: TaskContext| handler(ctx.name))
        .await
        .into_result()
        .map(|_| ())
}

pub async fn run_on_context_pool<H, Fut, E>(
    feed: StartFeed,
    sink: CompletionSink,
    pool: WorkerPool,
    handler: H,
) -> Result<(), PoolError<E>>
where
    H: Fn(CancellationToken, TaskName) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    run_with(feed, sink, pool, move |ctx: TaskContext| handler(ctx.cancel, ctx.name))
        .await
        .into_result()
        .map(|_| ())
}

/// Run infallible handlers and collect their results in completion order.
pub async fn run_on_result_pool<H, Fut, T>(
    feed: StartFeed,
    sink: CompletionSink,
    pool: WorkerPool,
    handler: H,
) -> Vec<T>
where
    H: Fn(TaskName) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let outcome: PoolOutcome<T, Infallible> =
        run_with(feed, sink, pool, move |ctx: TaskContext| {
            let fut = handler(ctx.name);
            async move { Ok(fut.await) }
        })
        .await;
    outcome.results
}

pub async fn run_on_result_error_pool<H, Fut, T, E>(
    feed: StartFeed,
    sink: CompletionSink,
    pool: WorkerPool,
    handler: H,
) -> Result<Vec<T>, PoolError<E>>
where
    H: Fn(TaskName) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    run_with(feed, sink, pool, move |ctx: TaskContext| handler(ctx.name))
        .await
        .into_result()
}

pub async fn run_on_result_context_pool<H, Fut, T, E>(
    feed: StartFeed,
    sink: CompletionSink,
    pool: WorkerPool,
    handler: H,
) -> Result<Vec<T>, PoolError<E>>
where
    H: Fn(CancellationToken, TaskName) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    run_with(feed, sink, pool, move |ctx: TaskContext| handler(ctx.cancel, ctx.name))
        .await
        .into_result()
}
