// src/exec/command.rs

//! Shell command execution for a single task.

use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("process exited with status {0}")]
    Failed(i32),

    #[error("cancelled")]
    Cancelled,
}

/// Run `cmd` through the platform shell on behalf of `task`.
///
/// Output lines are logged with the task name attached. If `cancel` fires
/// first, the child is killed and [`CommandError::Cancelled`] is returned.
pub async fn run_command(
    task: &str,
    cmd: &str,
    cancel: CancellationToken,
) -> Result<(), CommandError> {
    if cancel.is_cancelled() {
        debug!(task = %task, "skipping command; pool already cancelled");
        return Err(CommandError::Cancelled);
    }

    info!(task = %task, cmd = %cmd, "starting task process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(CommandError::Spawn)?;

    if let Some(stdout) = child.stdout.take() {
        forward_lines(task.to_string(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(task.to_string(), "stderr", stderr);
    }

    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(CommandError::Wait)?;
            let code = status.code().unwrap_or(-1);

            info!(
                task = %task,
                exit_code = code,
                success = status.success(),
                "task process exited"
            );

            if status.success() {
                Ok(())
            } else {
                Err(CommandError::Failed(code))
            }
        }

        _ = cancel.cancelled() => {
            info!(task = %task, "cancellation requested; killing task process");
            if let Err(e) = child.kill().await {
                warn!(task = %task, error = %e, "failed to kill child process on cancellation");
            }
            Err(CommandError::Cancelled)
        }
    }
}

/// Log every line of a child's output stream until it closes.
fn forward_lines<R>(task: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(task = %task, stream, "{}", line);
        }
    });
}
