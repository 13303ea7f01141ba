use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time;

use crate::error::LessonError;

/// How the child's streams are captured. Fetch/submit merge stderr into
/// stdout so a failure carries everything the tool printed; the list and
/// validate calls keep them split because stdout must stay parseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Split,
    Merged,
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// The external grading tool is the real subsystem boundary; this is the
/// whole interface to it. Tests substitute a double that returns canned
/// exit codes and output without spawning anything.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run `command` with `args` in `cwd` and wait for it to finish.
    /// A non-zero exit is a normal return value, not an `Err`; only a
    /// process that cannot be started (or times out) is an error.
    async fn run(
        &self,
        command: &str,
        args: &[&str],
        cwd: &Path,
        mode: CaptureMode,
    ) -> Result<CommandOutput, LessonError>;
}

/// One fresh OS process per call; nothing is reused.
pub struct ToolInvoker {
    timeout: Option<Duration>,
}

impl ToolInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        ToolInvoker { timeout }
    }
}

#[async_trait]
impl Invoker for ToolInvoker {
    async fn run(
        &self,
        command: &str,
        args: &[&str],
        cwd: &Path,
        mode: CaptureMode,
    ) -> Result<CommandOutput, LessonError> {
        tracing::debug!(command, ?args, cwd = %cwd.display(), "spawning grader");

        let mut child = Command::new(command)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LessonError::Launch {
                command: command.to_string(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty child can't fill one
        // and deadlock against our wait.
        let stdout_task = tokio::spawn(read_to_end(child.stdout.take()));
        let stderr_task = tokio::spawn(read_to_end(child.stderr.take()));

        let status = match self.timeout {
            Some(limit) => match time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "failed to kill timed-out grader");
                    }
                    return Err(LessonError::Timeout { limit });
                }
            },
            None => child.wait().await,
        }
        .map_err(|source| LessonError::Launch {
            command: command.to_string(),
            source,
        })?;

        let mut stdout = stdout_task.await.unwrap_or_default();
        let mut stderr = stderr_task.await.unwrap_or_default();
        if mode == CaptureMode::Merged {
            stdout.append(&mut stderr);
        }

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

async fn read_to_end<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}
