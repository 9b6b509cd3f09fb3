//! Child process lifetime management

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{CountingReader, OperationContext};
use crate::ProcessError;

const STDIN_BUFFER_SIZE: usize = 256 * 1024;

enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

/// Owns one running external tool.
///
/// Standard output is discarded and standard error is collected in the
/// background. The child is killed if the handle is dropped before it exits.
pub struct ProcessHandle {
    tool: String,
    child: Child,
    stderr: Option<JoinHandle<String>>,
    stdin_feed: Option<JoinHandle<std::io::Result<u64>>>,
}

impl ProcessHandle {
    /// Launch `command`. `tool` labels the process in errors and logs.
    ///
    /// Standard input is left as configured by the caller.
    pub fn spawn(tool: impl Into<String>, mut command: Command) -> Result<Self, ProcessError> {
        let tool = tool.into();
        command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            tool: tool.clone(),
            source,
        })?;
        tracing::debug!(tool = %tool, pid = ?child.id(), "spawned external tool");

        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut captured = Vec::new();
                if let Err(e) = pipe.read_to_end(&mut captured).await {
                    tracing::debug!(error = %e, "stopped reading tool diagnostics");
                }
                String::from_utf8_lossy(&captured).into_owned()
            })
        });

        Ok(Self {
            tool,
            child,
            stderr,
            stdin_feed: None,
        })
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// OS process id, while the child has not been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Stream `input` into the child's standard input, adding every byte
    /// read from the file to `counter`. Standard input is closed at EOF.
    ///
    /// The command must have been spawned with a piped standard input.
    pub fn feed_stdin(&mut self, input: File, counter: Arc<AtomicU64>) -> Result<(), ProcessError> {
        let mut stdin = self.child.stdin.take().ok_or_else(|| ProcessError::Io {
            tool: self.tool.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "standard input is not piped",
            ),
        })?;

        let mut reader =
            BufReader::with_capacity(STDIN_BUFFER_SIZE, CountingReader::new(input, counter));
        self.stdin_feed = Some(tokio::spawn(async move {
            let copied = tokio::io::copy_buf(&mut reader, &mut stdin).await?;
            stdin.shutdown().await?;
            Ok(copied)
        }));
        Ok(())
    }

    /// Kill the child and reap it.
    pub async fn terminate(&mut self) {
        match self.child.kill().await {
            Ok(()) => tracing::debug!(tool = %self.tool, "terminated external tool"),
            Err(e) => tracing::warn!(tool = %self.tool, error = %e, "failed to terminate external tool"),
        }
    }

    /// Wait for the child to exit, or terminate it when `ctx` is cancelled
    /// or its deadline passes.
    pub async fn wait(mut self, ctx: &OperationContext) -> Result<(), ProcessError> {
        let outcome = tokio::select! {
            status = self.child.wait() => WaitOutcome::Exited(status),
            _ = ctx.token().cancelled() => WaitOutcome::Cancelled,
            _ = tokio::time::sleep_until(ctx.deadline()) => WaitOutcome::TimedOut,
        };

        match outcome {
            WaitOutcome::Exited(Ok(status)) => {
                self.finish_stdin_feed(ctx.deadline()).await;
                let stderr = self.collect_stderr(ctx.deadline()).await;
                if status.success() {
                    tracing::debug!(tool = %self.tool, "external tool finished");
                    Ok(())
                } else {
                    tracing::warn!(tool = %self.tool, code = ?status.code(), "external tool failed");
                    Err(ProcessError::Exited {
                        tool: self.tool,
                        code: status.code(),
                        stderr,
                    })
                }
            }
            WaitOutcome::Exited(Err(source)) => {
                self.abort_helpers();
                Err(ProcessError::Io {
                    tool: self.tool,
                    source,
                })
            }
            WaitOutcome::Cancelled => {
                tracing::warn!(tool = %self.tool, "cancellation requested, terminating external tool");
                self.terminate().await;
                self.abort_helpers();
                Err(ProcessError::Cancelled { tool: self.tool })
            }
            WaitOutcome::TimedOut => {
                tracing::warn!(tool = %self.tool, timeout = ?ctx.timeout(), "deadline exceeded, terminating external tool");
                self.terminate().await;
                self.abort_helpers();
                Err(ProcessError::TimedOut {
                    tool: self.tool,
                    after: ctx.timeout(),
                })
            }
        }
    }

    async fn finish_stdin_feed(&mut self, deadline: Instant) {
        let Some(mut feed) = self.stdin_feed.take() else {
            return;
        };
        match tokio::time::timeout_at(deadline, &mut feed).await {
            Ok(Ok(Ok(bytes))) => tracing::trace!(tool = %self.tool, bytes, "standard input fully written"),
            Ok(Ok(Err(e))) => tracing::debug!(tool = %self.tool, error = %e, "standard input closed early"),
            Ok(Err(e)) => tracing::debug!(tool = %self.tool, error = %e, "standard input task ended abnormally"),
            Err(_) => {
                tracing::warn!(tool = %self.tool, "standard input feed still running at the deadline");
                feed.abort();
            }
        }
    }

    /// Standard error captured so far. A descendant that inherited the pipe
    /// can keep it open after the tool exits, so collection stops at
    /// `deadline`.
    async fn collect_stderr(&mut self, deadline: Instant) -> String {
        let Some(mut task) = self.stderr.take() else {
            return String::new();
        };
        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(stderr) => stderr.unwrap_or_default(),
            Err(_) => {
                tracing::warn!(tool = %self.tool, "standard error still open at the deadline");
                task.abort();
                String::new()
            }
        }
    }

    fn abort_helpers(&mut self) {
        if let Some(feed) = self.stdin_feed.take() {
            feed.abort();
        }
        if let Some(stderr) = self.stderr.take() {
            stderr.abort();
        }
    }
}
