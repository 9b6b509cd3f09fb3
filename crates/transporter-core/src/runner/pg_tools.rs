//! `pg_dump`/`psql` driver

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::process::Command;

use super::{DumpRestore, OperationContext, ProcessHandle, WIPE_STATEMENT};
use crate::progress::DEFAULT_POLL_INTERVAL;
use crate::{
    ConnectionDescriptor, CounterProbe, FileSizeProbe, ProcessError, ProgressMonitor, ProgressSink,
};

const PG_DUMP: &str = "pg_dump";
const PSQL: &str = "psql";

/// Program plus leading arguments used to launch one external tool.
///
/// The leading arguments come before the connection arguments, so a tool
/// can be wrapped (`["docker", "exec", "-i", "pg", "pg_dump"]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append leading arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from an argv-style list whose first element is the program.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(program).with_args(args.iter().cloned()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self, descriptor: &ConnectionDescriptor) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(descriptor.connection_args())
            .envs(descriptor.env_overlay());
        command
    }
}

/// `DumpRestore` backed by the PostgreSQL client tools.
#[derive(Debug, Clone)]
pub struct PgTools {
    pg_dump: ToolCommand,
    psql: ToolCommand,
    poll_interval: Duration,
}

impl PgTools {
    /// Use `pg_dump` and `psql` from `PATH`.
    pub fn new() -> Self {
        Self {
            pg_dump: ToolCommand::new(PG_DUMP),
            psql: ToolCommand::new(PSQL),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_pg_dump(mut self, command: ToolCommand) -> Self {
        self.pg_dump = command;
        self
    }

    pub fn with_psql(mut self, command: ToolCommand) -> Self {
        self.psql = command;
        self
    }

    /// Interval between progress samples
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn pg_dump(&self) -> &ToolCommand {
        &self.pg_dump
    }

    pub fn psql(&self) -> &ToolCommand {
        &self.psql
    }
}

impl Default for PgTools {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DumpRestore for PgTools {
    #[tracing::instrument(skip_all, fields(source = %source.name(), output = %output.display()))]
    async fn export(
        &self,
        source: &ConnectionDescriptor,
        output: &Path,
        sink: Arc<dyn ProgressSink>,
        ctx: &OperationContext,
    ) -> Result<(), ProcessError> {
        let mut command = self.pg_dump.command(source);
        command
            .args(["--no-owner", "--no-privileges", "-F", "p", "-f"])
            .arg(output)
            .stdin(Stdio::null());

        let handle = ProcessHandle::spawn(PG_DUMP, command)?;
        let monitor = ProgressMonitor::spawn(
            FileSizeProbe::new(output),
            self.poll_interval,
            sink,
            ctx.token().child_token(),
        );
        let result = handle.wait(ctx).await;
        monitor.stop().await;
        result
    }

    #[tracing::instrument(skip_all, fields(destination = %destination.name()))]
    async fn wipe(
        &self,
        destination: &ConnectionDescriptor,
        ctx: &OperationContext,
    ) -> Result<(), ProcessError> {
        let mut command = self.psql.command(destination);
        command.arg("-c").arg(WIPE_STATEMENT).stdin(Stdio::null());

        ProcessHandle::spawn(PSQL, command)?.wait(ctx).await
    }

    #[tracing::instrument(skip_all, fields(destination = %destination.name(), input = %input.display()))]
    async fn import(
        &self,
        destination: &ConnectionDescriptor,
        input: &Path,
        sink: Arc<dyn ProgressSink>,
        ctx: &OperationContext,
    ) -> Result<(), ProcessError> {
        let file = tokio::fs::File::open(input)
            .await
            .map_err(|source| ProcessError::Input {
                path: input.to_path_buf(),
                source,
            })?;
        let total = match file.metadata().await {
            Ok(metadata) => Some(metadata.len()),
            Err(e) => {
                tracing::debug!(error = %e, "dump size unknown, reporting absolute progress");
                None
            }
        };

        let mut command = self.psql.command(destination);
        command.stdin(Stdio::piped());

        let mut handle = ProcessHandle::spawn(PSQL, command)?;
        let consumed = Arc::new(AtomicU64::new(0));
        handle.feed_stdin(file, consumed.clone())?;

        let monitor = ProgressMonitor::spawn(
            CounterProbe::new(consumed, total),
            self.poll_interval,
            sink,
            ctx.token().child_token(),
        );
        let result = handle.wait(ctx).await;
        monitor.stop().await;
        result
    }
}
