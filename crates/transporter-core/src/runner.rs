//! Dump/restore capability and its child-process implementation
//!
//! The orchestrator only sees the `DumpRestore` trait. `PgTools` implements
//! it by launching `pg_dump` and `psql`; tests substitute a recording fake so
//! no real tool is ever started.

mod counting;
mod pg_tools;
mod process;

pub use counting::*;
pub use pg_tools::*;
pub use process::*;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{ConnectionDescriptor, ProcessError, ProgressSink};

/// Deadline applied when the caller supplies none
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Statement used to wipe a destination's default schema
pub const WIPE_STATEMENT: &str = "DROP SCHEMA public CASCADE; CREATE SCHEMA public;";

/// One atomic, sequential step of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Export,
    Wipe,
    Import,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Export => "export",
            Phase::Wipe => "wipe",
            Phase::Import => "import",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cancellation signal and deadline shared by every phase of one transfer.
#[derive(Debug, Clone)]
pub struct OperationContext {
    token: CancellationToken,
    deadline: Instant,
    timeout: Duration,
}

impl OperationContext {
    /// Create a context whose deadline is `timeout` from now.
    pub fn new(timeout: Duration, token: CancellationToken) -> Self {
        Self {
            token,
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    /// Create a context with the default 30 minute deadline.
    pub fn with_default_timeout(token: CancellationToken) -> Self {
        Self::new(DEFAULT_OPERATION_TIMEOUT, token)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// The three operations a transfer needs from a dump/restore backend.
#[async_trait]
pub trait DumpRestore: Send + Sync {
    /// Dump `source` into `output`, creating or overwriting it.
    async fn export(
        &self,
        source: &ConnectionDescriptor,
        output: &Path,
        sink: Arc<dyn ProgressSink>,
        ctx: &OperationContext,
    ) -> Result<(), ProcessError>;

    /// Drop and recreate the destination's `public` schema.
    async fn wipe(
        &self,
        destination: &ConnectionDescriptor,
        ctx: &OperationContext,
    ) -> Result<(), ProcessError>;

    /// Apply the statements of `input` to `destination`.
    async fn import(
        &self,
        destination: &ConnectionDescriptor,
        input: &Path,
        sink: Arc<dyn ProgressSink>,
        ctx: &OperationContext,
    ) -> Result<(), ProcessError>;
}
