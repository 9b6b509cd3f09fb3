//! Transfer orchestration
//!
//! The `Orchestrator` drives one transfer through
//! `SelectingEndpoints → Validating → ConfirmingDestruction → Exporting →
//! Wiping → Importing → Done`. Validation failures and a declined
//! confirmation end in `Aborted`; a failing phase ends in `Failed` and no
//! later phase is attempted. Export always completes before the
//! destination is wiped.

mod endpoint;
mod selection;

pub use endpoint::*;
pub use selection::*;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::progress::DEFAULT_POLL_INTERVAL;
use crate::runner::{DEFAULT_OPERATION_TIMEOUT, DumpRestore, OperationContext, Phase};
use crate::{ProcessError, ProgressSink, Result, TransferError};

/// Default intermediate dump file, relative to the working directory
pub const DEFAULT_DUMP_PATH: &str = "dump.sql";

/// Final success marker reported to the operator
pub const SUCCESS_MARKER: &str = "All done ✅";

/// Explicit settings threaded into a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    /// Deadline for the whole transfer, all phases included
    pub timeout: Duration,
    /// Intermediate dump for database copies and default for file prompts
    pub dump_path: PathBuf,
    /// Interval between progress samples
    pub poll_interval: Duration,
}

impl TransferSettings {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dump_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_path = path.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_OPERATION_TIMEOUT,
            dump_path: Path::new(".").join(DEFAULT_DUMP_PATH),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    SelectingEndpoints,
    Validating,
    ConfirmingDestruction,
    Exporting,
    Wiping,
    Importing,
    Done,
    Aborted,
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Done | TransferState::Aborted | TransferState::Failed
        )
    }
}

impl From<Phase> for TransferState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Export => TransferState::Exporting,
            Phase::Wipe => TransferState::Wiping,
            Phase::Import => TransferState::Importing,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a transfer ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Every phase succeeded. `artifact` is the dump file produced, if any.
    Completed { artifact: Option<PathBuf> },
    /// The operator declined the confirmation; nothing was executed.
    Aborted,
}

/// The operator-facing side of a transfer: prompts and progress display.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Single choice from `options`, returning the chosen label.
    async fn select(&self, label: &str, options: &[String]) -> Result<String>;

    /// Yes/no question defaulting to "no".
    async fn confirm(&self, message: &str) -> Result<bool>;

    /// Ask for a path, offering `default`. With `must_exist` the path must
    /// name an existing file.
    async fn input_path(&self, label: &str, default: &Path, must_exist: bool) -> Result<PathBuf>;

    /// A phase is starting; returns the sink for its progress samples.
    fn phase_started(&self, phase: Phase) -> Arc<dyn ProgressSink>;

    /// A phase ended, successfully when `error` is `None`.
    fn phase_finished(&self, phase: Phase, error: Option<&ProcessError>);

    /// Informational line for the operator.
    fn notify(&self, message: &str);
}

/// State machine for one transfer.
pub struct Orchestrator {
    driver: Arc<dyn DumpRestore>,
    settings: TransferSettings,
    state: TransferState,
    history: Vec<TransferState>,
}

impl Orchestrator {
    pub fn new(driver: Arc<dyn DumpRestore>, settings: TransferSettings) -> Self {
        Self {
            driver,
            settings,
            state: TransferState::SelectingEndpoints,
            history: vec![TransferState::SelectingEndpoints],
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[TransferState] {
        &self.history
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Select endpoints (prompting for any side not preset), then run.
    pub async fn execute(
        &mut self,
        catalog: &SourceCatalog,
        preset: EndpointPreset,
        presenter: &dyn Presenter,
        token: CancellationToken,
    ) -> Result<TransferOutcome> {
        let selected =
            select_endpoints(catalog, preset, presenter, &self.settings.dump_path).await;

        match selected {
            Ok(request) => self.run(request, presenter, token).await,
            Err(TransferError::Validation(e)) => {
                self.transition(TransferState::Validating);
                self.transition(TransferState::Aborted);
                Err(e.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Validate, confirm and execute an already selected request.
    pub async fn run(
        &mut self,
        request: TransferRequest,
        presenter: &dyn Presenter,
        token: CancellationToken,
    ) -> Result<TransferOutcome> {
        self.transition(TransferState::Validating);
        let plan = match validate(request, &self.settings.dump_path) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "transfer rejected");
                self.transition(TransferState::Aborted);
                return Err(e.into());
            }
        };

        if let Some(message) = confirmation_message(&plan) {
            self.transition(TransferState::ConfirmingDestruction);
            if !presenter.confirm(&message).await? {
                tracing::info!("operator declined confirmation");
                self.transition(TransferState::Aborted);
                presenter.notify("Aborted.");
                return Ok(TransferOutcome::Aborted);
            }
        }

        self.execute_plan(&plan, presenter, token).await
    }

    async fn execute_plan(
        &mut self,
        plan: &TransferPlan,
        presenter: &dyn Presenter,
        token: CancellationToken,
    ) -> Result<TransferOutcome> {
        let ctx = OperationContext::new(self.settings.timeout, token);
        tracing::info!(phases = ?plan.phases(), timeout = ?ctx.timeout(), "starting transfer");

        for step in plan.steps() {
            let phase = step.phase();
            self.transition(phase.into());

            let result = if ctx.is_cancelled() {
                Err(ProcessError::Cancelled {
                    tool: phase.to_string(),
                })
            } else {
                self.run_step(step, presenter, &ctx).await
            };
            presenter.phase_finished(phase, result.as_ref().err());

            if let Err(source) = result {
                tracing::error!(phase = %phase, error = %source, "phase failed, halting transfer");
                self.transition(TransferState::Failed);
                if phase == Phase::Import {
                    if let (Some(destination), Some(input)) =
                        (plan.destination_database(), plan.import_input())
                    {
                        presenter.notify(&format!(
                            "DESTINATION {:?} was wiped but the import did not complete. The dump is kept at {} for a manual retry.",
                            destination.name(),
                            input.display()
                        ));
                    }
                }
                return Err(TransferError::Phase { phase, source });
            }
        }

        self.transition(TransferState::Done);
        let artifact = plan.artifact().map(Path::to_path_buf);
        if let Some(path) = &artifact {
            presenter.notify(&format!("Dump written to {}", path.display()));
        }
        presenter.notify(SUCCESS_MARKER);

        Ok(TransferOutcome::Completed { artifact })
    }

    async fn run_step(
        &self,
        step: Step<'_>,
        presenter: &dyn Presenter,
        ctx: &OperationContext,
    ) -> std::result::Result<(), ProcessError> {
        let sink = presenter.phase_started(step.phase());
        match step {
            Step::Export { source, output } => {
                self.driver.export(source, output, sink, ctx).await
            }
            Step::Wipe { destination } => self.driver.wipe(destination, ctx).await,
            Step::Import { destination, input } => {
                self.driver.import(destination, input, sink, ctx).await
            }
        }
    }

    fn transition(&mut self, next: TransferState) {
        tracing::debug!(from = %self.state, to = %next, "transfer state change");
        self.state = next;
        self.history.push(next);
    }
}

/// Question put to the operator before anything is overwritten.
///
/// Export to a new file overwrites nothing and needs no confirmation.
fn confirmation_message(plan: &TransferPlan) -> Option<String> {
    match plan {
        TransferPlan::ExportOnly { output, .. } if output.exists() => Some(format!(
            "FILE {:?} already exists and will be OVERWRITTEN. Continue?",
            output.display().to_string()
        )),
        TransferPlan::ExportOnly { .. } => None,
        TransferPlan::Restore { input, destination } => Some(format!(
            "DESTINATION {:?} will be WIPED and replaced with contents of {:?}. Continue?",
            destination.name(),
            input.display().to_string()
        )),
        TransferPlan::Copy {
            source,
            destination,
            ..
        } => Some(format!(
            "DESTINATION {:?} will be WIPED and replaced with {:?}. Continue?",
            destination.name(),
            source.name()
        )),
    }
}
