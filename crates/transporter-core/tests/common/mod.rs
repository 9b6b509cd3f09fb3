//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use transporter_core::{
    ConnectionDescriptor, DumpRestore, NoOpSink, OperationContext, Phase, Presenter,
    ProcessError, ProgressSample, ProgressSink, Result, SourceCatalog, TransferError,
};

/// A call the orchestrator made on the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Export { source: String, output: PathBuf },
    Wipe { destination: String },
    Import { destination: String, input: PathBuf },
}

impl Call {
    pub fn phase(&self) -> Phase {
        match self {
            Call::Export { .. } => Phase::Export,
            Call::Wipe { .. } => Phase::Wipe,
            Call::Import { .. } => Phase::Import,
        }
    }
}

/// Dump/restore driver that records calls instead of launching tools.
///
/// Each successful phase reports a single 100% sample to its sink.
#[derive(Default)]
pub struct FakeDriver {
    pub calls: Arc<Mutex<Vec<Call>>>,
    fail_on: Option<Phase>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given phase with a non-zero exit
    pub fn with_failure(mut self, phase: Phase) -> Self {
        self.fail_on = Some(phase);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.calls.lock().iter().map(Call::phase).collect()
    }

    fn finish(&self, phase: Phase, tool: &str) -> std::result::Result<(), ProcessError> {
        if self.fail_on == Some(phase) {
            return Err(ProcessError::Exited {
                tool: tool.to_string(),
                code: Some(1),
                stderr: format!("{tool}: simulated failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DumpRestore for FakeDriver {
    async fn export(
        &self,
        source: &ConnectionDescriptor,
        output: &Path,
        sink: Arc<dyn ProgressSink>,
        _ctx: &OperationContext,
    ) -> std::result::Result<(), ProcessError> {
        self.calls.lock().push(Call::Export {
            source: source.name().to_string(),
            output: output.to_path_buf(),
        });
        self.finish(Phase::Export, "pg_dump")?;
        sink.on_sample(ProgressSample::new(1024, None));
        Ok(())
    }

    async fn wipe(
        &self,
        destination: &ConnectionDescriptor,
        _ctx: &OperationContext,
    ) -> std::result::Result<(), ProcessError> {
        self.calls.lock().push(Call::Wipe {
            destination: destination.name().to_string(),
        });
        self.finish(Phase::Wipe, "psql")
    }

    async fn import(
        &self,
        destination: &ConnectionDescriptor,
        input: &Path,
        sink: Arc<dyn ProgressSink>,
        _ctx: &OperationContext,
    ) -> std::result::Result<(), ProcessError> {
        self.calls.lock().push(Call::Import {
            destination: destination.name().to_string(),
            input: input.to_path_buf(),
        });
        self.finish(Phase::Import, "psql")?;
        sink.on_sample(ProgressSample::new(1024, Some(1024)));
        Ok(())
    }
}

/// Presenter answering prompts from queued responses.
///
/// Every prompt and notification is logged for assertions. Running out of
/// queued answers is reported as a prompt error.
#[derive(Default)]
pub struct ScriptedPresenter {
    selections: Mutex<VecDeque<String>>,
    paths: Mutex<VecDeque<PathBuf>>,
    confirm_answer: bool,
    pub prompts: Mutex<Vec<(String, Vec<String>)>>,
    pub confirmations: Mutex<Vec<String>>,
    pub notifications: Mutex<Vec<String>>,
    pub started: Mutex<Vec<Phase>>,
    pub finished: Mutex<Vec<(Phase, bool)>>,
    pub samples: Arc<Mutex<Vec<ProgressSample>>>,
}

impl ScriptedPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(self, choice: impl Into<String>) -> Self {
        self.selections.lock().push_back(choice.into());
        self
    }

    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        self.paths.lock().push_back(path.into());
        self
    }

    pub fn confirming(mut self, answer: bool) -> Self {
        self.confirm_answer = answer;
        self
    }

    pub fn options_for(&self, label: &str) -> Option<Vec<String>> {
        self.prompts
            .lock()
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, options)| options.clone())
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().clone()
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.lock().len()
    }
}

struct SharedSink(Arc<Mutex<Vec<ProgressSample>>>);

impl ProgressSink for SharedSink {
    fn on_sample(&self, sample: ProgressSample) {
        self.0.lock().push(sample);
    }
}

#[async_trait]
impl Presenter for ScriptedPresenter {
    async fn select(&self, label: &str, options: &[String]) -> Result<String> {
        self.prompts
            .lock()
            .push((label.to_string(), options.to_vec()));
        self.selections
            .lock()
            .pop_front()
            .ok_or_else(|| TransferError::Prompt(format!("no scripted answer for {label:?}")))
    }

    async fn confirm(&self, message: &str) -> Result<bool> {
        self.confirmations.lock().push(message.to_string());
        Ok(self.confirm_answer)
    }

    async fn input_path(&self, label: &str, default: &Path, _must_exist: bool) -> Result<PathBuf> {
        self.prompts.lock().push((label.to_string(), Vec::new()));
        Ok(self
            .paths
            .lock()
            .pop_front()
            .unwrap_or_else(|| default.to_path_buf()))
    }

    fn phase_started(&self, phase: Phase) -> Arc<dyn ProgressSink> {
        self.started.lock().push(phase);
        if phase == Phase::Wipe {
            return Arc::new(NoOpSink);
        }
        Arc::new(SharedSink(self.samples.clone()))
    }

    fn phase_finished(&self, phase: Phase, error: Option<&ProcessError>) {
        self.finished.lock().push((phase, error.is_none()));
    }

    fn notify(&self, message: &str) {
        self.notifications.lock().push(message.to_string());
    }
}

pub fn db(name: &str) -> ConnectionDescriptor {
    ConnectionDescriptor::new(name, "db.internal", 5432, "app", name)
}

/// `prod` (protected), `staging`, `qa`
pub fn catalog() -> SourceCatalog {
    SourceCatalog::new(vec![db("prod").protected(true), db("staging"), db("qa")])
}
