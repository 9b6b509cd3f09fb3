//! Interactive terminal presenter
//!
//! Prompts go to stderr and answers are read from stdin on a reader thread.
//! A pending prompt gives up as soon as the cancellation token fires. Each
//! running phase shows an `indicatif` spinner whose message is updated from
//! progress samples.

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use transporter_core::{
    Phase, Presenter, ProcessError, ProgressSample, ProgressSink, Result, TransferError,
    human_size,
};

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Presenter for an operator at a terminal
pub struct TerminalPresenter {
    spinner: Mutex<Option<ProgressBar>>,
    token: CancellationToken,
}

impl TerminalPresenter {
    /// Prompts fail with [`TransferError::Prompt`] once `token` is cancelled.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            spinner: Mutex::new(None),
            token,
        }
    }

    async fn ask(&self, prompt: String) -> Result<String> {
        interruptible(&self.token, read_answer(prompt)).await
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

#[async_trait]
impl Presenter for TerminalPresenter {
    async fn select(&self, label: &str, options: &[String]) -> Result<String> {
        let mut menu = format!("{}\n", label);
        for (index, option) in options.iter().enumerate() {
            menu.push_str(&format!("  {}) {}\n", index + 1, option));
        }
        menu.push_str("> ");

        loop {
            let answer = self.ask(menu.clone()).await?;
            if let Some(choice) = parse_choice(&answer, options) {
                return Ok(choice.clone());
            }
            eprintln!("Enter a number between 1 and {}.", options.len());
        }
    }

    async fn confirm(&self, message: &str) -> Result<bool> {
        let answer = self.ask(format!("{} [y/N]: ", message)).await?;
        Ok(parse_confirmation(&answer))
    }

    async fn input_path(&self, label: &str, default: &Path, must_exist: bool) -> Result<PathBuf> {
        let prompt = format!("{} [{}]: ", label, default.display());
        loop {
            let answer = self.ask(prompt.clone()).await?;
            let path = resolve_path(&answer, default);
            if !must_exist || path.is_file() {
                return Ok(path);
            }
            eprintln!("{} does not exist or is not a file.", path.display());
        }
    }

    fn phase_started(&self, phase: Phase) -> Arc<dyn ProgressSink> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::spinner_style());
        bar.set_message(starting_message(phase));
        bar.enable_steady_tick(TICK_INTERVAL);

        if let Some(previous) = self.spinner.lock().replace(bar.clone()) {
            previous.finish_and_clear();
        }
        Arc::new(SpinnerSink { bar, phase })
    }

    fn phase_finished(&self, phase: Phase, error: Option<&ProcessError>) {
        let Some(bar) = self.spinner.lock().take() else {
            return;
        };
        match error {
            None => bar.finish_with_message(format!("{} finished", capitalize(phase.as_str()))),
            Some(e) => {
                bar.abandon_with_message(format!("{} failed", capitalize(phase.as_str())));
                tracing::debug!(phase = %phase, error = %e, "phase reported as failed");
            }
        }
    }

    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

/// Forwards progress samples into the spinner message
struct SpinnerSink {
    bar: ProgressBar,
    phase: Phase,
}

impl ProgressSink for SpinnerSink {
    fn on_sample(&self, sample: ProgressSample) {
        self.bar.set_message(progress_message(self.phase, sample));
    }
}

/// Resolve `answer` unless `token` is cancelled first.
async fn interruptible<T>(
    token: &CancellationToken,
    answer: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(TransferError::Prompt("interrupted".to_string())),
        answer = answer => answer,
    }
}

/// Print `prompt` to stderr and read one line from stdin.
///
/// The read runs on a detached thread: a blocking-pool task would hold up
/// runtime shutdown after an interrupt. End of input is a prompt error so a
/// closed stdin never loops forever.
async fn read_answer(prompt: String) -> Result<String> {
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("prompt-reader".to_string())
        .spawn(move || {
            let _ = tx.send(read_line(&prompt));
        })
        .map_err(|e| TransferError::Prompt(format!("cannot start prompt reader: {}", e)))?;

    rx.await
        .map_err(|_| TransferError::Prompt("prompt reader stopped".to_string()))?
        .map_err(|e| TransferError::Prompt(e.to_string()))?
        .ok_or_else(|| TransferError::Prompt("input closed".to_string()))
}

fn read_line(prompt: &str) -> io::Result<Option<String>> {
    let mut stderr = io::stderr().lock();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Accept either the 1-based number of an option or its exact label.
fn parse_choice<'a>(answer: &str, options: &'a [String]) -> Option<&'a String> {
    let answer = answer.trim();
    if let Ok(index) = answer.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| options.get(i));
    }
    options.iter().find(|option| option.as_str() == answer)
}

fn parse_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn resolve_path(answer: &str, default: &Path) -> PathBuf {
    let answer = answer.trim();
    if answer.is_empty() {
        default.to_path_buf()
    } else {
        PathBuf::from(answer)
    }
}

fn starting_message(phase: Phase) -> String {
    match phase {
        Phase::Export => "Exporting...".to_string(),
        Phase::Wipe => "Wiping destination...".to_string(),
        Phase::Import => "Importing...".to_string(),
    }
}

/// Spinner text for a sample: percent when the total is known, otherwise
/// the size seen so far.
fn progress_message(phase: Phase, sample: ProgressSample) -> String {
    let detail = match sample.percent() {
        Some(percent) => format!("{:.1}%", percent),
        None => human_size(sample.bytes_observed),
    };
    match phase {
        Phase::Export => format!("Exporting... ({})", detail),
        Phase::Wipe => "Wiping destination...".to_string(),
        Phase::Import => format!("Importing... ({})", detail),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests;
