//! Progress monitoring for long-running export/import phases
//!
//! A `ProgressMonitor` samples a `ProgressProbe` on a fixed interval from a
//! background task and hands each sample to a `ProgressSink`. Monitoring is
//! advisory: probe failures are skipped and never affect the observed
//! operation.

mod probe;

pub use probe::*;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default interval between progress samples
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One observation of a running phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    /// Bytes written (export) or consumed (import) so far
    pub bytes_observed: u64,
    /// Total bytes expected, when known up front
    pub total_bytes: Option<u64>,
}

impl ProgressSample {
    pub fn new(bytes_observed: u64, total_bytes: Option<u64>) -> Self {
        Self {
            bytes_observed,
            total_bytes,
        }
    }

    /// Completion percentage, `min(100, 100 * observed / total)`.
    ///
    /// `None` when no non-zero total is known.
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.bytes_observed as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }
}

/// Receiver of progress samples.
///
/// Called from the monitor task, never concurrently with itself for the
/// same monitor.
pub trait ProgressSink: Send + Sync {
    fn on_sample(&self, sample: ProgressSample);
}

/// A sink that ignores all samples.
pub struct NoOpSink;

impl ProgressSink for NoOpSink {
    fn on_sample(&self, _sample: ProgressSample) {}
}

/// A closure-based sink.
pub struct FnSink<F>
where
    F: Fn(ProgressSample) + Send + Sync,
{
    f: F,
}

impl<F> FnSink<F>
where
    F: Fn(ProgressSample) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(ProgressSample) + Send + Sync,
{
    fn on_sample(&self, sample: ProgressSample) {
        (self.f)(sample)
    }
}

/// Helper to create an Arc-wrapped sink from a closure.
pub fn sink<F>(f: F) -> Arc<dyn ProgressSink>
where
    F: Fn(ProgressSample) + Send + Sync + 'static,
{
    Arc::new(FnSink::new(f))
}

/// Spawns monitor tasks.
pub struct ProgressMonitor;

impl ProgressMonitor {
    /// Start sampling `probe` every `interval` until the returned handle is
    /// stopped or `token` is cancelled.
    ///
    /// The first sample is taken one full interval after start. Samples are
    /// clamped so the reported byte count never decreases.
    pub fn spawn<P>(
        probe: P,
        interval: Duration,
        sink: Arc<dyn ProgressSink>,
        token: CancellationToken,
    ) -> MonitorHandle
    where
        P: ProgressProbe + 'static,
    {
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut highest = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        match probe.probe() {
                            Ok(sample) => {
                                highest = highest.max(sample.bytes_observed);
                                sink.on_sample(ProgressSample::new(highest, sample.total_bytes));
                            }
                            Err(e) => {
                                tracing::trace!(error = %e, "progress probe failed, skipping sample");
                            }
                        }
                    }
                }
            }
        });

        MonitorHandle { token, task }
    }
}

/// Handle to a running monitor task.
pub struct MonitorHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the monitor and wait for its task to exit.
    ///
    /// Once this returns the sink receives no further samples.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::debug!(error = %e, "progress monitor task ended abnormally");
        }
    }
}

/// Human-friendly byte count using binary units.
pub fn human_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut exponent = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        n /= UNIT;
        exponent += 1;
    }

    let value = bytes as f64 / (UNIT as f64).powi(exponent as i32 + 1);
    format!("{:.1} {}", value, PREFIXES[exponent])
}
