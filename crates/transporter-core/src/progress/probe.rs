//! Sources of progress samples

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ProgressSample;

/// Something the monitor can sample.
pub trait ProgressProbe: Send + Sync {
    fn probe(&self) -> std::io::Result<ProgressSample>;
}

/// Reports the current size of a file being written (export).
///
/// The final size is unknowable until the dump completes, so no total is
/// reported.
#[derive(Debug, Clone)]
pub struct FileSizeProbe {
    path: PathBuf,
}

impl FileSizeProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProgressProbe for FileSizeProbe {
    fn probe(&self) -> std::io::Result<ProgressSample> {
        let metadata = std::fs::metadata(&self.path)?;
        Ok(ProgressSample::new(metadata.len(), None))
    }
}

/// Reports a shared byte counter against an optional total (import).
#[derive(Debug, Clone)]
pub struct CounterProbe {
    counter: Arc<AtomicU64>,
    total: Option<u64>,
}

impl CounterProbe {
    /// A zero total is treated as unknown.
    pub fn new(counter: Arc<AtomicU64>, total: Option<u64>) -> Self {
        Self {
            counter,
            total: total.filter(|total| *total > 0),
        }
    }
}

impl ProgressProbe for CounterProbe {
    fn probe(&self) -> std::io::Result<ProgressSample> {
        Ok(ProgressSample::new(
            self.counter.load(Ordering::Relaxed),
            self.total,
        ))
    }
}
