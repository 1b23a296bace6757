//! Helper utilities for multiput testing

use multiput_core::progress::ProgressCallback;
use std::sync::Mutex;

/// Progress callback that records everything it is told
#[derive(Debug, Default)]
pub struct RecordingProgress {
    inner: Mutex<Recorded>,
}

/// Snapshot of the calls seen by a [`RecordingProgress`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub total: Option<u64>,
    pub ticks: Vec<u64>,
    pub phases: Vec<String>,
    pub finished: usize,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Recorded {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressCallback for RecordingProgress {
    fn start(&self, total: u64) {
        self.lock().total = Some(total);
    }

    fn part_uploaded(&self, current: u64, _total: u64) {
        self.lock().ticks.push(current);
    }

    fn finish(&self) {
        self.lock().finished += 1;
    }

    fn begin_phase(&self, message: &str) {
        self.lock().phases.push(message.to_string());
    }
}
