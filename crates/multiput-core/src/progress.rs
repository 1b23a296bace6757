//! Progress reporting module

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Notification sent by a worker after one part has been accepted by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartEvent {
    pub part_number: u32,
    pub bytes: u64,
}

/// Progress callback for upload runs
pub trait ProgressCallback: Send + Sync {
    /// Called once the number of expected parts is known
    fn start(&self, total: u64);

    /// Called after each uploaded part with the running count
    fn part_uploaded(&self, current: u64, total: u64);

    /// Called when no more parts will be reported
    fn finish(&self);

    /// An indeterminate phase such as session setup has begun
    fn begin_phase(&self, _message: &str) {}

    /// The current indeterminate phase is over
    fn end_phase(&self) {}
}

/// No-op progress callback
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn start(&self, _total: u64) {}
    fn part_uploaded(&self, _current: u64, _total: u64) {}
    fn finish(&self) {}
}

/// Terminal progress reporter: a spinner for the setup and completion phases
/// and a part counter while workers run
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new(enabled: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            bar: Mutex::new(None),
            enabled,
        }
    }

    /// Create a spinner for indeterminate phases
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.enabled {
            return None;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("🌑🌒🌓🌔🌕🌖🌗🌘 ")
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        Some(spinner)
    }
}

impl ProgressCallback for ProgressReporter {
    fn start(&self, total: u64) {
        if !self.enabled {
            return;
        }

        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("Parts: [{bar:30}] {pos} of {len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#."),
        );
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn part_uploaded(&self, current: u64, _total: u64) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_position(current);
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn begin_phase(&self, message: &str) {
        let spinner = self.spinner(message);
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = std::mem::replace(&mut *slot, spinner) {
                previous.finish_and_clear();
            }
        }
    }

    fn end_phase(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }
}

/// Single consumer that turns worker events into progress ticks
///
/// The running count is owned by the consumer task alone; workers only send
/// events through the channel.
#[derive(Debug)]
pub(crate) struct ProgressAggregator {
    tx: mpsc::UnboundedSender<PartEvent>,
    handle: JoinHandle<u64>,
}

impl ProgressAggregator {
    pub(crate) fn spawn(total: u64, callback: Arc<dyn ProgressCallback>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PartEvent>();
        callback.start(total);

        let handle = tokio::spawn(async move {
            let mut current = 0u64;
            while rx.recv().await.is_some() {
                current += 1;
                callback.part_uploaded(current, total);
            }
            callback.finish();
            current
        });

        Self { tx, handle }
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<PartEvent> {
        self.tx.clone()
    }

    /// Close the channel and wait for the consumer, returning the number of parts seen
    ///
    /// Only returns once every outstanding sender has been dropped.
    pub(crate) async fn finish(self) -> u64 {
        drop(self.tx);
        self.handle.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct Counting {
        total: AtomicU64,
        last: AtomicU64,
        finished: AtomicU64,
    }

    impl ProgressCallback for Counting {
        fn start(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }
        fn part_uploaded(&self, current: u64, _total: u64) {
            self.last.store(current, Ordering::SeqCst);
        }
        fn finish(&self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_aggregator_counts_events_from_many_senders() {
        let counting = Arc::new(Counting::default());
        let aggregator = ProgressAggregator::spawn(12, counting.clone());

        let mut tasks = Vec::new();
        for worker in 0..4u32 {
            let tx = aggregator.sender();
            tasks.push(tokio::spawn(async move {
                for n in 0..3u32 {
                    tx.send(PartEvent {
                        part_number: n * 4 + worker + 1,
                        bytes: 10,
                    })
                    .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(aggregator.finish().await, 12);
        assert_eq!(counting.total.load(Ordering::SeqCst), 12);
        assert_eq!(counting.last.load(Ordering::SeqCst), 12);
        assert_eq!(counting.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_reporter_is_silent() {
        let reporter = ProgressReporter::new(false);
        assert!(reporter.spinner("Preparing").is_none());
        reporter.begin_phase("Preparing");
        reporter.end_phase();
        reporter.start(10);
        reporter.part_uploaded(1, 10);
        reporter.finish();
    }
}
