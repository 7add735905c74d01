//! Progress logging for record streams.

use std::cell::Cell;

use log::info;
use minute_metrics::format_count;

/// Logs a message every time the processed count crosses a multiple of the interval.
///
/// ```
/// use minute_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Read records").with_interval(100);
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "Read records 250 (complete)"
/// assert_eq!(tracker.count(), 250);
/// ```
#[derive(Debug)]
pub struct ProgressTracker {
    interval: u64,
    message: String,
    count: Cell<u64>,
}

impl ProgressTracker {
    /// Creates a tracker with the default interval of 1,000,000 records.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 1_000_000, message: message.into(), count: Cell::new(0) }
    }

    /// Sets the logging interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Adds to the count, logging each interval boundary crossed.
    ///
    /// Returns `true` if the new count is exactly on an interval boundary.
    pub fn log_if_needed(&self, additional: u64) -> bool {
        let prev = self.count.get();
        let new_count = prev + additional;
        self.count.set(new_count);

        for i in (prev / self.interval + 1)..=(new_count / self.interval) {
            info!("{} {}", self.message, format_count(i * self.interval));
        }
        new_count > 0 && new_count % self.interval == 0
    }

    /// Logs the final count unless the last boundary already reported it.
    pub fn log_final(&self) {
        let count = self.count.get();
        if count > 0 && count % self.interval != 0 {
            info!("{} {} (complete)", self.message, format_count(count));
        }
    }

    /// The current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.get()
    }
}
