//! Periodic progress logging.

use std::time::{Duration, Instant};

/// Logs a progress line every time the count reaches a multiple of the interval.
pub struct ProgressLogger {
    interval: u64,
    count: u64,
    start: Instant,
}

impl ProgressLogger {
    #[must_use]
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            count: 0,
            start: Instant::now(),
        }
    }

    /// Count one item, logging if an interval boundary is reached.
    ///
    /// Returns whether a progress line was logged.
    pub fn record(&mut self) -> bool {
        self.count += 1;

        if self.count % self.interval == 0 {
            log::info!(
                "Processed {} reads in {:.1} minutes.",
                self.count,
                minutes(self.start.elapsed())
            );
            return true;
        }

        false
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

pub fn minutes(duration: Duration) -> f64 {
    duration.as_secs_f64() / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_at_interval() {
        let mut progress = ProgressLogger::new(3);
        let logged = (0..7).map(|_| progress.record()).collect::<Vec<_>>();

        assert_eq!(logged, [false, false, true, false, false, true, false]);
        assert_eq!(progress.count(), 7);
    }

    #[test]
    fn test_minutes() {
        assert_eq!(minutes(Duration::from_secs(90)), 1.5);
    }
}
