//! Worker statistics tracking

use std::time::Instant;

/// Statistics tracked by each worker.
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Number of jobs that reached a successful outcome.
    pub completed: usize,

    /// Number of jobs that failed.
    pub errors: usize,

    /// Total status polls issued across all jobs this worker ran.
    pub polls: usize,

    /// Worker start time.
    pub started_at: Option<Instant>,

    /// Worker end time.
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time).
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time).
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Total jobs resolved by this worker (successes + failures).
    pub fn total_jobs(&self) -> usize {
        self.completed + self.errors
    }

    /// Success rate in the 0.0 - 1.0 range.
    pub fn success_rate(&self) -> f64 {
        if self.total_jobs() == 0 {
            0.0
        } else {
            self.completed as f64 / self.total_jobs() as f64
        }
    }

    /// Elapsed time since start, or between start and stop once stopped.
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Record a successful job and the polls it took.
    pub fn record_success(&mut self, poll_count: u32) {
        self.completed += 1;
        self.polls += poll_count as usize;
    }

    /// Record a failed job.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Merge stats from another worker.
    pub fn merge(&mut self, other: &WorkerStats) {
        self.completed += other.completed;
        self.errors += other.errors;
        self.polls += other.polls;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let stats = WorkerStats::default();
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.polls, 0);
        assert!(stats.elapsed().is_none());
    }

    #[test]
    fn test_record_success_accumulates_polls() {
        let mut stats = WorkerStats::new();
        stats.record_success(0);
        stats.record_success(3);

        assert_eq!(stats.completed, 2);
        assert_eq!(stats.polls, 3);
    }

    #[test]
    fn test_success_rate() {
        let mut stats = WorkerStats::new();
        stats.completed = 8;
        stats.errors = 2;
        assert!((stats.success_rate() - 0.8).abs() < 0.001);
        assert_eq!(stats.total_jobs(), 10);
    }

    #[test]
    fn test_success_rate_zero_jobs() {
        assert_eq!(WorkerStats::new().success_rate(), 0.0);
    }

    #[test]
    fn test_merge() {
        let mut a = WorkerStats::new();
        a.completed = 10;
        a.errors = 1;
        a.polls = 20;

        let mut b = WorkerStats::new();
        b.completed = 5;
        b.errors = 2;
        b.polls = 7;

        a.merge(&b);
        assert_eq!(a.completed, 15);
        assert_eq!(a.errors, 3);
        assert_eq!(a.polls, 27);
    }

    #[test]
    fn test_start_stop_elapsed() {
        let mut stats = WorkerStats::new();
        stats.start();
        std::thread::sleep(Duration::from_millis(10));
        stats.stop();

        assert!(stats.elapsed().unwrap() >= Duration::from_millis(10));
    }
}
