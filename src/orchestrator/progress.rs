//! Batch progress and the completion-time estimate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Snapshot of how far a batch has come. Recomputed after every file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub total_files: usize,
    pub completed_files: usize,
    pub started_at: DateTime<Utc>,
    pub estimated_seconds_remaining: Option<u64>,
}

impl BatchProgress {
    /// Progress at batch start, with the assumption-based estimate.
    pub fn start(total_files: usize, assumed_secs_per_file: u64) -> Self {
        Self {
            total_files,
            completed_files: 0,
            started_at: Utc::now(),
            estimated_seconds_remaining: estimate_remaining(
                total_files,
                0,
                Duration::ZERO,
                assumed_secs_per_file,
            ),
        }
    }

    /// Record one more finished file and refresh the estimate.
    pub fn record_completion(&mut self, assumed_secs_per_file: u64) {
        self.completed_files = (self.completed_files + 1).min(self.total_files);
        let elapsed = (Utc::now() - self.started_at).to_std().unwrap_or_default();
        self.estimated_seconds_remaining = estimate_remaining(
            self.total_files,
            self.completed_files,
            elapsed,
            assumed_secs_per_file,
        );
    }

    pub fn is_complete(&self) -> bool {
        self.completed_files >= self.total_files
    }

    pub fn remaining_files(&self) -> usize {
        self.total_files.saturating_sub(self.completed_files)
    }
}

/// Estimated seconds until the batch finishes.
///
/// Before any completion the estimate is `total * assumed`. After `k`
/// completions it is `round((total - k) * elapsed / k)`. A non-positive
/// estimate, or a finished batch, yields `None`.
pub fn estimate_remaining(
    total: usize,
    completed: usize,
    elapsed: Duration,
    assumed_secs_per_file: u64,
) -> Option<u64> {
    if completed >= total {
        return None;
    }

    let estimate = if completed == 0 {
        (total as f64) * (assumed_secs_per_file as f64)
    } else {
        let avg_per_file = elapsed.as_secs_f64() / completed as f64;
        ((total - completed) as f64 * avg_per_file).round()
    };

    if estimate <= 0.0 {
        None
    } else {
        Some(estimate as u64)
    }
}

/// `1m 05s` / `42s` rendering for the progress line.
pub fn format_eta(seconds: u64) -> String {
    let (m, s) = (seconds / 60, seconds % 60);
    if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_estimate_uses_assumption() {
        assert_eq!(estimate_remaining(3, 0, Duration::ZERO, 20), Some(60));
    }

    #[test]
    fn test_empty_batch_has_no_estimate() {
        assert_eq!(estimate_remaining(0, 0, Duration::ZERO, 20), None);
    }

    #[test]
    fn test_estimate_from_observed_average() {
        // 2 of 5 done in 30s: 15s each, 3 left.
        assert_eq!(estimate_remaining(5, 2, Duration::from_secs(30), 20), Some(45));
    }

    #[test]
    fn test_estimate_rounds() {
        // 1 of 2 done in 1.6s: 1.6 remaining rounds to 2.
        assert_eq!(
            estimate_remaining(2, 1, Duration::from_millis(1600), 20),
            Some(2)
        );
    }

    #[test]
    fn test_zero_estimate_is_absent() {
        assert_eq!(estimate_remaining(4, 1, Duration::from_millis(100), 20), None);
        assert_eq!(estimate_remaining(3, 0, Duration::ZERO, 0), None);
    }

    #[test]
    fn test_complete_batch_is_absent() {
        assert_eq!(estimate_remaining(3, 3, Duration::from_secs(90), 20), None);
    }

    #[test]
    fn test_estimate_can_rise() {
        let fast = estimate_remaining(4, 1, Duration::from_secs(5), 20).unwrap();
        let slow = estimate_remaining(4, 2, Duration::from_secs(60), 20).unwrap();
        assert!(slow > fast);
    }

    #[test]
    fn test_progress_lifecycle() {
        let mut progress = BatchProgress::start(2, 20);
        assert_eq!(progress.estimated_seconds_remaining, Some(40));
        assert_eq!(progress.remaining_files(), 2);

        progress.record_completion(20);
        assert_eq!(progress.completed_files, 1);
        assert!(!progress.is_complete());

        progress.record_completion(20);
        assert!(progress.is_complete());
        assert_eq!(progress.estimated_seconds_remaining, None);

        // Never overshoots the total.
        progress.record_completion(20);
        assert_eq!(progress.completed_files, 2);
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(42), "42s");
        assert_eq!(format_eta(65), "1m 05s");
    }
}
