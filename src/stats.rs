/*!
 * Aggregate statistics for an upload run
 */

use std::time::Duration;

use crate::core::worker::UploadOutcome;

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Per-worker outcomes, ordered by worker index
    pub outcomes: Vec<UploadOutcome>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Workers whose source ended before the advertised size
    pub short_reads: usize,
    /// Payload bytes written across all workers
    pub total_bytes: u64,
    /// Time from first spawn to last join
    pub wall_time: Duration,
    pub fastest_speed_bps: f64,
    pub slowest_speed_bps: f64,
}

impl RunSummary {
    /// Tally worker outcomes in whatever order they finished
    pub fn from_outcomes(mut outcomes: Vec<UploadOutcome>, wall_time: Duration) -> Self {
        outcomes.sort_by_key(|o| o.worker_index);

        let mut stats = Self {
            total: outcomes.len(),
            wall_time,
            ..Self::default()
        };

        let mut fastest = 0.0_f64;
        let mut slowest = f64::MAX;

        for outcome in &outcomes {
            if outcome.success {
                stats.successful += 1;
            } else {
                stats.failed += 1;
            }
            if outcome.short_read {
                stats.short_reads += 1;
            }
            stats.total_bytes += outcome.bytes_sent;

            // Speed only means something for completed uploads
            if outcome.success && !outcome.duration.is_zero() {
                let speed = outcome.bytes_sent as f64 / outcome.duration.as_secs_f64();
                if speed > fastest {
                    fastest = speed;
                }
                if speed < slowest && speed > 0.0 {
                    slowest = speed;
                }
            }
        }

        stats.fastest_speed_bps = fastest;
        stats.slowest_speed_bps = if slowest < f64::MAX { slowest } else { 0.0 };
        stats.outcomes = outcomes;
        stats
    }

    pub fn all_succeeded(&self) -> bool {
        self.successful == self.total
    }

    /// `"<successful>/<total> uploads successful"`
    pub fn summary_line(&self) -> String {
        format!("{}/{} uploads successful", self.successful, self.total)
    }

    /// Aggregate payload throughput over the whole run
    pub fn aggregate_speed_bps(&self) -> f64 {
        if self.wall_time.is_zero() {
            0.0
        } else {
            self.total_bytes as f64 / self.wall_time.as_secs_f64()
        }
    }
}
