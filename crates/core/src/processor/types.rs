//! Types for the processor module.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the worker pool's load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Name of the converter driving the pool.
    pub name: String,
    /// Number of active jobs.
    pub active_jobs: usize,
    /// Maximum concurrent jobs.
    pub max_concurrent: usize,
    /// Number of jobs waiting for a worker.
    pub queued_jobs: usize,
    /// Total jobs that succeeded since startup.
    pub total_succeeded: u64,
    /// Total jobs that failed since startup.
    pub total_failed: u64,
    /// Whether the pool was released.
    pub closed: bool,
}

/// Tracks statistics for a worker pool.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    pub(crate) active: AtomicU64,
    pub(crate) queued: AtomicU64,
    pub(crate) total_succeeded: AtomicU64,
    pub(crate) total_failed: AtomicU64,
}

impl PoolStats {
    pub(crate) fn to_status(&self, name: &str, max_concurrent: usize, closed: bool) -> PoolStatus {
        PoolStatus {
            name: name.to_string(),
            active_jobs: self.active.load(Ordering::Relaxed) as usize,
            max_concurrent,
            queued_jobs: self.queued.load(Ordering::Relaxed) as usize,
            total_succeeded: self.total_succeeded.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            closed,
        }
    }

    pub(crate) fn record(&self, success: bool) {
        if success {
            self.total_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_snapshot() {
        let stats = PoolStats::default();
        stats.active.fetch_add(2, Ordering::Relaxed);
        stats.queued.fetch_add(3, Ordering::Relaxed);
        stats.record(true);
        stats.record(false);
        stats.record(true);

        let status = stats.to_status("simulated", 4, false);
        assert_eq!(status.name, "simulated");
        assert_eq!(status.active_jobs, 2);
        assert_eq!(status.queued_jobs, 3);
        assert_eq!(status.max_concurrent, 4);
        assert_eq!(status.total_succeeded, 2);
        assert_eq!(status.total_failed, 1);
        assert!(!status.closed);
    }
}
