//! Proof queue metrics.
//!
//! Tracks proving throughput, failures, and how deep the queue gets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared between the proof queue handle and its worker.
///
/// Uses atomics for lock-free access across threads.
#[derive(Debug, Default)]
pub struct ProofMetrics {
    /// Every task ever handed to the queue
    submitted: AtomicU64,
    generated: AtomicU64,
    failed: AtomicU64,
    /// Tasks enqueued but not yet settled, including the one being proved
    queue_depth: AtomicU64,
    peak_queue_depth: AtomicU64,
    total_proving_time_nanos: AtomicU64,
}

impl ProofMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn task_enqueued(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let depth = self.queue_depth.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_queue_depth.fetch_max(depth, Ordering::Relaxed);
    }

    /// Undoes [`ProofMetrics::task_enqueued`] for a task that never reached the worker.
    pub(crate) fn task_abandoned(&self) {
        let _ = self
            .submitted
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
        self.decrement_depth();
    }

    pub(crate) fn record_success(&self, proving_time: Duration) {
        self.generated.fetch_add(1, Ordering::Relaxed);
        self.total_proving_time_nanos
            .fetch_add(proving_time.as_nanos() as u64, Ordering::Relaxed);
        self.decrement_depth();
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.decrement_depth();
    }

    fn decrement_depth(&self) {
        let _ = self
            .queue_depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |depth| {
                Some(depth.saturating_sub(1))
            });
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn queue_depth(&self) -> u64 {
        self.queue_depth.load(Ordering::Relaxed)
    }

    pub fn peak_queue_depth(&self) -> u64 {
        self.peak_queue_depth.load(Ordering::Relaxed)
    }

    /// Mean wall time of successful proofs.
    pub fn avg_proving_time(&self) -> Duration {
        let generated = self.generated();
        if generated == 0 {
            Duration::ZERO
        } else {
            let total_nanos = self.total_proving_time_nanos.load(Ordering::Relaxed);
            Duration::from_nanos(total_nanos / generated)
        }
    }

    /// Point-in-time copy. Fields are read individually, not as one atomic unit.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted(),
            generated: self.generated(),
            failed: self.failed(),
            queue_depth: self.queue_depth(),
            peak_queue_depth: self.peak_queue_depth(),
            avg_proving_time: self.avg_proving_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub generated: u64,
    pub failed: u64,
    pub queue_depth: u64,
    pub peak_queue_depth: u64,
    pub avg_proving_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_tracks_peak() {
        let metrics = ProofMetrics::new();
        metrics.task_enqueued();
        metrics.task_enqueued();
        metrics.record_success(Duration::from_millis(10));
        metrics.task_enqueued();
        metrics.record_failure();
        metrics.record_success(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.submitted, 3);
        assert_eq!(snapshot.queue_depth, 0);
        assert_eq!(snapshot.peak_queue_depth, 2);
        assert_eq!(snapshot.generated, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.avg_proving_time, Duration::from_millis(20));
    }

    #[test]
    fn depth_never_underflows() {
        let metrics = ProofMetrics::new();
        metrics.task_abandoned();
        assert_eq!(metrics.queue_depth(), 0);
        assert_eq!(metrics.submitted(), 0);
    }
}
