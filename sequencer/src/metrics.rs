//! Sequencer metrics.
//!
//! Atomic counters for submissions and their outcomes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Metrics for the sequencer.
#[derive(Debug)]
pub struct SequencerMetrics {
    /// Total submissions, resubmissions included.
    transactions_submitted: AtomicU64,

    /// Transactions confirmed.
    transactions_confirmed: AtomicU64,

    /// Transactions rejected on-chain.
    transactions_rejected: AtomicU64,

    /// Transactions expired with the retry budget spent.
    transactions_expired: AtomicU64,

    /// Resubmissions after a freshness-token expiry.
    resubmissions: AtomicU64,

    /// Simulations that reported an error.
    preflight_failures: AtomicU64,

    /// Sends that never reached the ledger.
    send_failures: AtomicU64,

    /// Sequences run.
    sequences: AtomicU64,

    /// Start time.
    start_time: Instant,
}

impl Default for SequencerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencerMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transactions_submitted: AtomicU64::new(0),
            transactions_confirmed: AtomicU64::new(0),
            transactions_rejected: AtomicU64::new(0),
            transactions_expired: AtomicU64::new(0),
            resubmissions: AtomicU64::new(0),
            preflight_failures: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            sequences: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a submission.
    pub fn record_submission(&self) {
        self.transactions_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a confirmation.
    pub fn record_confirmed(&self) {
        self.transactions_confirmed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an on-chain or preflight rejection.
    pub fn record_rejected(&self) {
        self.transactions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a terminal expiry.
    pub fn record_expired(&self) {
        self.transactions_expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a resubmission.
    pub fn record_resubmission(&self) {
        self.resubmissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed simulation.
    pub fn record_preflight_failure(&self) {
        self.preflight_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed send.
    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a sequence run.
    pub fn record_sequence(&self) {
        self.sequences.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns total submissions.
    #[must_use]
    pub fn transactions_submitted(&self) -> u64 {
        self.transactions_submitted.load(Ordering::Relaxed)
    }

    /// Returns confirmed transactions.
    #[must_use]
    pub fn transactions_confirmed(&self) -> u64 {
        self.transactions_confirmed.load(Ordering::Relaxed)
    }

    /// Returns rejected transactions.
    #[must_use]
    pub fn transactions_rejected(&self) -> u64 {
        self.transactions_rejected.load(Ordering::Relaxed)
    }

    /// Returns expired transactions.
    #[must_use]
    pub fn transactions_expired(&self) -> u64 {
        self.transactions_expired.load(Ordering::Relaxed)
    }

    /// Returns resubmissions.
    #[must_use]
    pub fn resubmissions(&self) -> u64 {
        self.resubmissions.load(Ordering::Relaxed)
    }

    /// Returns failed simulations.
    #[must_use]
    pub fn preflight_failures(&self) -> u64 {
        self.preflight_failures.load(Ordering::Relaxed)
    }

    /// Returns failed sends.
    #[must_use]
    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    /// Returns sequences run.
    #[must_use]
    pub fn sequences(&self) -> u64 {
        self.sequences.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the share of finished transactions that confirmed (0.0 to 1.0).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let confirmed = self.transactions_confirmed();
        let finished = confirmed + self.transactions_rejected() + self.transactions_expired();
        if finished > 0 {
            confirmed as f64 / finished as f64
        } else {
            0.0
        }
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> SequencerMetricsSnapshot {
        SequencerMetricsSnapshot {
            transactions_submitted: self.transactions_submitted(),
            transactions_confirmed: self.transactions_confirmed(),
            transactions_rejected: self.transactions_rejected(),
            transactions_expired: self.transactions_expired(),
            resubmissions: self.resubmissions(),
            preflight_failures: self.preflight_failures(),
            send_failures: self.send_failures(),
            sequences: self.sequences(),
            uptime_ms: u64::try_from(self.uptime().as_millis()).unwrap_or(u64::MAX),
            success_rate: self.success_rate(),
        }
    }

    /// Resets all counters.
    pub fn reset(&self) {
        self.transactions_submitted.store(0, Ordering::Relaxed);
        self.transactions_confirmed.store(0, Ordering::Relaxed);
        self.transactions_rejected.store(0, Ordering::Relaxed);
        self.transactions_expired.store(0, Ordering::Relaxed);
        self.resubmissions.store(0, Ordering::Relaxed);
        self.preflight_failures.store(0, Ordering::Relaxed);
        self.send_failures.store(0, Ordering::Relaxed);
        self.sequences.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of sequencer metrics.
#[derive(Debug, Clone, Serialize)]
pub struct SequencerMetricsSnapshot {
    /// Total submissions.
    pub transactions_submitted: u64,
    /// Confirmed transactions.
    pub transactions_confirmed: u64,
    /// Rejected transactions.
    pub transactions_rejected: u64,
    /// Expired transactions.
    pub transactions_expired: u64,
    /// Resubmissions.
    pub resubmissions: u64,
    /// Failed simulations.
    pub preflight_failures: u64,
    /// Failed sends.
    pub send_failures: u64,
    /// Sequences run.
    pub sequences: u64,
    /// Uptime in milliseconds.
    pub uptime_ms: u64,
    /// Success rate.
    pub success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = SequencerMetrics::new();
        assert_eq!(metrics.transactions_submitted(), 0);
        assert_eq!(metrics.transactions_confirmed(), 0);
    }

    #[test]
    fn test_metrics_record() {
        let metrics = SequencerMetrics::default();

        metrics.record_submission();
        metrics.record_submission();
        metrics.record_resubmission();
        metrics.record_confirmed();
        metrics.record_preflight_failure();
        metrics.record_send_failure();
        metrics.record_sequence();

        assert_eq!(metrics.transactions_submitted(), 2);
        assert_eq!(metrics.resubmissions(), 1);
        assert_eq!(metrics.transactions_confirmed(), 1);
        assert_eq!(metrics.preflight_failures(), 1);
        assert_eq!(metrics.send_failures(), 1);
        assert_eq!(metrics.sequences(), 1);
    }

    #[test]
    fn test_metrics_success_rate() {
        let metrics = SequencerMetrics::new();
        assert_eq!(metrics.success_rate(), 0.0);

        metrics.record_confirmed();
        metrics.record_confirmed();
        metrics.record_expired();

        let rate = metrics.success_rate();
        assert!((rate - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = SequencerMetrics::new();
        metrics.record_submission();
        metrics.record_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.transactions_submitted, 1);
        assert_eq!(snapshot.transactions_rejected, 1);
        assert_eq!(snapshot.success_rate, 0.0);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = SequencerMetrics::new();
        metrics.record_submission();
        metrics.record_expired();

        metrics.reset();

        assert_eq!(metrics.transactions_submitted(), 0);
        assert_eq!(metrics.transactions_expired(), 0);
    }
}
