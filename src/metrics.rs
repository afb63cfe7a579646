//! Per-session request statistics for the demand forecast form.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept before the oldest half is discarded
const MAX_SAMPLES: usize = 10_000;

/// Counters and latencies for one form session
pub struct SessionMetrics {
    /// Form submissions
    pub requests: AtomicU64,
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Submissions rejected during feature preparation
    pub preparation_failures: AtomicU64,
    /// Submissions whose predictor call failed
    pub prediction_failures: AtomicU64,
    /// End-to-end request times (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Sum of predicted units, for the mean
    units_total: AtomicU64,
    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
            preparation_failures: AtomicU64::new(0),
            prediction_failures: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(64)),
            units_total: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, elapsed: Duration, units: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.predictions.fetch_add(1, Ordering::Relaxed);
        self.units_total.fetch_add(units, Ordering::Relaxed);
        self.record_latency(elapsed);
    }

    /// Record a submission rejected before reaching the predictor
    pub fn record_preparation_failure(&self, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.preparation_failures.fetch_add(1, Ordering::Relaxed);
        self.record_latency(elapsed);
    }

    /// Record a predictor failure
    pub fn record_prediction_failure(&self, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.prediction_failures.fetch_add(1, Ordering::Relaxed);
        self.record_latency(elapsed);
    }

    fn record_latency(&self, elapsed: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(elapsed.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }
    }

    /// Latency statistics over the retained samples
    pub fn latency_stats(&self) -> LatencyStats {
        let times = match self.latencies.read() {
            Ok(times) => times,
            Err(_) => return LatencyStats::default(),
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Mean predicted units over successful predictions
    pub fn mean_units(&self) -> f64 {
        let predictions = self.predictions.load(Ordering::Relaxed);
        if predictions == 0 {
            return 0.0;
        }
        self.units_total.load(Ordering::Relaxed) as f64 / predictions as f64
    }

    /// Log a session summary
    pub fn print_summary(&self) {
        let stats = self.latency_stats();

        info!(
            requests = self.requests.load(Ordering::Relaxed),
            predictions = self.predictions.load(Ordering::Relaxed),
            preparation_failures = self.preparation_failures.load(Ordering::Relaxed),
            prediction_failures = self.prediction_failures.load(Ordering::Relaxed),
            mean_units = format!("{:.1}", self.mean_units()),
            session_secs = self.start_time.elapsed().as_secs(),
            "Session summary"
        );
        info!(
            mean_us = stats.mean_us,
            p50_us = stats.p50_us,
            p95_us = stats.p95_us,
            max_us = stats.max_us,
            "Request latency"
        );
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Request latency statistics
#[derive(Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = SessionMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 40);
        metrics.record_prediction(Duration::from_micros(300), 20);
        metrics.record_preparation_failure(Duration::from_micros(10));
        metrics.record_prediction_failure(Duration::from_micros(200));

        assert_eq!(metrics.requests.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.preparation_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.prediction_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.mean_units(), 30.0);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = SessionMetrics::new();
        for us in [10, 20, 30, 40] {
            metrics.record_prediction(Duration::from_micros(us), 1);
        }

        let stats = metrics.latency_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 25);
        assert_eq!(stats.p50_us, 30);
        assert_eq!(stats.max_us, 40);
    }

    #[test]
    fn test_empty_stats() {
        let metrics = SessionMetrics::new();
        assert_eq!(metrics.latency_stats(), LatencyStats::default());
        assert_eq!(metrics.mean_units(), 0.0);
    }
}
