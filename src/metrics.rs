//! Request metrics and statistics tracking for the prediction service.

use crate::types::prediction::PredictionOutcome;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for served predictions
pub struct PredictionMetrics {
    /// Total successful predictions
    pub predictions: AtomicU64,
    /// Predictions labelled "yes"
    pub predicted_yes: AtomicU64,
    /// Requests that ended in a caught error
    pub failures: AtomicU64,
    /// How often each column had to be zero-filled
    zero_filled: RwLock<HashMap<String, u64>>,
    /// Latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Probability of "yes" distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PredictionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            predicted_yes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            zero_filled: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, outcome: &PredictionOutcome) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if outcome.is_yes() {
            self.predicted_yes.fetch_add(1, Ordering::Relaxed);
        }

        self.record_latency(latency);

        if let Some(p) = outcome.probability_yes {
            let bucket = (p * 10.0).clamp(0.0, 9.0) as usize;
            if let Ok(mut buckets) = self.probability_buckets.write() {
                buckets[bucket] += 1;
            }
        }

        if !outcome.zero_filled.is_empty() {
            if let Ok(mut counts) = self.zero_filled.write() {
                for column in &outcome.zero_filled {
                    *counts.entry(column.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    /// Record a failed prediction
    pub fn record_failure(&self, latency: Duration) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get latency statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.5),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// Get zero-fill counts per column
    pub fn get_zero_filled(&self) -> HashMap<String, u64> {
        self.zero_filled
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Point-in-time copy of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            predictions: self.predictions.load(Ordering::Relaxed),
            predicted_yes: self.predicted_yes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            throughput: self.get_throughput(),
            latency: self.get_latency_stats(),
            probability_distribution: self.get_probability_distribution(),
            zero_filled: self.get_zero_filled(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let yes_rate = if snapshot.predictions > 0 {
            (snapshot.predicted_yes as f64 / snapshot.predictions as f64) * 100.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║        TERM DEPOSIT PREDICTOR - METRICS SUMMARY              ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions: {:>8}  │  Failures: {:>6}  │  Yes rate: {:>5.1}% ║",
            snapshot.predictions, snapshot.failures, yes_rate
        );
        info!(
            "║ Latency (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}       ║",
            snapshot.latency.mean_us,
            snapshot.latency.p50_us,
            snapshot.latency.p95_us,
            snapshot.latency.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Probability of 'yes' distribution:                           ║");
        let total: u64 = snapshot.probability_distribution.iter().sum();
        for (i, &count) in snapshot.probability_distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        if !snapshot.zero_filled.is_empty() {
            info!("Zero-filled columns:");
            for (column, count) in &snapshot.zero_filled {
                info!("  {}: {}", column, count);
            }
        }
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable view of the collected metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub predictions: u64,
    pub predicted_yes: u64,
    pub failures: u64,
    pub throughput: f64,
    pub latency: LatencyStats,
    pub probability_distribution: [u64; 10],
    pub zero_filled: HashMap<String, u64>,
    pub uptime_secs: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<PredictionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PredictionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::prediction::Label;

    fn outcome(label: Label, p: Option<f64>) -> PredictionOutcome {
        PredictionOutcome::new(label, label.to_string(), "tree".into()).with_probability(p)
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PredictionMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), &outcome(Label::Yes, Some(0.8)));
        metrics.record_prediction(Duration::from_micros(300), &outcome(Label::No, Some(0.1)));
        metrics.record_failure(Duration::from_micros(50));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.predictions, 2);
        assert_eq!(snapshot.predicted_yes, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.latency.count, 3);
        assert_eq!(snapshot.latency.max_us, 300);
        assert_eq!(snapshot.probability_distribution[8], 1);
        assert_eq!(snapshot.probability_distribution[1], 1);
    }

    #[test]
    fn test_probability_one_lands_in_last_bucket() {
        let metrics = PredictionMetrics::new();
        metrics.record_prediction(Duration::from_micros(10), &outcome(Label::Yes, Some(1.0)));
        assert_eq!(metrics.get_probability_distribution()[9], 1);
    }

    #[test]
    fn test_zero_filled_counts() {
        let metrics = PredictionMetrics::new();
        let filled = outcome(Label::No, None).with_zero_filled(vec!["pdays".into()]);

        metrics.record_prediction(Duration::from_micros(10), &filled);
        metrics.record_prediction(Duration::from_micros(10), &filled);

        assert_eq!(metrics.get_zero_filled().get("pdays"), Some(&2));
    }

    #[test]
    fn test_empty_latency_stats() {
        let metrics = PredictionMetrics::new();
        assert_eq!(metrics.get_latency_stats().count, 0);
    }
}
