//! Prometheus-style relay metrics.
//!
//! Counters for every outcome the engine and ferry distinguish, a cursor gauge,
//! and a relay latency histogram.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric (monotonically increasing).
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by amount.
    pub fn add(&self, amount: u64) {
        self.value.fetch_add(amount, Ordering::Relaxed);
    }

    /// Get current value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A gauge metric holding the latest value.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gauge value.
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Get current value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A histogram metric for measuring distributions.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<f64>,
    bucket_counts: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create a new histogram with default buckets (seconds).
    pub fn new() -> Self {
        Self::with_buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    }

    /// Create with custom buckets.
    pub fn with_buckets(buckets: Vec<f64>) -> Self {
        let bucket_counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            bucket_counts,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Observe a value.
    pub fn observe(&self, value: f64) {
        for (i, bucket) in self.buckets.iter().enumerate() {
            if value <= *bucket {
                self.bucket_counts[i].fetch_add(1, Ordering::Relaxed);
            }
        }

        // sum is stored as f64 bits; a lost update only skews the mean
        let current_sum = f64::from_bits(self.sum.load(Ordering::Relaxed));
        self.sum.store((current_sum + value).to_bits(), Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative count per upper bound, ascending.
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(&self.bucket_counts)
            .map(|(bound, count)| (*bound, count.load(Ordering::Relaxed)))
            .collect()
    }

    /// Get observation count.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get sum of observations.
    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Get mean value.
    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() / count as f64
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for one relay channel.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    pub reports_ingested: Counter,
    pub stale_reports: Counter,
    pub lookahead_rejections: Counter,
    pub conflicts: Counter,
    pub relays_succeeded: Counter,
    pub relays_failed: Counter,
    pub verification_failures: Counter,
    pub node_failures: Counter,
    pub cursor: Gauge,
    pub relay_seconds: Histogram,
}

/// Point-in-time copy of [`RelayMetrics`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub reports_ingested: u64,
    pub stale_reports: u64,
    pub lookahead_rejections: u64,
    pub conflicts: u64,
    pub relays_succeeded: u64,
    pub relays_failed: u64,
    pub verification_failures: u64,
    pub node_failures: u64,
    pub cursor: u64,
    pub relay_count: u64,
    pub relay_seconds_mean: f64,
}

impl RelayMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_ingested: self.reports_ingested.get(),
            stale_reports: self.stale_reports.get(),
            lookahead_rejections: self.lookahead_rejections.get(),
            conflicts: self.conflicts.get(),
            relays_succeeded: self.relays_succeeded.get(),
            relays_failed: self.relays_failed.get(),
            verification_failures: self.verification_failures.get(),
            node_failures: self.node_failures.get(),
            cursor: self.cursor.get(),
            relay_count: self.relay_seconds.count(),
            relay_seconds_mean: self.relay_seconds.mean(),
        }
    }

    /// Export in Prometheus text format, labelled with the channel.
    pub fn export_prometheus(&self, from: &str, to: &str) -> String {
        let labels = format!("from=\"{}\",to=\"{}\"", from, to);
        let mut output = String::new();

        let counters = [
            ("relay_reports_ingested_total", &self.reports_ingested),
            ("relay_stale_reports_total", &self.stale_reports),
            ("relay_lookahead_rejections_total", &self.lookahead_rejections),
            ("relay_conflicts_total", &self.conflicts),
            ("relay_succeeded_total", &self.relays_succeeded),
            ("relay_failed_total", &self.relays_failed),
            ("relay_verification_failures_total", &self.verification_failures),
            ("relay_node_failures_total", &self.node_failures),
        ];
        for (name, counter) in counters {
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{}{{{}}} {}\n", name, labels, counter.get()));
        }

        output.push_str("# TYPE relay_cursor gauge\n");
        output.push_str(&format!("relay_cursor{{{}}} {}\n", labels, self.cursor.get()));

        output.push_str("# TYPE relay_seconds histogram\n");
        for (bound, count) in self.relay_seconds.buckets() {
            output.push_str(&format!(
                "relay_seconds_bucket{{{},le=\"{}\"}} {}\n",
                labels, bound, count
            ));
        }
        output.push_str(&format!(
            "relay_seconds_bucket{{{},le=\"+Inf\"}} {}\n",
            labels,
            self.relay_seconds.count()
        ));
        output.push_str(&format!("relay_seconds_sum{{{}}} {}\n", labels, self.relay_seconds.sum()));
        output.push_str(&format!(
            "relay_seconds_count{{{}}} {}\n",
            labels,
            self.relay_seconds.count()
        ));

        output
    }
}
