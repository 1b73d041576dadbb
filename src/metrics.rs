//! Pipeline counters and statistics tracking.
//!
//! Every rejected or dropped record increments an observable counter; the
//! pipeline keeps operating on best-effort metrics rather than halting on
//! data-quality issues.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Counters for pipeline health and throughput.
pub struct PipelineMetrics {
    /// Records accepted into the aggregator
    pub records_ingested: AtomicU64,
    /// Malformed records rejected at the decode boundary
    pub decode_rejected: AtomicU64,
    /// Records dropped for being older than the window horizon
    pub out_of_order_dropped: AtomicU64,
    /// Records skipped by the risk scorer under the encoding policy
    pub scoring_skipped: AtomicU64,
    /// Alerts emitted to the sink
    pub alerts_generated: AtomicU64,
    /// Alerts dropped because the sink was unavailable (counted loss)
    pub alerts_dropped: AtomicU64,
    /// Alerts by kind
    alerts_by_kind: RwLock<HashMap<String, u64>>,
    /// Per-record processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            records_ingested: AtomicU64::new(0),
            decode_rejected: AtomicU64::new(0),
            out_of_order_dropped: AtomicU64::new(0),
            scoring_skipped: AtomicU64::new(0),
            alerts_generated: AtomicU64::new(0),
            alerts_dropped: AtomicU64::new(0),
            alerts_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record an accepted record and its processing time.
    pub fn record_ingested(&self, processing_time: Duration) {
        self.records_ingested.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the recent tail for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    pub fn record_decode_rejected(&self) {
        self.decode_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_out_of_order(&self) {
        self.out_of_order_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scoring_skipped(&self, count: u64) {
        self.scoring_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an emitted alert.
    pub fn record_alert(&self, kind: &str) {
        self.alerts_generated.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.alerts_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Record alerts lost to an unavailable sink.
    pub fn record_alerts_dropped(&self, count: u64) {
        self.alerts_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Current ingestion throughput (records per second).
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records_ingested.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_alerts_by_kind(&self) -> HashMap<String, u64> {
        self.alerts_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let ingested = self.records_ingested.load(Ordering::Relaxed);
        let rejected = self.decode_rejected.load(Ordering::Relaxed);
        let out_of_order = self.out_of_order_dropped.load(Ordering::Relaxed);
        let skipped = self.scoring_skipped.load(Ordering::Relaxed);
        let alerts = self.alerts_generated.load(Ordering::Relaxed);
        let dropped = self.alerts_dropped.load(Ordering::Relaxed);

        let processing = self.get_processing_stats();

        info!(
            records_ingested = ingested,
            decode_rejected = rejected,
            out_of_order_dropped = out_of_order,
            scoring_skipped = skipped,
            throughput = format!("{:.1} rec/s", self.get_throughput()),
            "Pipeline ingestion summary"
        );
        info!(
            alerts_generated = alerts,
            alerts_dropped = dropped,
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            "Pipeline alerting summary"
        );
        for (kind, count) in self.get_alerts_by_kind() {
            info!(kind = %kind, count = count, "Alerts by kind");
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
