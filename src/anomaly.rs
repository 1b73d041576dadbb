//! Statistical anomaly detection over channel metric snapshots.
//!
//! Each channel accumulates a baseline (mean/stddev) of its own
//! `transactions_per_minute` and `error_rate` history. A snapshot is judged
//! against the history seen *before* it, then folded in. A baseline with
//! zero variance never flags its metric, whatever the current value.

use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

use crate::aggregator::ChannelMetrics;
use crate::types::alert::Alert;

/// Online mean/variance accumulator (Welford).
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl BaselineStats {
    pub fn observe(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation (n - 1); 0.0 until two values are seen.
    pub fn stddev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).max(0.0).sqrt()
        }
    }

    /// `|value - mean| / stddev`, or `None` when the baseline has zero
    /// variance. The `None` branch is the designed guard: a constant
    /// baseline cannot produce a statistically meaningful deviation, so it
    /// must never flag, and must never divide by zero.
    pub fn z_score(&self, value: f64) -> Option<f64> {
        let stddev = self.stddev();
        if stddev > 0.0 {
            Some(((value - self.mean) / stddev).abs())
        } else {
            None
        }
    }
}

/// Accumulated baselines for one channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelBaseline {
    pub volume: BaselineStats,
    pub error_rate: BaselineStats,
}

/// Result of a (possibly deadline-bounded) evaluation pass.
#[derive(Debug)]
pub struct EvaluationOutcome {
    pub alerts: Vec<Alert>,
    /// Snapshots judged and folded into their baselines
    pub evaluated: usize,
    /// Snapshots left untouched because the deadline was reached
    pub remaining: usize,
}

/// Flags z-score outliers across channel snapshots.
#[derive(Debug)]
pub struct AnomalyDetector {
    z_threshold: f64,
    min_history: u64,
    baselines: HashMap<String, ChannelBaseline>,
}

impl AnomalyDetector {
    pub fn new(z_threshold: f64, min_history: u64) -> Self {
        Self {
            z_threshold,
            min_history,
            baselines: HashMap::new(),
        }
    }

    /// Judge each snapshot against its channel's prior history, emitting one
    /// alert per anomalous metric, then fold the snapshot into the baseline.
    ///
    /// A channel with fewer than `min_history` prior snapshots is not judged
    /// at all: with no variance history it cannot be anomalous, and must not
    /// produce a false positive or a division by zero.
    pub fn evaluate(&mut self, snapshots: &[ChannelMetrics]) -> Vec<Alert> {
        self.evaluate_with_deadline(snapshots, None).alerts
    }

    /// Like [`evaluate`](Self::evaluate), but stops once `deadline` passes,
    /// reporting how many snapshots were left unevaluated.
    pub fn evaluate_with_deadline(
        &mut self,
        snapshots: &[ChannelMetrics],
        deadline: Option<Instant>,
    ) -> EvaluationOutcome {
        let mut alerts = Vec::new();
        let mut evaluated = 0;

        for (i, snapshot) in snapshots.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return EvaluationOutcome {
                    alerts,
                    evaluated,
                    remaining: snapshots.len() - i,
                };
            }

            let baseline = self.baselines.entry(snapshot.channel.clone()).or_default();
            let volume = snapshot.transactions_per_minute as f64;

            if baseline.volume.count() >= self.min_history {
                alerts.extend(judge_metric(
                    &baseline.volume,
                    volume,
                    self.z_threshold,
                    snapshot,
                    Alert::volume_anomaly,
                ));
                alerts.extend(judge_metric(
                    &baseline.error_rate,
                    snapshot.error_rate,
                    self.z_threshold,
                    snapshot,
                    Alert::error_anomaly,
                ));
            }

            baseline.volume.observe(volume);
            baseline.error_rate.observe(snapshot.error_rate);
            evaluated += 1;
        }

        EvaluationOutcome {
            alerts,
            evaluated,
            remaining: 0,
        }
    }

    /// Accumulated baseline for a channel, if any snapshots have been seen.
    pub fn baseline(&self, channel: &str) -> Option<&ChannelBaseline> {
        self.baselines.get(channel)
    }
}

fn judge_metric(
    stats: &BaselineStats,
    observed: f64,
    threshold: f64,
    snapshot: &ChannelMetrics,
    build: fn(&str, f64, f64, f64, f64) -> Alert,
) -> Option<Alert> {
    let z = match stats.z_score(observed) {
        Some(z) => z,
        None => {
            debug!(
                channel = %snapshot.channel,
                observed = observed,
                "zero-variance baseline, metric cannot flag"
            );
            return None;
        }
    };

    if z > threshold {
        debug!(
            channel = %snapshot.channel,
            observed = observed,
            mean = stats.mean(),
            z_score = z,
            "metric exceeds z-score threshold"
        );
        Some(build(
            &snapshot.channel,
            observed,
            stats.mean(),
            stats.stddev(),
            z,
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::alert::AlertKind;
    use chrono::{TimeZone, Utc};

    fn snapshot(channel: &str, tpm: u64, error_rate: f64) -> ChannelMetrics {
        ChannelMetrics {
            channel: channel.to_string(),
            as_of: Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap(),
            transactions_per_minute: tpm,
            success_rate: 100.0 - error_rate,
            error_rate,
        }
    }

    #[test]
    fn test_welford_matches_direct_computation() {
        let values = [4.0, 7.0, 13.0, 16.0];
        let mut stats = BaselineStats::default();
        for v in values {
            stats.observe(v);
        }

        assert!((stats.mean() - 10.0).abs() < 1e-12);
        // Sample variance: ((36 + 9 + 9 + 36) / 3) = 30
        assert!((stats.stddev() - 30.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_volume_anomaly_at_four_sigma() {
        let mut detector = AnomalyDetector::new(3.0, 2);

        // Baseline tpm history 9, 10, 11: mean 10, sample stddev 1
        for tpm in [9, 10, 11] {
            assert!(detector.evaluate(&[snapshot("NEG", tpm, 0.0)]).is_empty());
        }

        let alerts = detector.evaluate(&[snapshot("NEG", 14, 0.0)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::VolumeAnomaly);
        let z = alerts[0].details.z_score.unwrap();
        assert!((z - 4.0).abs() < 1e-9);
        assert!((alerts[0].details.baseline_mean.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_variance_never_flags() {
        let mut detector = AnomalyDetector::new(3.0, 2);

        // Constant baseline: stddev exactly 0
        for _ in 0..5 {
            detector.evaluate(&[snapshot("NEG", 5, 0.0)]);
        }

        // A wild value still produces no alert on either metric
        let alerts = detector.evaluate(&[snapshot("NEG", 100_000, 0.0)]);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_min_history_gates_judgement() {
        let mut detector = AnomalyDetector::new(3.0, 2);

        // First snapshot: no history at all
        assert!(detector.evaluate(&[snapshot("NEG", 10, 0.0)]).is_empty());
        // Second: one prior snapshot, still below min_history
        assert!(detector.evaluate(&[snapshot("NEG", 500, 0.0)]).is_empty());

        let baseline = detector.baseline("NEG").unwrap();
        assert_eq!(baseline.volume.count(), 2);
    }

    #[test]
    fn test_both_kinds_fire_for_one_channel_window() {
        let mut detector = AnomalyDetector::new(3.0, 2);

        for (tpm, err) in [(9, 9.0), (10, 10.0), (11, 11.0)] {
            detector.evaluate(&[snapshot("NEG", tpm, err)]);
        }

        let alerts = detector.evaluate(&[snapshot("NEG", 30, 90.0)]);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::VolumeAnomaly);
        assert_eq!(alerts[1].kind, AlertKind::ErrorAnomaly);
    }

    #[test]
    fn test_channels_keep_separate_baselines() {
        let mut detector = AnomalyDetector::new(3.0, 2);

        for tpm in [9, 10, 11] {
            detector.evaluate(&[snapshot("NEG", tpm, 0.0), snapshot("ATM", 1000, 0.0)]);
        }

        // 14 is anomalous for NEG's baseline but would be nothing for ATM's
        let alerts = detector.evaluate(&[snapshot("NEG", 14, 0.0), snapshot("ATM", 1000, 0.0)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].details.channel.as_deref(), Some("NEG"));
    }

    #[test]
    fn test_expired_deadline_reports_remaining() {
        let mut detector = AnomalyDetector::new(3.0, 2);
        let snapshots = vec![snapshot("NEG", 10, 0.0), snapshot("ATM", 10, 0.0)];

        let outcome =
            detector.evaluate_with_deadline(&snapshots, Some(Instant::now() - std::time::Duration::from_secs(1)));
        assert_eq!(outcome.evaluated, 0);
        assert_eq!(outcome.remaining, 2);
        assert!(outcome.alerts.is_empty());
    }
}
