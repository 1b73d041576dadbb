//! Failure-risk scoring of individual transactions.

use std::time::Instant;
use tracing::{debug, warn};

use crate::config::RiskConfig;
use crate::error::EncodingError;
use crate::risk::encoders::UnknownCategoryPolicy;
use crate::risk::features::prepare_features;
use crate::risk::loader::RiskArtifact;
use crate::types::alert::Alert;
use crate::types::transaction::TransactionRecord;

/// Result of scoring a batch of transactions.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub alerts: Vec<Alert>,
    /// Records scored to a probability
    pub scored: usize,
    /// Records skipped under the unknown-category policy
    pub skipped: usize,
    /// Records left unscored because the deadline was reached
    pub remaining: usize,
}

/// Stateless scorer: the model/encoder artifact is passed in per call and
/// read-only, so concurrent scoring needs no synchronization.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    alert_threshold: f64,
    high_severity_threshold: f64,
    missing_feature_sentinel: f64,
    unknown_category_policy: UnknownCategoryPolicy,
}

impl RiskScorer {
    pub fn new(
        alert_threshold: f64,
        high_severity_threshold: f64,
        missing_feature_sentinel: f64,
        unknown_category_policy: UnknownCategoryPolicy,
    ) -> Self {
        Self {
            alert_threshold,
            high_severity_threshold,
            missing_feature_sentinel,
            unknown_category_policy,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(
            config.alert_threshold,
            config.high_severity_threshold,
            config.missing_feature_sentinel,
            config.unknown_category_policy,
        )
    }

    /// Failure probability in [0, 1] for one transaction.
    ///
    /// Deterministic for identical inputs; features the model expects but
    /// the record cannot produce are sentinel-substituted rather than
    /// failing the call.
    pub fn score(
        &self,
        record: &TransactionRecord,
        artifact: &RiskArtifact,
    ) -> Result<f64, EncodingError> {
        let features = prepare_features(
            record,
            &artifact.encoders,
            &artifact.model.feature_names,
            self.missing_feature_sentinel,
            self.unknown_category_policy,
        )?;

        let probability = artifact.model.predict_failure_probability(&features);
        debug!(
            channel = %record.channel,
            transaction_code = %record.transaction_code,
            failure_probability = probability,
            "Transaction scored"
        );
        Ok(probability)
    }

    /// Score a batch, emitting one `TRANSACTION_RISK` alert per transaction
    /// whose failure probability exceeds the alert threshold.
    ///
    /// Encoding failures skip only the affected record; an optional deadline
    /// bounds the pass and reports how many records were left unscored.
    pub fn score_batch(
        &self,
        records: &[TransactionRecord],
        artifact: &RiskArtifact,
        deadline: Option<Instant>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for (i, record) in records.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                outcome.remaining = records.len() - i;
                break;
            }

            match self.score(record, artifact) {
                Ok(probability) => {
                    outcome.scored += 1;
                    if probability > self.alert_threshold {
                        outcome.alerts.push(Alert::transaction_risk(
                            &record.channel,
                            &record.transaction_code,
                            probability,
                            self.high_severity_threshold,
                        ));
                    }
                }
                Err(e) => {
                    outcome.skipped += 1;
                    warn!(
                        channel = %record.channel,
                        transaction_code = %record.transaction_code,
                        error = %e,
                        "Skipping unscorable transaction"
                    );
                }
            }
        }

        outcome
    }

    pub fn alert_threshold(&self) -> f64 {
        self.alert_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::encoders::{CategoricalEncoder, EncoderSet};
    use crate::risk::model::{RiskModel, Tree, TreeNode};
    use crate::types::alert::Severity;
    use chrono::{TimeZone, Utc};

    fn record(channel: &str, response_code: i32) -> TransactionRecord {
        TransactionRecord {
            channel: channel.to_string(),
            device_id: "APP".to_string(),
            transaction_code: "7900".to_string(),
            transaction_type: "No monetaria".to_string(),
            response_code,
            packed_time: 12345678,
            event_time: Utc.with_ymd_and_hms(2024, 10, 15, 12, 34, 56).unwrap(),
        }
    }

    /// NEG (code 1) is the risky channel: margin 1.0 -> p ~ 0.73.
    /// APP (code 0) scores margin -2.0 -> p ~ 0.12.
    fn artifact() -> RiskArtifact {
        let model = RiskModel {
            feature_names: vec!["channel_encoded".to_string(), "hour".to_string()],
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.5,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: -2.0 },
                    TreeNode::Leaf { value: 1.0 },
                ],
            }],
        };
        model.validate().unwrap();

        let mut encoders = EncoderSet::new();
        encoders.insert("channel", CategoricalEncoder::fit(["APP", "NEG"]));
        RiskArtifact::new(model, encoders)
    }

    fn scorer() -> RiskScorer {
        RiskScorer::new(0.3, 0.7, -999.0, UnknownCategoryPolicy::Reject)
    }

    #[test]
    fn test_score_is_probability_and_deterministic() {
        let artifact = artifact();
        let tx = record("NEG", 500);

        let p1 = scorer().score(&tx, &artifact).unwrap();
        let p2 = scorer().score(&tx, &artifact).unwrap();
        assert_eq!(p1, p2);
        assert!((0.0..=1.0).contains(&p1));
    }

    #[test]
    fn test_missing_expected_feature_uses_sentinel() {
        let mut artifact = artifact();
        artifact
            .model
            .feature_names
            .push("account_age_days".to_string());

        // The record has no such feature; scoring still returns a probability
        let p = scorer().score(&record("NEG", 0), &artifact).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_batch_emits_risk_alerts_above_threshold() {
        let artifact = artifact();
        let records = vec![record("NEG", 500), record("APP", 0)];

        let outcome = scorer().score_batch(&records, &artifact, None);
        assert_eq!(outcome.scored, 2);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.remaining, 0);

        // Only the risky channel crosses 0.3; p ~ 0.73 > 0.7 grades HIGH
        assert_eq!(outcome.alerts.len(), 1);
        let alert = &outcome.alerts[0];
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.details.channel.as_deref(), Some("NEG"));
        assert!(alert.details.failure_probability.unwrap() > 0.7);
    }

    #[test]
    fn test_unseen_category_skips_only_that_record() {
        let artifact = artifact();
        let records = vec![record("ATM", 500), record("NEG", 500)];

        let outcome = scorer().score_batch(&records, &artifact, None);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.scored, 1);
        assert_eq!(outcome.alerts.len(), 1);
    }

    #[test]
    fn test_unknown_bucket_policy_scores_everything() {
        let artifact = artifact();
        let lenient = RiskScorer::new(0.3, 0.7, -999.0, UnknownCategoryPolicy::UnknownBucket);
        let records = vec![record("ATM", 500), record("NEG", 500)];

        let outcome = lenient.score_batch(&records, &artifact, None);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.scored, 2);
    }

    #[test]
    fn test_expired_deadline_reports_remaining() {
        let artifact = artifact();
        let records = vec![record("NEG", 500), record("APP", 0)];

        let outcome = scorer().score_batch(
            &records,
            &artifact,
            Some(Instant::now() - std::time::Duration::from_secs(1)),
        );
        assert_eq!(outcome.scored, 0);
        assert_eq!(outcome.remaining, 2);
    }
}
