//! Alert data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// Channel throughput deviates from its baseline
    VolumeAnomaly,
    /// Channel error rate deviates from its baseline
    ErrorAnomaly,
    /// Single transaction predicted to be at high risk of failure
    TransactionRisk,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::VolumeAnomaly => "VOLUME_ANOMALY",
            AlertKind::ErrorAnomaly => "ERROR_ANOMALY",
            AlertKind::TransactionRisk => "TRANSACTION_RISK",
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Numeric evidence and identifiers carried by an alert.
///
/// Fields not relevant to the alert kind are omitted from serialized output;
/// rates and probabilities keep full precision.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// Metric value observed in the flagged window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_mean: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_stddev: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_probability: Option<f64>,

    pub reason: String,
}

/// An emitted alert. Never mutated; ownership transfers to the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert identifier
    pub alert_id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub details: AlertDetails,
}

impl Alert {
    fn new(kind: AlertKind, severity: Severity, details: AlertDetails) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            kind,
            severity,
            timestamp: Utc::now(),
            details,
        }
    }

    /// Channel throughput z-score outlier.
    pub fn volume_anomaly(channel: &str, observed: f64, mean: f64, stddev: f64, z: f64) -> Self {
        Self::new(
            AlertKind::VolumeAnomaly,
            Severity::Medium,
            AlertDetails {
                channel: Some(channel.to_string()),
                observed: Some(observed),
                baseline_mean: Some(mean),
                baseline_stddev: Some(stddev),
                z_score: Some(z),
                reason: "transaction volume deviates from channel baseline".to_string(),
                ..AlertDetails::default()
            },
        )
    }

    /// Channel error-rate z-score outlier.
    pub fn error_anomaly(channel: &str, observed: f64, mean: f64, stddev: f64, z: f64) -> Self {
        Self::new(
            AlertKind::ErrorAnomaly,
            Severity::Medium,
            AlertDetails {
                channel: Some(channel.to_string()),
                observed: Some(observed),
                baseline_mean: Some(mean),
                baseline_stddev: Some(stddev),
                z_score: Some(z),
                reason: "error rate deviates from channel baseline".to_string(),
                ..AlertDetails::default()
            },
        )
    }

    /// Transaction predicted to fail, severity graded by probability.
    pub fn transaction_risk(
        channel: &str,
        transaction_id: &str,
        failure_probability: f64,
        high_severity_threshold: f64,
    ) -> Self {
        let severity = if failure_probability > high_severity_threshold {
            Severity::High
        } else {
            Severity::Medium
        };

        Self::new(
            AlertKind::TransactionRisk,
            severity,
            AlertDetails {
                channel: Some(channel.to_string()),
                transaction_id: Some(transaction_id.to_string()),
                failure_probability: Some(failure_probability),
                reason: "high predicted risk of transaction failure".to_string(),
                ..AlertDetails::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_severity_grading() {
        let medium = Alert::transaction_risk("NEG", "7900", 0.45, 0.7);
        assert_eq!(medium.kind, AlertKind::TransactionRisk);
        assert_eq!(medium.severity, Severity::Medium);

        let high = Alert::transaction_risk("NEG", "7900", 0.85, 0.7);
        assert_eq!(high.severity, Severity::High);

        // Boundary: exactly at the cutoff stays MEDIUM
        let at_cutoff = Alert::transaction_risk("NEG", "7900", 0.7, 0.7);
        assert_eq!(at_cutoff.severity, Severity::Medium);
    }

    #[test]
    fn test_alert_serialization_preserves_evidence() {
        let alert = Alert::volume_anomaly("NEG", 14.0, 10.0, 1.0, 4.0);

        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"VOLUME_ANOMALY\""));
        assert!(json.contains("\"MEDIUM\""));
        // Risk-only fields are omitted for anomaly alerts
        assert!(!json.contains("failure_probability"));

        let back: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(back.details.z_score, Some(4.0));
        assert_eq!(back.details.baseline_mean, Some(10.0));
        assert_eq!(back.details.channel.as_deref(), Some("NEG"));
    }

    #[test]
    fn test_anomaly_kinds_distinct() {
        let volume = Alert::volume_anomaly("APP", 100.0, 10.0, 2.0, 45.0);
        let error = Alert::error_anomaly("APP", 60.0, 5.0, 1.0, 55.0);
        assert_eq!(volume.kind.as_str(), "VOLUME_ANOMALY");
        assert_eq!(error.kind.as_str(), "ERROR_ANOMALY");
        assert_ne!(volume.alert_id, error.alert_id);
    }
}
