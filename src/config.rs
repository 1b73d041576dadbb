//! Configuration management for the transaction monitoring pipeline

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

use crate::risk::encoders::UnknownCategoryPolicy;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming raw transactions
    pub transaction_subject: String,
    /// Subject for outgoing alerts
    pub alert_subject: String,
}

/// Sliding-window configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    /// Trailing window size in seconds
    #[serde(default = "default_window_size_seconds")]
    pub window_size_seconds: u64,
}

fn default_window_size_seconds() -> u64 {
    60
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size_seconds: default_window_size_seconds(),
        }
    }
}

/// Statistical anomaly detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyConfig {
    /// Z-score above which a metric is anomalous
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    /// Prior snapshots required before a channel can be judged
    #[serde(default = "default_min_history")]
    pub min_history: u64,
    /// Seconds between evaluation passes over all channels
    #[serde(default = "default_evaluation_interval_seconds")]
    pub evaluation_interval_seconds: u64,
}

fn default_z_threshold() -> f64 {
    3.0
}

fn default_min_history() -> u64 {
    2
}

fn default_evaluation_interval_seconds() -> u64 {
    10
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            z_threshold: default_z_threshold(),
            min_history: default_min_history(),
            evaluation_interval_seconds: default_evaluation_interval_seconds(),
        }
    }
}

/// Risk scoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Directory containing model.json and encoders.json
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,
    /// Failure probability above which an alert is emitted
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    /// Failure probability above which an alert grades HIGH
    #[serde(default = "default_high_severity_threshold")]
    pub high_severity_threshold: f64,
    /// Substituted for features the model expects but the record lacks
    #[serde(default = "default_missing_feature_sentinel")]
    pub missing_feature_sentinel: f64,
    /// Handling of categorical values unseen during encoder fitting
    #[serde(default)]
    pub unknown_category_policy: UnknownCategoryPolicy,
}

fn default_artifact_dir() -> String {
    "models".to_string()
}

fn default_alert_threshold() -> f64 {
    0.3
}

fn default_high_severity_threshold() -> f64 {
    0.7
}

fn default_missing_feature_sentinel() -> f64 {
    -999.0
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            alert_threshold: default_alert_threshold(),
            high_severity_threshold: default_high_severity_threshold(),
            missing_feature_sentinel: default_missing_feature_sentinel(),
            unknown_category_policy: UnknownCategoryPolicy::default(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent scoring workers
    pub workers: usize,
    /// Batch size for scoring passes
    pub batch_size: usize,
    /// Overall batch timeout in milliseconds
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                transaction_subject: "transactions".to_string(),
                alert_subject: "monitoring.alerts".to_string(),
            },
            window: WindowConfig::default(),
            anomaly: AnomalyConfig::default(),
            risk: RiskConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                batch_size: 32,
                timeout_ms: 1000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
