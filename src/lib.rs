//! Transaction Monitoring Pipeline Library
//!
//! Continuously ingests financial transaction records and produces, per
//! channel, rolling operational metrics over a trailing time window, flags
//! statistically anomalous channel-windows, and separately flags individual
//! transactions predicted to be at high risk of failure.

pub mod aggregator;
pub mod anomaly;
pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod producer;
pub mod risk;
pub mod types;

pub use aggregator::{ChannelMetrics, WindowAggregator};
pub use anomaly::AnomalyDetector;
pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use producer::AlertProducer;
pub use risk::{RiskArtifact, RiskScorer};
pub use types::{Alert, AlertKind, RawTransaction, Severity, TransactionRecord};
