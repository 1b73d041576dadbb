//! Error taxonomy for the monitoring pipeline.
//!
//! The aggregation/anomaly path and the risk-scoring path are independent
//! pipelines; none of these errors may cross from one into the other. The
//! zero-variance case in the anomaly detector is a designed no-alert branch,
//! not an error, so it has no variant here.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// A raw record that could not be reconstructed into a valid
/// [`TransactionRecord`](crate::types::transaction::TransactionRecord).
///
/// Rejected records never enter the aggregator and are counted, not
/// zero-filled.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed transaction payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no valid calendar instant for {year:04}-{month:02}-{day:02} with packed time {packed_time:08}")]
    InvalidEventTime {
        year: i32,
        month: u32,
        day: u32,
        packed_time: u32,
    },
}

/// A record older than its channel's window horizon.
///
/// Accepting it would corrupt the running sums, so it is dropped and counted.
#[derive(Debug, Error)]
#[error("record for channel '{channel}' is {lag_seconds}s behind the newest event, beyond the {window_seconds}s window")]
pub struct OutOfOrderError {
    pub channel: String,
    pub event_time: DateTime<Utc>,
    pub lag_seconds: i64,
    pub window_seconds: i64,
}

/// A categorical value that was not seen when the encoders were fit.
///
/// The caller's [`UnknownCategoryPolicy`](crate::risk::encoders::UnknownCategoryPolicy)
/// decides whether to skip the record or substitute the unknown bucket.
#[derive(Debug, Error)]
#[error("value '{value}' for column '{column}' was not seen during encoder fitting")]
pub struct EncodingError {
    pub column: String,
    pub value: String,
}

/// The model artifact could not be loaded.
///
/// Scoring for the affected stream is skipped entirely; aggregation and
/// anomaly detection continue unaffected.
#[derive(Debug, Error)]
pub enum ModelUnavailableError {
    #[error("artifact file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read artifact {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt artifact {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}
