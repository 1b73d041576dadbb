//! Feature preparation for risk scoring.
//!
//! A pure function of the transaction and a fixed encoder set: no state, no
//! side effects, deterministic for identical inputs. The model declares the
//! feature names it expects; any feature that cannot be produced from the
//! record gets the missing-value sentinel so a partially-populated record
//! still scores (degraded accuracy is a documented trade, not a crash).

use chrono::Datelike;

use crate::error::EncodingError;
use crate::risk::encoders::{EncoderSet, UnknownCategoryPolicy};
use crate::types::transaction::{PackedTime, TransactionRecord};

/// Categorical source columns the encoders are fit on.
pub const CATEGORICAL_COLUMNS: [&str; 4] =
    ["channel", "devicenameid", "transactioncode", "transactiontype"];

/// Build the feature vector for `expected` feature names, in order.
///
/// Name contract (matching the training pipeline):
/// - `<column>_encoded` routes through the fitted encoder for `<column>`
/// - `hour` / `minute` / `second` come from the packed time-of-day field,
///   with the hour validated to `0 <= hour < 24` (else missing)
/// - `finaltrxday` / `finaltrxmonth` / `finaltrxyear` come from the event time
/// - anything else is missing and gets `sentinel`
pub fn prepare_features(
    record: &TransactionRecord,
    encoders: &EncoderSet,
    expected: &[String],
    sentinel: f64,
    policy: UnknownCategoryPolicy,
) -> Result<Vec<f64>, EncodingError> {
    let time = PackedTime::decompose(record.packed_time);
    let mut features = Vec::with_capacity(expected.len());

    for name in expected {
        let value = if let Some(column) = name.strip_suffix("_encoded") {
            match categorical_value(record, column) {
                Some(raw) => encoders
                    .encode(column, raw, policy)?
                    .map(|code| code as f64),
                None => None,
            }
        } else {
            match name.as_str() {
                "hour" => time.hour.map(f64::from),
                "minute" => Some(f64::from(time.minute)),
                "second" => Some(f64::from(time.second)),
                "finaltrxday" => Some(f64::from(record.event_time.day())),
                "finaltrxmonth" => Some(f64::from(record.event_time.month())),
                "finaltrxyear" => Some(f64::from(record.event_time.year())),
                _ => None,
            }
        };

        features.push(value.unwrap_or(sentinel));
    }

    Ok(features)
}

fn categorical_value<'a>(record: &'a TransactionRecord, column: &str) -> Option<&'a str> {
    match column {
        "channel" => Some(&record.channel),
        "devicenameid" => Some(&record.device_id),
        "transactioncode" => Some(&record.transaction_code),
        "transactiontype" => Some(&record.transaction_type),
        _ => None,
    }
}
