//! Transaction record types for the monitoring pipeline.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Raw transaction fields as decoded at the ingestion boundary.
///
/// Field aliases match the source column names so upstream producers can
/// publish either form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Origination channel (e.g. mobile app, branch terminal)
    pub channel: String,

    /// Device identifier
    #[serde(alias = "devicenameid")]
    pub device_id: String,

    /// Transaction code
    #[serde(alias = "transactioncode")]
    pub transaction_code: String,

    /// Transaction type category label
    #[serde(alias = "transactiontype")]
    pub transaction_type: String,

    /// Calendar year of the transaction
    #[serde(alias = "finaltrxyear")]
    pub year: i32,

    /// Calendar month (1-12)
    #[serde(alias = "finaltrxmonth")]
    pub month: u32,

    /// Calendar day (1-31)
    #[serde(alias = "finaltrxday")]
    pub day: u32,

    /// Packed 8-digit time of day, HHMMSSCC
    #[serde(alias = "finaltrxhour")]
    pub packed_time: u32,

    /// Response code; 0 = success
    #[serde(alias = "responsecode")]
    pub response_code: i32,
}

/// Derived transaction category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionCategory {
    Financial,
    NonFinancial,
}

/// Components of the packed HHMMSSCC time-of-day field.
///
/// The hour must validate to `0 <= hour < 24`; an out-of-range hour is
/// reported as missing rather than wrapped or clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedTime {
    pub hour: Option<u32>,
    pub minute: u32,
    pub second: u32,
}

impl PackedTime {
    /// Decompose a packed 8-digit field: first two digits are the hour, the
    /// next two the minute, the next two the second.
    pub fn decompose(packed: u32) -> Self {
        let hour = packed / 1_000_000;
        let minute = (packed / 10_000) % 100;
        let second = (packed / 100) % 100;

        Self {
            hour: if hour < 24 { Some(hour) } else { None },
            minute,
            second,
        }
    }
}

/// A normalized, validated transaction record.
///
/// Immutable once constructed; records that fail reconstruction are rejected
/// at the boundary and never re-validated downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub channel: String,
    pub device_id: String,
    pub transaction_code: String,
    pub transaction_type: String,
    pub response_code: i32,
    /// Raw packed time-of-day, retained for feature preparation
    pub packed_time: u32,
    /// Absolute event instant, second resolution
    pub event_time: DateTime<Utc>,
}

impl TransactionRecord {
    /// Reconstruct a record from its raw form, validating the event instant.
    pub fn from_raw(raw: RawTransaction) -> Result<Self, DecodeError> {
        let time = PackedTime::decompose(raw.packed_time);

        let invalid = || DecodeError::InvalidEventTime {
            year: raw.year,
            month: raw.month,
            day: raw.day,
            packed_time: raw.packed_time,
        };

        let hour = time.hour.ok_or_else(invalid)?;
        let event_time = Utc
            .with_ymd_and_hms(raw.year, raw.month, raw.day, hour, time.minute, time.second)
            .single()
            .ok_or_else(invalid)?;

        Ok(Self {
            channel: raw.channel,
            device_id: raw.device_id,
            transaction_code: raw.transaction_code,
            transaction_type: raw.transaction_type,
            response_code: raw.response_code,
            packed_time: raw.packed_time,
            event_time,
        })
    }

    /// Whether the transaction completed successfully (response code 0).
    pub fn is_successful(&self) -> bool {
        self.response_code == 0
    }

    /// Monetary vs. non-monetary classification of the transaction type.
    pub fn category(&self) -> TransactionCategory {
        let label = self.transaction_type.to_uppercase();
        if label.contains("MONETARIA") && !label.contains("NO MONETARIA") {
            TransactionCategory::Financial
        } else {
            TransactionCategory::NonFinancial
        }
    }
}
