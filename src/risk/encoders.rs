//! Categorical encoders fit during model training.
//!
//! The encoders are part of the frozen artifact: label-to-code mappings per
//! column, immutable after load. Encoding a value never seen during fitting
//! is an [`EncodingError`]; whether that skips the record or substitutes the
//! unknown bucket is the caller's declared policy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::EncodingError;

/// Reserved code substituted for unseen values under
/// [`UnknownCategoryPolicy::UnknownBucket`].
pub const UNKNOWN_BUCKET_CODE: i64 = -1;

/// What to do with a categorical value the encoders have never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownCategoryPolicy {
    /// Surface the error; the caller skips (and counts) the record
    #[default]
    Reject,
    /// Substitute the reserved unknown bucket and keep scoring
    UnknownBucket,
}

/// Label-to-code mapping for one categorical column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoricalEncoder {
    classes: HashMap<String, i64>,
}

impl CategoricalEncoder {
    /// Build an encoder from the distinct labels, assigning codes in sorted
    /// label order (the shape produced by fitting a label encoder).
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut distinct: Vec<String> = labels.into_iter().map(Into::into).collect();
        distinct.sort();
        distinct.dedup();

        Self {
            classes: distinct
                .into_iter()
                .enumerate()
                .map(|(code, label)| (label, code as i64))
                .collect(),
        }
    }

    pub fn encode(&self, value: &str) -> Option<i64> {
        self.classes.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Fitted encoders keyed by source column name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderSet {
    columns: HashMap<String, CategoricalEncoder>,
}

impl EncoderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: &str, encoder: CategoricalEncoder) {
        self.columns.insert(column.to_string(), encoder);
    }

    pub fn get(&self, column: &str) -> Option<&CategoricalEncoder> {
        self.columns.get(column)
    }

    /// Encode one value under the given policy.
    ///
    /// Returns `Ok(None)` when no encoder exists for the column at all (the
    /// feature is then missing, not erroneous).
    pub fn encode(
        &self,
        column: &str,
        value: &str,
        policy: UnknownCategoryPolicy,
    ) -> Result<Option<i64>, EncodingError> {
        let Some(encoder) = self.columns.get(column) else {
            return Ok(None);
        };

        match encoder.encode(value) {
            Some(code) => Ok(Some(code)),
            None => match policy {
                UnknownCategoryPolicy::UnknownBucket => Ok(Some(UNKNOWN_BUCKET_CODE)),
                UnknownCategoryPolicy::Reject => Err(EncodingError {
                    column: column.to_string(),
                    value: value.to_string(),
                }),
            },
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_encoders() -> EncoderSet {
        let mut set = EncoderSet::new();
        set.insert("channel", CategoricalEncoder::fit(["APP", "NEG", "WEB"]));
        set
    }

    #[test]
    fn test_fit_assigns_sorted_codes() {
        let encoder = CategoricalEncoder::fit(["NEG", "APP", "WEB", "APP"]);
        assert_eq!(encoder.len(), 3);
        assert_eq!(encoder.encode("APP"), Some(0));
        assert_eq!(encoder.encode("NEG"), Some(1));
        assert_eq!(encoder.encode("WEB"), Some(2));
    }

    #[test]
    fn test_unseen_value_rejected_by_default() {
        let set = channel_encoders();
        let err = set
            .encode("channel", "ATM", UnknownCategoryPolicy::Reject)
            .unwrap_err();
        assert_eq!(err.column, "channel");
        assert_eq!(err.value, "ATM");
    }

    #[test]
    fn test_unknown_bucket_policy_substitutes() {
        let set = channel_encoders();
        let code = set
            .encode("channel", "ATM", UnknownCategoryPolicy::UnknownBucket)
            .unwrap();
        assert_eq!(code, Some(UNKNOWN_BUCKET_CODE));
    }

    #[test]
    fn test_missing_column_is_not_an_error() {
        let set = channel_encoders();
        let code = set
            .encode("devicenameid", "APP", UnknownCategoryPolicy::Reject)
            .unwrap();
        assert_eq!(code, None);
    }

    #[test]
    fn test_encoder_set_deserializes_from_artifact_json() {
        let json = r#"{
            "channel": {"NEG": 0, "APP": 1},
            "transactiontype": {"Monetaria": 0, "No monetaria": 1, "Administrativa": 2}
        }"#;

        let set: EncoderSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.column_count(), 2);
        assert_eq!(set.get("channel").unwrap().encode("APP"), Some(1));
    }
}
