//! Risk artifact loading.
//!
//! The model and its encoders are loaded once from a directory and treated
//! as read-only from then on; concurrent scorers share them behind an `Arc`.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::ModelUnavailableError;
use crate::risk::encoders::EncoderSet;
use crate::risk::model::RiskModel;

const MODEL_FILE: &str = "model.json";
const ENCODERS_FILE: &str = "encoders.json";

/// Immutable-after-load model + encoder bundle.
#[derive(Debug, Clone)]
pub struct RiskArtifact {
    pub model: RiskModel,
    pub encoders: EncoderSet,
}

impl RiskArtifact {
    pub fn new(model: RiskModel, encoders: EncoderSet) -> Self {
        Self { model, encoders }
    }
}

/// Load `model.json` and `encoders.json` from `dir`.
///
/// Any missing, unreadable, or structurally invalid file yields
/// [`ModelUnavailableError`]; the caller skips scoring entirely rather than
/// applying a half-loaded artifact.
pub fn load_artifact<P: AsRef<Path>>(dir: P) -> Result<RiskArtifact, ModelUnavailableError> {
    let dir = dir.as_ref();

    let model_path = dir.join(MODEL_FILE);
    let model: RiskModel = read_json(&model_path)?;
    model
        .validate()
        .map_err(|reason| ModelUnavailableError::Corrupt {
            path: model_path.clone(),
            reason,
        })?;

    let encoders_path = dir.join(ENCODERS_FILE);
    let encoders: EncoderSet = read_json(&encoders_path)?;

    info!(
        dir = %dir.display(),
        features = model.feature_names.len(),
        trees = model.trees.len(),
        encoder_columns = encoders.column_count(),
        "Risk artifact loaded"
    );

    Ok(RiskArtifact { model, encoders })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelUnavailableError> {
    if !path.exists() {
        return Err(ModelUnavailableError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|source| ModelUnavailableError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|e| ModelUnavailableError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::encoders::CategoricalEncoder;
    use crate::risk::model::{Tree, TreeNode};

    fn write_artifact(dir: &Path, model: &RiskModel, encoders: &EncoderSet) {
        fs::write(dir.join(MODEL_FILE), serde_json::to_vec(model).unwrap()).unwrap();
        fs::write(
            dir.join(ENCODERS_FILE),
            serde_json::to_vec(encoders).unwrap(),
        )
        .unwrap();
    }

    fn sample_model() -> RiskModel {
        RiskModel {
            feature_names: vec!["channel_encoded".to_string()],
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.5,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: -1.0 },
                    TreeNode::Leaf { value: 1.0 },
                ],
            }],
        }
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoders = EncoderSet::new();
        encoders.insert("channel", CategoricalEncoder::fit(["APP", "NEG"]));
        write_artifact(dir.path(), &sample_model(), &encoders);

        let artifact = load_artifact(dir.path()).unwrap();
        assert_eq!(artifact.model.feature_names, vec!["channel_encoded"]);
        assert_eq!(artifact.encoders.column_count(), 1);
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_artifact(dir.path()),
            Err(ModelUnavailableError::NotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_model_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MODEL_FILE), b"{not json").unwrap();

        assert!(matches!(
            load_artifact(dir.path()),
            Err(ModelUnavailableError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_structurally_invalid_model_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = sample_model();
        // Feature index beyond the declared feature list
        model.trees[0].nodes[0] = TreeNode::Split {
            feature: 9,
            threshold: 0.5,
            left: 1,
            right: 2,
        };
        write_artifact(dir.path(), &model, &EncoderSet::new());

        match load_artifact(dir.path()) {
            Err(ModelUnavailableError::Corrupt { reason, .. }) => {
                assert!(reason.contains("feature 9"));
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }
}
