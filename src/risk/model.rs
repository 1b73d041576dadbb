//! Frozen predictive model for transaction failure risk.
//!
//! The model is an externally-trained boosted-tree classifier exported as a
//! JSON artifact: a prior logit plus an array of regression trees whose leaf
//! values accumulate into the failure margin. It is immutable after load;
//! hot swaps happen by replacing the `Arc` holding the artifact, never by
//! mutating it in place.

use serde::{Deserialize, Serialize};

/// One node of an array-encoded tree. Child references must point forward
/// (index strictly greater than the parent's), which
/// [`RiskModel::validate`] enforces at load time so tree walks always
/// terminate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree, root at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn score(&self, features: &[f64]) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).copied().unwrap_or(f64::NAN);
                    // NaN fails the comparison and routes right
                    idx = if x < *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Externally-trained failure-risk model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskModel {
    /// Feature names, in the order the trees index them
    pub feature_names: Vec<String>,
    /// Prior logit added before the tree contributions
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl RiskModel {
    /// Structural validation run once at load: rejects artifacts whose tree
    /// walks could index out of range or fail to terminate.
    pub fn validate(&self) -> Result<(), String> {
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    if *feature >= self.feature_names.len() {
                        return Err(format!(
                            "tree {t} node {n} references feature {feature}, but the model has {} features",
                            self.feature_names.len()
                        ));
                    }
                    for child in [*left, *right] {
                        if child <= n || child >= tree.nodes.len() {
                            return Err(format!(
                                "tree {t} node {n} has non-forward child index {child}"
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Failure probability in [0, 1] for a prepared feature vector.
    ///
    /// Pure function of the inputs: identical features always give an
    /// identical probability.
    pub fn predict_failure_probability(&self, features: &[f64]) -> f64 {
        let margin: f64 = self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.score(features))
                .sum::<f64>();
        1.0 / (1.0 + (-margin).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-feature model: failure margin rises when feature 0 is >= 0.5 and
    /// again when feature 1 is >= 2.5.
    pub(crate) fn test_model() -> RiskModel {
        RiskModel {
            feature_names: vec!["channel_encoded".to_string(), "hour".to_string()],
            base_score: -1.0,
            trees: vec![
                Tree {
                    nodes: vec![
                        TreeNode::Split {
                            feature: 0,
                            threshold: 0.5,
                            left: 1,
                            right: 2,
                        },
                        TreeNode::Leaf { value: -1.5 },
                        TreeNode::Leaf { value: 2.0 },
                    ],
                },
                Tree {
                    nodes: vec![
                        TreeNode::Split {
                            feature: 1,
                            threshold: 2.5,
                            left: 1,
                            right: 2,
                        },
                        TreeNode::Leaf { value: 0.5 },
                        TreeNode::Leaf { value: 1.0 },
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_prediction_in_unit_interval() {
        let model = test_model();
        for features in [[0.0, 0.0], [1.0, 3.0], [-999.0, -999.0], [1e9, -1e9]] {
            let p = model.predict_failure_probability(&features);
            assert!((0.0..=1.0).contains(&p), "p = {p} out of range");
        }
    }

    #[test]
    fn test_margin_accumulates_across_trees() {
        let model = test_model();

        // Low-risk path: -1.0 - 1.5 + 0.5 = -2.0
        let low = model.predict_failure_probability(&[0.0, 0.0]);
        assert!((low - 1.0 / (1.0 + 2.0_f64.exp())).abs() < 1e-12);

        // High-risk path: -1.0 + 2.0 + 1.0 = 2.0
        let high = model.predict_failure_probability(&[1.0, 3.0]);
        assert!((high - 1.0 / (1.0 + (-2.0_f64).exp())).abs() < 1e-12);
        assert!(high > low);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let model = test_model();
        let features = [1.0, 12.0];
        assert_eq!(
            model.predict_failure_probability(&features),
            model.predict_failure_probability(&features)
        );
    }

    #[test]
    fn test_validate_rejects_bad_artifacts() {
        let mut model = test_model();
        model.trees[0].nodes[0] = TreeNode::Split {
            feature: 7,
            threshold: 0.5,
            left: 1,
            right: 2,
        };
        assert!(model.validate().unwrap_err().contains("feature 7"));

        let mut model = test_model();
        // Self-referential child would loop forever without the forward check
        model.trees[1].nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
        };
        assert!(model.validate().is_err());

        assert!(test_model().validate().is_ok());
    }

    #[test]
    fn test_model_parses_from_artifact_json() {
        let json = r#"{
            "feature_names": ["channel_encoded", "hour"],
            "base_score": -0.25,
            "trees": [
                [
                    {"feature": 0, "threshold": 1.5, "left": 1, "right": 2},
                    {"value": -0.5},
                    {"value": 1.25}
                ]
            ]
        }"#;

        let model: RiskModel = serde_json::from_str(json).unwrap();
        model.validate().unwrap();
        assert_eq!(model.trees.len(), 1);

        let p = model.predict_failure_probability(&[2.0, 0.0]);
        assert!((p - 1.0 / (1.0 + (-1.0_f64).exp())).abs() < 1e-12);
    }
}
