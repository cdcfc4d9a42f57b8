//! Decision tree classifier

use crate::models::artifact::{TreeNodeSpec, TreeSpec};
use crate::models::classifier::{argmax_class, Classifier};
use anyhow::{Context, Result};

/// Split condition for a decision node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCondition {
    pub feature_index: usize,
    /// Go left if feature <= threshold
    pub threshold: f64,
    /// Direction for missing values
    pub default_left: bool,
}

impl SplitCondition {
    #[inline]
    pub fn go_left(&self, feature_value: f32) -> bool {
        if feature_value.is_nan() {
            self.default_left
        } else {
            f64::from(feature_value) <= self.threshold
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        condition: SplitCondition,
        left: usize,
        right: usize,
    },
    /// Normalized class probabilities
    Leaf(Vec<f64>),
}

/// Decision tree with per-class leaf distributions
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    classes: Vec<String>,
}

impl DecisionTree {
    /// Build a tree from its serialized form.
    ///
    /// Children must come after their parent in the node array, so every
    /// traversal terminates.
    pub fn from_spec(spec: &TreeSpec, n_features: usize) -> Result<Self> {
        let classes = spec.meta.classes.clone();
        if spec.nodes.is_empty() {
            anyhow::bail!("decision tree has no nodes");
        }

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (idx, node) in spec.nodes.iter().enumerate() {
            let node = match node {
                TreeNodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    if *feature >= n_features {
                        anyhow::bail!(
                            "node {} splits on feature {} but the model has {} features",
                            idx,
                            feature,
                            n_features
                        );
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= spec.nodes.len() {
                            anyhow::bail!("node {} has invalid child index {}", idx, child);
                        }
                    }
                    Node::Split {
                        condition: SplitCondition {
                            feature_index: *feature,
                            threshold: *threshold,
                            default_left: *default_left,
                        },
                        left: *left,
                        right: *right,
                    }
                }
                TreeNodeSpec::Leaf { value } => Node::Leaf(
                    normalize_leaf(value, classes.len())
                        .with_context(|| format!("invalid leaf at node {}", idx))?,
                ),
            };
            nodes.push(node);
        }

        Ok(Self { nodes, classes })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Walk from the root to a leaf and return its distribution.
    fn leaf_for(&self, features: &[f32]) -> Result<&[f64]> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(dist) => return Ok(dist.as_slice()),
                Node::Split {
                    condition,
                    left,
                    right,
                } => {
                    let value = features
                        .get(condition.feature_index)
                        .copied()
                        .ok_or_else(|| {
                            anyhow::anyhow!(
                                "feature row has {} values, tree needs index {}",
                                features.len(),
                                condition.feature_index
                            )
                        })?;
                    idx = if condition.go_left(value) { *left } else { *right };
                }
            }
        }
    }
}

fn normalize_leaf(value: &[f64], n_classes: usize) -> Result<Vec<f64>> {
    if value.len() != n_classes {
        anyhow::bail!(
            "leaf has {} class weights, expected {}",
            value.len(),
            n_classes
        );
    }
    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
        anyhow::bail!("leaf weights must be finite and non-negative");
    }

    let total: f64 = value.iter().sum();
    if total <= 0.0 {
        anyhow::bail!("leaf weights sum to zero");
    }
    Ok(value.iter().map(|w| w / total).collect())
}

impl Classifier for DecisionTree {
    fn kind(&self) -> &'static str {
        "decision_tree"
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn supports_proba(&self) -> bool {
        true
    }

    fn predict(&self, features: &[f32]) -> Result<String> {
        let dist = self.leaf_for(features)?;
        argmax_class(&self.classes, dist)
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<Vec<f64>>> {
        Ok(Some(self.leaf_for(features)?.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> TreeSpec {
        serde_json::from_str(json).unwrap()
    }

    fn stump() -> DecisionTree {
        let spec = parse(
            r#"{
                "nodes": [
                    {"feature": 0, "threshold": 300.0, "left": 1, "right": 2, "default_left": false},
                    {"value": [90.0, 10.0]},
                    {"value": [1.0, 3.0]}
                ]
            }"#,
        );
        DecisionTree::from_spec(&spec, 1).unwrap()
    }

    #[test]
    fn split_condition_threshold_goes_left() {
        let cond = SplitCondition {
            feature_index: 0,
            threshold: 0.5,
            default_left: true,
        };
        assert!(cond.go_left(0.3));
        assert!(cond.go_left(0.5));
        assert!(!cond.go_left(0.7));
        assert!(cond.go_left(f32::NAN));
    }

    #[test]
    fn test_predict_and_proba() {
        let tree = stump();

        assert_eq!(tree.predict(&[120.0]).unwrap(), "no");
        assert_eq!(tree.predict(&[900.0]).unwrap(), "yes");

        let proba = tree.predict_proba(&[900.0]).unwrap().unwrap();
        assert!((proba[1] - 0.75).abs() < 1e-9);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_follows_default_direction() {
        let tree = stump();
        assert_eq!(tree.predict(&[f32::NAN]).unwrap(), "yes");
    }

    #[test]
    fn test_rejects_backward_child() {
        let spec = parse(
            r#"{
                "nodes": [
                    {"feature": 0, "threshold": 1.0, "left": 0, "right": 1},
                    {"value": [1.0, 0.0]}
                ]
            }"#,
        );
        assert!(DecisionTree::from_spec(&spec, 1).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_feature() {
        let spec = parse(
            r#"{
                "nodes": [
                    {"feature": 4, "threshold": 1.0, "left": 1, "right": 2},
                    {"value": [1.0, 0.0]},
                    {"value": [0.0, 1.0]}
                ]
            }"#,
        );
        assert!(DecisionTree::from_spec(&spec, 2).is_err());
    }

    #[test]
    fn test_rejects_bad_leaf() {
        let spec = parse(r#"{"nodes": [{"value": [0.0, 0.0]}]}"#);
        assert!(DecisionTree::from_spec(&spec, 1).is_err());

        let spec = parse(r#"{"nodes": [{"value": [1.0]}]}"#);
        assert!(DecisionTree::from_spec(&spec, 1).is_err());
    }
}
