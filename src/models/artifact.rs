//! On-disk model artifact format
//!
//! An artifact is a JSON document holding either a bare classifier or a
//! bundle with the classifier under `model` and the training-time feature
//! list under `selected_features`.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level artifact document
#[derive(Debug, Clone)]
pub enum ModelArtifact {
    /// Classifier plus the features it was trained on
    Bundle {
        model: ClassifierSpec,
        selected_features: Option<Vec<String>>,
    },
    /// Classifier on its own
    Bare(ClassifierSpec),
}

#[derive(Deserialize)]
struct BundleDocument {
    model: ClassifierSpec,
    #[serde(default)]
    selected_features: Option<Vec<String>>,
}

/// A document with a `model` key is a bundle, anything else a bare
/// classifier. Picking the shape up front keeps the real parse error.
impl<'de> Deserialize<'de> for ModelArtifact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let artifact = if value.get("model").is_some() {
            serde_json::from_value::<BundleDocument>(value).map(|doc| ModelArtifact::Bundle {
                model: doc.model,
                selected_features: doc.selected_features,
            })
        } else {
            serde_json::from_value::<ClassifierSpec>(value).map(ModelArtifact::Bare)
        };
        artifact.map_err(serde::de::Error::custom)
    }
}

impl ModelArtifact {
    pub fn classifier(&self) -> &ClassifierSpec {
        match self {
            ModelArtifact::Bundle { model, .. } => model,
            ModelArtifact::Bare(model) => model,
        }
    }

    pub fn selected_features(&self) -> Option<&[String]> {
        match self {
            ModelArtifact::Bundle {
                selected_features, ..
            } => selected_features.as_deref(),
            ModelArtifact::Bare(_) => None,
        }
    }

    pub fn into_parts(self) -> (ClassifierSpec, Option<Vec<String>>) {
        match self {
            ModelArtifact::Bundle {
                model,
                selected_features,
            } => (model, selected_features),
            ModelArtifact::Bare(model) => (model, None),
        }
    }
}

/// Serialized classifier, tagged by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierSpec {
    DecisionTree(TreeSpec),
    LogisticRegression(LinearSpec),
    LinearSvc(LinearSpec),
    Onnx(OnnxSpec),
}

impl ClassifierSpec {
    pub fn meta(&self) -> &ModelMeta {
        match self {
            ClassifierSpec::DecisionTree(spec) => &spec.meta,
            ClassifierSpec::LogisticRegression(spec) | ClassifierSpec::LinearSvc(spec) => {
                &spec.meta
            }
            ClassifierSpec::Onnx(spec) => &spec.meta,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierSpec::DecisionTree(_) => "decision_tree",
            ClassifierSpec::LogisticRegression(_) => "logistic_regression",
            ClassifierSpec::LinearSvc(_) => "linear_svc",
            ClassifierSpec::Onnx(_) => "onnx",
        }
    }
}

/// Metadata shared by every classifier kind
#[derive(Debug, Clone, Deserialize)]
pub struct ModelMeta {
    /// Display name; defaults to the artifact file stem
    #[serde(default)]
    pub name: Option<String>,
    /// Class labels in output order
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
    /// Feature names seen during fit
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Ordinal encoding of categorical columns
    #[serde(default)]
    pub categories: HashMap<String, Vec<String>>,
}

fn default_classes() -> Vec<String> {
    vec!["no".to_string(), "yes".to_string()]
}

/// Decision tree stored as a flat node array, root at index 0
#[derive(Debug, Clone, Deserialize)]
pub struct TreeSpec {
    #[serde(flatten)]
    pub meta: ModelMeta,
    pub nodes: Vec<TreeNodeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNodeSpec {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_left")]
        default_left: bool,
    },
    Leaf {
        value: Vec<f64>,
    },
}

fn default_left() -> bool {
    true
}

/// Linear model parameters
#[derive(Debug, Clone, Deserialize)]
pub struct LinearSpec {
    #[serde(flatten)]
    pub meta: ModelMeta,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<ScalerSpec>,
}

/// Standardization applied before the linear model: `(x - mean) / scale`
#[derive(Debug, Clone, Deserialize)]
pub struct ScalerSpec {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// ONNX graph exported from the training pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct OnnxSpec {
    #[serde(flatten)]
    pub meta: ModelMeta,
    /// Path to the `.onnx` file, relative to the artifact
    pub path: PathBuf,
}
