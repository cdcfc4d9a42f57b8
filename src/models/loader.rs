//! Model artifact loader

use crate::models::artifact::{ClassifierSpec, ModelArtifact};
use crate::models::classifier::Classifier;
use crate::models::linear::LinearModel;
use crate::models::onnx::OnnxClassifier;
use crate::models::tree::DecisionTree;
use crate::schema::FeatureSchema;
use crate::types::prediction::Label;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Loaded classifier with the metadata needed to feed it
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// Predictor
    pub classifier: Box<dyn Classifier>,
    /// Expected input columns, in order
    pub feature_names: Vec<String>,
    /// Ordinal encoding of categorical columns
    pub categories: HashMap<String, Vec<String>>,
    /// Index of the "yes" class in the classifier output
    pub yes_index: usize,
    /// Artifact the model was loaded from
    pub source: PathBuf,
}

impl LoadedModel {
    pub fn kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn supports_proba(&self) -> bool {
        self.classifier.supports_proba()
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("feature_names", &self.feature_names)
            .field("source", &self.source)
            .finish()
    }
}

/// Loader for model artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
    /// Feature order used when the artifact does not declare one
    schema: FeatureSchema,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
            schema: FeatureSchema::bank_marketing(),
        }
    }

    /// Load a model artifact from file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model artifact");

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact {:?}", path))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model artifact {:?}", path))?;

        self.build(artifact, path)
            .with_context(|| format!("Invalid model artifact {:?}", path))
    }

    /// Build a model from an already parsed artifact
    ///
    /// Relative ONNX paths resolve against the directory of `source`.
    pub fn build(&self, artifact: ModelArtifact, source: &Path) -> Result<LoadedModel> {
        let base_dir = source.parent().unwrap_or_else(|| Path::new("."));
        let (spec, selected_features) = artifact.into_parts();
        let meta = spec.meta().clone();

        let feature_names = selected_features
            .or_else(|| meta.feature_names.clone())
            .unwrap_or_else(|| {
                warn!("Artifact declares no feature names, using the full schema order");
                self.schema.names()
            });
        if feature_names.is_empty() {
            anyhow::bail!("model declares an empty feature list");
        }
        if let Some(dup) = first_duplicate(&feature_names) {
            anyhow::bail!("feature '{}' is listed more than once", dup);
        }

        for column in meta.categories.keys() {
            if !feature_names.contains(column) {
                warn!(column = %column, "Category encoding for a column the model does not use");
            }
        }

        let yes_index = yes_class_index(&meta.classes)?;
        let n_features = feature_names.len();

        let classifier: Box<dyn Classifier> = match &spec {
            ClassifierSpec::DecisionTree(tree) => {
                let tree = DecisionTree::from_spec(tree, n_features)?;
                info!(nodes = tree.node_count(), "Decision tree loaded");
                Box::new(tree)
            }
            ClassifierSpec::LogisticRegression(linear) => {
                Box::new(LinearModel::logistic(linear, n_features)?)
            }
            ClassifierSpec::LinearSvc(linear) => Box::new(LinearModel::svc(linear, n_features)?),
            ClassifierSpec::Onnx(onnx) => Box::new(OnnxClassifier::load(
                base_dir.join(&onnx.path),
                meta.classes.clone(),
                self.onnx_threads,
            )?),
        };

        let name = meta.name.clone().unwrap_or_else(|| {
            source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "model".to_string())
        });

        info!(
            model = %name,
            kind = classifier.kind(),
            features = n_features,
            predict_proba = classifier.supports_proba(),
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            classifier,
            feature_names,
            categories: meta.categories,
            yes_index,
            source: source.to_path_buf(),
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Binary models must carry exactly one "yes" and one "no" class
fn yes_class_index(classes: &[String]) -> Result<usize> {
    if classes.len() != 2 {
        anyhow::bail!("expected 2 classes, got {:?}", classes);
    }
    let labels = classes
        .iter()
        .map(|c| Label::from_class(c))
        .collect::<Result<Vec<_>>>()?;

    match (labels[0], labels[1]) {
        (Label::No, Label::Yes) => Ok(1),
        (Label::Yes, Label::No) => Ok(0),
        _ => anyhow::bail!("classes {:?} must be one yes and one no", classes),
    }
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    names
        .iter()
        .enumerate()
        .find(|&(i, name)| names[..i].contains(name))
        .map(|(_, name)| name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_artifact(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(
            dir.path(),
            "best_tree.json",
            r#"{
                "model": {
                    "type": "decision_tree",
                    "categories": {"poutcome": ["failure", "nonexistent", "success"]},
                    "nodes": [
                        {"feature": 0, "threshold": 300.0, "left": 1, "right": 2},
                        {"value": [9.0, 1.0]},
                        {"value": [1.0, 1.0]}
                    ]
                },
                "selected_features": ["duration", "poutcome"]
            }"#,
        );

        let model = ModelLoader::new().load(&path).unwrap();
        assert_eq!(model.name, "best_tree");
        assert_eq!(model.kind(), "decision_tree");
        assert_eq!(model.feature_names, vec!["duration", "poutcome"]);
        assert_eq!(model.yes_index, 1);
        assert!(model.supports_proba());
        assert_eq!(model.source, path);
    }

    #[test]
    fn test_bare_model_falls_back_to_schema_order() {
        let dir = tempfile::tempdir().unwrap();
        let coefficients = vec!["0.0"; 20].join(", ");
        let json = format!(
            r#"{{"type": "linear_svc", "name": "svc", "coefficients": [{}]}}"#,
            coefficients
        );
        let path = write_artifact(dir.path(), "svc.json", &json);

        let model = ModelLoader::new().load(&path).unwrap();
        assert_eq!(model.name, "svc");
        assert_eq!(model.feature_names.len(), 20);
        assert_eq!(model.feature_names[0], "age");
        assert!(!model.supports_proba());
    }

    #[test]
    fn test_reversed_classes() {
        assert_eq!(yes_class_index(&["yes".into(), "no".into()]).unwrap(), 0);
        assert_eq!(yes_class_index(&["0".into(), "1".into()]).unwrap(), 1);
        assert!(yes_class_index(&["no".into(), "no".into()]).is_err());
        assert!(yes_class_index(&["a".into(), "b".into()]).is_err());
    }

    #[test]
    fn test_duplicate_features_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(
            dir.path(),
            "dup.json",
            r#"{
                "model": {"type": "decision_tree", "nodes": [{"value": [1.0, 1.0]}]},
                "selected_features": ["age", "age"]
            }"#,
        );
        let err = ModelLoader::new().load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("more than once"));
    }

    #[test]
    fn test_missing_file() {
        let err = ModelLoader::new().load("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read model artifact"));
    }

    #[test]
    fn test_shipped_artifacts_load() {
        let models = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");

        let tree = ModelLoader::new()
            .load(models.join("bank_decision_tree.json"))
            .unwrap();
        assert_eq!(tree.feature_names.len(), 10);
        assert_eq!(tree.categories["month"].len(), 12);

        let logreg = ModelLoader::new()
            .load(models.join("bank_logistic_regression.json"))
            .unwrap();
        assert_eq!(logreg.kind(), "logistic_regression");
        assert_eq!(logreg.yes_index, 1);
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "bad.json", "{ not json");
        assert!(ModelLoader::new().load(&path).is_err());
    }
}
