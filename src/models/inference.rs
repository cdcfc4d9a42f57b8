//! Inference engine for term deposit predictions

use crate::assembler::{AssemblerOptions, RequestAssembler};
use crate::config::{AppConfig, FormMode};
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::schema::FeatureSchema;
use crate::types::prediction::{Label, PredictionOutcome};
use crate::types::record::ClientRecord;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

/// Public description of the loaded model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: String,
    pub classes: Vec<String>,
    pub features: Vec<String>,
    pub predict_proba: bool,
}

/// Single-model inference engine
pub struct InferenceEngine {
    model: LoadedModel,
    assembler: RequestAssembler,
    schema: FeatureSchema,
    form_mode: FormMode,
}

impl InferenceEngine {
    /// Create a new inference engine from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.model.onnx_threads);
        let model = loader.load(&config.model.artifact_path)?;

        let options = AssemblerOptions {
            reconcile: config.form.reconcile,
            unknown_as_missing: config.form.unknown_as_missing,
        };

        info!(
            model = %model.name,
            reconcile = ?options.reconcile,
            unknown_as_missing = options.unknown_as_missing,
            form_mode = ?config.form.mode,
            "Inference engine initialized"
        );

        Ok(Self::from_model(model, options).with_form_mode(config.form.mode))
    }

    /// Create an inference engine around an already loaded model
    pub fn from_model(model: LoadedModel, options: AssemblerOptions) -> Self {
        Self {
            model,
            assembler: RequestAssembler::new(options),
            schema: FeatureSchema::bank_marketing(),
            form_mode: FormMode::FreeText,
        }
    }

    pub fn with_form_mode(mut self, form_mode: FormMode) -> Self {
        self.form_mode = form_mode;
        self
    }

    pub fn form_mode(&self) -> FormMode {
        self.form_mode
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn model_name(&self) -> &str {
        &self.model.name
    }

    /// Columns the model expects, in order
    pub fn feature_names(&self) -> &[String] {
        &self.model.feature_names
    }

    pub fn supports_proba(&self) -> bool {
        self.model.supports_proba()
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: self.model.name.clone(),
            kind: self.model.kind().to_string(),
            classes: self.model.classifier.classes().to_vec(),
            features: self.model.feature_names.clone(),
            predict_proba: self.model.supports_proba(),
        }
    }

    /// Collect raw form input and predict.
    ///
    /// In typed mode the values are first checked against the schema
    /// widget constraints.
    pub fn predict_form<I, K, V>(&self, inputs: I) -> Result<PredictionOutcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let record = self.assembler.collect(inputs);
        self.predict_prepared(&record)
    }

    /// Predict from a record that has not been coerced yet (e.g. JSON).
    pub fn predict_record(&self, record: ClientRecord) -> Result<PredictionOutcome> {
        let record = self.assembler.prepare(record);
        self.predict_prepared(&record)
    }

    fn predict_prepared(&self, record: &ClientRecord) -> Result<PredictionOutcome> {
        if self.form_mode == FormMode::Typed {
            self.schema.validate(record, &self.model.feature_names)?;
        }
        self.predict(record)
    }

    /// Run the classifier on a prepared record.
    pub fn predict(&self, record: &ClientRecord) -> Result<PredictionOutcome> {
        let assembled =
            self.assembler
                .assemble(record, &self.model.feature_names, &self.model.categories)?;

        let raw_label = self
            .model
            .classifier
            .predict(&assembled.features)
            .with_context(|| format!("model '{}' failed to predict", self.model.name))?;
        let label = Label::from_class(&raw_label)?;

        let probability_yes = self
            .model
            .classifier
            .predict_proba(&assembled.features)
            .with_context(|| format!("model '{}' failed to score", self.model.name))?
            .map(|probs| self.probability_of_yes(&probs))
            .transpose()?;

        debug!(
            model = %self.model.name,
            label = %label,
            probability_yes = ?probability_yes,
            zero_filled = assembled.zero_filled.len(),
            dropped = ?assembled.dropped,
            "Prediction complete"
        );

        Ok(
            PredictionOutcome::new(label, raw_label, self.model.name.clone())
                .with_probability(probability_yes)
                .with_zero_filled(assembled.zero_filled),
        )
    }

    /// Pick the "yes" probability and make sure it is a probability
    fn probability_of_yes(&self, probs: &[f64]) -> Result<f64> {
        let p = probs
            .get(self.model.yes_index)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("model returned {} probabilities", probs.len()))?;

        if !p.is_finite() || !(-1e-6..=1.0 + 1e-6).contains(&p) {
            anyhow::bail!("model returned an invalid probability {}", p);
        }
        Ok(p.clamp(0.0, 1.0))
    }
}
