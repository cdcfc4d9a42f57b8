//! ONNX Runtime backed classifier

use crate::models::classifier::{argmax_class, Classifier};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Classifier exported to ONNX, fed a single `[1, n]` float tensor
pub struct OnnxClassifier {
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    label_output: Option<String>,
    proba_output: Option<String>,
    classes: Vec<String>,
}

impl OnnxClassifier {
    /// Load an ONNX graph from file
    pub fn load<P: AsRef<Path>>(path: P, classes: Vec<String>, threads: usize) -> Result<Self> {
        let path = path.as_ref();

        ort::init().commit()?;
        info!(path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let proba_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        if label_output.is_none() && proba_output.is_none() {
            anyhow::bail!("ONNX model at {:?} has neither a label nor a probability output", path);
        }

        info!(
            input = %input_name,
            label = ?label_output,
            probabilities = ?proba_output,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_output,
            proba_output,
            classes,
        })
    }

    /// Run the graph once and hand the outputs to `f`
    fn run<T>(&self, features: &[f32], f: impl FnOnce(&SessionOutputs) -> Result<T>) -> Result<T> {
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor =
            Tensor::from_array((shape, features.to_vec())).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;
        f(&outputs)
    }

    fn extract_probabilities(&self, outputs: &SessionOutputs, output_name: &str) -> Result<Vec<f64>> {
        let output = outputs
            .get(output_name)
            .ok_or_else(|| anyhow::anyhow!("output '{}' missing from results", output_name))?;

        // Tensor format: [1, n_classes]
        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            let probs: Vec<f64> = data.iter().map(|&p| p as f64).collect();
            debug!(probabilities = ?probs, "Extracted from tensor");
            return self.fit_to_classes(probs);
        }

        // Sequence format: seq(map(int64, float))
        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output);
        }

        anyhow::bail!("unsupported probability output type {:?}", dtype)
    }

    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<Vec<f64>> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;
        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        let map_value = maps
            .first()
            .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;
        let mut kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
        kv_pairs.sort_by_key(|(class_id, _)| *class_id);

        let probs: Vec<f64> = kv_pairs.iter().map(|(_, p)| *p as f64).collect();
        debug!(probabilities = ?probs, "Extracted from seq(map)");
        self.fit_to_classes(probs)
    }

    /// Single-column outputs hold the positive class only
    fn fit_to_classes(&self, probs: Vec<f64>) -> Result<Vec<f64>> {
        match probs.len() {
            n if n == self.classes.len() => Ok(probs),
            1 if self.classes.len() == 2 => Ok(vec![1.0 - probs[0], probs[0]]),
            n => anyhow::bail!(
                "model returned {} probabilities for {} classes",
                n,
                self.classes.len()
            ),
        }
    }

    fn extract_label(&self, outputs: &SessionOutputs, output_name: &str) -> Result<String> {
        let output = outputs
            .get(output_name)
            .ok_or_else(|| anyhow::anyhow!("output '{}' missing from results", output_name))?;
        let (_, data) = output.try_extract_tensor::<i64>()?;
        let idx = *data
            .first()
            .ok_or_else(|| anyhow::anyhow!("empty label output"))?;

        usize::try_from(idx)
            .ok()
            .and_then(|i| self.classes.get(i))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("label index {} out of range", idx))
    }
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn supports_proba(&self) -> bool {
        self.proba_output.is_some()
    }

    fn predict(&self, features: &[f32]) -> Result<String> {
        self.run(features, |outputs| {
            if let Some(name) = &self.label_output {
                match self.extract_label(outputs, name) {
                    Ok(label) => return Ok(label),
                    Err(e) => warn!(error = %e, "Could not read label output, using probabilities"),
                }
            }
            let name = self
                .proba_output
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("no usable output to derive a label from"))?;
            let probs = self.extract_probabilities(outputs, name)?;
            argmax_class(&self.classes, &probs)
        })
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<Vec<f64>>> {
        let Some(name) = self.proba_output.as_deref() else {
            return Ok(None);
        };
        self.run(features, |outputs| self.extract_probabilities(outputs, name))
            .map(Some)
    }
}
