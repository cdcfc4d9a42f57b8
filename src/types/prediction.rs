//! Prediction outcome data structures

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Yes,
    No,
}

impl Label {
    /// Map a classifier class label to a subscription label.
    pub fn from_class(class: &str) -> Result<Self> {
        match class.trim().to_ascii_lowercase().as_str() {
            "yes" | "1" | "1.0" | "true" => Ok(Label::Yes),
            "no" | "0" | "0.0" | "false" => Ok(Label::No),
            other => anyhow::bail!("unexpected class label '{}'", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Yes => "yes",
            Label::No => "no",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single prediction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutcome {
    /// Unique prediction identifier
    pub prediction_id: String,

    /// Subscription label
    pub label: Label,

    /// Class label exactly as produced by the classifier
    pub raw_label: String,

    /// Probability of "yes" (0.0 - 1.0), when the model can score
    pub probability_yes: Option<f64>,

    /// Expected columns absent from the request and filled with zero
    pub zero_filled: Vec<String>,

    /// Name of the model that produced the prediction
    pub model: String,

    /// Prediction timestamp
    pub timestamp: DateTime<Utc>,
}

impl PredictionOutcome {
    pub fn new(label: Label, raw_label: String, model: String) -> Self {
        Self {
            prediction_id: uuid::Uuid::new_v4().to_string(),
            label,
            raw_label,
            probability_yes: None,
            zero_filled: Vec::new(),
            model,
            timestamp: Utc::now(),
        }
    }

    pub fn with_probability(mut self, probability_yes: Option<f64>) -> Self {
        self.probability_yes = probability_yes;
        self
    }

    pub fn with_zero_filled(mut self, columns: Vec<String>) -> Self {
        self.zero_filled = columns;
        self
    }

    pub fn is_yes(&self) -> bool {
        self.label == Label::Yes
    }
}
