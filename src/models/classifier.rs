//! Classifier abstraction shared by every model kind

use anyhow::Result;

/// A trained binary classifier operating on an encoded feature row.
pub trait Classifier: Send + Sync {
    /// Short identifier of the model kind.
    fn kind(&self) -> &'static str;

    /// Class labels in output order.
    fn classes(&self) -> &[String];

    /// Whether `predict_proba` returns scores.
    fn supports_proba(&self) -> bool;

    /// Predict the class label for one feature row.
    fn predict(&self, features: &[f32]) -> Result<String>;

    /// Per-class probabilities for one feature row, in `classes()` order.
    ///
    /// Returns `Ok(None)` for models without a probability capability.
    fn predict_proba(&self, features: &[f32]) -> Result<Option<Vec<f64>>>;
}

/// Label of the highest-scoring class. Ties resolve to the first class.
pub fn argmax_class(classes: &[String], scores: &[f64]) -> Result<String> {
    if scores.len() != classes.len() {
        anyhow::bail!(
            "score vector has {} entries but the model has {} classes",
            scores.len(),
            classes.len()
        );
    }

    let mut best = 0;
    for (idx, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = idx;
        }
    }

    classes
        .get(best)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("model has no classes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["no".to_string(), "yes".to_string()]
    }

    #[test]
    fn test_argmax_class() {
        assert_eq!(argmax_class(&classes(), &[0.2, 0.8]).unwrap(), "yes");
        assert_eq!(argmax_class(&classes(), &[0.9, 0.1]).unwrap(), "no");
        assert_eq!(argmax_class(&classes(), &[0.5, 0.5]).unwrap(), "no");
    }

    #[test]
    fn test_argmax_length_mismatch() {
        assert!(argmax_class(&classes(), &[1.0]).is_err());
    }
}
