//! Linear classifiers: logistic regression and linear SVC

use crate::models::artifact::LinearSpec;
use crate::models::classifier::Classifier;
use anyhow::Result;

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Linear decision function `w·x + b` over optionally standardized inputs.
///
/// The positive side of the decision function maps to `classes[1]`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    coefficients: Vec<f64>,
    intercept: f64,
    mean: Option<Vec<f64>>,
    scale: Option<Vec<f64>>,
    classes: Vec<String>,
    /// Logistic regression exposes probabilities, linear SVC does not
    probabilistic: bool,
}

impl LinearModel {
    pub fn logistic(spec: &LinearSpec, n_features: usize) -> Result<Self> {
        Self::from_spec(spec, n_features, true)
    }

    pub fn svc(spec: &LinearSpec, n_features: usize) -> Result<Self> {
        Self::from_spec(spec, n_features, false)
    }

    fn from_spec(spec: &LinearSpec, n_features: usize, probabilistic: bool) -> Result<Self> {
        if spec.meta.classes.len() != 2 {
            anyhow::bail!(
                "linear model must have exactly 2 classes, got {}",
                spec.meta.classes.len()
            );
        }
        if spec.coefficients.len() != n_features {
            anyhow::bail!(
                "linear model has {} coefficients but {} features",
                spec.coefficients.len(),
                n_features
            );
        }

        let (mean, scale) = match &spec.scaler {
            Some(scaler) => {
                if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
                    anyhow::bail!("scaler dimensions do not match {} features", n_features);
                }
                if scaler.scale.iter().any(|s| *s == 0.0) {
                    anyhow::bail!("scaler has a zero scale");
                }
                (Some(scaler.mean.clone()), Some(scaler.scale.clone()))
            }
            None => (None, None),
        };

        Ok(Self {
            coefficients: spec.coefficients.clone(),
            intercept: spec.intercept,
            mean,
            scale,
            classes: spec.meta.classes.clone(),
            probabilistic,
        })
    }

    /// Signed distance to the decision boundary.
    pub fn decision_function(&self, features: &[f32]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            anyhow::bail!(
                "expected {} features, got {}",
                self.coefficients.len(),
                features.len()
            );
        }
        if let Some(idx) = features.iter().position(|v| v.is_nan()) {
            anyhow::bail!("input contains a missing value at feature {}", idx);
        }

        let mut z = self.intercept;
        for (i, (&x, &w)) in features.iter().zip(&self.coefficients).enumerate() {
            let mut x = f64::from(x);
            if let (Some(mean), Some(scale)) = (&self.mean, &self.scale) {
                x = (x - mean[i]) / scale[i];
            }
            z += w * x;
        }
        Ok(z)
    }
}

impl Classifier for LinearModel {
    fn kind(&self) -> &'static str {
        if self.probabilistic {
            "logistic_regression"
        } else {
            "linear_svc"
        }
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn supports_proba(&self) -> bool {
        self.probabilistic
    }

    fn predict(&self, features: &[f32]) -> Result<String> {
        let z = self.decision_function(features)?;
        let idx = if z > 0.0 { 1 } else { 0 };
        Ok(self.classes[idx].clone())
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<Vec<f64>>> {
        if !self.probabilistic {
            return Ok(None);
        }
        let p = sigmoid(self.decision_function(features)?);
        Ok(Some(vec![1.0 - p, p]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> LinearSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!((sigmoid(2.0) - 0.8807970779778823).abs() < 1e-9);
    }

    #[test]
    fn test_logistic_regression() {
        let spec = parse(r#"{"coefficients": [0.01, -1.0], "intercept": -2.0}"#);
        let model = LinearModel::logistic(&spec, 2).unwrap();

        // z = 0.01 * 500 - 1.0 * 1.0 - 2.0 = 2.0
        let proba = model.predict_proba(&[500.0, 1.0]).unwrap().unwrap();
        assert!((proba[1] - 0.8807970779778823).abs() < 1e-6);
        assert_eq!(model.predict(&[500.0, 1.0]).unwrap(), "yes");
        assert_eq!(model.predict(&[100.0, 1.0]).unwrap(), "no");
    }

    #[test]
    fn test_scaler_applied() {
        let json = r#"{
            "coefficients": [1.0],
            "intercept": 0.0,
            "scaler": {"mean": [250.0], "scale": [50.0]}
        }"#;
        let model = LinearModel::logistic(&parse(json), 1).unwrap();
        let z = model.decision_function(&[350.0]).unwrap();
        assert!((z - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_svc_has_no_probability() {
        let spec = parse(r#"{"coefficients": [1.0], "intercept": -1.0}"#);
        let model = LinearModel::svc(&spec, 1).unwrap();

        assert!(!model.supports_proba());
        assert!(model.predict_proba(&[3.0]).unwrap().is_none());
        assert_eq!(model.predict(&[3.0]).unwrap(), "yes");
    }

    #[test]
    fn test_rejects_missing_values() {
        let spec = parse(r#"{"coefficients": [1.0]}"#);
        let model = LinearModel::logistic(&spec, 1).unwrap();
        assert!(model.predict(&[f32::NAN]).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let spec = parse(r#"{"coefficients": [1.0, 2.0]}"#);
        assert!(LinearModel::logistic(&spec, 3).is_err());
    }
}
