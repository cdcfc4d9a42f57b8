//! Request assembly for term deposit model inference.
//!
//! Turns collected client attributes into the single feature row the loaded
//! model expects: columns reconciled to the model's training-time feature
//! list, categorical text ordinal-encoded, missing values as NaN.

use crate::config::ReconcileMode;
use crate::types::record::{ClientRecord, FieldValue};
use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

/// Options controlling record preparation and reconciliation
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblerOptions {
    pub reconcile: ReconcileMode,
    pub unknown_as_missing: bool,
}

/// Record whose columns match the model's expected columns, in order
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRecord {
    pub columns: Vec<String>,
    pub values: Vec<FieldValue>,
    /// Expected columns the request did not provide
    pub zero_filled: Vec<String>,
    /// Provided columns the model does not use
    pub dropped: Vec<String>,
}

/// Encoded model input plus the reconciliation report
#[derive(Debug, Clone)]
pub struct AssembledRequest {
    pub features: Vec<f32>,
    pub zero_filled: Vec<String>,
    pub dropped: Vec<String>,
}

/// Assembler that maps collected attributes to model input.
pub struct RequestAssembler {
    options: AssemblerOptions,
}

impl RequestAssembler {
    pub fn new(options: AssemblerOptions) -> Self {
        Self { options }
    }

    /// Collect raw form input into a record, coercing numeric text.
    pub fn collect<I, K, V>(&self, inputs: I) -> ClientRecord
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        self.prepare(ClientRecord::from_raw(inputs))
    }

    /// Apply numeric coercion and the unknown-category substitution.
    pub fn prepare(&self, record: ClientRecord) -> ClientRecord {
        let record = record.coerce_numeric();
        if self.options.unknown_as_missing {
            record.unknown_as_missing()
        } else {
            record
        }
    }

    /// Align a record to the expected columns.
    pub fn reconcile(&self, record: &ClientRecord, expected: &[String]) -> Result<ReconciledRecord> {
        let zero_filled: Vec<String> = expected
            .iter()
            .filter(|name| !record.contains(name))
            .cloned()
            .collect();

        if !zero_filled.is_empty() && self.options.reconcile == ReconcileMode::Strict {
            anyhow::bail!("missing columns: {}", zero_filled.join(", "));
        }

        let dropped: Vec<String> = record
            .columns()
            .filter(|name| !expected.iter().any(|e| e.as_str() == *name))
            .map(str::to_string)
            .collect();

        let values = expected
            .iter()
            .map(|name| record.get(name).cloned().unwrap_or(FieldValue::Number(0.0)))
            .collect();

        if !zero_filled.is_empty() || !dropped.is_empty() {
            debug!(
                zero_filled = ?zero_filled,
                dropped = ?dropped,
                "Reconciled request columns"
            );
        }

        Ok(ReconciledRecord {
            columns: expected.to_vec(),
            values,
            zero_filled,
            dropped,
        })
    }

    /// Encode a reconciled record into the model's feature row.
    ///
    /// Numbers pass through (also for categorical columns, where they are
    /// taken as already-encoded codes). Text must name a known category.
    pub fn encode(
        &self,
        record: &ReconciledRecord,
        categories: &HashMap<String, Vec<String>>,
    ) -> Result<Vec<f32>> {
        record
            .columns
            .iter()
            .zip(&record.values)
            .map(|(column, value)| encode_value(column, value, categories.get(column)))
            .collect()
    }

    /// Reconcile and encode in one step.
    pub fn assemble(
        &self,
        record: &ClientRecord,
        expected: &[String],
        categories: &HashMap<String, Vec<String>>,
    ) -> Result<AssembledRequest> {
        let reconciled = self.reconcile(record, expected)?;
        let features = self.encode(&reconciled, categories)?;

        Ok(AssembledRequest {
            features,
            zero_filled: reconciled.zero_filled,
            dropped: reconciled.dropped,
        })
    }
}

impl Default for RequestAssembler {
    fn default() -> Self {
        Self::new(AssemblerOptions::default())
    }
}

fn encode_value(column: &str, value: &FieldValue, categories: Option<&Vec<String>>) -> Result<f32> {
    match (value, categories) {
        (FieldValue::Missing, _) => Ok(f32::NAN),
        (value, _) if value.is_blank() => {
            anyhow::bail!("no value given for column '{}'", column)
        }
        (FieldValue::Number(v), _) => Ok(*v as f32),
        (FieldValue::Text(text), Some(choices)) => choices
            .iter()
            .position(|c| c == text)
            .map(|idx| idx as f32)
            .ok_or_else(|| {
                anyhow::anyhow!("unknown category '{}' for column '{}'", text, column)
            }),
        (FieldValue::Text(text), None) => {
            anyhow::bail!("could not convert '{}' to a number for column '{}'", text, column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> Vec<String> {
        ["age", "job", "duration"].iter().map(|s| s.to_string()).collect()
    }

    fn categories() -> HashMap<String, Vec<String>> {
        let mut categories = HashMap::new();
        categories.insert(
            "job".to_string(),
            vec!["admin.".to_string(), "blue-collar".to_string(), "unknown".to_string()],
        );
        categories
    }

    #[test]
    fn test_assemble_exact_columns() {
        let assembler = RequestAssembler::default();
        let record = assembler.collect([("duration", "250"), ("job", "blue-collar"), ("age", "41")]);

        let assembled = assembler.assemble(&record, &expected(), &categories()).unwrap();
        assert_eq!(assembled.features, vec![41.0, 1.0, 250.0]);
        assert!(assembled.zero_filled.is_empty());
        assert!(assembled.dropped.is_empty());
    }

    #[test]
    fn test_zero_fill_absent_columns() {
        let assembler = RequestAssembler::default();
        let record = assembler.collect([("age", "41"), ("balance", "1200")]);

        let assembled = assembler.assemble(&record, &expected(), &categories()).unwrap();
        assert_eq!(assembled.features, vec![41.0, 0.0, 0.0]);
        assert_eq!(assembled.zero_filled, vec!["job", "duration"]);
        assert_eq!(assembled.dropped, vec!["balance"]);
    }

    #[test]
    fn test_strict_rejects_absent_columns() {
        let assembler = RequestAssembler::new(AssemblerOptions {
            reconcile: ReconcileMode::Strict,
            unknown_as_missing: false,
        });
        let record = assembler.collect([("age", "41")]);

        let err = assembler.reconcile(&record, &expected()).unwrap_err();
        assert_eq!(err.to_string(), "missing columns: job, duration");
    }

    #[test]
    fn test_unknown_category_kept_or_missing() {
        let keep = RequestAssembler::default();
        let record = keep.collect([("age", "30"), ("job", "unknown"), ("duration", "10")]);
        let features = keep.assemble(&record, &expected(), &categories()).unwrap().features;
        assert_eq!(features[1], 2.0);

        let substitute = RequestAssembler::new(AssemblerOptions {
            reconcile: ReconcileMode::ZeroFill,
            unknown_as_missing: true,
        });
        let record = substitute.collect([("age", "30"), ("job", "unknown"), ("duration", "10")]);
        let features = substitute
            .assemble(&record, &expected(), &categories())
            .unwrap()
            .features;
        assert!(features[1].is_nan());
    }

    #[test]
    fn test_bad_values_are_errors() {
        let assembler = RequestAssembler::default();

        let record = assembler.collect([("age", "forty"), ("job", "admin."), ("duration", "1")]);
        let err = assembler.assemble(&record, &expected(), &categories()).unwrap_err();
        assert!(err.to_string().contains("could not convert 'forty'"));

        let record = assembler.collect([("age", "40"), ("job", "astronaut"), ("duration", "1")]);
        let err = assembler.assemble(&record, &expected(), &categories()).unwrap_err();
        assert!(err.to_string().contains("unknown category 'astronaut'"));
    }

    #[test]
    fn test_blank_input_is_error() {
        let assembler = RequestAssembler::default();

        let record = assembler.collect([("age", ""), ("job", "admin."), ("duration", "5")]);
        let err = assembler.assemble(&record, &expected(), &categories()).unwrap_err();
        assert_eq!(err.to_string(), "no value given for column 'age'");

        let record = assembler.collect([("age", "30"), ("job", " "), ("duration", "5")]);
        let err = assembler.assemble(&record, &expected(), &categories()).unwrap_err();
        assert_eq!(err.to_string(), "no value given for column 'job'");
    }

    #[test]
    fn test_null_is_missing() {
        let assembler = RequestAssembler::default();
        let record: ClientRecord =
            serde_json::from_str(r#"{"age": null, "job": "admin.", "duration": 5}"#).unwrap();
        let record = assembler.prepare(record);

        let features = assembler.assemble(&record, &expected(), &categories()).unwrap().features;
        assert!(features[0].is_nan());
        assert_eq!(features[1], 0.0);
    }
}
