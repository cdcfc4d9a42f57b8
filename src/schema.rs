//! Feature schema for the bank marketing term deposit model.
//!
//! Lists every client attribute the form knows how to collect, with its
//! display label and the widget constraints used in typed form mode.

use crate::types::record::{ClientRecord, FieldValue};
use anyhow::Result;
use serde::Serialize;

/// Kind of value a feature holds
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeatureKind {
    /// Numeric range, optionally restricted to whole numbers
    Numeric { min: f64, max: f64, integer: bool },
    /// Enumerated choice
    Categorical { choices: Vec<&'static str> },
}

/// A single client attribute
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSpec {
    /// Column name used by the trained model
    pub name: &'static str,
    /// Human-readable form label
    pub label: &'static str,
    /// Value constraints
    #[serde(flatten)]
    pub kind: FeatureKind,
}

impl FeatureSpec {
    fn integer(name: &'static str, label: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            label,
            kind: FeatureKind::Numeric { min, max, integer: true },
        }
    }

    fn real(name: &'static str, label: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            label,
            kind: FeatureKind::Numeric { min, max, integer: false },
        }
    }

    fn choice(name: &'static str, label: &'static str, choices: &[&'static str]) -> Self {
        Self {
            name,
            label,
            kind: FeatureKind::Categorical { choices: choices.to_vec() },
        }
    }

    /// Returns true if the feature is categorical.
    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, FeatureKind::Categorical { .. })
    }

    /// Check a single value against the widget constraints.
    ///
    /// Missing values are accepted; whether the model can handle them is
    /// decided at encoding time.
    pub fn validate(&self, value: &FieldValue) -> std::result::Result<(), String> {
        match (&self.kind, value) {
            (_, FieldValue::Missing) => Ok(()),
            (_, value) if value.is_blank() => Err(format!("{} is required", self.label)),
            (FeatureKind::Numeric { min, max, integer }, FieldValue::Number(v)) => {
                if !v.is_finite() || v < min || v > max {
                    Err(format!("{} must be between {} and {}", self.label, min, max))
                } else if *integer && v.fract() != 0.0 {
                    Err(format!("{} must be a whole number", self.label))
                } else {
                    Ok(())
                }
            }
            (FeatureKind::Numeric { .. }, FieldValue::Text(text)) => {
                Err(format!("{} must be a number, got '{}'", self.label, text))
            }
            (FeatureKind::Categorical { choices }, FieldValue::Text(text)) => {
                if choices.contains(&text.as_str()) {
                    Ok(())
                } else {
                    Err(format!(
                        "{} must be one of: {}",
                        self.label,
                        choices.join(", ")
                    ))
                }
            }
            (FeatureKind::Categorical { .. }, FieldValue::Number(v)) => {
                Err(format!("{} expects a category, got {}", self.label, v))
            }
        }
    }
}

const JOBS: &[&str] = &[
    "admin.",
    "blue-collar",
    "entrepreneur",
    "housemaid",
    "management",
    "retired",
    "self-employed",
    "services",
    "student",
    "technician",
    "unemployed",
    "unknown",
];

const EDUCATION: &[&str] = &[
    "basic.4y",
    "basic.6y",
    "basic.9y",
    "high.school",
    "illiterate",
    "professional.course",
    "university.degree",
    "unknown",
];

const MONTHS: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const YES_NO_UNKNOWN: &[&str] = &["no", "yes", "unknown"];

/// Ordered set of client attributes
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSchema {
    features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    /// The twenty attributes of the bank marketing campaign dataset.
    pub fn bank_marketing() -> Self {
        Self {
            features: vec![
                FeatureSpec::integer("age", "Age", 17.0, 100.0),
                FeatureSpec::choice("job", "Job Title", JOBS),
                FeatureSpec::choice(
                    "marital",
                    "Marital Status",
                    &["divorced", "married", "single", "unknown"],
                ),
                FeatureSpec::choice("education", "Education Level", EDUCATION),
                FeatureSpec::choice("default", "Has Credit in Default?", YES_NO_UNKNOWN),
                FeatureSpec::choice("housing", "Has Housing Loan?", YES_NO_UNKNOWN),
                FeatureSpec::choice("loan", "Has Personal Loan?", YES_NO_UNKNOWN),
                FeatureSpec::choice("contact", "Contact Type", &["cellular", "telephone"]),
                FeatureSpec::choice("month", "Last Contact Month", MONTHS),
                FeatureSpec::choice(
                    "day_of_week",
                    "Last Contact Day",
                    &["mon", "tue", "wed", "thu", "fri"],
                ),
                FeatureSpec::integer("duration", "Last Call Duration (sec)", 0.0, 5000.0),
                FeatureSpec::integer("campaign", "Current Campaign Contacts", 1.0, 100.0),
                FeatureSpec::integer("pdays", "Days Since Last Contact", 0.0, 999.0),
                FeatureSpec::integer("previous", "Previous Campaign Contacts", 0.0, 50.0),
                FeatureSpec::choice(
                    "poutcome",
                    "Previous Campaign Outcome",
                    &["failure", "nonexistent", "success"],
                ),
                FeatureSpec::real("emp.var.rate", "Employment Variation Rate", -5.0, 5.0),
                FeatureSpec::real("cons.price.idx", "Consumer Price Index", 90.0, 96.0),
                FeatureSpec::real("cons.conf.idx", "Consumer Confidence Index", -60.0, -20.0),
                FeatureSpec::real("euribor3m", "Euribor 3-Month Rate", 0.0, 6.0),
                FeatureSpec::real("nr.employed", "Number of Employees", 4900.0, 5300.0),
            ],
        }
    }

    /// All features in schema order.
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Column names in schema order.
    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.to_string()).collect()
    }

    /// Look up a feature by column name.
    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Display label for a column, falling back to the raw name.
    pub fn label_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(name).map(|f| f.label).unwrap_or(name)
    }

    /// Validate the given columns of a record against the widget constraints.
    ///
    /// Columns unknown to the schema are not checked.
    pub fn validate(&self, record: &ClientRecord, columns: &[String]) -> Result<()> {
        let problems: Vec<String> = columns
            .iter()
            .filter_map(|name| {
                let spec = self.get(name)?;
                let value = record.get(name)?;
                spec.validate(value).err()
            })
            .collect();

        if !problems.is_empty() {
            anyhow::bail!("invalid input: {}", problems.join("; "));
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::bank_marketing()
    }
}
