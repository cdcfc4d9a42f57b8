//! Single-row prediction request

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel category that may be treated as a missing value
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Value of a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    /// Serialized as `null`
    Missing,
}

impl FieldValue {
    /// Best-effort numeric coercion of raw form input.
    ///
    /// Text that parses as a number becomes `Number`, anything else stays
    /// `Text`. Blank input stays an empty `Text`, which no model accepts.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => FieldValue::Number(v),
            _ => FieldValue::Text(trimmed.to_string()),
        }
    }

    /// Re-coerce text values, leaving numbers and missing values as-is.
    pub fn coerced(self) -> Self {
        match self {
            FieldValue::Text(text) => FieldValue::coerce(&text),
            other => other,
        }
    }

    /// Returns true for a submitted value with no content.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(t) if t.is_empty())
    }

    /// Returns true for the `unknown` sentinel category (case-insensitive).
    pub fn is_unknown_sentinel(&self) -> bool {
        matches!(self, FieldValue::Text(t) if t.eq_ignore_ascii_case(UNKNOWN_CATEGORY))
    }
}

/// Client attributes keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl ClientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from raw form input, coercing each value.
    pub fn from_raw<I, K, V>(inputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let fields = inputs
            .into_iter()
            .map(|(k, v)| (k.into(), FieldValue::coerce(v.as_ref())))
            .collect();
        Self { fields }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Apply numeric coercion to every text value.
    pub fn coerce_numeric(self) -> Self {
        let fields = self
            .fields
            .into_iter()
            .map(|(k, v)| (k, v.coerced()))
            .collect();
        Self { fields }
    }

    /// Replace the `unknown` sentinel category with a missing value.
    pub fn unknown_as_missing(mut self) -> Self {
        for value in self.fields.values_mut() {
            if value.is_unknown_sentinel() {
                *value = FieldValue::Missing;
            }
        }
        self
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for ClientRecord {
    fn from_iter<T: IntoIterator<Item = (K, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce() {
        assert_eq!(FieldValue::coerce("41"), FieldValue::Number(41.0));
        assert_eq!(FieldValue::coerce(" -36.4 "), FieldValue::Number(-36.4));
        assert_eq!(
            FieldValue::coerce("blue-collar"),
            FieldValue::Text("blue-collar".into())
        );
        assert_eq!(FieldValue::coerce("   "), FieldValue::Text(String::new()));
        assert!(FieldValue::coerce("   ").is_blank());
        assert_eq!(FieldValue::coerce("NaN"), FieldValue::Text("NaN".into()));
    }

    #[test]
    fn test_unknown_as_missing() {
        let record = ClientRecord::from_raw([("job", "Unknown"), ("age", "30")]);
        let record = record.unknown_as_missing();

        assert_eq!(record.get("job"), Some(&FieldValue::Missing));
        assert_eq!(record.get("age"), Some(&FieldValue::Number(30.0)));
    }

    #[test]
    fn test_json_record_coercion() {
        let json = r#"{"age": 41, "duration": "250", "job": "admin.", "pdays": null}"#;
        let record: ClientRecord = serde_json::from_str(json).unwrap();
        let record = record.coerce_numeric();

        assert_eq!(record.get("age"), Some(&FieldValue::Number(41.0)));
        assert_eq!(record.get("duration"), Some(&FieldValue::Number(250.0)));
        assert_eq!(record.get("job"), Some(&FieldValue::Text("admin.".into())));
        assert_eq!(record.get("pdays"), Some(&FieldValue::Missing));
    }
}
