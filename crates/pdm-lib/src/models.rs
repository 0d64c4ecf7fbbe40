//! Core data models for the maintenance classifier

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Binary failure indicator for one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    NoFailure,
    Failure,
}

impl Label {
    /// Both classes in index order
    pub const ALL: [Label; 2] = [Label::NoFailure, Label::Failure];

    pub fn from_flag(failed: bool) -> Self {
        if failed {
            Label::Failure
        } else {
            Label::NoFailure
        }
    }

    /// Class index used by the forest and the confusion matrix
    pub fn index(self) -> usize {
        match self {
            Label::NoFailure => 0,
            Label::Failure => 1,
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Label::Failure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::NoFailure => "No Failure",
            Label::Failure => "Failure",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature values for a single equipment observation, keyed by column name.
///
/// A key mapped to `None` is present but missing and will be imputed; a key
/// that is absent entirely is a schema violation at prediction time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    values: BTreeMap<String, Option<f64>>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let value = if value.is_nan() { None } else { Some(value) };
        self.values.insert(name.into(), value);
    }

    pub fn insert_missing(&mut self, name: impl Into<String>) {
        self.values.insert(name.into(), None);
    }

    /// `None` if the feature is absent, `Some(None)` if present but missing
    pub fn get(&self, name: &str) -> Option<Option<f64>> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut record = FeatureRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Model output for one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    /// Fraction of trees voting failure, in `[0, 1]`
    pub probability: f64,
}

impl Prediction {
    /// Decision threshold on the failure vote fraction
    pub const THRESHOLD: f64 = 0.5;

    pub fn from_probability(probability: f64) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        Self {
            label: Label::from_flag(probability >= Self::THRESHOLD),
            probability,
        }
    }

    pub fn probability_percent(&self) -> f64 {
        self.probability * 100.0
    }
}

/// Semantic type of a numeric feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => f.write_str("integer"),
            ColumnType::Float => f.write_str("float"),
        }
    }
}

/// Feature columns of a dataset with their types, in file order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    names: Vec<String>,
    types: Vec<ColumnType>,
}

impl Schema {
    pub fn new(names: Vec<String>, types: Vec<ColumnType>) -> Self {
        debug_assert_eq!(names.len(), types.len());
        Self { names, types }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn types(&self) -> &[ColumnType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.position(name).map(|i| self.types[i])
    }
}

/// Which features the final inference pipeline is trained on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturePolicy {
    /// Every feature column of the dataset
    #[default]
    All,
    /// The `k` highest-ranked features by forest importance
    TopK(usize),
}

impl fmt::Display for FeaturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeaturePolicy::All => f.write_str("all"),
            FeaturePolicy::TopK(k) => write!(f, "top_{}", k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_index_round_trip() {
        for label in Label::ALL {
            assert_eq!(Label::ALL[label.index()], label);
        }
    }

    #[test]
    fn test_prediction_threshold() {
        assert_eq!(Prediction::from_probability(0.5).label, Label::Failure);
        assert_eq!(Prediction::from_probability(0.49).label, Label::NoFailure);
        assert_eq!(Prediction::from_probability(1.7).probability, 1.0);
    }

    #[test]
    fn test_record_nan_is_missing() {
        let record = FeatureRecord::new()
            .with("Torque [Nm]", f64::NAN)
            .with("Tool wear [min]", 3.0);
        assert_eq!(record.get("Torque [Nm]"), Some(None));
        assert_eq!(record.get("Tool wear [min]"), Some(Some(3.0)));
        assert_eq!(record.get("UDI"), None);
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new(
            vec!["UDI".to_string(), "Torque [Nm]".to_string()],
            vec![ColumnType::Integer, ColumnType::Float],
        );
        assert_eq!(schema.position("Torque [Nm]"), Some(1));
        assert_eq!(schema.column_type("UDI"), Some(ColumnType::Integer));
        assert!(schema.position("Target").is_none());
    }
}
