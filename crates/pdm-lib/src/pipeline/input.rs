//! User-supplied feature values
//!
//! Raw text fields are parsed per feature. A field that fails numeric
//! parsing is replaced by the training median and reported back as a
//! [`Substitution`]; a field that was never supplied takes the median
//! silently, the same value a blank form starts from.

use super::TrainedPipeline;
use crate::models::FeatureRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A field whose value was replaced by the training median
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub feature: String,
    pub raw: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInput {
    pub record: FeatureRecord,
    pub substitutions: Vec<Substitution>,
}

/// Parse `(feature, raw value)` pairs against the pipeline's schema
pub fn parse_form<'a, I>(fields: I, pipeline: &TrainedPipeline) -> ParsedInput
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let supplied: HashMap<&str, &str> = fields.into_iter().collect();
    let mut record = FeatureRecord::new();
    let mut substitutions = Vec::new();

    for (name, &median) in pipeline.feature_names().iter().zip(pipeline.medians()) {
        match supplied.get(name.as_str()) {
            None => record.insert(name.as_str(), median),
            Some(raw) => match parse_number(raw) {
                Some(value) => record.insert(name.as_str(), value),
                None => {
                    warn!(
                        event = "input_substituted",
                        feature = %name,
                        raw = %raw,
                        median,
                        "Invalid value, using training median"
                    );
                    record.insert(name.as_str(), median);
                    substitutions.push(Substitution {
                        feature: name.clone(),
                        raw: raw.to_string(),
                        value: median,
                    });
                }
            },
        }
    }

    for name in supplied.keys() {
        if !pipeline.feature_names().iter().any(|n| n == name) {
            debug!(field = %name, "Ignoring field outside the trained schema");
        }
    }

    ParsedInput {
        record,
        substitutions,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
