//! Single-record failure prediction

use anyhow::{Context, Result};
use colored::Colorize;
use pdm_lib::evaluate::EvaluationReport;
use pdm_lib::{FormPrediction, Session};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::Tabled;

use super::evaluate::print_report;
use crate::output::{
    color_label, color_probability, format_value, print_heading, print_json, print_table,
    print_warning, OutputFormat,
};

#[derive(Tabled)]
struct InputRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

#[derive(Serialize)]
struct PredictOutput {
    #[serde(flatten)]
    result: FormPrediction,
    probability_percent: f64,
    trained_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation: Option<EvaluationReport>,
}

/// Parse a `NAME=VALUE` argument
pub fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
}

/// Predict failure for one machine described by `assignments`
pub fn predict(
    session: &mut Session,
    mut assignments: Vec<(String, String)>,
    interactive: bool,
    skip_evaluation: bool,
    format: OutputFormat,
) -> Result<()> {
    if interactive {
        assignments = prompt_fields(session, assignments)?;
    }

    let fields = assignments.iter().map(|(n, v)| (n.as_str(), v.as_str()));
    let result = session
        .predict_form(fields)
        .context("Failed to predict failure")?;
    let pipeline = session.pipeline()?;
    let trained_at = pipeline.trained_at();

    let evaluation = if skip_evaluation {
        None
    } else {
        Some(session.evaluate().context("Failed to evaluate pipeline")?)
    };

    match format {
        OutputFormat::Json => print_json(&PredictOutput {
            probability_percent: result.prediction.probability_percent(),
            result,
            trained_at: format_timestamp(trained_at),
            evaluation,
        })?,
        OutputFormat::Table => {
            for substitution in &result.substitutions {
                print_warning(&format!(
                    "Invalid value for {}: '{}'. Using median {}.",
                    substitution.feature.bold(),
                    substitution.raw,
                    format_value(Some(substitution.value))
                ));
            }

            print_heading("User input features");
            print_table(&input_rows(pipeline.feature_names(), &assignments, &result));
            println!();

            println!("{} {}", "Prediction:".bold(), color_label(result.prediction.label));
            println!(
                "{} {}",
                "Failure Probability:".bold(),
                color_probability(&result.prediction)
            );
            println!("{}", format!("Pipeline trained {}", format_timestamp(trained_at)).dimmed());

            if let Some(report) = &evaluation {
                println!();
                print_report(report);
            }
        }
    }

    Ok(())
}

/// One row per trained feature, in training column order
fn input_rows(
    feature_names: &[String],
    assignments: &[(String, String)],
    result: &FormPrediction,
) -> Vec<InputRow> {
    feature_names
        .iter()
        .map(|name| InputRow {
            feature: name.clone(),
            value: format_value(result.record.get(name).flatten()),
            source: source_of(name, assignments, result),
        })
        .collect()
}

fn source_of(name: &str, assignments: &[(String, String)], result: &FormPrediction) -> String {
    if result.substitutions.iter().any(|s| s.feature == name) {
        "median (invalid input)".yellow().to_string()
    } else if assignments.iter().any(|(n, _)| n == name) {
        "input".to_string()
    } else {
        "median (default)".dimmed().to_string()
    }
}

/// Ask for each feature on stdin, offering the training median as default
fn prompt_fields(
    session: &mut Session,
    preset: Vec<(String, String)>,
) -> Result<Vec<(String, String)>> {
    let pipeline = session.pipeline()?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut fields = preset;

    println!("{}", "Enter details of the machine (blank keeps the default):".bold());
    for (name, &median) in pipeline.feature_names().iter().zip(pipeline.medians()) {
        if fields.iter().any(|(n, _)| n == name) {
            continue;
        }
        print!("  {} [{}]: ", name, format_value(Some(median)));
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;
        if !line.trim().is_empty() {
            fields.push((name.clone(), line));
        }
    }
    Ok(fields)
}

fn format_timestamp(unix: i64) -> String {
    chrono::DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| unix.to_string())
}
