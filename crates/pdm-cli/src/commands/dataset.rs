//! Dataset exploration: head rows, shape, nulls, types and distributions

use anyhow::Result;
use colored::Colorize;
use pdm_lib::Session;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::Tabled;

use crate::output::{format_value, print_heading, print_json, print_table, OutputFormat};

/// Row for the per-column summary table
#[derive(Tabled)]
struct ColumnRow {
    #[tabled(rename = "Column")]
    name: String,
    #[tabled(rename = "Type")]
    column_type: String,
    #[tabled(rename = "Nulls")]
    nulls: usize,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Median")]
    median: String,
    #[tabled(rename = "Max")]
    max: String,
}

/// Row for label and failure-type distributions
#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Share")]
    share: String,
}

#[derive(Serialize)]
struct DatasetView<'a> {
    head: Vec<Vec<Option<f64>>>,
    feature_names: &'a [String],
    summary: pdm_lib::dataset::DatasetSummary,
}

/// Show the first `rows` rows and summary statistics
pub fn show_dataset(session: &Session, rows: usize, format: OutputFormat) -> Result<()> {
    let dataset = session.dataset();
    let summary = dataset.summary();

    if format == OutputFormat::Json {
        return print_json(&DatasetView {
            head: dataset.head(rows),
            feature_names: dataset.feature_names(),
            summary,
        });
    }

    print_heading("⚙️ Machine maintenance dataset");
    println!(
        "Shape:                  {} rows × {} features",
        summary.n_rows.to_string().cyan(),
        summary.n_features.to_string().cyan()
    );
    println!("Fingerprint:            {}", dataset.fingerprint()[..16].dimmed());
    println!();

    let mut head = Builder::default();
    head.push_record(dataset.feature_names().iter().cloned());
    for row in dataset.head(rows) {
        head.push_record(row.into_iter().map(format_value));
    }
    println!("{}", "Head".bold());
    println!("{}", head.build().with(Style::rounded()));
    println!();

    println!("{}", "Null counts and types".bold());
    let columns: Vec<ColumnRow> = summary
        .columns
        .iter()
        .map(|c| ColumnRow {
            name: c.name.clone(),
            column_type: c.column_type.to_string(),
            nulls: c.null_count,
            min: format_value(c.min),
            median: format_value(c.median),
            max: format_value(c.max),
        })
        .collect();
    print_table(&columns);
    println!();

    let share = |count: usize| format!("{:.2}%", count as f64 / summary.n_rows as f64 * 100.0);

    println!("{}", "Label distribution".bold());
    let labels: Vec<CountRow> = summary
        .label_counts
        .iter()
        .map(|(label, count)| CountRow {
            class: label.to_string(),
            rows: *count,
            share: share(*count),
        })
        .collect();
    print_table(&labels);

    if !summary.failure_types.is_empty() {
        println!();
        println!("{}", "Failure types".bold());
        let types: Vec<CountRow> = summary
            .failure_types
            .iter()
            .map(|(name, count)| CountRow {
                class: name.clone(),
                rows: *count,
                share: share(*count),
            })
            .collect();
        print_table(&types);
    }

    Ok(())
}
