//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use pdm_lib::evaluate::RocCurve;
use pdm_lib::{Label, Prediction};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section heading with an underline
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a probability as a percentage with two decimals
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Format an optional statistic, `-` when absent
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{:.3}", v),
        None => "-".to_string(),
    }
}

/// Color a predicted label
pub fn color_label(label: Label) -> String {
    match label {
        Label::Failure => format!("🛑 {}", label).red().bold().to_string(),
        Label::NoFailure => format!("✅ {}", label).green().bold().to_string(),
    }
}

/// Color a failure probability by how close it is to the decision threshold
pub fn color_probability(prediction: &Prediction) -> String {
    let formatted = format_percent(prediction.probability);
    if prediction.probability >= Prediction::THRESHOLD {
        formatted.red().to_string()
    } else if prediction.probability >= 0.25 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Render an ROC curve as a character plot, FPR on x and TPR on y
pub fn render_roc(roc: &RocCurve, width: usize, height: usize) -> String {
    let width = width.max(4);
    let height = height.max(2);
    let mut grid = vec![vec![' '; width]; height];

    // Chance diagonal
    for col in 0..width {
        let row = cell(col as f64 / (width - 1) as f64, height);
        grid[height - 1 - row][col] = '·';
    }

    // Walk each segment densely so steep steps stay connected
    for pair in roc.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let steps = width.max(height) * 2;
        for s in 0..=steps {
            let t = s as f64 / steps as f64;
            let fpr = a.fpr + (b.fpr - a.fpr) * t;
            let tpr = a.tpr + (b.tpr - a.tpr) * t;
            grid[height - 1 - cell(tpr, height)][cell(fpr, width)] = '█';
        }
    }

    let mut out = String::new();
    for (i, row) in grid.iter().enumerate() {
        let axis = match i {
            0 => "1.0 ┤",
            _ if i == height - 1 => "0.0 ┤",
            _ => "    │",
        };
        out.push_str(axis);
        out.extend(row.iter());
        out.push('\n');
    }
    out.push_str("    └");
    out.push_str(&"─".repeat(width));
    out.push('\n');
    out.push_str(&format!("     0.0{:>w$}\n", "1.0", w = width - 3));
    out.push_str("     False positive rate → (true positive rate ↑)");
    out
}

fn cell(value: f64, cells: usize) -> usize {
    ((value.clamp(0.0, 1.0) * (cells - 1) as f64).round() as usize).min(cells - 1)
}
