//! Held-out evaluation report

use anyhow::{Context, Result};
use colored::Colorize;
use pdm_lib::evaluate::EvaluationReport;
use pdm_lib::{Label, Session};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::output::{print_heading, print_json, print_warning, render_roc, OutputFormat};

/// Evaluate the session's pipeline on the test rows
pub fn show_evaluation(session: &mut Session, format: OutputFormat) -> Result<()> {
    let report = session
        .evaluate()
        .context("Failed to evaluate pipeline")?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

/// Classification report, confusion matrix and ROC curve as text
pub fn print_report(report: &EvaluationReport) {
    print_heading("📊 Model evaluation");
    println!("Test rows:              {}", report.n_test);
    println!();

    println!("{}", "Classification report".bold());
    println!("{}", report.report);

    println!("{}", "Confusion matrix (rows: actual, columns: predicted)".bold());
    let mut matrix = Builder::default();
    matrix.push_record(
        std::iter::once(String::new()).chain(Label::ALL.iter().map(|l| format!("Predicted {}", l))),
    );
    for actual in Label::ALL {
        matrix.push_record(
            std::iter::once(format!("Actual {}", actual))
                .chain(Label::ALL.iter().map(|&p| report.confusion.get(actual, p).to_string())),
        );
    }
    println!("{}", matrix.build().with(Style::rounded()));
    println!();

    println!("{}", "ROC curve".bold());
    println!("{}", render_roc(&report.roc, 50, 16));
    match report.auc() {
        Some(auc) => println!("{} {}", "ROC AUC:".bold(), format!("{:.4}", auc).green().bold()),
        None => print_warning("ROC AUC is undefined: the test set holds a single class"),
    }
}
