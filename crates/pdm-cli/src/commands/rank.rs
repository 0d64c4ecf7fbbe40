//! Feature importance ranking

use anyhow::{Context, Result};
use colored::Colorize;
use pdm_lib::Session;
use tabled::Tabled;

use crate::output::{print_heading, print_info, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Importance")]
    score: String,
    #[tabled(rename = "")]
    bar: String,
}

/// Rank features on the training rows and show the top `top`
pub fn show_ranking(session: &Session, top: usize, format: OutputFormat) -> Result<()> {
    let ranking = session
        .rank_features()
        .context("Failed to rank features")?;
    let shown = &ranking.entries()[..top.min(ranking.len())];

    match format {
        OutputFormat::Json => print_json(shown)?,
        OutputFormat::Table => {
            print_heading("Feature importance");
            let rows: Vec<ImportanceRow> = shown
                .iter()
                .enumerate()
                .map(|(i, entry)| ImportanceRow {
                    rank: i + 1,
                    name: entry.name.clone(),
                    score: format!("{:.4}", entry.score),
                    bar: "█".repeat((entry.score * 40.0).round() as usize).cyan().to_string(),
                })
                .collect();
            print_table(&rows);
            print_info(&format!(
                "Scores are mean impurity decrease over {} trees, normalized to sum to 1",
                session.config().forest.n_trees
            ));
        }
    }

    Ok(())
}
