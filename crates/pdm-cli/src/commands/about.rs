//! Model description

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::config::AppConfig;
use crate::output::{print_heading, print_json, OutputFormat};

const SUMMARY: &str = "In industrial environments, predictive maintenance aims to forecast \
equipment failures before they occur, enabling proactive servicing and minimizing costly \
unplanned downtime. This model employs a random forest classifier, a tree-based ensemble \
that builds many decision trees on random samples of the data and random subsets of the \
features, then aggregates their outputs by majority vote.";

const SIGNALS: &[&str] = &["Temperature", "Rotational speed", "Torque", "Tool wear"];

#[derive(Serialize)]
struct About<'a> {
    summary: &'a str,
    signals: &'a [&'a str],
    dataset_path: String,
    n_trees: usize,
    test_fraction: f64,
    seed: u64,
    feature_policy: String,
}

/// Describe the classifier and how it is configured
pub fn show_about(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let about = About {
        summary: SUMMARY,
        signals: SIGNALS,
        dataset_path: config.dataset_path.display().to_string(),
        n_trees: config.n_trees,
        test_fraction: config.test_fraction,
        seed: config.seed,
        feature_policy: config.feature_policy().to_string(),
    };

    match format {
        OutputFormat::Json => print_json(&about)?,
        OutputFormat::Table => {
            print_heading("🔧 Predictive Maintenance Classifier");
            println!("{}", about.summary);
            println!();

            println!("{}", "How it works".bold());
            println!("{}", "-".repeat(50));
            println!("By analyzing sensor readings such as:");
            for signal in about.signals {
                println!("  • {}", signal.cyan());
            }
            println!("the model learns subtle patterns that signal impending faults.");
            println!();

            println!("{}", "Configuration".bold());
            println!("{}", "-".repeat(50));
            println!("Dataset:                {}", about.dataset_path);
            println!("Trees:                  {}", about.n_trees);
            println!("Held-out fraction:      {}", about.test_fraction);
            println!("Seed:                   {}", about.seed);
            println!("Feature policy:         {}", about.feature_policy);
            println!();
            println!(
                "Run {} or {} next.",
                "pdm dataset".cyan(),
                "pdm predict".cyan()
            );
        }
    }

    Ok(())
}
