//! Predictive Maintenance CLI
//!
//! A command-line tool for exploring machine telemetry, ranking features,
//! predicting equipment failure and evaluating the classifier.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{about, dataset, evaluate, predict, rank};
use pdm_lib::{PipelineMetrics, Session};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Predictive Maintenance Classifier CLI
#[derive(Parser)]
#[command(name = "pdm")]
#[command(
    author,
    version,
    about = "CLI for the Predictive Maintenance Classifier",
    long_about = None
)]
pub struct Cli {
    /// CSV dataset path (can also be set via PDM_DATASET_PATH env var)
    #[arg(long, short, global = true)]
    pub dataset: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/pdm/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    pub dump_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Describe the model
    About,

    /// Explore the dataset: head rows, shape, nulls, types and class balance
    Dataset {
        /// Number of head rows to show
        #[arg(long, short = 'n', default_value_t = 5)]
        rows: usize,
    },

    /// Rank features by forest importance
    Rank {
        /// Number of features to show (defaults to the configured top_k)
        #[arg(long, short = 'k')]
        top: Option<usize>,
    },

    /// Predict failure for one machine
    Predict {
        /// Feature value; repeat for each feature (unset features take the training median)
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = predict::parse_assignment)]
        set: Vec<(String, String)>,

        /// Prompt for every feature not given with --set
        #[arg(long, short)]
        interactive: bool,

        /// Do not print the held-out evaluation after the prediction
        #[arg(long)]
        skip_evaluation: bool,
    },

    /// Evaluate the pipeline on the held-out rows
    Evaluate,
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = config::AppConfig::load(cli.config.as_deref())?.with_dataset(cli.dataset.clone());
    info!(
        dataset = %config.dataset_path.display(),
        policy = %config.feature_policy(),
        "Configured"
    );

    let open_session = || {
        Session::open(&config.dataset_path, config.session_config())
            .with_context(|| format!("Failed to load dataset {}", config.dataset_path.display()))
    };

    match cli.command {
        Commands::About => about::show_about(&config, cli.format)?,
        Commands::Dataset { rows } => dataset::show_dataset(&open_session()?, rows, cli.format)?,
        Commands::Rank { top } => {
            rank::show_ranking(&open_session()?, top.unwrap_or(config.top_k), cli.format)?
        }
        Commands::Predict {
            set,
            interactive,
            skip_evaluation,
        } => predict::predict(&mut open_session()?, set, interactive, skip_evaluation, cli.format)?,
        Commands::Evaluate => evaluate::show_evaluation(&mut open_session()?, cli.format)?,
    }

    if cli.dump_metrics {
        eprintln!("{}", PipelineMetrics::new().gather_text()?);
    }

    Ok(())
}
