//! Configuration management for the CLI

use anyhow::{Context, Result};
use pdm_lib::dataset::{
    DatasetConfig, DEFAULT_EXCLUDED_COLUMNS, DEFAULT_SEED, DEFAULT_TEST_FRACTION,
};
use pdm_lib::forest::{ClassWeight, ForestParams, DEFAULT_TREES};
use pdm_lib::ranker::DEFAULT_TOP_K;
use pdm_lib::{FeaturePolicy, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which columns the final pipeline trains on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
    #[default]
    All,
    TopK,
}

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// CSV file with the machine telemetry
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    #[serde(default = "default_label_column")]
    pub label_column: String,

    #[serde(default = "default_failure_type_column")]
    pub failure_type_column: Option<String>,

    #[serde(default = "default_excluded_columns")]
    pub excluded_columns: Vec<String>,

    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Depth limit for each tree; unlimited when unset
    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default = "default_class_weight")]
    pub class_weight: ClassWeight,

    /// Features kept when `feature_policy` is `top_k`, and rows shown by `rank`
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub feature_policy: PolicyName,
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("predictive_maintenance.csv")
}

fn default_label_column() -> String {
    "Target".to_string()
}

fn default_failure_type_column() -> Option<String> {
    Some("Failure Type".to_string())
}

fn default_excluded_columns() -> Vec<String> {
    DEFAULT_EXCLUDED_COLUMNS.iter().map(|s| s.to_string()).collect()
}

fn default_test_fraction() -> f64 {
    DEFAULT_TEST_FRACTION
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_n_trees() -> usize {
    DEFAULT_TREES
}

fn default_class_weight() -> ClassWeight {
    ClassWeight::Balanced
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            label_column: default_label_column(),
            failure_type_column: default_failure_type_column(),
            excluded_columns: default_excluded_columns(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            n_trees: default_n_trees(),
            max_depth: None,
            class_weight: default_class_weight(),
            top_k: default_top_k(),
            feature_policy: PolicyName::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and `PDM_*` environment variables.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(Self::config_path()?).required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("PDM")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("excluded_columns"),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("pdm").join("config.toml"))
    }

    /// Apply a dataset path given on the command line
    pub fn with_dataset(mut self, dataset: Option<PathBuf>) -> Self {
        if let Some(path) = dataset {
            self.dataset_path = path;
        }
        self
    }

    pub fn feature_policy(&self) -> FeaturePolicy {
        match self.feature_policy {
            PolicyName::All => FeaturePolicy::All,
            PolicyName::TopK => FeaturePolicy::TopK(self.top_k),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            dataset: DatasetConfig {
                label_column: self.label_column.clone(),
                failure_type_column: self.failure_type_column.clone(),
                excluded_columns: self.excluded_columns.clone(),
            },
            test_fraction: self.test_fraction,
            seed: self.seed,
            forest: ForestParams::default()
                .with_n_trees(self.n_trees)
                .with_seed(self.seed)
                .with_max_depth(self.max_depth)
                .with_class_weight(self.class_weight),
            feature_policy: self.feature_policy(),
        }
    }
}
