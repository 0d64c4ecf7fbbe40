//! Application session
//!
//! A [`Session`] owns the loaded dataset, its train/test split and the
//! trained pipelines fitted from it. Command handlers receive the session
//! explicitly; nothing here is process-global except the metrics registry.

use crate::dataset::{self, Dataset, DatasetConfig, Split, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use crate::error::SessionError;
use crate::evaluate::{self, EvaluationReport};
use crate::forest::ForestParams;
use crate::models::{FeaturePolicy, FeatureRecord, Label, Prediction};
use crate::observability::{PipelineMetrics, StructuredLogger};
use crate::pipeline::{parse_form, InferencePipeline, Substitution, TrainedPipeline};
use crate::ranker::{self, FeatureRanking};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Everything needed to go from a CSV file to a trained pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub dataset: DatasetConfig,
    pub test_fraction: f64,
    pub seed: u64,
    pub forest: ForestParams,
    pub feature_policy: FeaturePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            forest: ForestParams::default(),
            feature_policy: FeaturePolicy::default(),
        }
    }
}

/// Identity of a cached pipeline: the data it saw and the features it uses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub fingerprint: String,
    pub policy: FeaturePolicy,
}

/// A single-record prediction made from raw form fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormPrediction {
    /// Values the prediction was made from, after substitution
    pub record: FeatureRecord,
    pub prediction: Prediction,
    pub substitutions: Vec<Substitution>,
}

pub struct Session {
    config: SessionConfig,
    dataset: Dataset,
    split: Split,
    inference: InferencePipeline,
    cache: HashMap<PipelineKey, Arc<TrainedPipeline>>,
    metrics: PipelineMetrics,
    logger: StructuredLogger,
}

impl Session {
    /// Load the CSV at `path` and split it
    pub fn open(path: impl AsRef<Path>, config: SessionConfig) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let dataset = dataset::load(path, &config.dataset)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::build(dataset, config, StructuredLogger::new(name))
    }

    /// Wrap an already loaded dataset
    pub fn from_dataset(dataset: Dataset, config: SessionConfig) -> Result<Self, SessionError> {
        let name = format!("memory:{}", &dataset.fingerprint()[..12]);
        Self::build(dataset, config, StructuredLogger::new(name))
    }

    fn build(
        dataset: Dataset,
        config: SessionConfig,
        logger: StructuredLogger,
    ) -> Result<Self, SessionError> {
        let split = dataset::stratified_split(dataset.labels(), config.test_fraction, config.seed)?;
        let metrics = PipelineMetrics::new();
        metrics.set_dataset_rows(dataset.n_rows());
        logger.log_dataset_loaded(dataset.n_rows(), dataset.n_features(), dataset.positive_rate());

        Ok(Self {
            inference: InferencePipeline::new(config.forest.clone()),
            config,
            dataset,
            split,
            cache: HashMap::new(),
            metrics,
            logger,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Holder of the most recently fitted pipeline
    pub fn inference(&self) -> &InferencePipeline {
        &self.inference
    }

    /// Training rows over every feature column
    pub fn train_set(&self) -> (Array2<f64>, Vec<Label>) {
        self.dataset.rows(&self.split.train)
    }

    /// Held-out rows over every feature column
    pub fn test_set(&self) -> (Array2<f64>, Vec<Label>) {
        self.dataset.rows(&self.split.test)
    }

    /// Rank every feature on the training rows
    pub fn rank_features(&self) -> Result<FeatureRanking, SessionError> {
        let (x, y) = self.train_set();
        let names = self.dataset.feature_names();
        Ok(ranker::rank(x.view(), &y, names, self.inference.params())?)
    }

    /// Pipeline for the configured feature policy, fitting it on a cache miss
    pub fn pipeline(&mut self) -> Result<Arc<TrainedPipeline>, SessionError> {
        self.pipeline_for(self.config.feature_policy)
    }

    pub fn pipeline_for(
        &mut self,
        policy: FeaturePolicy,
    ) -> Result<Arc<TrainedPipeline>, SessionError> {
        let key = PipelineKey {
            fingerprint: self.dataset.fingerprint().to_string(),
            policy,
        };
        if let Some(pipeline) = self.cache.get(&key) {
            self.metrics.inc_cache_hits();
            debug!(policy = %policy, "Reusing cached pipeline");
            return Ok(Arc::clone(pipeline));
        }
        self.metrics.inc_cache_misses();

        let start = Instant::now();
        let columns = self.columns_for(policy)?;
        let names: Vec<String> = columns
            .iter()
            .map(|&c| self.dataset.feature_names()[c].clone())
            .collect();
        let (x, y) = self.dataset.rows_with_columns(&self.split.train, &columns);
        let pipeline = self.inference.fit(x.view(), &y, &names)?;

        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.observe_fit_latency(elapsed);
        self.logger
            .log_model_trained(&policy, names.len(), pipeline.forest().n_trees(), elapsed);

        self.cache.insert(key, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    fn columns_for(&self, policy: FeaturePolicy) -> Result<Vec<usize>, SessionError> {
        match policy {
            FeaturePolicy::All => Ok((0..self.dataset.n_features()).collect()),
            FeaturePolicy::TopK(k) => {
                let ranking = self.rank_features()?;
                Ok(ranking
                    .select_top(k.max(1))
                    .iter()
                    .filter_map(|name| self.dataset.schema().position(name))
                    .collect())
            }
        }
    }

    /// Predict a complete record
    pub fn predict(&mut self, record: &FeatureRecord) -> Result<Prediction, SessionError> {
        let pipeline = self.pipeline()?;
        let start = Instant::now();
        let prediction = pipeline.predict(record)?;
        self.metrics.observe_prediction_latency(start.elapsed().as_secs_f64());
        self.metrics.inc_predictions(&prediction);
        self.logger.log_prediction(&prediction, 0);
        Ok(prediction)
    }

    /// Predict from raw text fields, substituting medians for invalid values
    pub fn predict_form<'a, I>(&mut self, fields: I) -> Result<FormPrediction, SessionError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pipeline = self.pipeline()?;
        let parsed = parse_form(fields, &pipeline);

        let start = Instant::now();
        let prediction = pipeline.predict(&parsed.record)?;
        self.metrics.observe_prediction_latency(start.elapsed().as_secs_f64());
        self.metrics.inc_predictions(&prediction);
        self.metrics.add_substituted_fields(parsed.substitutions.len());
        self.logger.log_prediction(&prediction, parsed.substitutions.len());

        Ok(FormPrediction {
            record: parsed.record,
            prediction,
            substitutions: parsed.substitutions,
        })
    }

    /// Evaluate the configured pipeline on the held-out rows
    pub fn evaluate(&mut self) -> Result<EvaluationReport, SessionError> {
        let pipeline = self.pipeline()?;
        let columns: Vec<usize> = pipeline
            .feature_names()
            .iter()
            .filter_map(|name| self.dataset.schema().position(name))
            .collect();
        let (x, y) = self.dataset.rows_with_columns(&self.split.test, &columns);
        let report = evaluate::evaluate(pipeline.as_ref(), x.view(), &y)?;
        self.logger.log_evaluation(report.accuracy(), report.auc(), report.n_test);
        Ok(report)
    }

    /// Load a new CSV in place of the current dataset, dropping cached pipelines
    pub fn reload(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let dataset = dataset::load(path, &self.config.dataset)?;
        self.replace_dataset(dataset)
    }

    pub fn replace_dataset(&mut self, dataset: Dataset) -> Result<(), SessionError> {
        let split = dataset::stratified_split(
            dataset.labels(),
            self.config.test_fraction,
            self.config.seed,
        )?;
        self.dataset = dataset;
        self.split = split;
        self.invalidate();
        self.metrics.set_dataset_rows(self.dataset.n_rows());
        self.logger.log_dataset_loaded(
            self.dataset.n_rows(),
            self.dataset.n_features(),
            self.dataset.positive_rate(),
        );
        Ok(())
    }

    /// Drop every cached pipeline
    pub fn invalidate(&mut self) {
        let entries = self.cache.len();
        self.cache.clear();
        self.inference.reset();
        self.logger.log_cache_invalidated(entries);
    }

    pub fn cached_pipelines(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn small_dataset(offset: f64) -> Dataset {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let base = if i % 10 == 0 { 100.0 } else { 10.0 };
            base + (i as f64) * 0.1 + j as f64 + offset
        });
        let labels = (0..n).map(|i| Label::from_flag(i % 10 == 0)).collect();
        let names = vec!["Torque [Nm]".into(), "Tool wear [min]".into()];
        Dataset::from_parts(names, x, labels).unwrap()
    }

    fn config() -> SessionConfig {
        SessionConfig {
            forest: ForestParams::default().with_n_trees(7),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_pipeline_is_cached_per_policy() {
        let mut session = Session::from_dataset(small_dataset(0.0), config()).unwrap();
        let first = session.pipeline().unwrap();
        let second = session.pipeline().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.cached_pipelines(), 1);

        let top = session.pipeline_for(FeaturePolicy::TopK(1)).unwrap();
        assert_eq!(top.feature_names().len(), 1);
        assert_eq!(session.cached_pipelines(), 2);
    }

    #[test]
    fn test_replace_dataset_clears_cache() {
        let mut session = Session::from_dataset(small_dataset(0.0), config()).unwrap();
        let before = session.pipeline().unwrap();
        session.replace_dataset(small_dataset(5.0)).unwrap();
        assert_eq!(session.cached_pipelines(), 0);

        let after = session.pipeline().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_ne!(before.medians(), after.medians());
    }

    #[test]
    fn test_split_follows_config() {
        let session = Session::from_dataset(small_dataset(0.0), config()).unwrap();
        assert_eq!(session.split().test.len(), 12);
        assert_eq!(session.split().len(), 60);
        let (_, y) = session.test_set();
        assert_eq!(y.iter().filter(|l| l.is_failure()).count(), 1);
    }

    #[test]
    fn test_predict_form_reports_substitutions() {
        let mut session = Session::from_dataset(small_dataset(0.0), config()).unwrap();
        let result = session
            .predict_form([("Torque [Nm]", "abc"), ("Tool wear [min]", "11")])
            .unwrap();
        assert_eq!(result.substitutions.len(), 1);
        assert_eq!(result.substitutions[0].feature, "Torque [Nm]");
        assert!((0.0..=1.0).contains(&result.prediction.probability));
    }

    #[test]
    fn test_evaluate_uses_test_rows() {
        let mut session = Session::from_dataset(small_dataset(0.0), config()).unwrap();
        let report = session.evaluate().unwrap();
        assert_eq!(report.n_test, 12);
        assert_eq!(report.confusion.total(), 12);
    }

    #[test]
    fn test_top_k_evaluation_uses_selected_columns() {
        let mut session = Session::from_dataset(
            small_dataset(0.0),
            SessionConfig {
                feature_policy: FeaturePolicy::TopK(1),
                ..config()
            },
        )
        .unwrap();
        let report = session.evaluate().unwrap();
        assert_eq!(report.n_test, 12);
    }

    #[test]
    fn test_fits_go_through_inference_holder() {
        let mut session = Session::from_dataset(small_dataset(0.0), config()).unwrap();
        assert!(!session.inference().is_fitted());
        assert_eq!(session.inference().params().n_trees, 7);

        let pipeline = session.pipeline().unwrap();
        let latest = session.inference().trained().unwrap();
        assert_eq!(latest.medians(), pipeline.medians());
        assert_eq!(latest.trained_at(), pipeline.trained_at());

        session.invalidate();
        assert!(!session.inference().is_fitted());
    }
}
