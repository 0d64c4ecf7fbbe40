//! Observability for the maintenance pipeline
//!
//! Provides:
//! - Prometheus metrics (fit latency, prediction latency, cache hits, input substitutions)
//! - Structured event logging with tracing

use crate::models::{FeaturePolicy, Prediction};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Buckets for single-record prediction latency (in seconds)
const PREDICTION_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Buckets for pipeline fit latency (in seconds)
const FIT_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PipelineMetricsInner> = OnceLock::new();

struct PipelineMetricsInner {
    fit_latency_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    substituted_fields_total: IntCounter,
    cache_hits_total: IntCounter,
    cache_misses_total: IntCounter,
    dataset_rows: IntGauge,
}

impl PipelineMetricsInner {
    fn new() -> Self {
        Self {
            fit_latency_seconds: register_histogram!(
                "pdm_fit_latency_seconds",
                "Time spent fitting the imputer, scaler and forest",
                FIT_BUCKETS.to_vec()
            )
            .expect("Failed to register fit_latency_seconds"),

            prediction_latency_seconds: register_histogram!(
                "pdm_prediction_latency_seconds",
                "Time spent classifying a single record",
                PREDICTION_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "pdm_predictions_total",
                "Predictions generated, by predicted label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            substituted_fields_total: register_int_counter!(
                "pdm_substituted_fields_total",
                "Input fields replaced by the training median"
            )
            .expect("Failed to register substituted_fields_total"),

            cache_hits_total: register_int_counter!(
                "pdm_pipeline_cache_hits_total",
                "Trained pipeline lookups served from the session cache"
            )
            .expect("Failed to register cache_hits_total"),

            cache_misses_total: register_int_counter!(
                "pdm_pipeline_cache_misses_total",
                "Trained pipeline lookups that required a fit"
            )
            .expect("Failed to register cache_misses_total"),

            dataset_rows: register_int_gauge!(
                "pdm_dataset_rows",
                "Rows in the currently loaded dataset"
            )
            .expect("Failed to register dataset_rows"),
        }
    }
}

/// Handle to the process-wide pipeline metrics.
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Create a handle, registering the collectors on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PipelineMetricsInner {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new)
    }

    pub fn observe_fit_latency(&self, duration_secs: f64) {
        self.inner().fit_latency_seconds.observe(duration_secs);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, prediction: &Prediction) {
        self.inner()
            .predictions_total
            .with_label_values(&[prediction.label.as_str()])
            .inc();
    }

    pub fn add_substituted_fields(&self, count: usize) {
        self.inner().substituted_fields_total.inc_by(count as u64);
    }

    pub fn inc_cache_hits(&self) {
        self.inner().cache_hits_total.inc();
    }

    pub fn inc_cache_misses(&self) {
        self.inner().cache_misses_total.inc();
    }

    pub fn set_dataset_rows(&self, rows: usize) {
        self.inner().dataset_rows.set(rows as i64);
    }

    pub fn cache_hits(&self) -> u64 {
        self.inner().cache_hits_total.get()
    }

    pub fn cache_misses(&self) -> u64 {
        self.inner().cache_misses_total.get()
    }

    /// Render the default registry in Prometheus text exposition format
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Structured logger for pipeline events
///
/// Every event carries the `event` field and the dataset it concerns.
#[derive(Clone)]
pub struct StructuredLogger {
    dataset: String,
}

impl StructuredLogger {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn log_dataset_loaded(&self, rows: usize, features: usize, positive_rate: f64) {
        info!(
            event = "dataset_loaded",
            dataset = %self.dataset,
            rows = rows,
            features = features,
            positive_rate = positive_rate,
            "Dataset loaded"
        );
    }

    pub fn log_model_trained(
        &self,
        policy: &FeaturePolicy,
        features: usize,
        trees: usize,
        elapsed_secs: f64,
    ) {
        info!(
            event = "model_trained",
            dataset = %self.dataset,
            policy = %policy,
            features = features,
            trees = trees,
            elapsed_secs = elapsed_secs,
            "Trained pipeline"
        );
    }

    pub fn log_prediction(&self, prediction: &Prediction, substituted: usize) {
        info!(
            event = "prediction_generated",
            dataset = %self.dataset,
            label = %prediction.label,
            probability = prediction.probability,
            substituted_fields = substituted,
            "Generated failure prediction"
        );
    }

    pub fn log_evaluation(&self, accuracy: f64, auc: Option<f64>, n_test: usize) {
        match auc {
            Some(auc) => info!(
                event = "model_evaluated",
                dataset = %self.dataset,
                accuracy = accuracy,
                auc = auc,
                test_rows = n_test,
                "Evaluated pipeline on held-out rows"
            ),
            None => warn!(
                event = "model_evaluated",
                dataset = %self.dataset,
                accuracy = accuracy,
                test_rows = n_test,
                "Evaluated pipeline; AUC undefined for single-class test set"
            ),
        }
    }

    pub fn log_cache_invalidated(&self, entries: usize) {
        info!(
            event = "cache_invalidated",
            dataset = %self.dataset,
            entries = entries,
            "Dropped cached pipelines"
        );
    }
}
