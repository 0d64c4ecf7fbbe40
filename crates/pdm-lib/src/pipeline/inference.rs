//! Fitted pipeline and prediction

use super::{MedianImputer, StandardScaler};
use crate::error::{PipelineError, SchemaError, TrainError};
use crate::forest::{Classifier, ForestParams, RandomForest};
use crate::models::{FeatureRecord, Label, Prediction};
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Imputer, scaler and forest fitted together on one training set.
///
/// Read-only after construction; refitting produces a new value.
#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    feature_names: Vec<String>,
    imputer: MedianImputer,
    scaler: StandardScaler,
    forest: RandomForest,
    trained_at: i64,
}

impl TrainedPipeline {
    /// Fit all three stages on the training rows.
    ///
    /// `x` may contain `NaN` for missing cells; its columns must line up with
    /// `feature_names`.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[Label],
        feature_names: &[String],
        params: &ForestParams,
    ) -> Result<Self, TrainError> {
        if x.ncols() != feature_names.len() {
            return Err(TrainError::NameMismatch {
                columns: x.ncols(),
                names: feature_names.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(TrainError::EmptyTrainingSet);
        }

        let start = Instant::now();
        let imputer = MedianImputer::fit(x);
        let imputed = imputer.transform(x);
        let scaler = StandardScaler::fit(imputed.view());
        let scaled = scaler.transform(imputed.view());
        let forest = RandomForest::fit(scaled.view(), y, params)?;

        info!(
            rows = x.nrows(),
            features = feature_names.len(),
            trees = forest.n_trees(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted inference pipeline"
        );

        Ok(Self {
            feature_names: feature_names.to_vec(),
            imputer,
            scaler,
            forest,
            trained_at: chrono::Utc::now().timestamp(),
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Frozen training medians, one per feature
    pub fn medians(&self) -> &[f64] {
        self.imputer.medians()
    }

    pub fn median_of(&self, feature: &str) -> Option<f64> {
        self.feature_names
            .iter()
            .position(|n| n == feature)
            .map(|i| self.imputer.medians()[i])
    }

    pub fn imputer(&self) -> &MedianImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Unix timestamp of the fit
    pub fn trained_at(&self) -> i64 {
        self.trained_at
    }

    /// Predict a named record.
    ///
    /// Every trained feature must be present as a key; a present key with a
    /// missing value is imputed. Extra keys are ignored.
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, SchemaError> {
        let mut row = Vec::with_capacity(self.feature_names.len());
        for name in &self.feature_names {
            match record.get(name) {
                None => return Err(SchemaError::MissingFeature(name.clone())),
                Some(value) => row.push(value.unwrap_or(f64::NAN)),
            }
        }
        self.predict_row(&row)
    }

    /// Predict a positional row in training column order
    pub fn predict_row(&self, row: &[f64]) -> Result<Prediction, SchemaError> {
        self.check_width(row.len())?;
        let prediction = self.classify(ArrayView1::from(row));
        debug!(
            label = %prediction.label,
            probability = prediction.probability,
            "Predicted record"
        );
        Ok(prediction)
    }

    pub fn predict_batch(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Prediction>, SchemaError> {
        self.check_width(x.ncols())?;
        Ok(x.rows().into_iter().map(|row| self.classify(row)).collect())
    }

    /// Failure probabilities for a batch
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, SchemaError> {
        self.check_width(x.ncols())?;
        Ok(x.rows().into_iter().map(|row| self.failure_probability(row)).collect())
    }

    fn check_width(&self, actual: usize) -> Result<(), SchemaError> {
        let expected = self.feature_names.len();
        if actual != expected {
            return Err(SchemaError::WidthMismatch { expected, actual });
        }
        Ok(())
    }
}

impl Classifier for TrainedPipeline {
    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Runs imputation and scaling on a copy of the row before the forest
    fn failure_probability(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut owned = row.to_owned();
        self.imputer.transform_row(owned.view_mut());
        self.scaler.transform_row(owned.view_mut());
        self.forest.failure_probability(owned.view())
    }
}

/// Forest configuration holding the most recent fit.
///
/// Each fit builds a fresh [`TrainedPipeline`]; earlier fits handed out
/// through `Arc` stay valid and unchanged.
#[derive(Debug, Clone, Default)]
pub struct InferencePipeline {
    params: ForestParams,
    trained: Option<Arc<TrainedPipeline>>,
}

impl InferencePipeline {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trained: None,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Fit on the training rows, replacing any previous fit
    pub fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: &[Label],
        feature_names: &[String],
    ) -> Result<Arc<TrainedPipeline>, PipelineError> {
        let trained = Arc::new(TrainedPipeline::fit(x, y, feature_names, &self.params)?);
        self.trained = Some(Arc::clone(&trained));
        Ok(trained)
    }

    pub fn trained(&self) -> Result<&TrainedPipeline, PipelineError> {
        self.trained.as_deref().ok_or(PipelineError::NotFitted)
    }

    pub fn is_fitted(&self) -> bool {
        self.trained.is_some()
    }

    /// Forget the most recent fit
    pub fn reset(&mut self) {
        self.trained = None;
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, PipelineError> {
        Ok(self.trained()?.predict(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn names() -> Vec<String> {
        vec!["Torque [Nm]".to_string(), "Tool wear [min]".to_string()]
    }

    fn training_data() -> (Array2<f64>, Vec<Label>) {
        let x = array![
            [40.0, 10.0],
            [42.0, 20.0],
            [f64::NAN, 15.0],
            [41.0, 12.0],
            [70.0, 210.0],
            [72.0, 220.0],
            [39.0, 11.0],
            [43.0, 18.0],
        ];
        let y = vec![
            Label::NoFailure,
            Label::NoFailure,
            Label::NoFailure,
            Label::NoFailure,
            Label::Failure,
            Label::Failure,
            Label::NoFailure,
            Label::NoFailure,
        ];
        (x, y)
    }

    fn fitted() -> TrainedPipeline {
        let (x, y) = training_data();
        let params = ForestParams::default().with_n_trees(11);
        TrainedPipeline::fit(x.view(), &y, &names(), &params).unwrap()
    }

    #[test]
    fn test_medians_are_frozen_from_training() {
        let pipeline = fitted();
        // Torque present values: 39 40 41 42 43 70 72 → 42
        assert_eq!(pipeline.median_of("Torque [Nm]"), Some(42.0));
        assert_eq!(pipeline.median_of("Air temperature [K]"), None);
    }

    #[test]
    fn test_missing_key_is_schema_error() {
        let pipeline = fitted();
        let record = FeatureRecord::new().with("Torque [Nm]", 40.0);
        assert_eq!(
            pipeline.predict(&record),
            Err(SchemaError::MissingFeature("Tool wear [min]".to_string()))
        );
    }

    #[test]
    fn test_missing_value_is_imputed() {
        let pipeline = fitted();
        let mut record = FeatureRecord::new().with("Tool wear [min]", 12.0);
        record.insert_missing("Torque [Nm]");
        let imputed = pipeline.predict(&record).unwrap();
        let explicit = pipeline.predict_row(&[42.0, 12.0]).unwrap();
        assert_eq!(imputed, explicit);
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let pipeline = fitted();
        let record = FeatureRecord::new()
            .with("Torque [Nm]", 71.0)
            .with("Tool wear [min]", 215.0)
            .with("UDI", 9.0);
        let prediction = pipeline.predict(&record).unwrap();
        assert_eq!(prediction.label, Label::Failure);
    }

    #[test]
    fn test_width_mismatch() {
        let pipeline = fitted();
        assert_eq!(
            pipeline.predict_row(&[1.0]),
            Err(SchemaError::WidthMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_label_matches_probability() {
        let pipeline = fitted();
        let (x, _) = training_data();
        for p in pipeline.predict_batch(x.view()).unwrap() {
            assert!((0.0..=1.0).contains(&p.probability));
            assert_eq!(p.label.is_failure(), p.probability >= 0.5);
        }
    }

    #[test]
    fn test_refit_replaces_parameters() {
        let (x, y) = training_data();
        let mut pipeline = InferencePipeline::new(ForestParams::default().with_n_trees(5));
        assert_eq!(pipeline.trained().unwrap_err(), PipelineError::NotFitted);
        assert!(matches!(
            pipeline.predict(&FeatureRecord::new()),
            Err(PipelineError::NotFitted)
        ));

        let first = pipeline.fit(x.view(), &y, &names()).unwrap();
        let shifted = x.mapv(|v| v + 100.0);
        let second = pipeline.fit(shifted.view(), &y, &names()).unwrap();
        assert_ne!(first.medians(), second.medians());
        assert_eq!(second.median_of("Torque [Nm]"), Some(142.0));
        assert_eq!(first.median_of("Torque [Nm]"), Some(42.0));
        assert_eq!(pipeline.trained().unwrap().medians(), second.medians());

        pipeline.reset();
        assert!(!pipeline.is_fitted());
    }

    #[test]
    fn test_fit_errors_surface_as_pipeline_errors() {
        let (x, y) = training_data();
        let mut pipeline = InferencePipeline::new(ForestParams::default().with_n_trees(0));
        assert_eq!(
            pipeline.fit(x.view(), &y, &names()).unwrap_err(),
            PipelineError::Train(TrainError::NoTrees)
        );
        assert!(!pipeline.is_fitted());
    }
}
