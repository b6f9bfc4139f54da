//! Statistical predictor interface and a file-backed nearest-centroid model.
//!
//! A predictor consumes a fixed seven-element feature vector built from the
//! canonical parameters below, in this order. Models are trained elsewhere;
//! this module only loads and evaluates them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::extraction::ParameterMap;
use crate::tables::read_json;

/// Feature order expected by every predictor
pub const FEATURES: [&str; 7] = [
    "Hemoglobin",
    "WBC",
    "Platelets",
    "Creatinine",
    "SGPT",
    "SGOT",
    "Bilirubin",
];

pub type FeatureVector = [f64; 7];

/// Build the feature vector, or `None` if any feature is missing
pub fn feature_vector(params: &ParameterMap) -> Option<FeatureVector> {
    let mut features = [0.0; 7];
    for (slot, name) in features.iter_mut().zip(FEATURES.iter()) {
        *slot = *params.get(*name)?;
    }
    Some(features)
}

/// Errors that can occur while loading or invoking a predictor
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Failed to load model: {0}")]
    ModelLoadError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference error: {0}")]
    InferenceError(String),
}

/// A trained classifier over [`FeatureVector`]s
pub trait Predictor: Send + Sync {
    /// Predicted class label
    fn predict(&self, features: &FeatureVector) -> Result<String, PredictorError>;

    /// Class probability distribution, if the model provides one
    fn predict_probability(
        &self,
        _features: &FeatureVector,
    ) -> Result<Option<Vec<f64>>, PredictorError> {
        Ok(None)
    }
}

/// Nearest-centroid classifier with per-feature scaling.
///
/// Distances are Euclidean over `feature / scale`; probabilities are a softmax
/// over negative distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    pub labels: Vec<String>,
    pub centroids: Vec<FeatureVector>,
    pub scales: FeatureVector,
}

impl CentroidModel {
    pub fn new(
        labels: Vec<String>,
        centroids: Vec<FeatureVector>,
        scales: FeatureVector,
    ) -> Result<Self, PredictorError> {
        let model = Self {
            labels,
            centroids,
            scales,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load a model from JSON (`{"labels": [...], "centroids": [[...]], "scales": [...]}`)
    pub fn load(path: &Path) -> Result<Self, PredictorError> {
        let model: Self =
            read_json(path).map_err(|e| PredictorError::ModelLoadError(e.to_string()))?;
        model.validate()?;
        info!(
            "Loaded centroid model with {} classes from {:?}",
            model.labels.len(),
            path
        );
        Ok(model)
    }

    fn validate(&self) -> Result<(), PredictorError> {
        if self.labels.is_empty() {
            return Err(PredictorError::ModelLoadError("model has no classes".to_string()));
        }
        if self.labels.len() != self.centroids.len() {
            return Err(PredictorError::ModelLoadError(format!(
                "{} labels but {} centroids",
                self.labels.len(),
                self.centroids.len()
            )));
        }
        if self.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(PredictorError::ModelLoadError(
                "feature scales must be positive".to_string(),
            ));
        }
        if self.centroids.iter().flatten().any(|c| !c.is_finite()) {
            return Err(PredictorError::ModelLoadError(
                "centroids must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn distances(&self, features: &FeatureVector) -> Result<Vec<f64>, PredictorError> {
        if let Some(i) = features.iter().position(|f| !f.is_finite()) {
            return Err(PredictorError::InvalidInput(format!(
                "{} is not a finite number",
                FEATURES[i]
            )));
        }
        Ok(self
            .centroids
            .iter()
            .map(|centroid| {
                centroid
                    .iter()
                    .zip(features.iter())
                    .zip(self.scales.iter())
                    .map(|((c, f), s)| ((f - c) / s).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect())
    }
}

impl Predictor for CentroidModel {
    fn predict(&self, features: &FeatureVector) -> Result<String, PredictorError> {
        let distances = self.distances(features)?;
        let (best, _) = distances
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(best_i, best_d), (i, &d)| {
                if d < best_d {
                    (i, d)
                } else {
                    (best_i, best_d)
                }
            });
        Ok(self.labels[best].clone())
    }

    fn predict_probability(
        &self,
        features: &FeatureVector,
    ) -> Result<Option<Vec<f64>>, PredictorError> {
        let distances = self.distances(features)?;
        let nearest = distances.iter().cloned().fold(f64::INFINITY, f64::min);
        let weights: Vec<f64> = distances.iter().map(|d| (nearest - d).exp()).collect();
        let total: f64 = weights.iter().sum();
        if total.is_nan() || total <= 0.0 {
            return Err(PredictorError::InferenceError(
                "degenerate probability distribution".to_string(),
            ));
        }
        Ok(Some(weights.into_iter().map(|w| w / total).collect()))
    }
}
