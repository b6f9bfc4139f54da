//! Overall risk assessment: fixed threshold checks plus an optional
//! statistical predictor that falls back to those checks.

pub mod engine;
pub mod predictor;
pub mod rules;

pub use engine::{assess_risk, RiskEngine, HIGH_CONFIDENCE};
pub use predictor::{
    feature_vector, CentroidModel, FeatureVector, Predictor, PredictorError, FEATURES,
};
pub use rules::{assess_rules, AssessmentSource, OverallRisk, RiskAssessment};
