use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

use super::predictor::{feature_vector, FeatureVector, Predictor, PredictorError};
use super::rules::{assess_rules, AssessmentSource, OverallRisk, RiskAssessment};
use crate::extraction::ParameterMap;

/// Predictor confidence above which the statistical path reports High risk
pub const HIGH_CONFIDENCE: f64 = 0.7;

/// Overall risk assessment with an optional statistical predictor.
///
/// The predictor is used only when every feature is present. A missing
/// predictor, a missing feature, or any predictor error or panic falls back
/// to the rule-based checks, so [`RiskEngine::assess`] always returns a result.
#[derive(Default)]
pub struct RiskEngine {
    predictor: Option<Box<dyn Predictor>>,
}

impl fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskEngine")
            .field("has_predictor", &self.predictor.is_some())
            .finish()
    }
}

impl RiskEngine {
    /// Engine that always uses the rule-based checks
    pub fn rule_based() -> Self {
        Self { predictor: None }
    }

    pub fn with_predictor(predictor: Box<dyn Predictor>) -> Self {
        Self {
            predictor: Some(predictor),
        }
    }

    pub fn has_predictor(&self) -> bool {
        self.predictor.is_some()
    }

    pub fn assess(&self, params: &ParameterMap) -> RiskAssessment {
        let Some(predictor) = self.predictor.as_deref() else {
            debug!("No predictor configured, using rule-based assessment");
            return assess_rules(params);
        };

        let Some(features) = feature_vector(params) else {
            debug!("Incomplete feature set, using rule-based assessment");
            return assess_rules(params);
        };

        // A panicking predictor is treated like one that returned an error
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| statistical(predictor, &features)))
            .unwrap_or_else(|_| Err(PredictorError::InferenceError("predictor panicked".to_string())));

        match outcome {
            Ok(assessment) => {
                debug!("Statistical assessment: {:?}", assessment.source);
                assessment
            }
            Err(e) => {
                warn!("Predictor failed, falling back to rule-based assessment: {}", e);
                assess_rules(params)
            }
        }
    }
}

fn statistical(
    predictor: &dyn Predictor,
    features: &FeatureVector,
) -> Result<RiskAssessment, PredictorError> {
    let label = predictor.predict(features)?;

    let confidence = match predictor.predict_probability(features)? {
        Some(distribution) => Some(
            distribution
                .into_iter()
                .reduce(f64::max)
                .ok_or_else(|| {
                    PredictorError::InferenceError("empty probability distribution".to_string())
                })?,
        ),
        None => None,
    };

    let overall_risk = match confidence {
        Some(c) if c > HIGH_CONFIDENCE => OverallRisk::High,
        _ => OverallRisk::Medium,
    };

    let risks = if label.is_empty() { Vec::new() } else { vec![label] };

    Ok(RiskAssessment {
        risks,
        overall_risk,
        source: AssessmentSource::Statistical { confidence },
    })
}

/// Assess risk with the rule-based checks only
pub fn assess_risk(params: &ParameterMap) -> RiskAssessment {
    RiskEngine::rule_based().assess(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::predictor::FEATURES;
    use crate::risk::rules::KIDNEY_RISK;

    struct FixedPredictor {
        label: &'static str,
        probabilities: Option<Vec<f64>>,
    }

    impl Predictor for FixedPredictor {
        fn predict(&self, _features: &FeatureVector) -> Result<String, PredictorError> {
            Ok(self.label.to_string())
        }

        fn predict_probability(
            &self,
            _features: &FeatureVector,
        ) -> Result<Option<Vec<f64>>, PredictorError> {
            Ok(self.probabilities.clone())
        }
    }

    struct FailingPredictor;

    impl Predictor for FailingPredictor {
        fn predict(&self, _features: &FeatureVector) -> Result<String, PredictorError> {
            Err(PredictorError::InferenceError("model crashed".to_string()))
        }
    }

    struct PanickingPredictor;

    impl Predictor for PanickingPredictor {
        fn predict(&self, _features: &FeatureVector) -> Result<String, PredictorError> {
            panic!("model weights corrupted");
        }
    }

    fn complete_params(creatinine: f64) -> ParameterMap {
        FEATURES
            .iter()
            .zip([13.5, 7000.0, 250000.0, creatinine, 30.0, 25.0, 0.8])
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn fixed(label: &'static str, probabilities: Option<Vec<f64>>) -> RiskEngine {
        RiskEngine::with_predictor(Box::new(FixedPredictor {
            label,
            probabilities,
        }))
    }

    #[test]
    fn test_no_predictor_uses_rules() {
        let mut params = ParameterMap::new();
        params.insert("Creatinine".to_string(), 1.5);

        let result = assess_risk(&params);
        assert_eq!(result.risks, vec![KIDNEY_RISK]);
        assert_eq!(result.overall_risk, OverallRisk::Medium);
        assert_eq!(result.source, AssessmentSource::RuleBased);
    }

    #[test]
    fn test_missing_feature_uses_rules() {
        let engine = fixed("Kidney Disease", Some(vec![0.1, 0.9]));
        let mut params = complete_params(1.5);
        params.remove("SGOT");

        let result = engine.assess(&params);
        assert_eq!(result.source, AssessmentSource::RuleBased);
        assert_eq!(result.risks, vec![KIDNEY_RISK]);
    }

    #[test]
    fn test_confident_prediction_is_high() {
        let engine = fixed("Kidney Disease", Some(vec![0.05, 0.9, 0.05]));
        let result = engine.assess(&complete_params(1.5));
        assert_eq!(result.risks, vec!["Kidney Disease"]);
        assert_eq!(result.overall_risk, OverallRisk::High);
        assert_eq!(
            result.source,
            AssessmentSource::Statistical {
                confidence: Some(0.9)
            }
        );
    }

    #[test]
    fn test_borderline_confidence_is_medium() {
        let engine = fixed("Healthy", Some(vec![0.7, 0.3]));
        let result = engine.assess(&complete_params(0.9));
        assert_eq!(result.overall_risk, OverallRisk::Medium);
    }

    #[test]
    fn test_absent_confidence_is_medium() {
        let engine = fixed("Healthy", None);
        let result = engine.assess(&complete_params(0.9));
        assert_eq!(result.risks, vec!["Healthy"]);
        assert_eq!(result.overall_risk, OverallRisk::Medium);
        assert_eq!(
            result.source,
            AssessmentSource::Statistical { confidence: None }
        );
    }

    #[test]
    fn test_empty_label_yields_no_risks() {
        let engine = fixed("", Some(vec![0.95, 0.05]));
        let result = engine.assess(&complete_params(0.9));
        assert!(result.risks.is_empty());
        assert_eq!(result.overall_risk, OverallRisk::High);
    }

    #[test]
    fn test_predictor_failure_falls_back() {
        let engine = RiskEngine::with_predictor(Box::new(FailingPredictor));
        let result = engine.assess(&complete_params(1.5));
        assert_eq!(result.source, AssessmentSource::RuleBased);
        assert_eq!(result.risks, vec![KIDNEY_RISK]);
    }

    #[test]
    fn test_predictor_panic_falls_back() {
        let engine = RiskEngine::with_predictor(Box::new(PanickingPredictor));
        let result = engine.assess(&complete_params(1.5));
        assert_eq!(result.source, AssessmentSource::RuleBased);
        assert_eq!(result.risks, vec![KIDNEY_RISK]);
        assert_eq!(result.overall_risk, OverallRisk::Medium);
    }

    #[test]
    fn test_empty_distribution_falls_back() {
        let engine = fixed("Healthy", Some(Vec::new()));
        let result = engine.assess(&complete_params(0.9));
        assert_eq!(result.source, AssessmentSource::RuleBased);
        assert!(result.risks.is_empty());
        assert_eq!(result.overall_risk, OverallRisk::Low);
    }
}
