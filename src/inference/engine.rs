use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::rules::{ConditionRule, RuleTable, Threshold};
use crate::extraction::ParameterMap;
use crate::tables::OrderedEntries;

/// Conditions below this confidence (percent) are left out of the result
pub const INCLUSION_THRESHOLD: f64 = 30.0;

pub const NO_FINDINGS_SUMMARY: &str =
    "No significant diseases detected based on blood parameters. Regular monitoring recommended.";

/// Risk label for an included condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "Low Risk")]
    Low,
}

impl RiskLevel {
    /// Bucket a confidence percentage: 80 / 60 / 40 breakpoints
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            Self::High
        } else if confidence >= 60.0 {
            Self::Moderate
        } else if confidence >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High Risk",
            Self::Moderate => "Moderate Risk",
            Self::Medium => "Medium Risk",
            Self::Low => "Low Risk",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::High => "⚠️ Immediate medical consultation strongly recommended",
            Self::Moderate => "⚠️ Medical consultation recommended within a few days",
            Self::Medium => "ℹ️ Consider consulting a healthcare professional",
            Self::Low => "ℹ️ Monitor and consult doctor if symptoms appear",
        }
    }
}

/// An indicator that matched, with the measured value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedIndicator {
    pub parameter: String,
    pub value: f64,
    pub threshold: Threshold,
    pub condition: String,
}

/// Likelihood estimate for one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseasePrediction {
    /// Condition name; serialized as the key of `possible_diseases`
    #[serde(skip)]
    pub name: String,
    /// Percentage of the rule's total weight satisfied, one decimal place
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub description: String,
    pub matched_indicators: Vec<MatchedIndicator>,
    pub symptoms: Vec<String>,
    pub recommendation: String,
}

/// Ranked conditions and a one-line summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    #[serde(
        serialize_with = "serialize_ranked",
        deserialize_with = "deserialize_ranked"
    )]
    pub possible_diseases: Vec<DiseasePrediction>,
    pub summary: String,
}

impl InferenceResult {
    pub fn top(&self) -> Option<&DiseasePrediction> {
        self.possible_diseases.first()
    }

    pub fn get(&self, name: &str) -> Option<&DiseasePrediction> {
        self.possible_diseases.iter().find(|d| d.name == name)
    }
}

// Emit the ranking as a JSON object keyed by condition name, in rank order.
fn serialize_ranked<S>(diseases: &[DiseasePrediction], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(diseases.iter().map(|d| (d.name.as_str(), d)))
}

fn deserialize_ranked<'de, D>(deserializer: D) -> Result<Vec<DiseasePrediction>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = OrderedEntries::<DiseasePrediction>::deserialize(deserializer)?;
    Ok(entries
        .into_inner()
        .into_iter()
        .map(|(name, prediction)| DiseasePrediction { name, ..prediction })
        .collect())
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Score of one rule against the supplied parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RuleScore {
    /// Unrounded confidence percentage in [0, 100]
    pub confidence: f64,
    pub matched: Vec<MatchedIndicator>,
}

/// Score a rule.
///
/// Indicators whose parameter is absent are skipped, but the denominator is
/// always the rule's total declared weight, so sparse input cannot reach full
/// confidence unless the supplied indicators carry all of the weight.
pub fn score_rule(rule: &ConditionRule, params: &ParameterMap) -> RuleScore {
    let mut achieved = 0.0;
    let mut matched = Vec::new();

    for indicator in &rule.indicators {
        let Some(&value) = params.get(&indicator.param) else {
            continue;
        };
        if indicator.holds(value) {
            achieved += indicator.weight;
            matched.push(MatchedIndicator {
                parameter: indicator.param.clone(),
                value,
                threshold: indicator.threshold,
                condition: indicator.condition(),
            });
        }
    }

    let total = rule.total_weight();
    let confidence = if total > 0.0 {
        (achieved / total * 100.0).min(100.0)
    } else {
        0.0
    };

    RuleScore {
        confidence,
        matched,
    }
}

/// Summary line for a ranked result
pub fn summarize(diseases: &[DiseasePrediction]) -> String {
    let Some(top) = diseases.first() else {
        return NO_FINDINGS_SUMMARY.to_string();
    };
    let confidence = top.confidence;
    if confidence >= 80.0 {
        format!(
            "⚠️ High risk of {} detected ({:.1}% confidence). Immediate medical attention needed.",
            top.name, confidence
        )
    } else if confidence >= 60.0 {
        format!(
            "⚠️ Possible {} indicated ({:.1}% confidence). Medical consultation advised.",
            top.name, confidence
        )
    } else {
        format!(
            "ℹ️ {} is a possible condition ({:.1}% confidence). Further testing may be needed.",
            top.name, confidence
        )
    }
}

/// Weighted multi-indicator condition scoring over a rule table
#[derive(Debug, Clone, Default)]
pub struct DiseaseEngine {
    rules: RuleTable,
}

impl DiseaseEngine {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Score every rule, keep those at or above the inclusion threshold, and
    /// rank by descending confidence (ties keep table order).
    pub fn infer(&self, params: &ParameterMap) -> InferenceResult {
        let mut diseases: Vec<DiseasePrediction> = self
            .rules
            .rules()
            .iter()
            .filter_map(|rule| {
                let score = score_rule(rule, params);
                if score.confidence < INCLUSION_THRESHOLD {
                    return None;
                }
                let level = RiskLevel::from_confidence(score.confidence);
                debug!("{}: {:.1}% ({})", rule.name, score.confidence, level.label());
                Some(DiseasePrediction {
                    name: rule.name.clone(),
                    confidence: round1(score.confidence),
                    risk_level: level,
                    description: rule.description.clone(),
                    matched_indicators: score.matched,
                    symptoms: rule.symptoms.clone(),
                    recommendation: level.recommendation().to_string(),
                })
            })
            .collect();

        // Stable sort: equal confidences keep rule table order
        diseases.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let summary = summarize(&diseases);
        InferenceResult {
            possible_diseases: diseases,
            summary,
        }
    }
}

/// Infer conditions using the built-in rule table
pub fn infer(params: &ParameterMap) -> InferenceResult {
    DiseaseEngine::default().infer(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::rules::{Indicator, Operator};
    use proptest::prelude::*;

    fn params(pairs: &[(&str, f64)]) -> ParameterMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_low_hemoglobin_is_moderate_anemia() {
        let result = infer(&params(&[("Hemoglobin", 9.5)]));
        let anemia = result.get("Anemia").unwrap();
        assert_eq!(anemia.confidence, 75.0);
        assert_eq!(anemia.risk_level, RiskLevel::Moderate);
        assert_eq!(anemia.matched_indicators.len(), 1);
        assert_eq!(anemia.matched_indicators[0].condition, "Hemoglobin < 11");
        assert_eq!(anemia.matched_indicators[0].value, 9.5);
        assert_eq!(
            anemia.recommendation,
            "⚠️ Medical consultation recommended within a few days"
        );

        // Hemolytic Anemia: 0.85 / 2.05; Thrombocytopenia: 0.3 / 1.25 is below threshold
        let hemolytic = result.get("Hemolytic Anemia").unwrap();
        assert_eq!(hemolytic.confidence, 41.5);
        assert_eq!(hemolytic.risk_level, RiskLevel::Medium);
        assert!(result.get("Thrombocytopenia").is_none());

        assert_eq!(result.top().unwrap().name, "Anemia");
        assert_eq!(
            result.summary,
            "⚠️ Possible Anemia indicated (75.0% confidence). Medical consultation advised."
        );
    }

    #[test]
    fn test_empty_input_has_no_findings() {
        let result = infer(&ParameterMap::new());
        assert!(result.possible_diseases.is_empty());
        assert_eq!(result.summary, NO_FINDINGS_SUMMARY);
    }

    #[test]
    fn test_full_thrombocytopenia_match() {
        let result = infer(&params(&[("Platelets", 100000.0), ("Hemoglobin", 11.5)]));
        let top = result.top().unwrap();
        assert_eq!(top.name, "Thrombocytopenia");
        assert_eq!(top.confidence, 100.0);
        assert_eq!(top.risk_level, RiskLevel::High);
        assert_eq!(
            result.summary,
            "⚠️ High risk of Thrombocytopenia detected (100.0% confidence). Immediate medical attention needed."
        );
        // Infection/Leukemia: platelets only, 0.6 / 1.35
        assert_eq!(result.get("Infection/Leukemia").unwrap().confidence, 44.4);
    }

    #[test]
    fn test_matched_threshold_keeps_declared_form() {
        let result = infer(&params(&[("Hemoglobin", 9.0), ("Bilirubin", 2.5)]));
        let hemolytic = result.get("Hemolytic Anemia").unwrap();
        let conditions: Vec<&str> = hemolytic
            .matched_indicators
            .iter()
            .map(|m| m.condition.as_str())
            .collect();
        assert_eq!(conditions, vec!["Hemoglobin < 10", "Bilirubin > 2.0"]);

        let json = serde_json::to_value(&hemolytic.matched_indicators).unwrap();
        assert_eq!(json[0]["threshold"].to_string(), "10");
        assert_eq!(json[1]["threshold"].to_string(), "2.0");
    }

    #[test]
    fn test_unknown_parameters_are_ignored() {
        let result = infer(&params(&[("Glucose", 300.0), ("Cholesterol", 280.0)]));
        assert!(result.possible_diseases.is_empty());
    }

    #[test]
    fn test_absent_parameters_still_count_in_denominator() {
        // Only SGPT supplied: 0.8 / 2.3 = 34.8%, never 100%
        let result = infer(&params(&[("SGPT", 120.0)]));
        let liver = result.get("Liver Disease").unwrap();
        assert_eq!(liver.confidence, 34.8);
        assert_eq!(liver.risk_level, RiskLevel::Low);
        assert_eq!(liver.recommendation, "ℹ️ Monitor and consult doctor if symptoms appear");
        assert_eq!(
            result.summary,
            "ℹ️ Liver Disease is a possible condition (34.8% confidence). Further testing may be needed."
        );
    }

    #[test]
    fn test_ties_keep_table_order() {
        let a = ConditionRule::new(
            "First",
            "",
            vec![Indicator::new("X", Operator::GreaterThan, 1.0, 0.5)],
            &[],
        );
        let b = ConditionRule::new(
            "Second",
            "",
            vec![Indicator::new("X", Operator::GreaterThan, 1.0, 0.9)],
            &[],
        );
        let c = ConditionRule::new(
            "Third",
            "",
            vec![
                Indicator::new("X", Operator::GreaterThan, 1.0, 0.5),
                Indicator::new("Y", Operator::GreaterThan, 1.0, 0.5),
            ],
            &[],
        );
        let engine = DiseaseEngine::new(RuleTable::new(vec![c, a, b]).unwrap());
        let result = engine.infer(&params(&[("X", 2.0)]));
        let order: Vec<&str> = result.possible_diseases.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(order, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_rule_without_indicators_scores_zero() {
        let rule = ConditionRule::new("Empty", "", Vec::new(), &[]);
        let score = score_rule(&rule, &params(&[("Hemoglobin", 9.0)]));
        assert_eq!(score.confidence, 0.0);
        assert!(score.matched.is_empty());
    }

    #[test]
    fn test_inference_is_deterministic() {
        let input = params(&[
            ("Hemoglobin", 8.5),
            ("Bilirubin", 2.5),
            ("WBC", 12000.0),
            ("Platelets", 120000.0),
            ("SGOT", 60.0),
        ]);
        let first = infer(&input);
        let second = infer(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialized_ranking_is_ordered_map() {
        let result = infer(&params(&[("Hemoglobin", 9.5)]));
        let json = serde_json::to_string(&result).unwrap();
        let anemia = json.find("\"Anemia\"").unwrap();
        let hemolytic = json.find("\"Hemolytic Anemia\"").unwrap();
        assert!(anemia < hemolytic);
        assert!(json.contains("\"risk_level\":\"Moderate Risk\""));

        let back: InferenceResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_risk_level_breakpoints() {
        assert_eq!(RiskLevel::from_confidence(80.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_confidence(79.9), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_confidence(60.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_confidence(40.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_confidence(39.9), RiskLevel::Low);
    }

    fn satisfying_value(indicator: &Indicator) -> f64 {
        match indicator.operator {
            Operator::LessThan => indicator.threshold.value() - 1.0,
            Operator::GreaterThan => indicator.threshold.value() + 1.0,
        }
    }

    proptest! {
        #[test]
        fn prop_confidence_is_bounded(
            hb in 0.0f64..25.0,
            wbc in 0.0f64..30000.0,
            plt in 0.0f64..600000.0,
            creat in 0.0f64..10.0,
            bili in 0.0f64..10.0,
        ) {
            let input = params(&[
                ("Hemoglobin", hb),
                ("WBC", wbc),
                ("Platelets", plt),
                ("Creatinine", creat),
                ("Bilirubin", bili),
            ]);
            for rule in RuleTable::default().rules() {
                let score = score_rule(rule, &input);
                prop_assert!(score.confidence >= 0.0);
                prop_assert!(score.confidence <= 100.0);
            }
        }

        #[test]
        fn prop_more_satisfied_indicators_never_lower_confidence(
            rule_index in 0usize..7,
            mask in 0u8..8,
            extra in 0usize..3,
        ) {
            let table = RuleTable::default();
            let rule = &table.rules()[rule_index];
            let extra = extra % rule.indicators.len();

            let build = |mask: u8| -> ParameterMap {
                rule.indicators
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, ind)| (ind.param.clone(), satisfying_value(ind)))
                    .collect()
            };

            let before = score_rule(rule, &build(mask)).confidence;
            let after = score_rule(rule, &build(mask | (1 << extra))).confidence;
            prop_assert!(after >= before);

            // Full confidence needs every declared indicator
            let all = (1u8 << rule.indicators.len()) - 1;
            if mask & all != all {
                prop_assert!(before < 100.0);
            }
        }
    }
}
