use serde::{Deserialize, Serialize};

use crate::extraction::ParameterMap;

pub const ANEMIA_RISK: &str = "Anemia_Risk";
pub const KIDNEY_RISK: &str = "Kidney_Risk";
pub const LIVER_RISK: &str = "Liver_Risk";

/// Hemoglobin below this value flags anemia risk (g/dL)
pub const HEMOGLOBIN_LOW: f64 = 11.0;
/// Creatinine above this value flags kidney risk (mg/dL)
pub const CREATININE_HIGH: f64 = 1.3;
/// SGPT above this value flags liver risk (U/L)
pub const SGPT_HIGH: f64 = 56.0;
/// SGOT above this value flags liver risk (U/L)
pub const SGOT_HIGH: f64 = 40.0;

/// Coarse overall risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverallRisk {
    Low,
    Medium,
    High,
}

impl OverallRisk {
    /// Bucket by number of triggered checks: 0 → Low, 1 → Medium, 2+ → High
    pub fn from_tag_count(count: usize) -> Self {
        match count {
            0 => Self::Low,
            1 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Which path produced a risk assessment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AssessmentSource {
    /// Fixed threshold checks
    #[default]
    RuleBased,
    /// External predictor, with its top class probability when it reports one
    Statistical { confidence: Option<f64> },
}

/// Overall risk result: `{risks, overall_risk}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risks: Vec<String>,
    pub overall_risk: OverallRisk,
    #[serde(skip)]
    pub source: AssessmentSource,
}

fn above(params: &ParameterMap, name: &str, threshold: f64) -> bool {
    params.get(name).map_or(false, |&v| v > threshold)
}

fn below(params: &ParameterMap, name: &str, threshold: f64) -> bool {
    params.get(name).map_or(false, |&v| v < threshold)
}

/// Run the three fixed checks. Tags follow check order, not input order.
pub fn assess_rules(params: &ParameterMap) -> RiskAssessment {
    let mut risks = Vec::new();

    if below(params, "Hemoglobin", HEMOGLOBIN_LOW) {
        risks.push(ANEMIA_RISK.to_string());
    }
    if above(params, "Creatinine", CREATININE_HIGH) {
        risks.push(KIDNEY_RISK.to_string());
    }
    if above(params, "SGPT", SGPT_HIGH) || above(params, "SGOT", SGOT_HIGH) {
        risks.push(LIVER_RISK.to_string());
    }

    RiskAssessment {
        overall_risk: OverallRisk::from_tag_count(risks.len()),
        risks,
        source: AssessmentSource::RuleBased,
    }
}
