//! Full-analysis composition: extraction followed by the three independent
//! evaluations over the same parameter map.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::extraction::{Extractor, ParameterDictionary, ParameterMap};
use crate::inference::{DiseaseEngine, InferenceResult, RuleTable};
use crate::ranges::{compare_for_sex, RangeComparison, RangeStatus, ReferenceRangeTable, Sex};
use crate::risk::{CentroidModel, RiskAssessment, RiskEngine};

/// Results of evaluating one parameter map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub comparison: RangeComparison,
    pub prediction: RiskAssessment,
    pub diseases: InferenceResult,
}

/// Extracted parameters and their range comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedParameters {
    pub extracted: ParameterMap,
    pub comparison: RangeComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub risk_prediction: RiskAssessment,
    pub disease_predictions: InferenceResult,
}

/// A complete report for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub text_length: usize,
    pub parameters: ExtractedParameters,
    pub health_assessment: HealthAssessment,
}

/// Loaded tables and engines, shared read-only across documents
#[derive(Debug, Default)]
pub struct Analyzer {
    extractor: Extractor,
    ranges: ReferenceRangeTable,
    risk: RiskEngine,
    diseases: DiseaseEngine,
    sex: Option<Sex>,
}

impl Analyzer {
    pub fn new(
        extractor: Extractor,
        ranges: ReferenceRangeTable,
        risk: RiskEngine,
        diseases: DiseaseEngine,
    ) -> Self {
        Self {
            extractor,
            ranges,
            risk,
            diseases,
            sex: None,
        }
    }

    pub fn with_sex(mut self, sex: Option<Sex>) -> Self {
        self.sex = sex;
        self
    }

    /// Load every table named by the config, degrading to defaults
    pub fn from_config(config: &Config) -> Result<Self> {
        let dictionary = ParameterDictionary::load_or_default(Some(&config.get_aliases_path()?));
        let ranges = ReferenceRangeTable::load_or_empty(Some(&config.get_ranges_path()?));
        let rules = RuleTable::load_or_default(Some(&config.get_rules_path()?));

        let model_path = config.get_model_path()?;
        let risk = if model_path.exists() {
            match CentroidModel::load(&model_path) {
                Ok(model) => RiskEngine::with_predictor(Box::new(model)),
                Err(e) => {
                    warn!("Predictor unavailable, using rule-based risk: {}", e);
                    RiskEngine::rule_based()
                }
            }
        } else {
            debug!("No predictor model at {:?}", model_path);
            RiskEngine::rule_based()
        };

        info!(
            "Analyzer ready: {} aliases, {} ranges, {} rules, predictor: {}",
            dictionary.len(),
            ranges.len(),
            rules.len(),
            risk.has_predictor()
        );

        Ok(Self::new(
            Extractor::new(dictionary),
            ranges,
            risk,
            DiseaseEngine::new(rules),
        )
        .with_sex(config.sex))
    }

    pub fn extract(&self, text: &str) -> ParameterMap {
        self.extractor.extract(text)
    }

    /// Run comparison, risk assessment and inference over a parameter map
    pub fn analyze(&self, params: &ParameterMap) -> Analysis {
        Analysis {
            comparison: compare_for_sex(params, &self.ranges, self.sex),
            prediction: self.risk.assess(params),
            diseases: self.diseases.infer(params),
        }
    }

    /// Extract from raw text, then analyze
    pub fn analyze_text(&self, source: &str, text: &str) -> AnalysisReport {
        let extracted = self.extract(text);
        info!("Extracted {} parameters from {}", extracted.len(), source);

        let analysis = self.analyze(&extracted);
        info!(
            "Analysis complete: overall risk = {}",
            analysis.prediction.overall_risk.as_str()
        );

        AnalysisReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            source: source.to_string(),
            text_length: text.chars().count(),
            parameters: ExtractedParameters {
                extracted,
                comparison: analysis.comparison,
            },
            health_assessment: HealthAssessment {
                risk_prediction: analysis.prediction,
                disease_predictions: analysis.diseases,
            },
        }
    }
}

fn status_label(status: RangeStatus) -> &'static str {
    match status {
        RangeStatus::Low => "LOW",
        RangeStatus::Normal => "normal",
        RangeStatus::High => "HIGH",
        RangeStatus::Unknown => "?",
    }
}

impl AnalysisReport {
    /// Plain-text rendering for terminals
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Report: {} ({})", self.source, self.report_id);
        let _ = writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));

        let _ = writeln!(out, "\n--- Parameters ---");
        if self.parameters.comparison.is_empty() {
            let _ = writeln!(out, "No parameters recognised.");
        }
        for (name, entry) in &self.parameters.comparison {
            let range = match entry.range {
                Some(b) => format!(
                    "{} - {} {}",
                    b.low(),
                    b.high(),
                    entry.unit.as_deref().unwrap_or("")
                ),
                None => "no reference".to_string(),
            };
            let _ = writeln!(
                out,
                "{:<12} {:>10}  {:<7} ({})",
                name,
                entry.value,
                status_label(entry.status),
                range.trim_end()
            );
        }

        let risk = &self.health_assessment.risk_prediction;
        let _ = writeln!(out, "\n--- Overall Risk ---");
        let _ = writeln!(out, "{}", risk.overall_risk.as_str());
        for tag in &risk.risks {
            let _ = writeln!(out, "  - {}", tag);
        }

        let diseases = &self.health_assessment.disease_predictions;
        let _ = writeln!(out, "\n--- Possible Conditions ---");
        for disease in &diseases.possible_diseases {
            let _ = writeln!(
                out,
                "{}: {:.1}% ({})",
                disease.name,
                disease.confidence,
                disease.risk_level.label()
            );
            for matched in &disease.matched_indicators {
                let _ = writeln!(out, "    {} (actual {})", matched.condition, matched.value);
            }
            let _ = writeln!(out, "    {}", disease.recommendation);
        }
        let _ = writeln!(out, "\n{}", diseases.summary);
        out
    }
}
