//! Disease inference: a static table of weighted condition rules scored
//! against canonical parameters.

pub mod engine;
pub mod rules;

pub use engine::{
    infer, round1, score_rule, summarize, DiseaseEngine, DiseasePrediction, InferenceResult,
    MatchedIndicator, RiskLevel, RuleScore, INCLUSION_THRESHOLD, NO_FINDINGS_SUMMARY,
};
pub use rules::{ConditionRule, Indicator, Operator, RuleTable, Threshold};
