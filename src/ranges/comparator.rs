use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::table::{Bounds, ReferenceRangeTable, Sex};
use crate::extraction::ParameterMap;

/// Where a value falls relative to its reference range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeStatus {
    Low,
    Normal,
    High,
    /// No reference range available for the parameter
    Unknown,
}

/// Comparison result for one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterComparison {
    pub value: f64,
    pub status: RangeStatus,
    #[serde(rename = "normal_range", default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ParameterComparison {
    fn unknown(value: f64) -> Self {
        Self {
            value,
            status: RangeStatus::Unknown,
            range: None,
            unit: None,
        }
    }
}

/// Comparison results keyed by canonical parameter name
pub type RangeComparison = BTreeMap<String, ParameterComparison>;

/// Classify a value against inclusive bounds
pub fn classify(value: f64, bounds: Bounds) -> RangeStatus {
    if value < bounds.low() {
        RangeStatus::Low
    } else if value > bounds.high() {
        RangeStatus::High
    } else {
        RangeStatus::Normal
    }
}

/// Compare every parameter against the general reference ranges
pub fn compare(params: &ParameterMap, ranges: &ReferenceRangeTable) -> RangeComparison {
    compare_for_sex(params, ranges, None)
}

/// Compare every parameter, preferring the ranges for `sex` where defined.
///
/// Every input key appears in the output; parameters without a range are
/// reported as [`RangeStatus::Unknown`] with no range or unit.
pub fn compare_for_sex(
    params: &ParameterMap,
    ranges: &ReferenceRangeTable,
    sex: Option<Sex>,
) -> RangeComparison {
    params
        .iter()
        .map(|(name, &value)| {
            let entry = ranges.get(name).and_then(|range| {
                range.bounds_for(sex).map(|bounds| ParameterComparison {
                    value,
                    status: classify(value, bounds),
                    range: Some(bounds),
                    unit: Some(range.unit.clone().unwrap_or_default()),
                })
            });
            (
                name.clone(),
                entry.unwrap_or_else(|| ParameterComparison::unknown(value)),
            )
        })
        .collect()
}
