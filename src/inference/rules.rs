use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::tables::{read_json, OrderedEntries, TableError};

/// Comparison applied by an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">")]
    GreaterThan,
}

impl Operator {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::LessThan => value < threshold,
            Self::GreaterThan => value > threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::GreaterThan => ">",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Indicator threshold, keeping the form it was declared in.
///
/// `Integer(11)` prints as "11" and `Decimal(2.0)` as "2.0", so condition text
/// matches the rule table as written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Integer(i64),
    Decimal(f64),
}

impl Threshold {
    pub fn value(&self) -> f64 {
        match *self {
            Self::Integer(v) => v as f64,
            Self::Decimal(v) => v,
        }
    }
}

impl From<i64> for Threshold {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Threshold {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Decimal(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Self::Decimal(v) => write!(f, "{}", v),
        }
    }
}

/// One weighted threshold check against a canonical parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub param: String,
    pub operator: Operator,
    #[serde(rename = "value")]
    pub threshold: Threshold,
    pub weight: f64,
}

impl Indicator {
    pub fn new(param: &str, operator: Operator, threshold: impl Into<Threshold>, weight: f64) -> Self {
        Self {
            param: param.to_string(),
            operator,
            threshold: threshold.into(),
            weight,
        }
    }

    pub fn holds(&self, value: f64) -> bool {
        self.operator.holds(value, self.threshold.value())
    }

    /// Human-readable condition, e.g. "Hemoglobin < 11" or "Bilirubin > 2.0"
    pub fn condition(&self) -> String {
        format!("{} {} {}", self.param, self.operator, self.threshold)
    }
}

/// Rule body as stored in a rule table file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RuleBody {
    description: String,
    indicators: Vec<Indicator>,
    #[serde(default)]
    symptoms: Vec<String>,
}

/// A named condition with its weighted indicators
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRule {
    pub name: String,
    pub description: String,
    pub indicators: Vec<Indicator>,
    pub symptoms: Vec<String>,
}

impl ConditionRule {
    pub fn new(name: &str, description: &str, indicators: Vec<Indicator>, symptoms: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            indicators,
            symptoms: symptoms.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Sum of all declared indicator weights
    pub fn total_weight(&self) -> f64 {
        self.indicators.iter().map(|i| i.weight).sum()
    }

    fn validate(&self) -> Result<(), TableError> {
        for indicator in &self.indicators {
            if !(indicator.weight > 0.0 && indicator.weight <= 1.0) {
                return Err(TableError::InvalidEntry {
                    name: self.name.clone(),
                    reason: format!(
                        "weight {} for {} is outside (0, 1]",
                        indicator.weight, indicator.param
                    ),
                });
            }
            if !indicator.threshold.value().is_finite() {
                return Err(TableError::InvalidEntry {
                    name: self.name.clone(),
                    reason: format!("threshold for {} is not finite", indicator.param),
                });
            }
        }
        Ok(())
    }
}

/// Ordered, read-only table of condition rules.
///
/// Declaration order is significant: conditions with equal confidence are
/// ranked in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    rules: Vec<ConditionRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<ConditionRule>) -> Result<Self, TableError> {
        for (i, rule) in rules.iter().enumerate() {
            rule.validate()?;
            if rules[..i].iter().any(|r| r.name == rule.name) {
                return Err(TableError::InvalidEntry {
                    name: rule.name.clone(),
                    reason: "duplicate condition name".to_string(),
                });
            }
        }
        Ok(Self { rules })
    }

    /// Load `{ "<name>": {description, indicators: [{param, operator, value, weight}], symptoms} }`
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let entries: OrderedEntries<RuleBody> = read_json(path)?;
        let rules = entries
            .into_inner()
            .into_iter()
            .map(|(name, body)| ConditionRule {
                name,
                description: body.description,
                indicators: body.indicators,
                symptoms: body.symptoms,
            })
            .collect();
        let table = Self::new(rules)?;
        info!("Loaded {} condition rules from {:?}", table.len(), path);
        Ok(table)
    }

    /// Load a rule table, falling back to the built-in rules on any failure
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::load(path) {
                Ok(table) => table,
                Err(TableError::NotFound(_)) => {
                    debug!("No rule table at {:?}, using built-in rules", path);
                    Self::default()
                }
                Err(e) => {
                    warn!("Failed to load rule table, using built-in rules: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    pub fn rules(&self) -> &[ConditionRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&ConditionRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        use Operator::{GreaterThan as Gt, LessThan as Lt};
        use Threshold::{Decimal as Dec, Integer as Int};

        let rules = vec![
            ConditionRule::new(
                "Anemia",
                "Low red blood cell count or hemoglobin levels",
                vec![
                    Indicator::new("Hemoglobin", Lt, Int(11), 0.9),
                    Indicator::new("WBC", Lt, Int(4000), 0.3),
                ],
                &["Fatigue", "Shortness of breath", "Weakness", "Pale skin"],
            ),
            ConditionRule::new(
                "Kidney Disease",
                "Impaired kidney function",
                vec![
                    Indicator::new("Creatinine", Gt, Dec(1.3), 0.85),
                    Indicator::new("Bilirubin", Gt, Dec(1.5), 0.2),
                ],
                &["Fatigue", "Swelling in legs", "Difficulty urinating", "Blood in urine"],
            ),
            ConditionRule::new(
                "Liver Disease",
                "Impaired liver function",
                vec![
                    Indicator::new("SGPT", Gt, Int(56), 0.8),
                    Indicator::new("SGOT", Gt, Int(40), 0.8),
                    Indicator::new("Bilirubin", Gt, Dec(1.2), 0.7),
                ],
                &["Jaundice", "Fatigue", "Abdominal pain", "Dark urine"],
            ),
            ConditionRule::new(
                "Infection/Leukemia",
                "Bacterial or viral infection, possible blood disorder",
                vec![
                    Indicator::new("WBC", Gt, Int(11000), 0.75),
                    Indicator::new("Platelets", Lt, Int(150000), 0.6),
                ],
                &["Fever", "Chills", "Easy bruising", "Frequent infections"],
            ),
            ConditionRule::new(
                "Hemolytic Anemia",
                "Destruction of red blood cells",
                vec![
                    Indicator::new("Hemoglobin", Lt, Int(10), 0.85),
                    Indicator::new("Bilirubin", Gt, Dec(2.0), 0.8),
                    Indicator::new("WBC", Gt, Int(8000), 0.4),
                ],
                &["Dark urine", "Yellowing of skin", "Shortness of breath", "Headache"],
            ),
            ConditionRule::new(
                "Thrombocytopenia",
                "Low platelet count",
                vec![
                    Indicator::new("Platelets", Lt, Int(150000), 0.95),
                    Indicator::new("Hemoglobin", Lt, Int(12), 0.3),
                ],
                &["Easy bruising", "Petechiae (small red spots)", "Bleeding gums", "Nosebleeds"],
            ),
            ConditionRule::new(
                "Polycythemia",
                "High red blood cell count",
                vec![
                    Indicator::new("Hemoglobin", Gt, Int(18), 0.85),
                    Indicator::new("WBC", Gt, Int(9000), 0.4),
                ],
                &["Headache", "Dizziness", "Shortness of breath", "Itching"],
            ),
        ];

        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_table_order_and_weights() {
        let table = RuleTable::default();
        let names: Vec<&str> = table.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Anemia",
                "Kidney Disease",
                "Liver Disease",
                "Infection/Leukemia",
                "Hemolytic Anemia",
                "Thrombocytopenia",
                "Polycythemia",
            ]
        );
        assert!((table.get("Anemia").unwrap().total_weight() - 1.2).abs() < 1e-9);
        assert!((table.get("Liver Disease").unwrap().total_weight() - 2.3).abs() < 1e-9);
        // Built-in table passes the same validation as loaded tables
        assert!(RuleTable::new(table.rules().to_vec()).is_ok());
    }

    #[test]
    fn test_operator_is_strict() {
        assert!(Operator::LessThan.holds(10.9, 11.0));
        assert!(!Operator::LessThan.holds(11.0, 11.0));
        assert!(Operator::GreaterThan.holds(1.31, 1.3));
        assert!(!Operator::GreaterThan.holds(1.3, 1.3));
    }

    #[test]
    fn test_indicator_condition_text() {
        assert_eq!(
            Indicator::new("Hemoglobin", Operator::LessThan, 11_i64, 0.9).condition(),
            "Hemoglobin < 11"
        );
        assert_eq!(
            Indicator::new("Bilirubin", Operator::GreaterThan, 2.0, 0.8).condition(),
            "Bilirubin > 2.0"
        );
        assert_eq!(
            Indicator::new("Creatinine", Operator::GreaterThan, 1.3, 0.85).condition(),
            "Creatinine > 1.3"
        );
    }

    #[test]
    fn test_rejects_out_of_range_weight() {
        let rule = ConditionRule::new(
            "Bad",
            "bad weight",
            vec![Indicator::new("WBC", Operator::GreaterThan, 11000.0, 1.5)],
            &[],
        );
        assert!(matches!(
            RuleTable::new(vec![rule]),
            Err(TableError::InvalidEntry { .. })
        ));

        let zero = ConditionRule::new(
            "Zero",
            "zero weight",
            vec![Indicator::new("WBC", Operator::GreaterThan, 11000.0, 0.0)],
            &[],
        );
        assert!(RuleTable::new(vec![zero]).is_err());
    }

    #[test]
    fn test_load_preserves_declaration_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{
                "Hyperglycemia": {
                    "description": "High blood sugar",
                    "indicators": [{"param": "Glucose", "operator": ">", "value": 125, "weight": 0.9}],
                    "symptoms": ["Thirst"]
                },
                "Anemia": {
                    "description": "Low hemoglobin",
                    "indicators": [{"param": "Hemoglobin", "operator": "<", "value": 11, "weight": 0.9}]
                }
            }"#,
        )
        .unwrap();

        let table = RuleTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rules()[0].name, "Hyperglycemia");
        assert_eq!(table.rules()[0].indicators[0].operator, Operator::GreaterThan);
        assert_eq!(table.rules()[0].indicators[0].threshold, Threshold::Integer(125));
        assert!(table.rules()[1].symptoms.is_empty());
    }

    #[test]
    fn test_loaded_threshold_form_drives_condition_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"Jaundice": {"description": "", "indicators": [
                {"param": "Bilirubin", "operator": ">", "value": 2.0, "weight": 0.8},
                {"param": "SGOT", "operator": ">", "value": 40, "weight": 0.5}
            ]}}"#,
        )
        .unwrap();

        let table = RuleTable::load(&path).unwrap();
        let indicators = &table.get("Jaundice").unwrap().indicators;
        assert_eq!(indicators[0].threshold, Threshold::Decimal(2.0));
        assert_eq!(indicators[0].condition(), "Bilirubin > 2.0");
        assert_eq!(indicators[1].threshold, Threshold::Integer(40));
        assert_eq!(indicators[1].condition(), "SGOT > 40");
        assert!(indicators[1].holds(40.5));
    }

    #[test]
    fn test_load_or_default_on_bad_operator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"X": {"description": "", "indicators": [{"param": "WBC", "operator": ">=", "value": 1, "weight": 0.5}]}}"#,
        )
        .unwrap();
        assert_eq!(RuleTable::load_or_default(Some(&path)), RuleTable::default());
    }
}
