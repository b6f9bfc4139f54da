use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::tables::{read_json, TableError};

/// Patient sex used to pick a sex-specific reference range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl std::str::FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            _ => Err(format!("Unknown sex: {}", s)),
        }
    }
}

/// Inclusive `[low, high]` bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds(pub f64, pub f64);

impl Bounds {
    pub fn low(&self) -> f64 {
        self.0
    }

    pub fn high(&self) -> f64 {
        self.1
    }

    fn is_valid(&self) -> bool {
        self.0 <= self.1
    }
}

/// Normal range for one canonical parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub male: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub female: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ReferenceRange {
    pub fn general(low: f64, high: f64, unit: &str) -> Self {
        Self {
            any: Some(Bounds(low, high)),
            unit: Some(unit.to_string()),
            ..Self::default()
        }
    }

    /// General bounds: `any`, else `male`, else `female`
    pub fn default_bounds(&self) -> Option<Bounds> {
        self.any.or(self.male).or(self.female)
    }

    /// Bounds for a sex, falling back to the general bounds
    pub fn bounds_for(&self, sex: Option<Sex>) -> Option<Bounds> {
        let specific = match sex {
            Some(Sex::Male) => self.male,
            Some(Sex::Female) => self.female,
            None => None,
        };
        specific.or_else(|| self.default_bounds())
    }

    /// Drop variants with `low > high`; returns the names of dropped variants
    fn retain_valid(&mut self) -> Vec<&'static str> {
        let mut dropped = Vec::new();
        for (label, slot) in [
            ("any", &mut self.any),
            ("male", &mut self.male),
            ("female", &mut self.female),
        ] {
            if slot.map_or(false, |b| !b.is_valid()) {
                *slot = None;
                dropped.push(label);
            }
        }
        dropped
    }
}

/// Reference ranges keyed by canonical parameter name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceRangeTable {
    ranges: HashMap<String, ReferenceRange>,
}

impl ReferenceRangeTable {
    /// Build a table, dropping variants that violate `low <= high`
    /// and entries left without any usable bounds.
    pub fn from_ranges(ranges: HashMap<String, ReferenceRange>) -> Self {
        let mut table = HashMap::with_capacity(ranges.len());
        for (name, mut range) in ranges {
            for variant in range.retain_valid() {
                warn!("Dropping {} range for {}: low is above high", variant, name);
            }
            if range.default_bounds().is_none() {
                warn!("Dropping range entry for {}: no usable bounds", name);
                continue;
            }
            table.insert(name, range);
        }
        Self { ranges: table }
    }

    /// Load `{ "<name>": { "any"|"male"|"female": [low, high], "unit": "..." } }`
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let ranges: HashMap<String, ReferenceRange> = read_json(path)?;
        let table = Self::from_ranges(ranges);
        info!("Loaded {} reference ranges from {:?}", table.len(), path);
        Ok(table)
    }

    /// Load a table; a missing or unreadable file yields an empty table
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::load(path) {
                Ok(table) => table,
                Err(TableError::NotFound(_)) => {
                    debug!("No reference range table at {:?}", path);
                    Self::default()
                }
                Err(e) => {
                    warn!("Failed to load reference ranges: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceRange> {
        self.ranges.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, range: ReferenceRange) {
        self.ranges.insert(name.into(), range);
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
