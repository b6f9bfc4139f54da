use std::path::Path;
use tracing::{debug, info, warn};

use crate::tables::{read_json, OrderedEntries, TableError};

/// Display names for the lowercase keys of the alias table.
/// Keys not listed here are presented capitalised.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("hemoglobin", "Hemoglobin"),
    ("wbc", "WBC"),
    ("platelets", "Platelets"),
    ("creatinine", "Creatinine"),
    ("sgpt", "SGPT"),
    ("sgot", "SGOT"),
    ("bilirubin", "Bilirubin"),
];

/// Built-in alias table used when no mapping file is available
const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    ("hemoglobin", &["hemoglobin", "hb", "hgb"]),
    ("wbc", &["wbc", "white blood cell", "wbcs"]),
    ("platelets", &["platelets", "plt", "platelet"]),
    ("creatinine", &["creatinine", "creat"]),
    ("sgpt", &["sgpt", "alt", "alanine"]),
    ("sgot", &["sgot", "ast", "aspartate"]),
    ("bilirubin", &["bilirubin", "bili"]),
];

/// Canonical display name for an alias table key
pub fn display_name(key: &str) -> String {
    if let Some((_, name)) = DISPLAY_NAMES.iter().find(|(k, _)| *k == key) {
        return (*name).to_string();
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Lower-case a raw label and keep only ASCII letters, digits and spaces
pub fn clean_label(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect()
}

/// One canonical parameter and the text aliases that resolve to it
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterAlias {
    /// Lowercase table key (e.g. "hemoglobin")
    pub key: String,
    /// Name used in parameter maps (e.g. "Hemoglobin")
    pub canonical: String,
    pub aliases: Vec<String>,
}

/// Ordered alias table mapping label text to canonical parameter names.
///
/// Lookup walks the table in declaration order and returns the first
/// parameter with an alias contained in the label. Overlapping aliases are
/// therefore resolved by table order alone: with the built-in table a label
/// such as "plt (alt method)" resolves to Platelets, never SGPT.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDictionary {
    entries: Vec<ParameterAlias>,
}

impl Default for ParameterDictionary {
    fn default() -> Self {
        let entries = DEFAULT_ALIASES
            .iter()
            .map(|(key, aliases)| ParameterAlias {
                key: (*key).to_string(),
                canonical: display_name(key),
                aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
            })
            .collect();
        Self { entries }
    }
}

impl ParameterDictionary {
    /// Build a dictionary from `(key, aliases)` pairs in lookup order
    pub fn from_entries(entries: Vec<(String, Vec<String>)>) -> Result<Self, TableError> {
        let mut built: Vec<ParameterAlias> = Vec::with_capacity(entries.len());
        for (key, aliases) in entries {
            let canonical = display_name(&key);
            if built.iter().any(|e| e.canonical == canonical) {
                return Err(TableError::InvalidEntry {
                    name: key,
                    reason: "duplicate canonical parameter".to_string(),
                });
            }
            if aliases.iter().any(|a| a.is_empty()) {
                return Err(TableError::InvalidEntry {
                    name: key,
                    reason: "empty alias would match every label".to_string(),
                });
            }
            built.push(ParameterAlias {
                key,
                canonical,
                aliases,
            });
        }
        Ok(Self { entries: built })
    }

    /// Load an alias table from a JSON file (`{"key": ["alias", ...]}`)
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let entries: OrderedEntries<Vec<String>> = read_json(path)?;
        let dictionary = Self::from_entries(entries.into_inner())?;
        info!(
            "Loaded {} parameter aliases from {:?}",
            dictionary.len(),
            path
        );
        Ok(dictionary)
    }

    /// Load an alias table, falling back to the built-in table on any failure
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::load(path) {
                Ok(dictionary) => dictionary,
                Err(TableError::NotFound(_)) => {
                    debug!("No alias table at {:?}, using built-in aliases", path);
                    Self::default()
                }
                Err(e) => {
                    warn!("Failed to load alias table, using built-in aliases: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    /// Resolve a cleaned label to its canonical parameter name
    pub fn canonicalize(&self, cleaned_label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .aliases
                    .iter()
                    .any(|alias| cleaned_label.contains(alias.as_str()))
            })
            .map(|entry| entry.canonical.as_str())
    }

    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.canonical.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
