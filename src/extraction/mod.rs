//! Key/value extraction from report text.
//!
//! Text is scanned line by line; each line's first `label value` pair is
//! resolved to a canonical parameter through the alias table.

pub mod aliases;
pub mod extractor;

pub use aliases::{clean_label, display_name, ParameterAlias, ParameterDictionary};
pub use extractor::{extract, match_line, split_lines, Extractor, RawPair};

use std::collections::BTreeMap;

/// Canonical parameter name to measured value
pub type ParameterMap = BTreeMap<String, f64>;
