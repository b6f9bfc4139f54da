use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::aliases::{clean_label, ParameterDictionary};
use super::ParameterMap;

// Label of letters, spaces, hyphens, parentheses and slashes, then a colon or
// whitespace run, then an integer or decimal value (e.g. "Hemoglobin: 9.5 g/dL").
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z \-()/]+)[:\s]+([0-9]+(?:\.[0-9]+)?)").expect("line pattern is valid")
});

// Line terminators beyond `\n` and `\r\n`. OCR output uses form feeds
// between pages, and some PDF text layers end lines with a bare `\r`.
const EXTRA_LINE_BREAKS: &[char] = &[
    '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Split text into lines at every line terminator, treating `\r\n` as one
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().flat_map(|line| line.split(EXTRA_LINE_BREAKS))
}

/// A label/value pair matched on a single line, before alias resolution
#[derive(Debug, Clone, PartialEq)]
pub struct RawPair<'a> {
    pub label: &'a str,
    pub value: &'a str,
}

/// Match the first label/value pair on a line
pub fn match_line(line: &str) -> Option<RawPair<'_>> {
    let caps = LINE_PATTERN.captures(line)?;
    let label = caps.get(1)?.as_str().trim();
    let value = caps.get(2)?.as_str();
    Some(RawPair { label, value })
}

/// Turns free-form report text into canonical parameter values
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    dictionary: ParameterDictionary,
}

impl Extractor {
    pub fn new(dictionary: ParameterDictionary) -> Self {
        Self { dictionary }
    }

    /// Extract canonical parameters from raw text.
    ///
    /// Lines are split with [`split_lines`]. Each non-empty line contributes
    /// at most one value (its first match).
    /// Lines without a match, labels that resolve to no parameter, and values
    /// that fail to parse are skipped. A parameter seen on several lines keeps
    /// the last value.
    pub fn extract(&self, raw_text: &str) -> ParameterMap {
        let mut params = ParameterMap::new();

        for (line_no, line) in split_lines(raw_text).enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(pair) = match_line(line) else {
                continue;
            };

            let cleaned = clean_label(pair.label);
            let Some(canonical) = self.dictionary.canonicalize(&cleaned) else {
                debug!("Line {}: unrecognised label {:?}", line_no + 1, pair.label);
                continue;
            };

            let value: f64 = match pair.value.parse() {
                Ok(v) => v,
                Err(e) => {
                    debug!("Line {}: bad value {:?}: {}", line_no + 1, pair.value, e);
                    continue;
                }
            };

            if let Some(previous) = params.insert(canonical.to_string(), value) {
                debug!(
                    "Line {}: {} overrides earlier value {} with {}",
                    line_no + 1,
                    canonical,
                    previous,
                    value
                );
            }
        }

        debug!("Extracted {} parameters", params.len());
        params
    }
}

/// Extract parameters using the built-in alias table
pub fn extract(raw_text: &str) -> ParameterMap {
    Extractor::default().extract(raw_text)
}
