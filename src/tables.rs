//! Shared loading helpers for the JSON data tables.
//!
//! The alias and disease rule tables are JSON objects whose key order is
//! meaningful (first alias match wins, ties in ranking keep declaration order).
//! `serde_json` maps do not keep insertion order, so these tables are read
//! through [`OrderedEntries`], which collects object members as a `Vec`.

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a data table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Table file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read table file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse table file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid table entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },
}

/// JSON object members in document order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedEntries<V>(pub Vec<(String, V)>);

impl<V> OrderedEntries<V> {
    pub fn into_inner(self) -> Vec<(String, V)> {
        self.0
    }
}

struct OrderedEntriesVisitor<V> {
    marker: PhantomData<V>,
}

impl<'de, V> Visitor<'de> for OrderedEntriesVisitor<V>
where
    V: Deserialize<'de>,
{
    type Value = OrderedEntries<V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            entries.push((key, value));
        }
        Ok(OrderedEntries(entries))
    }
}

impl<'de, V> Deserialize<'de> for OrderedEntries<V>
where
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(OrderedEntriesVisitor {
            marker: PhantomData,
        })
    }
}

/// Read and parse a JSON table file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TableError> {
    if !path.exists() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}
