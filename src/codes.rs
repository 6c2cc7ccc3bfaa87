//! Language code table loading and lookup.
//! The table maps a detector code (e.g. "en") to its display name
//! ("English"). It is loaded once before the listener starts and is never
//! mutated afterwards.

use std::collections::HashMap;
use std::path::Path;

/// Display name substituted when a detected code is missing from the table.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, thiserror::Error)]
pub enum CodeTableError {
    #[error("language table IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("language table parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("language table is empty")]
    Empty,
}

/// Immutable code -> display name mapping.
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    names: HashMap<String, String>,
}

impl LanguageTable {
    /// Load the table from a JSON object file (`{"en": "English", ...}`).
    pub fn load_from_file(path: &Path) -> Result<Self, CodeTableError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a JSON object of code/name pairs. An empty object is rejected,
    /// it would turn every result into an "Unknown" one.
    pub fn from_json(content: &str) -> Result<Self, CodeTableError> {
        let table = Self {
            names: serde_json::from_str(content)?,
        };
        if table.is_empty() {
            return Err(CodeTableError::Empty);
        }
        Ok(table)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Display name for `code`, `None` when the table has no entry.
    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
