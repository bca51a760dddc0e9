//! Low-level discovery documents.
//!
//! The server expects discovery rules to return `{"data":[{...},...]}` where
//! every entry maps `{#MACRO}` names to values.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

const MACRO_PATTERN: &str = r"^\{#[A-Z0-9_.]+\}$";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid macro name '{0}', expected {{#NAME}} with A-Z, 0-9, '_' or '.'")]
    InvalidMacro(String),
    #[error("Macro pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn macro_regex() -> Result<&'static Regex, DiscoveryError> {
    static COMPILED: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    COMPILED
        .get_or_init(|| Regex::new(MACRO_PATTERN))
        .as_ref()
        .map_err(|e| DiscoveryError::Pattern(e.clone()))
}

/// One discovered object: macro name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiscoveryEntry(BTreeMap<String, String>);

impl DiscoveryEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a macro, e.g. `with("{#QUEUE}", "orders-prod")`.
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, DiscoveryError> {
        let name = name.into();
        if !macro_regex()?.is_match(&name) {
            return Err(DiscoveryError::InvalidMacro(name));
        }
        self.0.insert(name, value.into());
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryDocument {
    data: Vec<DiscoveryEntry>,
}

impl DiscoveryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DiscoveryEntry) {
        self.data.push(entry);
    }

    pub fn entries(&self) -> &[DiscoveryEntry] {
        &self.data
    }

    pub fn to_json(&self) -> Result<String, DiscoveryError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl FromIterator<DiscoveryEntry> for DiscoveryDocument {
    fn from_iter<I: IntoIterator<Item = DiscoveryEntry>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_shape() {
        let document: DiscoveryDocument = ["orders-prod", "billing-prod"]
            .into_iter()
            .map(|queue| {
                DiscoveryEntry::new()
                    .with("{#QUEUE}", queue)
                    .and_then(|e| e.with("{#SHORT_NAME}", queue.trim_end_matches("-prod")))
                    .unwrap()
            })
            .collect();

        assert_eq!(
            document.to_json().unwrap(),
            r#"{"data":[{"{#QUEUE}":"orders-prod","{#SHORT_NAME}":"orders"},{"{#QUEUE}":"billing-prod","{#SHORT_NAME}":"billing"}]}"#
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(DiscoveryDocument::new().to_json().unwrap(), r#"{"data":[]}"#);
    }

    #[test]
    fn test_rejects_bad_macro_names() {
        for name in ["QUEUE", "{QUEUE}", "{#queue}", "{#}", "{#A B}"] {
            assert!(
                matches!(
                    DiscoveryEntry::new().with(name, "x"),
                    Err(DiscoveryError::InvalidMacro(_))
                ),
                "{name}"
            );
        }
        assert!(DiscoveryEntry::new().with("{#AWS.REGION_1}", "x").is_ok());
    }
}
