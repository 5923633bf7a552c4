//! Permutations: one resolved token document per modifier selection
//!
//! - [`combinations`] enumerates selections, exhaustively or from the
//!   manifest's generation specs
//! - [`id`] derives the stable permutation id from a selection
//! - [`engine`] turns a selection into a merged, resolved [`Permutation`]

pub mod combinations;
pub mod engine;
pub mod id;

pub use combinations::{DirectedTarget, Scope, directed, exhaustive};
pub use engine::PermutationEngine;
pub use id::permutation_id;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Selected value(s) of one modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    One(String),
    Many(Vec<String>),
}

impl Selection {
    pub fn values(&self) -> Vec<String> {
        match self {
            Selection::One(value) => vec![value.clone()],
            Selection::Many(values) => values.clone(),
        }
    }

    /// Parse a comma-separated list; a single item is [`Selection::One`].
    pub fn parse(raw: &str) -> Self {
        let values: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        match values.as_slice() {
            [single] => Selection::One(single.clone()),
            _ => Selection::Many(values),
        }
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        Selection::One(value.to_string())
    }
}

impl From<Vec<&str>> for Selection {
    fn from(values: Vec<&str>) -> Self {
        Selection::Many(values.into_iter().map(String::from).collect())
    }
}

/// Modifier name -> selection, as requested by a caller.
pub type Assignment = BTreeMap<String, Selection>;

/// A rejected part of a modifier selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InputError {
    #[error("unknown modifier '{modifier}'")]
    UnknownModifier { modifier: String },

    #[error("modifier '{modifier}' has no value '{value}'")]
    UnknownValue { modifier: String, value: String },

    #[error("modifier '{modifier}' takes exactly one value, got {count}")]
    MultipleValues { modifier: String, count: usize },
}

/// Counts and diagnostics of one permutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermutationMetadata {
    pub file_count: usize,
    pub token_count: usize,
    pub group_count: usize,
    pub reference_count: usize,
    pub resolved_references: usize,
    pub unresolved_references: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// The resolved output for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Permutation {
    pub id: String,
    /// Output name from a generation spec
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Effective selection, defaults applied
    pub input: BTreeMap<String, Vec<String>>,
    pub files: Vec<String>,
    pub tokens: Value,
    pub metadata: PermutationMetadata,
}

impl Permutation {
    /// Name used for output files: the generated output name if any, else the id.
    pub fn output_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A permutation that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermutationFailure {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub error: String,
}

/// Outcome of a batch: every permutation is attempted independently.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub permutations: Vec<Permutation>,
    pub failures: Vec<PermutationFailure>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.permutations.iter().map(|p| p.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parse() {
        assert_eq!(Selection::parse("dark"), Selection::One("dark".into()));
        assert_eq!(Selection::parse("a, b"), Selection::from(vec!["a", "b"]));
        assert_eq!(Selection::parse(""), Selection::Many(vec![]));
    }

    #[test]
    fn selection_deserializes_untagged() {
        let input: Assignment =
            serde_json::from_str(r#"{"theme": "dark", "features": ["a", "b"]}"#).unwrap();
        assert_eq!(input["theme"], Selection::from("dark"));
        assert_eq!(input["features"].values(), vec!["a", "b"]);
    }
}
