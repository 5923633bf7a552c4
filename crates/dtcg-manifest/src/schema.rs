//! Schema validation for token and manifest documents
//!
//! Validation is consulted around the resolution engine: a document that
//! fails is skipped by discovery rather than aborting the whole run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of document being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Tokens,
    Manifest,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Tokens => write!(f, "tokens"),
            DocumentKind::Manifest => write!(f, "manifest"),
        }
    }
}

/// A field-level validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted location of the offending field (`<root>` for the document itself)
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validates decoded documents before they enter the engine.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, data: &Value, kind: DocumentKind) -> Result<(), Vec<FieldError>>;
}

/// Keys a token or group may carry besides its children.
const KNOWN_RESERVED: &[&str] = &[
    "$value",
    "$type",
    "$description",
    "$extensions",
    "$deprecated",
    "$schema",
    "$ref",
];

/// Built-in validator checking the structural rules of the token format.
///
/// Tokens: the root is an object; names contain no `{`, `}` or `.`;
/// `$type` and `$description` are strings; `$extensions` is an object; a
/// token carries no child nodes. Manifests: the root is an object (the
/// dialect-specific checks belong to the manifest front-ends).
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn new() -> Self {
        Self
    }

    fn validate_node(map: &Map<String, Value>, path: &str, issues: &mut Vec<FieldError>) {
        let field = |key: &str| {
            if path.is_empty() {
                key.to_string()
            } else {
                format!("{path}.{key}")
            }
        };

        if let Some(ty) = map.get("$type")
            && !ty.is_string()
        {
            issues.push(FieldError::new(field("$type"), "must be a string"));
        }
        if let Some(description) = map.get("$description")
            && !description.is_string()
        {
            issues.push(FieldError::new(field("$description"), "must be a string"));
        }
        if let Some(extensions) = map.get("$extensions")
            && !extensions.is_object()
        {
            issues.push(FieldError::new(field("$extensions"), "must be an object"));
        }

        let is_token = map.contains_key("$value");

        for (key, child) in map {
            if key.starts_with('$') {
                if !KNOWN_RESERVED.contains(&key.as_str()) {
                    tracing::debug!(field = %field(key), "Unknown reserved key");
                }
                continue;
            }
            if key.contains(['{', '}', '.']) {
                issues.push(FieldError::new(
                    field(key),
                    "name must not contain '{', '}' or '.'",
                ));
                continue;
            }
            if is_token {
                issues.push(FieldError::new(
                    field(key),
                    "a token must not contain child tokens or groups",
                ));
                continue;
            }
            if let Value::Object(child_map) = child {
                Self::validate_node(child_map, &field(key), issues);
            }
        }
    }
}

impl SchemaValidator for StructuralValidator {
    fn validate(&self, data: &Value, kind: DocumentKind) -> Result<(), Vec<FieldError>> {
        let Value::Object(map) = data else {
            return Err(vec![FieldError::new(
                "<root>",
                format!("{kind} document must be an object"),
            )]);
        };

        let mut issues = Vec::new();
        if kind == DocumentKind::Tokens {
            Self::validate_node(map, "", &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_tokens() {
        let doc = json!({
            "color": {
                "$type": "color",
                "primary": {"$value": "#0066CC", "$description": "Brand"}
            }
        });
        assert!(StructuralValidator.validate(&doc, DocumentKind::Tokens).is_ok());
    }

    #[test]
    fn rejects_non_object_root() {
        let issues = StructuralValidator
            .validate(&json!([1, 2]), DocumentKind::Manifest)
            .unwrap_err();
        assert_eq!(issues[0].field, "<root>");
    }

    #[test]
    fn reports_field_level_issues() {
        let doc = json!({
            "color": {
                "bad.name": {"$value": 1},
                "primary": {"$value": "#fff", "$type": 7, "nested": {"$value": 2}}
            }
        });
        let issues = StructuralValidator
            .validate(&doc, DocumentKind::Tokens)
            .unwrap_err();
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["color.bad.name", "color.primary.$type", "color.primary.nested"]
        );
    }
}
