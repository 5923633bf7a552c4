//! Post-resolution transform hooks
//!
//! A transform maps a permutation's token document to a new document.
//! Transforms run in order over a copy; the permutation itself is never
//! modified.

use crate::ast::{NodeKind, classify_node};
use crate::error::{Error, Result};
use crate::fault::catch_fault;
use crate::permutation::Permutation;
use serde_json::{Map, Value};

/// Error returned by a transform.
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// A `tokens -> tokens` hook applied after resolution.
pub trait Transform: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    fn apply(&self, tokens: &Value) -> std::result::Result<Value, TransformError>;
}

/// Run `transforms` in order over a copy of the permutation's tokens.
///
/// The first failing transform (error or panic) stops the pipeline.
pub fn apply_transforms(permutation: &Permutation, transforms: &[Box<dyn Transform>]) -> Result<Value> {
    let mut tokens = permutation.tokens.clone();
    for transform in transforms {
        let failed = |message: String| Error::Transform {
            transform: transform.name().to_string(),
            permutation: permutation.id.clone(),
            message,
        };
        tokens = match catch_fault(|| transform.apply(&tokens)) {
            Ok(Ok(next)) => next,
            Ok(Err(e)) => return Err(failed(e.to_string())),
            Err(panic) => return Err(failed(panic)),
        };
        tracing::debug!(transform = transform.name(), permutation = %permutation.id, "Applied transform");
    }
    Ok(tokens)
}

/// Transform backed by a closure.
pub struct FnTransform<F> {
    name: String,
    f: F,
}

impl<F> Transform for FnTransform<F>
where
    F: Fn(&Value) -> std::result::Result<Value, TransformError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, tokens: &Value) -> std::result::Result<Value, TransformError> {
        (self.f)(tokens)
    }
}

/// Wrap a closure as a named [`Transform`].
pub fn transform_fn<F>(name: impl Into<String>, f: F) -> FnTransform<F>
where
    F: Fn(&Value) -> std::result::Result<Value, TransformError> + Send + Sync,
{
    FnTransform { name: name.into(), f }
}

/// Flatten nested groups into a single object keyed by dotted token path.
///
/// Group `$type`s are pushed down onto tokens that do not declare one.
#[derive(Debug, Default, Clone, Copy)]
pub struct Flatten;

impl Transform for Flatten {
    fn name(&self) -> &str {
        "flatten"
    }

    fn apply(&self, tokens: &Value) -> std::result::Result<Value, TransformError> {
        let mut out = Map::new();
        flatten_into(tokens, "", None, &mut out);
        Ok(Value::Object(out))
    }
}

fn flatten_into(node: &Value, path: &str, inherited: Option<&Value>, out: &mut Map<String, Value>) {
    let Value::Object(map) = node else {
        return;
    };
    match classify_node(map) {
        Some(NodeKind::Token) if !path.is_empty() => {
            let mut token = map.clone();
            if !token.contains_key("$type")
                && let Some(kind) = inherited
            {
                token.insert("$type".into(), kind.clone());
            }
            out.insert(path.to_string(), Value::Object(token));
        }
        _ => {
            let inherited = map.get("$type").or(inherited);
            for (key, child) in map.iter().filter(|(key, _)| !key.starts_with('$')) {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                flatten_into(child, &child_path, inherited, out);
            }
        }
    }
}

/// Remove `$description` and `$extensions` everywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct StripMetadata;

impl Transform for StripMetadata {
    fn name(&self) -> &str {
        "strip-metadata"
    }

    fn apply(&self, tokens: &Value) -> std::result::Result<Value, TransformError> {
        Ok(strip(tokens))
    }
}

fn strip(node: &Value) -> Value {
    match node {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !matches!(key.as_str(), "$description" | "$extensions"))
                .map(|(key, value)| {
                    // token values are data, not metadata
                    if key == "$value" {
                        (key.clone(), value.clone())
                    } else {
                        (key.clone(), strip(value))
                    }
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permutation::PermutationMetadata;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn permutation(tokens: Value) -> Permutation {
        Permutation {
            id: "theme-dark".into(),
            name: None,
            input: BTreeMap::new(),
            files: vec![],
            tokens,
            metadata: PermutationMetadata::default(),
        }
    }

    #[test]
    fn flatten_uses_dotted_paths_and_inherits_type() {
        let tokens = json!({
            "color": {
                "$type": "color",
                "primary": {"$value": "#000"},
                "accent": {"light": {"$value": "#fff", "$type": "color"}}
            },
            "size": {"$value": 4, "$type": "number"}
        });
        let flat = Flatten.apply(&tokens).unwrap();
        assert_eq!(
            flat,
            json!({
                "color.primary": {"$value": "#000", "$type": "color"},
                "color.accent.light": {"$value": "#fff", "$type": "color"},
                "size": {"$value": 4, "$type": "number"}
            })
        );
    }

    #[test]
    fn strip_metadata_keeps_values() {
        let tokens = json!({
            "$description": "root",
            "a": {
                "$value": {"$description": "part of the value"},
                "$description": "token",
                "$extensions": {"x": 1}
            }
        });
        assert_eq!(
            StripMetadata.apply(&tokens).unwrap(),
            json!({"a": {"$value": {"$description": "part of the value"}}})
        );
    }

    #[test]
    fn transforms_run_in_order_on_a_copy() {
        let original = permutation(json!({"a": {"$value": 1, "$description": "x"}}));
        let transforms: Vec<Box<dyn Transform>> = vec![Box::new(StripMetadata), Box::new(Flatten)];

        let out = apply_transforms(&original, &transforms).unwrap();
        assert_eq!(out, json!({"a": {"$value": 1}}));
        assert_eq!(original.tokens["a"]["$description"], json!("x"));
    }

    #[test]
    fn failing_transform_is_reported() {
        let original = permutation(json!({}));
        let transforms: Vec<Box<dyn Transform>> = vec![Box::new(transform_fn("reject", |_| {
            Err("no tokens".into())
        }))];

        let err = apply_transforms(&original, &transforms).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Transform 'reject' failed for permutation theme-dark: no tokens"
        );
    }

    #[test]
    fn panicking_transform_is_caught() {
        let original = permutation(json!({}));
        let transforms: Vec<Box<dyn Transform>> = vec![Box::new(transform_fn("boom", |_| {
            panic!("exploded")
        }))];

        let err = apply_transforms(&original, &transforms).unwrap_err();
        assert!(matches!(err, Error::Transform { ref message, .. } if message == "exploded"));
    }
}
