//! Structural merge of token documents
//!
//! `merge_documents(base, overlay)` walks both trees together. The later
//! document wins wherever the two disagree on a value, but never where
//! they disagree on structure: a token meeting a group, or two different
//! types at the same path, is a [`MergeError`] and the merge produces
//! nothing.

use crate::ast::{NodeKind, classify_node, is_reserved};
use serde_json::{Map, Value};

/// Types whose `$value` is merged member by member.
pub const COMPOSITE_TYPES: &[&str] = &[
    "shadow",
    "typography",
    "border",
    "transition",
    "gradient",
    "strokeStyle",
];

/// Structural conflict between two documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("Cannot merge a {overlay} into a {base} at '{path}'")]
    KindConflict {
        path: String,
        base: NodeKind,
        overlay: NodeKind,
    },

    #[error("Type conflict at '{path}': '{base}' cannot be merged with '{overlay}'")]
    TypeConflict {
        path: String,
        base: String,
        overlay: String,
    },
}

impl MergeError {
    pub fn path(&self) -> &str {
        match self {
            MergeError::KindConflict { path, .. } | MergeError::TypeConflict { path, .. } => path,
        }
    }
}

/// Group types in effect on each side of the merge.
#[derive(Debug, Clone, Copy, Default)]
struct Inherited<'a> {
    base: Option<&'a str>,
    overlay: Option<&'a str>,
}

/// Merge `overlay` onto `base`, returning the combined document.
pub fn merge_documents(base: &Value, overlay: &Value) -> Result<Value, MergeError> {
    let mut merged = base.clone();
    match (&mut merged, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            merge_group(base_map, overlay_map, "", Inherited::default())?;
        }
        (slot, other) => *slot = other.clone(),
    }
    Ok(merged)
}

/// Merge documents left to right; later documents win.
pub fn merge_all<'a>(
    documents: impl IntoIterator<Item = &'a Value>,
) -> Result<Value, MergeError> {
    let mut merged = Value::Object(Map::new());
    for document in documents {
        merged = merge_documents(&merged, document)?;
    }
    Ok(merged)
}

fn merge_node(
    base: &mut Value,
    overlay: &Value,
    path: &str,
    inherited: Inherited<'_>,
) -> Result<(), MergeError> {
    let Value::Object(overlay_map) = overlay else {
        if !overlay.is_null() {
            *base = overlay.clone();
        }
        return Ok(());
    };
    let base_kind = match base {
        Value::Object(base_map) => classify_node(base_map),
        _ => {
            *base = overlay.clone();
            return Ok(());
        }
    };
    let overlay_kind = classify_node(overlay_map);
    if overlay_kind.is_none() && overlay_map.contains_key("$ref") {
        *base = overlay.clone();
        return Ok(());
    }
    let Value::Object(base_map) = base else {
        return Ok(());
    };

    match (base_kind, overlay_kind) {
        (Some(base_kind), Some(overlay_kind)) if base_kind != overlay_kind => {
            Err(MergeError::KindConflict {
                path: path.to_string(),
                base: base_kind,
                overlay: overlay_kind,
            })
        }
        (Some(NodeKind::Token), Some(NodeKind::Token)) => {
            merge_token(base_map, overlay_map, path, inherited)
        }
        _ => merge_group(base_map, overlay_map, path, inherited),
    }
}

fn merge_group(
    base: &mut Map<String, Value>,
    overlay: &Map<String, Value>,
    path: &str,
    inherited: Inherited<'_>,
) -> Result<(), MergeError> {
    let base_type = type_of(base).map(String::from);
    let overlay_type = type_of(overlay).or(inherited.overlay);
    check_types(
        path,
        base_type.as_deref().or(inherited.base),
        overlay_type,
    )?;

    let base_context = base_type.or_else(|| inherited.base.map(String::from));
    let child_context = Inherited {
        base: base_context.as_deref(),
        overlay: overlay_type,
    };

    for (key, overlay_value) in overlay {
        if overlay_value.is_null() {
            continue;
        }
        if is_reserved(key) {
            merge_reserved(base, key, overlay_value);
            continue;
        }
        let child_path = join_path(path, key);
        match base.get_mut(key) {
            Some(base_value) => merge_node(base_value, overlay_value, &child_path, child_context)?,
            None => {
                base.insert(key.clone(), overlay_value.clone());
            }
        }
    }
    Ok(())
}

fn merge_token(
    base: &mut Map<String, Value>,
    overlay: &Map<String, Value>,
    path: &str,
    inherited: Inherited<'_>,
) -> Result<(), MergeError> {
    let base_type = type_of(base).or(inherited.base).map(String::from);
    let overlay_type = type_of(overlay).or(inherited.overlay);
    check_types(path, base_type.as_deref(), overlay_type)?;

    let composite = overlay_type
        .or(base_type.as_deref())
        .is_some_and(|t| COMPOSITE_TYPES.contains(&t));

    for (key, overlay_value) in overlay {
        if overlay_value.is_null() {
            continue;
        }
        if key == "$value" {
            match base.get_mut(key) {
                Some(base_value) if composite => deep_merge_value(base_value, overlay_value),
                _ => {
                    base.insert(key.clone(), overlay_value.clone());
                }
            }
        } else {
            merge_reserved(base, key, overlay_value);
        }
    }
    Ok(())
}

/// `$extensions` deep-merges; every other key is overlay-wins.
fn merge_reserved(base: &mut Map<String, Value>, key: &str, overlay_value: &Value) {
    match base.get_mut(key) {
        Some(base_value) if key == "$extensions" => deep_merge_value(base_value, overlay_value),
        _ => {
            base.insert(key.to_string(), overlay_value.clone());
        }
    }
}

fn check_types(path: &str, base: Option<&str>, overlay: Option<&str>) -> Result<(), MergeError> {
    match (base, overlay) {
        (Some(base), Some(overlay)) if base != overlay => Err(MergeError::TypeConflict {
            path: path.to_string(),
            base: base.to_string(),
            overlay: overlay.to_string(),
        }),
        _ => Ok(()),
    }
}

fn type_of(map: &Map<String, Value>) -> Option<&str> {
    map.get("$type").and_then(Value::as_str)
}

/// Deep merge two JSON values
///
/// Objects merge recursively with `overlay` taking precedence; a `$ref`
/// object is replaced whole. Anything else is replaced by `overlay`.
fn deep_merge_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map))
            if !overlay_map.contains_key("$ref") =>
        {
            for (key, overlay_val) in overlay_map {
                if let Some(base_val) = base_map.get_mut(key) {
                    deep_merge_value(base_val, overlay_val);
                } else {
                    base_map.insert(key.clone(), overlay_val.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
