//! Type inference
//!
//! Explicit types (own or inherited) win. Otherwise the type is taken
//! from the target of a valid single-hop reference, recursively, and
//! finally guessed from the shape of the literal value.

use crate::ast::TokenAst;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
});

static DIMENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)(px|rem|em|%)$").unwrap());

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)ms$").unwrap());

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)$").unwrap());

/// Fill `resolved_type` on every token of `ast`.
pub fn infer_types(ast: &mut TokenAst) {
    let mut memo: HashMap<String, Option<String>> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();

    let paths: Vec<String> = ast.tokens().map(|t| t.path.clone()).collect();
    let inferred: Vec<Option<String>> = paths
        .iter()
        .map(|path| resolve_type(ast, path, &mut memo, &mut visited))
        .collect();

    for (token, resolved_type) in ast.tokens_mut().zip(inferred) {
        token.resolved_type = resolved_type;
    }
}

/// Type of the token at `path`, following valid references.
///
/// `memo` caches results per path; `visited` guards against revisiting a
/// path whose type is still being computed.
pub fn resolve_type(
    ast: &TokenAst,
    path: &str,
    memo: &mut HashMap<String, Option<String>>,
    visited: &mut HashSet<String>,
) -> Option<String> {
    if let Some(cached) = memo.get(path) {
        return cached.clone();
    }
    if !visited.insert(path.to_string()) {
        return None;
    }

    let token = ast.token(path)?;
    let resolved = if let Some(explicit) = token.explicit_type() {
        Some(explicit.to_string())
    } else if let Some(edge) = ast.reference_from(path)
        && edge.valid
        && !edge.circular
        && !edge.external
        && let Some(target) = edge.resolved_path.as_deref()
    {
        resolve_type(ast, target, memo, visited)
    } else {
        infer_from_value(&token.value).map(String::from)
    };

    memo.insert(path.to_string(), resolved.clone());
    resolved
}

/// Guess a token type from the shape of a literal value.
pub fn infer_from_value(value: &Value) -> Option<&'static str> {
    match value {
        Value::Number(_) => Some("number"),
        Value::String(text) => {
            let text = text.trim();
            if HEX_COLOR.is_match(text) {
                Some("color")
            } else if DIMENSION.is_match(text) {
                Some("dimension")
            } else if DURATION.is_match(text) {
                Some("duration")
            } else if NUMBER.is_match(text) {
                Some("number")
            } else {
                None
            }
        }
        Value::Object(map) => {
            let has = |key: &str| map.contains_key(key);
            if has("colorSpace") && has("components") {
                Some("color")
            } else if has("fontFamily") || has("fontSize") {
                Some("typography")
            } else if has("color") && has("offsetX") && has("offsetY") {
                Some("shadow")
            } else if has("color") && has("width") && has("style") {
                Some("border")
            } else {
                None
            }
        }
        _ => None,
    }
}
