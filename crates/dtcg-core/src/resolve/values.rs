//! Reference depths and resolved values
//!
//! Both walks follow the same edges as type inference and share its
//! shape: an explicit memo table and visited set passed into a free
//! function.

use super::reference::{ReferenceTarget, select_member, substitute};
use crate::ast::TokenAst;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Fill `reference_depth` on every token.
///
/// Literal tokens have depth 0; each valid hop adds one. Unresolved,
/// circular and external chains have depth -1.
pub fn compute_depths(ast: &mut TokenAst) {
    let mut memo = HashMap::new();
    let mut visited = HashSet::new();
    let paths: Vec<String> = ast.tokens().map(|t| t.path.clone()).collect();
    let depths: Vec<i32> = paths
        .iter()
        .map(|path| reference_depth(ast, path, &mut memo, &mut visited))
        .collect();

    for (token, depth) in ast.tokens_mut().zip(depths) {
        token.reference_depth = depth;
    }
}

pub fn reference_depth(
    ast: &TokenAst,
    path: &str,
    memo: &mut HashMap<String, i32>,
    visited: &mut HashSet<String>,
) -> i32 {
    if let Some(depth) = memo.get(path) {
        return *depth;
    }
    if !visited.insert(path.to_string()) {
        return -1;
    }

    let depth = match ast.token(path) {
        None => -1,
        Some(token) if !token.valid => -1,
        Some(token) if !token.has_reference => 0,
        Some(_) => match ast.reference_from(path) {
            Some(edge) if edge.valid && !edge.circular && !edge.external => {
                match edge.resolved_path.as_deref() {
                    Some(target) => {
                        let inner = reference_depth(ast, target, memo, visited);
                        if inner < 0 { -1 } else { inner + 1 }
                    }
                    None => -1,
                }
            }
            _ => -1,
        },
    };

    memo.insert(path.to_string(), depth);
    depth
}

/// Fill `resolved_value` on every valid token by substituting every
/// resolvable internal reference, through full chains.
pub fn resolve_values(ast: &mut TokenAst) {
    let mut memo = HashMap::new();
    let mut visited = HashSet::new();
    let paths: Vec<String> = ast.tokens().map(|t| t.path.clone()).collect();
    let values: Vec<Option<Value>> = paths
        .iter()
        .map(|path| resolved_value(ast, path, &mut memo, &mut visited))
        .collect();

    for (token, value) in ast.tokens_mut().zip(values) {
        token.resolved_value = value;
    }
}

pub fn resolved_value(
    ast: &TokenAst,
    path: &str,
    memo: &mut HashMap<String, Option<Value>>,
    visited: &mut HashSet<String>,
) -> Option<Value> {
    if let Some(value) = memo.get(path) {
        return value.clone();
    }
    if !visited.insert(path.to_string()) {
        return None;
    }

    let token = ast.token(path)?;
    let value = if !token.valid {
        None
    } else if !token.has_reference {
        Some(token.value.clone())
    } else {
        Some(substitute(&token.value, &mut |raw| {
            match ReferenceTarget::classify(raw)? {
                ReferenceTarget::Internal { path, member } => {
                    let target = resolved_value(ast, &path, memo, visited)?;
                    select_member(&target, &member)
                }
                ReferenceTarget::External { .. } => None,
            }
        }))
    };

    memo.insert(path.to_string(), value.clone());
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::analyze_document;
    use serde_json::json;

    #[test]
    fn depth_counts_hops() {
        let ast = analyze_document(
            "tokens.json",
            &json!({
                "a": {"$value": "#fff"},
                "b": {"$value": "{a}"},
                "c": {"$value": "{b}"},
                "x": {"$value": "{missing}"}
            }),
        );
        let depth = |path: &str| ast.token(path).unwrap().reference_depth;
        assert_eq!(depth("a"), 0);
        assert_eq!(depth("b"), 1);
        assert_eq!(depth("c"), 2);
        assert_eq!(depth("x"), -1);
    }

    #[test]
    fn circular_tokens_have_negative_depth() {
        let ast = analyze_document(
            "tokens.json",
            &json!({
                "a": {"$value": "{b}"},
                "b": {"$value": "{a}"},
                "c": {"$value": "{a}"}
            }),
        );
        assert_eq!(ast.token("a").unwrap().reference_depth, -1);
        assert_eq!(ast.token("c").unwrap().reference_depth, -1);
    }

    #[test]
    fn values_resolve_through_chains() {
        let ast = analyze_document(
            "tokens.json",
            &json!({
                "a": {"$value": "#fff"},
                "b": {"$value": "{a}"},
                "c": {"$value": {"$ref": "#/b/$value"}},
                "border": {"$value": {"color": "{c}", "width": "1px", "style": "solid"}}
            }),
        );
        assert_eq!(ast.token("c").unwrap().resolved_value, Some(json!("#fff")));
        assert_eq!(
            ast.token("border").unwrap().resolved_value,
            Some(json!({"color": "#fff", "width": "1px", "style": "solid"}))
        );
    }

    #[test]
    fn member_references_select_into_values() {
        let ast = analyze_document(
            "tokens.json",
            &json!({
                "shadow": {"$value": {"color": "#000", "offsetX": "1px", "offsetY": "1px"}},
                "ink": {"$value": {"$ref": "#/shadow/$value/color"}}
            }),
        );
        assert_eq!(ast.token("ink").unwrap().resolved_value, Some(json!("#000")));
    }

    #[test]
    fn invalid_tokens_have_no_resolved_value() {
        let ast = analyze_document("tokens.json", &json!({"x": {"$value": "{missing}"}}));
        assert_eq!(ast.token("x").unwrap().resolved_value, None);
    }
}
