//! Single-hop reference resolution within one document

use super::reference::ReferenceTarget;
use crate::ast::TokenAst;

/// Resolve every reference edge of `ast` by one hop.
///
/// External edges are accepted as-is and left for project resolution.
/// Internal edges are looked up in the token index; misses invalidate the
/// referencing token.
pub fn resolve_references(ast: &mut TokenAst) {
    for index in 0..ast.references.len() {
        let from = ast.references[index].from.clone();
        let raw = ast.references[index].to.clone();

        let Some(raw) = raw else {
            ast.references[index].valid = false;
            invalidate(ast, &from, "malformed reference: $ref must be a string".into());
            continue;
        };

        match ReferenceTarget::classify(&raw) {
            None => {
                ast.references[index].valid = false;
                invalidate(ast, &from, format!("malformed reference '{raw}'"));
            }
            Some(ReferenceTarget::External { .. }) => {
                let edge = &mut ast.references[index];
                edge.valid = true;
                edge.external = true;
                if let Some(token) = ast.token_mut(&from) {
                    token
                        .warnings
                        .push(format!("external reference '{raw}' is resolved at project scope"));
                }
            }
            Some(ReferenceTarget::Internal { path, .. }) => {
                if let Some(target) = ast.token_mut(&path) {
                    target.referenced_by.push(from.clone());
                    let edge = &mut ast.references[index];
                    edge.valid = true;
                    edge.resolved_path = Some(path);
                } else {
                    ast.references[index].valid = false;
                    invalidate(ast, &from, format!("unresolved reference '{raw}'"));
                }
            }
        }
    }

    tracing::debug!(
        file = %ast.file,
        references = ast.references.len(),
        invalid = ast.references.iter().filter(|r| !r.valid).count(),
        "Resolved references"
    );
}

fn invalidate(ast: &mut TokenAst, path: &str, message: String) {
    if let Some(token) = ast.token_mut(path) {
        token.invalidate(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_ast;
    use serde_json::json;

    fn resolved(document: serde_json::Value) -> TokenAst {
        let mut ast = build_ast("tokens.json", &document);
        resolve_references(&mut ast);
        ast
    }

    #[test]
    fn internal_reference_resolves() {
        let ast = resolved(json!({
            "a": {"$value": 1},
            "b": {"$value": "{a}"},
            "c": {"$value": {"$ref": "#/a/$value"}}
        }));

        let edge = ast.reference_from("b").unwrap();
        assert!(edge.valid);
        assert_eq!(edge.resolved_path.as_deref(), Some("a"));
        assert_eq!(ast.token("a").unwrap().referenced_by, vec!["b", "c"]);
    }

    #[test]
    fn missing_target_invalidates_token() {
        let ast = resolved(json!({"b": {"$value": "{nope}"}}));
        let token = ast.token("b").unwrap();
        assert!(!token.valid);
        assert_eq!(token.errors, vec!["unresolved reference '{nope}'"]);
        assert!(!ast.reference_from("b").unwrap().valid);
    }

    #[test]
    fn malformed_reference_invalidates_token() {
        let ast = resolved(json!({
            "b": {"$value": {"$ref": 42}},
            "c": {"$value": {"$ref": "#/"}}
        }));
        assert!(!ast.token("b").unwrap().valid);
        assert!(!ast.token("c").unwrap().valid);
        assert_eq!(ast.reference_from("b").unwrap().to, None);
    }

    #[test]
    fn external_reference_is_deferred() {
        let ast = resolved(json!({"b": {"$value": {"$ref": "base.json#/a"}}}));
        let token = ast.token("b").unwrap();
        let edge = ast.reference_from("b").unwrap();

        assert!(token.valid);
        assert!(edge.valid && edge.external);
        assert_eq!(edge.resolved_path, None);
        assert_eq!(token.warnings.len(), 1);
    }

    #[test]
    fn references_to_groups_do_not_resolve() {
        let ast = resolved(json!({
            "color": {"primary": {"$value": "#fff"}},
            "b": {"$value": "{color}"}
        }));
        assert!(!ast.token("b").unwrap().valid);
    }
}
