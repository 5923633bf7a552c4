//! Recursive descent from a decoded document to a [`TokenAst`]

use super::{
    ExternalReference, Group, GroupId, NodeId, NodeKind, Reference, Token, TokenAst, TokenId,
    classify_node, is_reserved,
};
use crate::resolve::reference::{ReferenceTarget, find_references, resolve_file_path};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Owns the arenas and indices while a document is walked.
///
/// The builder is threaded through the recursion by `&mut self`, so a
/// subtree can be built into a fresh builder on its own.
#[derive(Debug)]
pub struct AstBuilder {
    file: String,
    tokens: Vec<Token>,
    groups: Vec<Group>,
    token_index: HashMap<String, TokenId>,
    group_index: HashMap<String, GroupId>,
    references: Vec<Reference>,
    reference_index: HashMap<String, usize>,
    external_references: Vec<ExternalReference>,
    warnings: Vec<String>,
}

impl AstBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            tokens: Vec::new(),
            groups: Vec::new(),
            token_index: HashMap::new(),
            group_index: HashMap::new(),
            references: Vec::new(),
            reference_index: HashMap::new(),
            external_references: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Build the tree for `document`.
    pub fn build(mut self, document: &Value) -> TokenAst {
        let root = self.push_group(String::new(), String::new(), None, None);
        match document {
            Value::Object(map) => {
                let root_type = string_field(map, "$type");
                if let Some(description) = string_field(map, "$description") {
                    self.groups[root.0].description = Some(description);
                }
                self.groups[root.0].declared_type = root_type.clone();
                self.visit_children(root, "", map, root_type.as_deref());
            }
            other => self.warn(format!(
                "document root: expected an object, found {}",
                value_kind(other)
            )),
        }

        tracing::debug!(
            file = %self.file,
            tokens = self.tokens.len(),
            groups = self.groups.len() - 1,
            references = self.references.len(),
            "Built token AST"
        );

        TokenAst {
            file: self.file,
            source: document.clone(),
            root,
            tokens: self.tokens,
            groups: self.groups,
            token_index: self.token_index,
            group_index: self.group_index,
            references: self.references,
            reference_index: self.reference_index,
            external_references: self.external_references,
            warnings: self.warnings,
        }
    }

    fn visit_children(
        &mut self,
        parent: GroupId,
        prefix: &str,
        map: &Map<String, Value>,
        inherited_type: Option<&str>,
    ) {
        for (key, child) in map {
            if is_reserved(key) {
                continue;
            }
            let path = join_path(prefix, key);

            let Value::Object(node) = child else {
                self.warn(format!(
                    "{path}: expected an object, found {}",
                    value_kind(child)
                ));
                continue;
            };

            match classify_node(node) {
                Some(NodeKind::Token) => {
                    if let Some(id) = self.add_token(&path, key, node, inherited_type) {
                        self.groups[parent.0].children.push(NodeId::Token(id));
                    }
                }
                Some(NodeKind::Group) => {
                    if let Some(id) = self.add_group(&path, key, node, inherited_type) {
                        self.groups[parent.0].children.push(NodeId::Group(id));
                    }
                }
                None if node.contains_key("$ref") => {
                    self.warn(format!("{path}: reference without $value is not a token"));
                }
                None => {}
            }
        }
    }

    fn add_group(
        &mut self,
        path: &str,
        name: &str,
        node: &Map<String, Value>,
        inherited_type: Option<&str>,
    ) -> Option<GroupId> {
        if self.group_index.contains_key(path) || self.token_index.contains_key(path) {
            self.warn(format!("{path}: duplicate node path"));
            return None;
        }
        let declared_type = string_field(node, "$type");
        let description = string_field(node, "$description");
        let child_type = declared_type
            .clone()
            .or_else(|| inherited_type.map(String::from));

        let id = self.push_group(
            path.to_string(),
            name.to_string(),
            description,
            declared_type,
        );
        self.visit_children(id, path, node, child_type.as_deref());
        Some(id)
    }

    fn add_token(
        &mut self,
        path: &str,
        name: &str,
        node: &Map<String, Value>,
        inherited_type: Option<&str>,
    ) -> Option<TokenId> {
        if self.token_index.contains_key(path) || self.group_index.contains_key(path) {
            self.warn(format!("{path}: duplicate node path"));
            return None;
        }

        let value = node.get("$value").cloned().unwrap_or(Value::Null);
        let sites = find_references(&value);

        for raw in sites.iter().flatten() {
            if let Some(ReferenceTarget::External { file, fragment }) =
                ReferenceTarget::classify(raw)
            {
                self.external_references.push(ExternalReference {
                    from: path.to_string(),
                    file: resolve_file_path(&self.file, &file),
                    fragment,
                });
            }
        }

        if let Some(first) = sites.first() {
            self.reference_index
                .insert(path.to_string(), self.references.len());
            self.references.push(Reference {
                from: path.to_string(),
                to: first.clone(),
                resolved_path: None,
                valid: false,
                circular: false,
                external: false,
            });
        }

        let extensions = match node.get("$extensions") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let id = TokenId(self.tokens.len());
        self.tokens.push(Token {
            path: path.to_string(),
            name: name.to_string(),
            declared_type: string_field(node, "$type"),
            inherited_type: inherited_type.map(String::from),
            description: string_field(node, "$description"),
            value,
            resolved_value: None,
            resolved_type: None,
            has_reference: !sites.is_empty(),
            reference_depth: -1,
            extensions,
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            referenced_by: Vec::new(),
        });
        self.token_index.insert(path.to_string(), id);
        Some(id)
    }

    fn push_group(
        &mut self,
        path: String,
        name: String,
        description: Option<String>,
        declared_type: Option<String>,
    ) -> GroupId {
        let id = GroupId(self.groups.len());
        self.group_index.insert(path.clone(), id);
        self.groups.push(Group {
            path,
            name,
            description,
            declared_type,
            children: Vec::new(),
        });
        id
    }

    fn warn(&mut self, message: String) {
        tracing::debug!(file = %self.file, %message, "Structural warning");
        self.warnings.push(message);
    }
}

/// Build the structural AST of one document.
pub fn build_ast(file: &str, document: &Value) -> TokenAst {
    AstBuilder::new(file).build(document)
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(String::from)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
