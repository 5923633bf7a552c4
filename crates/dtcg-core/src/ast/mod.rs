//! Structural token tree
//!
//! A [`TokenAst`] is built once per source document by the [`AstBuilder`].
//! Tokens and groups live in arenas owned by the AST and are addressed by
//! [`TokenId`] / [`GroupId`]; a group's children are tagged [`NodeId`]s so
//! the token/group decision is made exactly once, at construction.

mod builder;

pub use builder::{AstBuilder, build_ast};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Index of a token in its AST's token arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub usize);

/// Index of a group in its AST's group arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub usize);

/// A child of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Token(TokenId),
    Group(GroupId),
}

/// Structural kind of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Token,
    Group,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Token => write!(f, "token"),
            NodeKind::Group => write!(f, "group"),
        }
    }
}

/// Whether `key` is a reserved (`$`-prefixed) key.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with('$')
}

/// Decide the kind of an object node.
///
/// A node is a token iff it has `$value`, or has `$type` and no child
/// keys. It is a group iff it has at least one child key and is not a
/// token. Anything else (e.g. an object with only `$description`) is
/// neither.
pub fn classify_node(map: &Map<String, Value>) -> Option<NodeKind> {
    let has_children = map.keys().any(|key| !is_reserved(key));
    if map.contains_key("$value") || (map.contains_key("$type") && !has_children) {
        Some(NodeKind::Token)
    } else if has_children {
        Some(NodeKind::Group)
    } else {
        None
    }
}

/// A leaf design token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub path: String,
    pub name: String,
    pub declared_type: Option<String>,
    /// Type declared on the nearest typed ancestor group
    pub inherited_type: Option<String>,
    pub description: Option<String>,
    pub value: Value,
    pub resolved_value: Option<Value>,
    pub resolved_type: Option<String>,
    pub has_reference: bool,
    pub reference_depth: i32,
    pub extensions: Map<String, Value>,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Paths of tokens whose reference resolved to this token
    pub referenced_by: Vec<String>,
}

impl Token {
    /// Mark the token invalid with a diagnostic.
    pub fn invalidate(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    /// Declared type, falling back to the inherited group type.
    pub fn explicit_type(&self) -> Option<&str> {
        self.declared_type
            .as_deref()
            .or(self.inherited_type.as_deref())
    }
}

/// An internal node holding tokens and further groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    pub declared_type: Option<String>,
    #[serde(skip)]
    pub children: Vec<NodeId>,
}

/// A reference edge from a token to the target named in its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Path of the referencing token
    pub from: String,
    /// Raw reference text, `None` when malformed
    pub to: Option<String>,
    pub resolved_path: Option<String>,
    pub valid: bool,
    pub circular: bool,
    pub external: bool,
}

/// A reference site pointing into another file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalReference {
    pub from: String,
    /// Target file, relative to the project base directory
    pub file: String,
    pub fragment: Option<String>,
}

/// Token tree of one source document.
#[derive(Debug, Clone)]
pub struct TokenAst {
    pub file: String,
    pub source: Value,
    pub root: GroupId,
    pub(crate) tokens: Vec<Token>,
    pub(crate) groups: Vec<Group>,
    pub(crate) token_index: HashMap<String, TokenId>,
    pub(crate) group_index: HashMap<String, GroupId>,
    pub references: Vec<Reference>,
    pub(crate) reference_index: HashMap<String, usize>,
    pub external_references: Vec<ExternalReference>,
    /// Structural diagnostics found while building
    pub warnings: Vec<String>,
}

impl TokenAst {
    pub fn token(&self, path: &str) -> Option<&Token> {
        self.token_index.get(path).map(|id| &self.tokens[id.0])
    }

    pub fn token_mut(&mut self, path: &str) -> Option<&mut Token> {
        match self.token_index.get(path) {
            Some(id) => Some(&mut self.tokens[id.0]),
            None => None,
        }
    }

    pub fn token_by_id(&self, id: TokenId) -> &Token {
        &self.tokens[id.0]
    }

    /// Look up a group; the root group has the empty path.
    pub fn group(&self, path: &str) -> Option<&Group> {
        self.group_index.get(path).map(|id| &self.groups[id.0])
    }

    pub fn group_by_id(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn root(&self) -> &Group {
        &self.groups[self.root.0]
    }

    /// All tokens in document order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub(crate) fn tokens_mut(&mut self) -> impl Iterator<Item = &mut Token> {
        self.tokens.iter_mut()
    }

    /// All groups except the root, in document order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        let root = self.root;
        self.groups
            .iter()
            .enumerate()
            .filter(move |(index, _)| *index != root.0)
            .map(|(_, group)| group)
    }

    pub fn children<'a>(&self, group: &'a Group) -> &'a [NodeId] {
        &group.children
    }

    pub fn direct_tokens<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a Token> {
        group.children.iter().filter_map(|child| match child {
            NodeId::Token(id) => Some(&self.tokens[id.0]),
            NodeId::Group(_) => None,
        })
    }

    pub fn direct_groups<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a Group> {
        group.children.iter().filter_map(|child| match child {
            NodeId::Group(id) => Some(&self.groups[id.0]),
            NodeId::Token(_) => None,
        })
    }

    /// The reference edge registered for a token, if any.
    pub fn reference_from(&self, path: &str) -> Option<&Reference> {
        self.reference_index
            .get(path)
            .map(|index| &self.references[*index])
    }

    pub(crate) fn reference_from_mut(&mut self, path: &str) -> Option<&mut Reference> {
        match self.reference_index.get(path) {
            Some(index) => Some(&mut self.references[*index]),
            None => None,
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens that failed resolution.
    pub fn invalid_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|token| !token.valid)
    }
}
