//! Reference syntax
//!
//! Two shapes count as a reference inside a `$value`:
//!
//! - an object with a `$ref` member: `{"$ref": "#/color/primary"}`,
//!   `{"$ref": "base.json#/color/primary"}`
//! - a string that is entirely an alias: `"{color.primary}"`

use dtcg_fs::NormalizedPath;
use dtcg_manifest::manifest::INLINE_PREFIX;
use serde_json::{Map, Value};

/// Where a raw reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// A token in the same document; `member` selects into its value
    Internal { path: String, member: Vec<String> },
    /// Another document, optionally narrowed by a fragment
    External {
        file: String,
        fragment: Option<String>,
    },
}

impl ReferenceTarget {
    /// Classify raw reference text. Returns `None` when malformed.
    pub fn classify(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with('{') {
            return alias_body(raw).map(|alias| Self::Internal {
                path: alias.to_string(),
                member: Vec::new(),
            });
        }
        if let Some(pointer) = raw.strip_prefix('#') {
            return pointer_target(pointer);
        }

        let (file, fragment) = match raw.split_once('#') {
            Some((file, fragment)) => (file, Some(fragment)),
            None => (raw, None),
        };
        if file.is_empty() {
            return None;
        }
        Some(Self::External {
            file: file.to_string(),
            fragment: fragment.filter(|f| !f.is_empty()).map(String::from),
        })
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }
}

/// Convert a fragment (`/a/b/$value` or `{a.b}`) into a token path.
pub fn fragment_path(fragment: &str) -> Option<(String, Vec<String>)> {
    let fragment = fragment.trim();
    if let Some(alias) = alias_body(fragment) {
        return Some((alias.to_string(), Vec::new()));
    }
    match pointer_target(fragment.strip_prefix('#').unwrap_or(fragment))? {
        ReferenceTarget::Internal { path, member } => Some((path, member)),
        ReferenceTarget::External { .. } => None,
    }
}

fn alias_body(raw: &str) -> Option<&str> {
    let body = raw.strip_prefix('{')?.strip_suffix('}')?;
    if body.is_empty() || body.contains(['{', '}']) {
        return None;
    }
    Some(body)
}

fn pointer_target(pointer: &str) -> Option<ReferenceTarget> {
    let segments: Vec<String> = pointer
        .trim_start_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect();

    let split = segments
        .iter()
        .position(|segment| segment == "$value")
        .unwrap_or(segments.len());
    let (path, rest) = segments.split_at(split);
    if path.is_empty() {
        return None;
    }
    Some(ReferenceTarget::Internal {
        path: path.join("."),
        member: rest.iter().skip(1).cloned().collect(),
    })
}

/// Collect every reference site in a value, in document order.
///
/// Each entry is the raw reference text, or `None` for a `$ref` whose
/// value is not a string.
pub fn find_references(value: &Value) -> Vec<Option<String>> {
    let mut sites = Vec::new();
    collect(value, &mut sites);
    sites
}

fn collect(value: &Value, sites: &mut Vec<Option<String>>) {
    match value {
        Value::Object(map) => {
            if let Some(target) = map.get("$ref") {
                sites.push(target.as_str().map(String::from));
                return;
            }
            for child in map.values() {
                collect(child, sites);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, sites);
            }
        }
        Value::String(text) if alias_body(text.trim()).is_some() => {
            sites.push(Some(text.clone()));
        }
        _ => {}
    }
}

/// The raw reference text if `value` itself is a reference site.
pub fn reference_text(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map.get("$ref").and_then(Value::as_str),
        Value::String(text) if alias_body(text.trim()).is_some() => Some(text),
        _ => None,
    }
}

/// Replace every reference site for which `lookup` returns a value.
///
/// Sites the lookup cannot resolve are kept verbatim.
pub fn substitute(value: &Value, lookup: &mut dyn FnMut(&str) -> Option<Value>) -> Value {
    if let Some(raw) = reference_text(value) {
        return lookup(raw).unwrap_or_else(|| value.clone());
    }
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key.clone(), substitute(child, lookup));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|i| substitute(i, lookup)).collect()),
        other => other.clone(),
    }
}

/// Select a member path inside a value.
pub fn select_member(value: &Value, member: &[String]) -> Option<Value> {
    let mut current = value;
    for segment in member {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Resolve a referenced file against the referencing file's directory.
///
/// Inline documents have no directory; their references resolve from the
/// project base.
pub fn resolve_file_path(from_file: &str, target: &str) -> String {
    if from_file.starts_with(INLINE_PREFIX) {
        NormalizedPath::new(target).normalize().as_str().to_string()
    } else {
        NormalizedPath::new(from_file)
            .resolve_sibling(target)
            .as_str()
            .to_string()
    }
}
