//! The resolver-document dialect
//!
//! Sets and modifiers are keyed objects, sources are `{"$ref": "file"}`
//! entries or inline token documents, and an optional `resolutionOrder`
//! fixes the order in which sets and modifiers apply:
//!
//! ```json
//! {
//!   "version": "2025.10",
//!   "sets": { "base": { "sources": [{ "$ref": "base.json" }] } },
//!   "modifiers": {
//!     "theme": {
//!       "default": "light",
//!       "contexts": {
//!         "light": [{ "$ref": "light.json" }],
//!         "dark": [{ "$ref": "dark.json" }]
//!       }
//!     }
//!   },
//!   "resolutionOrder": [{ "$ref": "#/sets/base" }, { "$ref": "#/modifiers/theme" }]
//! }
//! ```
//!
//! Entries missing from `resolutionOrder` keep their declaration order
//! after the listed ones.

use super::{ManifestFrontend, from_value};
use crate::manifest::{GenerateSpec, Manifest, Modifier, ModifierKind, ModifierOption, Source, TokenSet};
use crate::schema::FieldError;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

const FORMAT: &str = "resolver";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResolver {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sets: Map<String, Value>,
    #[serde(default)]
    modifiers: Map<String, Value>,
    #[serde(default)]
    resolution_order: Vec<RawRef>,
    #[serde(default)]
    generate: Vec<GenerateSpec>,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    #[serde(rename = "$ref")]
    reference: String,
}

#[derive(Debug, Deserialize)]
struct RawSet {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sources: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawModifier {
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    kind: ModifierKind,
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    contexts: Map<String, Value>,
}

/// Front-end for resolver documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolverFrontend;

impl ResolverFrontend {
    /// Sources always include whole files; a `#fragment` on a `$ref` is
    /// dropped with a warning.
    fn convert_sources(
        owner: &str,
        sources: &[Value],
        warnings: &mut Vec<String>,
    ) -> Result<Vec<Source>> {
        sources
            .iter()
            .enumerate()
            .map(|(i, source)| match source {
                Value::Object(map) => match map.get("$ref") {
                    Some(Value::String(reference)) => {
                        let (file, fragment) = match reference.split_once('#') {
                            Some((file, fragment)) => (file, Some(fragment)),
                            None => (reference.as_str(), None),
                        };
                        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
                            tracing::warn!(%owner, %reference, "Ignoring source fragment");
                            warnings.push(format!(
                                "{owner}[{i}]: fragment '#{fragment}' of '{reference}' is ignored; the whole of '{file}' is included"
                            ));
                        }
                        Ok(Source::file(file))
                    }
                    Some(_) => Err(Error::Parse {
                        format: FORMAT.into(),
                        message: format!("{owner}[{i}]: $ref must be a string"),
                    }),
                    None => Ok(Source::inline(owner, i, source.clone())),
                },
                _ => Err(Error::Parse {
                    format: FORMAT.into(),
                    message: format!("{owner}[{i}]: source must be an object"),
                }),
            })
            .collect()
    }

    /// Reorder `items` by their position in `order`; unlisted items follow.
    fn apply_order<T>(items: Vec<(String, T)>, order: &[String]) -> Vec<T> {
        let mut indexed: Vec<(usize, usize, T)> = items
            .into_iter()
            .enumerate()
            .map(|(declared, (name, item))| {
                let rank = order
                    .iter()
                    .position(|o| o == &name)
                    .unwrap_or(order.len());
                (rank, declared, item)
            })
            .collect();
        indexed.sort_by_key(|(rank, declared, _)| (*rank, *declared));
        indexed.into_iter().map(|(_, _, item)| item).collect()
    }
}

impl ManifestFrontend for ResolverFrontend {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn detect(&self, raw: &Value) -> bool {
        let Some(map) = raw.as_object() else {
            return false;
        };
        if map.contains_key("resolutionOrder") {
            return true;
        }
        map.get("version").is_some_and(Value::is_string)
            && (map.get("sets").is_some_and(Value::is_object)
                || map.get("modifiers").is_some_and(Value::is_object))
    }

    fn validate(&self, raw: &Value) -> Vec<FieldError> {
        let mut issues = Vec::new();
        let Some(map) = raw.as_object() else {
            issues.push(FieldError::new("<root>", "manifest must be an object"));
            return issues;
        };

        if let Some(sets) = map.get("sets") {
            match sets.as_object() {
                Some(sets) => {
                    for (name, set) in sets {
                        let field = format!("sets.{name}");
                        match set.get("sources") {
                            Some(Value::Array(sources)) => {
                                check_sources(sources, &format!("{field}.sources"), &mut issues)
                            }
                            Some(_) => issues.push(FieldError::new(
                                format!("{field}.sources"),
                                "must be an array",
                            )),
                            None => {}
                        }
                    }
                }
                None => issues.push(FieldError::new("sets", "must be an object")),
            }
        }

        if let Some(modifiers) = map.get("modifiers") {
            match modifiers.as_object() {
                Some(modifiers) => {
                    for (name, modifier) in modifiers {
                        let field = format!("modifiers.{name}");
                        match modifier.get("contexts").and_then(Value::as_object) {
                            Some(contexts) => {
                                for (context, sources) in contexts {
                                    let context_field = format!("{field}.contexts.{context}");
                                    match sources.as_array() {
                                        Some(sources) => {
                                            check_sources(sources, &context_field, &mut issues)
                                        }
                                        None => issues.push(FieldError::new(
                                            context_field,
                                            "must be an array",
                                        )),
                                    }
                                }
                            }
                            None => issues.push(FieldError::new(
                                format!("{field}.contexts"),
                                "must be an object",
                            )),
                        }
                        if let Some(kind) = modifier.get("type")
                            && kind.as_str().and_then(|k| k.parse::<ModifierKind>().ok()).is_none()
                        {
                            issues.push(FieldError::new(
                                format!("{field}.type"),
                                "must be \"oneOf\" or \"anyOf\"",
                            ));
                        }
                    }
                }
                None => issues.push(FieldError::new("modifiers", "must be an object")),
            }
        }

        if let Some(order) = map.get("resolutionOrder") {
            match order.as_array() {
                Some(entries) => {
                    for (i, entry) in entries.iter().enumerate() {
                        let target = entry.get("$ref").and_then(Value::as_str);
                        let known = target.is_some_and(|t| {
                            resolve_order_ref(t).is_some_and(|(kind, name)| {
                                map.get(kind).and_then(|v| v.get(name)).is_some()
                            })
                        });
                        if !known {
                            issues.push(FieldError::new(
                                format!("resolutionOrder[{i}]"),
                                "must reference #/sets/<name> or #/modifiers/<name>",
                            ));
                        }
                    }
                }
                None => issues.push(FieldError::new("resolutionOrder", "must be an array")),
            }
        }

        issues
    }

    fn parse(&self, raw: &Value) -> Result<Manifest> {
        let raw: RawResolver = from_value(FORMAT, raw)?;

        let mut set_order = Vec::new();
        let mut modifier_order = Vec::new();
        for entry in &raw.resolution_order {
            match resolve_order_ref(&entry.reference) {
                Some(("sets", name)) => set_order.push(name.to_string()),
                Some(("modifiers", name)) => modifier_order.push(name.to_string()),
                _ => tracing::warn!(reference = %entry.reference, "Ignoring resolutionOrder entry"),
            }
        }

        let mut warnings = Vec::new();
        let mut sets = Vec::new();
        for (name, value) in &raw.sets {
            let set: RawSet = from_value(FORMAT, value)?;
            let sources =
                Self::convert_sources(&format!("sets/{name}"), &set.sources, &mut warnings)?;
            sets.push((
                name.clone(),
                TokenSet {
                    name: name.clone(),
                    description: set.description,
                    sources,
                },
            ));
        }

        let mut modifiers = Vec::new();
        for (name, value) in &raw.modifiers {
            let modifier: RawModifier = from_value(FORMAT, value)?;
            let mut options = Vec::new();
            for (context, sources) in &modifier.contexts {
                let sources = sources.as_array().map(Vec::as_slice).unwrap_or_default();
                options.push(ModifierOption {
                    name: context.clone(),
                    sources: Self::convert_sources(
                        &format!("modifiers/{name}/{context}"),
                        sources,
                        &mut warnings,
                    )?,
                });
            }
            modifiers.push((
                name.clone(),
                Modifier {
                    name: name.clone(),
                    description: modifier.description,
                    kind: modifier.kind,
                    options,
                    default: modifier.default,
                },
            ));
        }

        Ok(Manifest {
            name: raw.name,
            format: FORMAT.to_string(),
            sets: Self::apply_order(sets, &set_order),
            modifiers: Self::apply_order(modifiers, &modifier_order),
            generate: raw.generate,
            warnings,
        })
    }
}

/// Split `#/sets/base` into `("sets", "base")`.
fn resolve_order_ref(reference: &str) -> Option<(&str, &str)> {
    let pointer = reference.strip_prefix("#/")?;
    let (kind, name) = pointer.split_once('/')?;
    match kind {
        "sets" | "modifiers" if !name.is_empty() => Some((kind, name)),
        _ => None,
    }
}

fn check_sources(sources: &[Value], field: &str, issues: &mut Vec<FieldError>) {
    for (i, source) in sources.iter().enumerate() {
        match source {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref")
                    && !reference.is_string()
                {
                    issues.push(FieldError::new(
                        format!("{field}[{i}].$ref"),
                        "must be a string",
                    ));
                }
            }
            _ => issues.push(FieldError::new(
                format!("{field}[{i}]"),
                "must be a {\"$ref\"} object or an inline token document",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "version": "2025.10",
            "sets": {
                "brand": {"sources": [{"$ref": "brand.json"}]},
                "base": {"sources": [{"$ref": "base.json#/color"}, {"size": {"$value": "4px"}}]}
            },
            "modifiers": {
                "theme": {
                    "default": "dark",
                    "contexts": {
                        "light": [{"$ref": "light.json"}],
                        "dark": [{"$ref": "dark.json"}]
                    }
                }
            },
            "resolutionOrder": [{"$ref": "#/sets/base"}, {"$ref": "#/modifiers/theme"}]
        })
    }

    #[test]
    fn detects_resolver_documents() {
        assert!(ResolverFrontend.detect(&document()));
        assert!(!ResolverFrontend.detect(&json!({"sets": []})));
    }

    #[test]
    fn resolution_order_puts_listed_sets_first() {
        let manifest = ResolverFrontend.parse(&document()).unwrap();
        let names: Vec<_> = manifest.sets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["base", "brand"]);
    }

    #[test]
    fn refs_drop_fragments_and_inline_sources_get_virtual_paths() {
        let manifest = ResolverFrontend.parse(&document()).unwrap();
        let base = manifest.set("base").unwrap();
        assert_eq!(base.sources[0], Source::file("base.json"));
        assert_eq!(base.sources[1].path(), "inline:sets/base/1");
        assert_eq!(
            manifest.warnings,
            vec!["sets/base[0]: fragment '#/color' of 'base.json#/color' is ignored; the whole of 'base.json' is included"]
        );
    }

    #[test]
    fn whole_file_refs_do_not_warn() {
        let mut doc = document();
        doc["sets"]["base"]["sources"] = json!([{"$ref": "base.json"}, {"$ref": "extra.json#"}]);
        let manifest = ResolverFrontend.parse(&doc).unwrap();
        assert!(manifest.warnings.is_empty());
        assert_eq!(manifest.set("base").unwrap().sources[1], Source::file("extra.json"));
    }

    #[test]
    fn contexts_keep_declaration_order() {
        let manifest = ResolverFrontend.parse(&document()).unwrap();
        let theme = manifest.modifier("theme").unwrap();
        let options: Vec<_> = theme.option_names().collect();
        assert_eq!(options, vec!["light", "dark"]);
        assert_eq!(theme.default_value(), Some("dark"));
    }

    #[test]
    fn validate_flags_unknown_order_entries() {
        let mut doc = document();
        doc["resolutionOrder"] = json!([{"$ref": "#/sets/missing"}]);
        let issues = ResolverFrontend.validate(&doc);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "resolutionOrder[0]");
    }
}
