//! The native manifest dialect
//!
//! ```json
//! {
//!   "name": "design-system",
//!   "sets": [{ "name": "base", "files": ["base.json"] }],
//!   "modifiers": [{
//!     "name": "theme",
//!     "type": "oneOf",
//!     "default": "light",
//!     "options": [
//!       { "name": "light", "files": ["light.json"] },
//!       { "name": "dark", "files": ["dark.json"] }
//!     ]
//!   }],
//!   "generate": [{ "output": "tokens", "modifiers": ["theme"] }]
//! }
//! ```
//!
//! A `files` entry is either a path or an inline token document.

use super::{ManifestFrontend, from_value};
use crate::manifest::{GenerateSpec, Manifest, Modifier, ModifierKind, ModifierOption, Source, TokenSet};
use crate::schema::FieldError;
use crate::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

const FORMAT: &str = "native";

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sets: Vec<RawSet>,
    #[serde(default)]
    modifiers: Vec<RawModifier>,
    #[serde(default)]
    generate: Vec<GenerateSpec>,
}

#[derive(Debug, Deserialize)]
struct RawSet {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    files: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSource {
    Path(String),
    Inline(Map<String, Value>),
}

#[derive(Debug, Deserialize)]
struct RawModifier {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    kind: ModifierKind,
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    name: String,
    #[serde(default)]
    files: Vec<RawSource>,
}

fn convert_sources(owner: &str, raw: Vec<RawSource>) -> Vec<Source> {
    raw.into_iter()
        .enumerate()
        .map(|(i, source)| match source {
            RawSource::Path(path) => Source::file(path),
            RawSource::Inline(document) => Source::inline(owner, i, Value::Object(document)),
        })
        .collect()
}

/// Front-end for the native dialect: `sets` and `modifiers` as arrays.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFrontend;

impl ManifestFrontend for NativeFrontend {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn detect(&self, raw: &Value) -> bool {
        let Some(map) = raw.as_object() else {
            return false;
        };
        if map.contains_key("resolutionOrder") {
            return false;
        }
        map.get("sets").is_some_and(Value::is_array)
            || map.get("modifiers").is_some_and(Value::is_array)
    }

    fn validate(&self, raw: &Value) -> Vec<FieldError> {
        let mut issues = Vec::new();
        let Some(map) = raw.as_object() else {
            issues.push(FieldError::new("<root>", "manifest must be an object"));
            return issues;
        };

        if let Some(sets) = map.get("sets") {
            match sets.as_array() {
                Some(sets) => {
                    for (i, set) in sets.iter().enumerate() {
                        let field = format!("sets[{i}]");
                        require_name(set, &field, &mut issues);
                        check_files(set.get("files"), &format!("{field}.files"), &mut issues);
                    }
                }
                None => issues.push(FieldError::new("sets", "must be an array")),
            }
        }

        if let Some(modifiers) = map.get("modifiers") {
            match modifiers.as_array() {
                Some(modifiers) => {
                    for (i, modifier) in modifiers.iter().enumerate() {
                        let field = format!("modifiers[{i}]");
                        require_name(modifier, &field, &mut issues);
                        if let Some(kind) = modifier.get("type") {
                            match kind.as_str() {
                                Some(kind) if kind.parse::<ModifierKind>().is_ok() => {}
                                _ => issues.push(FieldError::new(
                                    format!("{field}.type"),
                                    "must be \"oneOf\" or \"anyOf\"",
                                )),
                            }
                        }
                        match modifier.get("options").and_then(Value::as_array) {
                            Some(options) => {
                                for (j, option) in options.iter().enumerate() {
                                    let option_field = format!("{field}.options[{j}]");
                                    require_name(option, &option_field, &mut issues);
                                    check_files(
                                        option.get("files"),
                                        &format!("{option_field}.files"),
                                        &mut issues,
                                    );
                                }
                            }
                            None => issues.push(FieldError::new(
                                format!("{field}.options"),
                                "must be an array",
                            )),
                        }
                    }
                }
                None => issues.push(FieldError::new("modifiers", "must be an array")),
            }
        }

        if let Some(generate) = map.get("generate")
            && !generate.is_array()
        {
            issues.push(FieldError::new("generate", "must be an array"));
        }

        issues
    }

    fn parse(&self, raw: &Value) -> Result<Manifest> {
        let raw: RawManifest = from_value(FORMAT, raw)?;

        let sets = raw
            .sets
            .into_iter()
            .map(|set| {
                let owner = format!("sets/{}", set.name);
                TokenSet {
                    sources: convert_sources(&owner, set.files),
                    name: set.name,
                    description: set.description,
                }
            })
            .collect();

        let modifiers = raw
            .modifiers
            .into_iter()
            .map(|modifier| {
                let options = modifier
                    .options
                    .into_iter()
                    .map(|option| {
                        let owner = format!("modifiers/{}/{}", modifier.name, option.name);
                        ModifierOption {
                            sources: convert_sources(&owner, option.files),
                            name: option.name,
                        }
                    })
                    .collect();
                Modifier {
                    name: modifier.name,
                    description: modifier.description,
                    kind: modifier.kind,
                    options,
                    default: modifier.default,
                }
            })
            .collect();

        Ok(Manifest {
            name: raw.name,
            format: FORMAT.to_string(),
            sets,
            modifiers,
            generate: raw.generate,
            warnings: Vec::new(),
        })
    }
}

fn require_name(node: &Value, field: &str, issues: &mut Vec<FieldError>) {
    match node.get("name") {
        Some(Value::String(name)) if !name.is_empty() => {}
        _ => issues.push(FieldError::new(
            format!("{field}.name"),
            "must be a non-empty string",
        )),
    }
}

fn check_files(files: Option<&Value>, field: &str, issues: &mut Vec<FieldError>) {
    let Some(files) = files else {
        return;
    };
    let Some(files) = files.as_array() else {
        issues.push(FieldError::new(field, "must be an array"));
        return;
    };
    for (i, file) in files.iter().enumerate() {
        if !(file.is_string() || file.is_object()) {
            issues.push(FieldError::new(
                format!("{field}[{i}]"),
                "must be a path or an inline token document",
            ));
        }
    }
}
