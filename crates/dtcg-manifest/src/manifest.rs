//! Normalized manifest model
//!
//! Every manifest dialect is parsed into this shape. A manifest names
//! token sets (files that are always included) and modifiers (variation
//! axes whose selected options contribute further files), plus optional
//! directed generation specs.

use crate::schema::FieldError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Prefix of the virtual paths given to inline sources.
pub const INLINE_PREFIX: &str = "inline:";

/// A document contributing tokens to a set or modifier option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Source {
    /// A file path relative to the manifest's directory
    File { path: String },
    /// A document embedded in the manifest, addressed by a synthesized path
    Inline { path: String, document: Value },
}

impl Source {
    pub fn file(path: impl Into<String>) -> Self {
        Self::File { path: path.into() }
    }

    /// Create an inline source whose virtual path is `inline:<owner>/<index>`.
    pub fn inline(owner: &str, index: usize, document: Value) -> Self {
        Self::Inline {
            path: format!("{INLINE_PREFIX}{owner}/{index}"),
            document,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::File { path } | Self::Inline { path, .. } => path,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }
}

/// A named group of sources that is always included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sources: Vec<Source>,
}

/// Selection constraint of a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Exactly one option is selected; the default applies when none is given
    #[default]
    #[serde(rename = "oneOf", alias = "one-of", alias = "oneof")]
    OneOf,
    /// Any subset of options is selected; defaults to the empty set
    #[serde(rename = "anyOf", alias = "any-of", alias = "anyof")]
    AnyOf,
}

impl FromStr for ModifierKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "oneOf" | "one-of" | "oneof" => Ok(Self::OneOf),
            "anyOf" | "any-of" | "anyof" => Ok(Self::AnyOf),
            other => Err(format!("unknown modifier type '{other}'")),
        }
    }
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierKind::OneOf => write!(f, "oneOf"),
            ModifierKind::AnyOf => write!(f, "anyOf"),
        }
    }
}

/// One selectable value of a modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierOption {
    pub name: String,
    pub sources: Vec<Source>,
}

/// A variation axis such as `theme` or `density`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: ModifierKind,
    pub options: Vec<ModifierOption>,
    /// Default option of a `oneOf` modifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Modifier {
    pub fn option(&self, name: &str) -> Option<&ModifierOption> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn option_index(&self, name: &str) -> Option<usize> {
        self.options.iter().position(|o| o.name == name)
    }

    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.name.as_str())
    }

    /// The value used when an assignment does not mention this modifier.
    ///
    /// `oneOf` falls back to its declared default, then its first option;
    /// `anyOf` has no default value.
    pub fn default_value(&self) -> Option<&str> {
        match self.kind {
            ModifierKind::OneOf => self
                .default
                .as_deref()
                .or_else(|| self.options.first().map(|o| o.name.as_str())),
            ModifierKind::AnyOf => None,
        }
    }
}

/// A modifier reference inside a generation spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifierRef {
    /// `theme` expands into one output per value of the modifier
    Generic(String),
    /// `theme:dark` pins a single value
    Pinned { modifier: String, value: String },
}

impl ModifierRef {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((modifier, value)) => Self::Pinned {
                modifier: modifier.trim().to_string(),
                value: value.trim().to_string(),
            },
            None => Self::Generic(raw.trim().to_string()),
        }
    }

    pub fn modifier(&self) -> &str {
        match self {
            Self::Generic(name) => name,
            Self::Pinned { modifier, .. } => modifier,
        }
    }
}

/// A directed generation spec: one named output (or a family of outputs
/// when it references modifiers generically).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSpec {
    /// Base output name
    pub output: String,
    /// Modifier references, generic (`theme`) or pinned (`theme:dark`)
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_sets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_sets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_modifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_modifiers: Vec<String>,
}

impl GenerateSpec {
    pub fn modifier_refs(&self) -> Vec<ModifierRef> {
        self.modifiers.iter().map(|m| ModifierRef::parse(m)).collect()
    }
}

/// The normalized manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name of the front-end that produced this manifest
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub sets: Vec<TokenSet>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub generate: Vec<GenerateSpec>,
    /// Parts of the raw manifest the front-end could not honour
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Manifest {
    pub fn set(&self, name: &str) -> Option<&TokenSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    pub fn modifier(&self, name: &str) -> Option<&Modifier> {
        self.modifiers.iter().find(|m| m.name == name)
    }

    /// Every source named anywhere in the manifest, sets first, in
    /// declaration order, without duplicates.
    pub fn sources(&self) -> Vec<&Source> {
        let mut seen = HashSet::new();
        self.sets
            .iter()
            .flat_map(|s| s.sources.iter())
            .chain(
                self.modifiers
                    .iter()
                    .flat_map(|m| m.options.iter())
                    .flat_map(|o| o.sources.iter()),
            )
            .filter(|source| seen.insert(source.path().to_string()))
            .collect()
    }

    /// Check the cross-references a front-end cannot check on its own.
    ///
    /// Returns every issue found rather than stopping at the first.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut issues = Vec::new();

        let mut set_names = HashSet::new();
        for (i, set) in self.sets.iter().enumerate() {
            if set.name.is_empty() {
                issues.push(FieldError::new(format!("sets[{i}].name"), "must not be empty"));
            } else if !set_names.insert(set.name.as_str()) {
                issues.push(FieldError::new(
                    format!("sets[{i}].name"),
                    format!("duplicate set '{}'", set.name),
                ));
            }
        }

        let mut modifier_names = HashSet::new();
        for (i, modifier) in self.modifiers.iter().enumerate() {
            let field = format!("modifiers.{}", modifier.name);
            if modifier.name.is_empty() {
                issues.push(FieldError::new(
                    format!("modifiers[{i}].name"),
                    "must not be empty",
                ));
            } else if !modifier_names.insert(modifier.name.as_str()) {
                issues.push(FieldError::new(
                    &field,
                    format!("duplicate modifier '{}'", modifier.name),
                ));
            }
            if modifier.options.is_empty() {
                issues.push(FieldError::new(&field, "must declare at least one option"));
            }

            let mut option_names = HashSet::new();
            for option in &modifier.options {
                if !option_names.insert(option.name.as_str()) {
                    issues.push(FieldError::new(
                        format!("{field}.{}", option.name),
                        "duplicate option",
                    ));
                }
            }

            match (modifier.kind, modifier.default.as_deref()) {
                (ModifierKind::OneOf, Some(default)) if modifier.option(default).is_none() => {
                    issues.push(FieldError::new(
                        format!("{field}.default"),
                        format!("default '{default}' is not one of the options"),
                    ));
                }
                (ModifierKind::AnyOf, Some(_)) => {
                    issues.push(FieldError::new(
                        format!("{field}.default"),
                        "anyOf modifiers default to the empty selection",
                    ));
                }
                _ => {}
            }
        }

        for (i, spec) in self.generate.iter().enumerate() {
            let field = format!("generate[{i}]");
            if spec.output.is_empty() {
                issues.push(FieldError::new(format!("{field}.output"), "must not be empty"));
            }
            for reference in spec.modifier_refs() {
                let Some(modifier) = self.modifier(reference.modifier()) else {
                    issues.push(FieldError::new(
                        format!("{field}.modifiers"),
                        format!("unknown modifier '{}'", reference.modifier()),
                    ));
                    continue;
                };
                match &reference {
                    ModifierRef::Pinned { value, .. } if modifier.option(value).is_none() => {
                        issues.push(FieldError::new(
                            format!("{field}.modifiers"),
                            format!("modifier '{}' has no value '{value}'", modifier.name),
                        ));
                    }
                    ModifierRef::Generic(_) if modifier.kind == ModifierKind::AnyOf => {
                        issues.push(FieldError::new(
                            format!("{field}.modifiers"),
                            format!(
                                "anyOf modifier '{}' must be pinned with <modifier>:<value>",
                                modifier.name
                            ),
                        ));
                    }
                    _ => {}
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme() -> Modifier {
        Modifier {
            name: "theme".into(),
            description: None,
            kind: ModifierKind::OneOf,
            options: vec![
                ModifierOption {
                    name: "light".into(),
                    sources: vec![Source::file("light.json")],
                },
                ModifierOption {
                    name: "dark".into(),
                    sources: vec![Source::file("dark.json")],
                },
            ],
            default: None,
        }
    }

    #[test]
    fn one_of_defaults_to_first_option() {
        assert_eq!(theme().default_value(), Some("light"));
    }

    #[test]
    fn parse_modifier_refs() {
        assert_eq!(
            ModifierRef::parse("theme"),
            ModifierRef::Generic("theme".into())
        );
        assert_eq!(
            ModifierRef::parse("theme:dark"),
            ModifierRef::Pinned {
                modifier: "theme".into(),
                value: "dark".into()
            }
        );
    }

    #[test]
    fn validate_flags_bad_default_and_unknown_generate_refs() {
        let mut modifier = theme();
        modifier.default = Some("sepia".into());
        let manifest = Manifest {
            modifiers: vec![modifier],
            generate: vec![GenerateSpec {
                output: "tokens".into(),
                modifiers: vec!["density".into(), "theme:blue".into()],
                ..Default::default()
            }],
            ..Default::default()
        };

        let issues = manifest.validate();
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "default 'sepia' is not one of the options",
                "unknown modifier 'density'",
                "modifier 'theme' has no value 'blue'",
            ]
        );
    }

    #[test]
    fn sources_are_deduplicated_in_declaration_order() {
        let manifest = Manifest {
            sets: vec![TokenSet {
                name: "base".into(),
                description: None,
                sources: vec![Source::file("base.json"), Source::file("dark.json")],
            }],
            modifiers: vec![theme()],
            ..Default::default()
        };
        let paths: Vec<_> = manifest.sources().iter().map(|s| s.path()).collect();
        assert_eq!(paths, vec!["base.json", "dark.json", "light.json"]);
    }
}
