//! Integration tests for the manifest front-end registry

use dtcg_manifest::{
    Error, FieldError, FrontendRegistry, Manifest, ManifestFrontend, ModifierKind, Result, Source,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

/// A dialect that claims every object, used to provoke ambiguity.
struct GreedyFrontend;

impl ManifestFrontend for GreedyFrontend {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn detect(&self, raw: &Value) -> bool {
        raw.is_object()
    }

    fn validate(&self, _raw: &Value) -> Vec<FieldError> {
        Vec::new()
    }

    fn parse(&self, _raw: &Value) -> Result<Manifest> {
        Ok(Manifest::default())
    }
}

/// A dialect keyed on a marker field, used to test the extension point.
struct LegacyFrontend;

impl ManifestFrontend for LegacyFrontend {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn detect(&self, raw: &Value) -> bool {
        raw.get("legacyThemes").is_some()
    }

    fn validate(&self, _raw: &Value) -> Vec<FieldError> {
        Vec::new()
    }

    fn parse(&self, raw: &Value) -> Result<Manifest> {
        let files = raw["legacyThemes"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(Source::file)
            .collect();
        Ok(Manifest {
            format: "legacy".into(),
            sets: vec![dtcg_manifest::TokenSet {
                name: "legacy".into(),
                description: None,
                sources: files,
            }],
            ..Default::default()
        })
    }
}

#[test]
fn test_parse_native_manifest() {
    let registry = FrontendRegistry::with_builtins();
    let manifest = registry
        .parse(&json!({
            "name": "ds",
            "sets": [{"name": "base", "files": ["base.json"]}],
            "modifiers": [
                {"name": "theme", "default": "light", "options": [
                    {"name": "light", "files": ["light.json"]},
                    {"name": "dark", "files": ["dark.json"]}
                ]},
                {"name": "features", "type": "anyOf", "options": [
                    {"name": "a11y", "files": ["a11y.json"]}
                ]}
            ]
        }))
        .expect("native manifest should parse");

    assert_eq!(manifest.format, "native");
    assert_eq!(manifest.name.as_deref(), Some("ds"));
    assert_eq!(manifest.modifiers[0].kind, ModifierKind::OneOf);
    assert_eq!(manifest.modifiers[1].kind, ModifierKind::AnyOf);
    assert_eq!(manifest.modifiers[1].default_value(), None);
}

#[test]
fn test_parse_resolver_manifest() {
    let registry = FrontendRegistry::with_builtins();
    let manifest = registry
        .parse(&json!({
            "version": "2025.10",
            "sets": {"base": {"sources": [{"$ref": "base.json"}]}},
            "modifiers": {"theme": {"contexts": {"light": [], "dark": [{"$ref": "dark.json"}]}}}
        }))
        .expect("resolver manifest should parse");

    assert_eq!(manifest.format, "resolver");
    assert_eq!(manifest.modifier("theme").unwrap().default_value(), Some("light"));
}

#[test]
fn test_unknown_format_is_rejected() {
    let registry = FrontendRegistry::with_builtins();
    let err = registry.parse(&json!({"tokens": {}})).unwrap_err();
    assert!(matches!(err, Error::UnknownFormat));
}

#[test]
fn test_ambiguous_format_is_rejected() {
    let mut registry = FrontendRegistry::with_builtins();
    registry.register(Box::new(GreedyFrontend)).unwrap();

    let err = registry
        .parse(&json!({"sets": [{"name": "base", "files": []}]}))
        .unwrap_err();

    match err {
        Error::AmbiguousFormat { formats } => assert_eq!(formats, vec!["native", "greedy"]),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn test_registered_frontend_is_used() {
    let mut registry = FrontendRegistry::with_builtins();
    registry.register(Box::new(LegacyFrontend)).unwrap();

    let manifest = registry
        .parse(&json!({"legacyThemes": ["a.json", "b.json"]}))
        .unwrap();

    assert_eq!(manifest.format, "legacy");
    assert_eq!(manifest.sets[0].sources.len(), 2);
}

#[test]
fn test_invalid_manifest_reports_field_issues() {
    let registry = FrontendRegistry::with_builtins();
    let err = registry
        .parse(&json!({
            "modifiers": [{"name": "theme", "default": "blue", "options": [
                {"name": "light", "files": []}
            ]}]
        }))
        .unwrap_err();

    match err {
        Error::Invalid { format, issues } => {
            assert_eq!(format, "native");
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].field, "modifiers.theme.default");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}
