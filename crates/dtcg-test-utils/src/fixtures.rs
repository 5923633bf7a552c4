//! Canned token projects.
//!
//! [`themes`] builds the light/dark theme project in a temporary
//! directory; [`fixture_dir`] points at the checked-in copies under
//! `test-fixtures/projects`.

use crate::project::TestProject;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Directory of a checked-in fixture project, e.g. `fixture_dir("themes")`.
pub fn fixture_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-fixtures/projects")
        .join(name)
}

pub fn base_tokens() -> Value {
    json!({
        "color": {
            "$type": "color",
            "primary": { "$value": "#0066CC" },
            "surface": { "$value": "#FFFFFF" },
            "link": { "$value": "{color.primary}" }
        },
        "space": {
            "$type": "dimension",
            "sm": { "$value": "4px" },
            "md": { "$value": "8px" }
        }
    })
}

pub fn light_tokens() -> Value {
    json!({
        "color": {
            "surface": { "$value": "#FAFAFA" }
        }
    })
}

pub fn dark_tokens() -> Value {
    json!({
        "dark-primary": { "$value": "#66AAFF", "$type": "color" },
        "color": {
            "primary": { "$value": { "$ref": "#/dark-primary" } },
            "surface": { "$value": "#121212" }
        }
    })
}

pub fn themes_manifest() -> Value {
    json!({
        "name": "themes",
        "sets": [{ "name": "base", "files": ["base.json"] }],
        "modifiers": [{
            "name": "theme",
            "type": "oneOf",
            "default": "light",
            "options": [
                { "name": "light", "files": ["light.json"] },
                { "name": "dark", "files": ["dark.json"] }
            ]
        }],
        "generate": [{ "output": "web", "modifiers": ["theme"] }]
    })
}

/// The light/dark theme project.
pub fn themes() -> TestProject {
    TestProject::new()
        .file("base.json", &base_tokens())
        .file("light.json", &light_tokens())
        .file("dark.json", &dark_tokens())
        .manifest(&themes_manifest())
}
