//! Integration tests for the `dtcg` binary

use assert_cmd::Command;
use dtcg_test_utils::{TestProject, fixtures};
use predicates::prelude::*;
use serde_json::json;

/// Get a Command for the dtcg binary
fn dtcg_cmd() -> Command {
    Command::cargo_bin("dtcg").expect("Failed to find dtcg binary")
}

// ============================================================================
// resolve
// ============================================================================

#[test]
fn test_resolve_prints_tokens_for_selection() {
    let fixture = fixtures::themes();
    let output = dtcg_cmd()
        .arg("resolve")
        .arg(fixture.manifest_path())
        .args(["-i", "theme=dark"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let tokens: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tokens["color"]["primary"]["$value"], json!("#66AAFF"));
}

#[test]
fn test_resolve_json_prints_record() {
    let fixture = fixtures::themes();
    dtcg_cmd()
        .arg("resolve")
        .arg(fixture.manifest_path())
        .args(["-i", "theme=dark", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"theme-dark\""))
        .stdout(predicate::str::contains("\"files\""));
}

#[test]
fn test_resolve_all_writes_one_file_per_permutation() {
    let fixture = fixtures::themes();
    dtcg_cmd()
        .arg("resolve")
        .arg(fixture.manifest_path())
        .arg("--all")
        .arg("--out-dir")
        .arg(fixture.path().join("dist"))
        .assert()
        .success()
        .stdout(predicate::str::contains("theme-light"));

    fixture.assert_file_exists("dist/theme-light.json");
    fixture.assert_file_exists("dist/theme-dark.json");
    let dark = fixture.read_json("dist/theme-dark.json");
    assert_eq!(dark["color"]["surface"]["$value"], json!("#121212"));
}

#[test]
fn test_resolve_directed_uses_output_names() {
    let fixture = fixtures::themes();
    dtcg_cmd()
        .arg("resolve")
        .arg(fixture.manifest_path())
        .args(["--directed", "--flatten", "--out-dir"])
        .arg(fixture.path().join("dist"))
        .assert()
        .success();

    let light = fixture.read_json("dist/web-light.json");
    assert_eq!(light["color.surface"]["$value"], json!("#FAFAFA"));
    assert_eq!(light["color.surface"]["$type"], json!("color"));
}

#[test]
fn test_resolve_refuses_output_outside_out_dir() {
    let fixture = TestProject::new()
        .file("base.json", &json!({"size": {"$value": 1, "$type": "number"}}))
        .manifest(&json!({
            "sets": [{"name": "core", "files": ["base.json"]}],
            "generate": [{"output": "../escape"}]
        }));
    dtcg_cmd()
        .arg("resolve")
        .arg(fixture.manifest_path())
        .args(["--directed", "--out-dir"])
        .arg(fixture.path().join("dist"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a plain file name"));

    fixture.assert_file_not_exists("escape.json");
}

#[test]
fn test_resolve_labels_project_errors() {
    let fixture = TestProject::new()
        .file(
            "base.json",
            &json!({
                "size": {"$value": 1, "$type": "number"},
                "gap": {"$value": {"$ref": "other.json#/missing"}}
            }),
        )
        .file("other.json", &json!({"x": {"$value": 2, "$type": "number"}}))
        .manifest(&json!({"sets": [{"name": "core", "files": ["base.json"]}]}));

    dtcg_cmd()
        .arg("resolve")
        .arg(fixture.manifest_path())
        .assert()
        .stderr(predicate::str::contains("error:").and(predicate::str::contains("names no token")));
}

#[test]
fn test_resolve_rejects_malformed_input() {
    let fixture = fixtures::themes();
    dtcg_cmd()
        .arg("resolve")
        .arg(fixture.manifest_path())
        .args(["-i", "theme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=VALUE"));
}

#[test]
fn test_resolve_abort_policy_from_config() {
    let fixture = fixtures::themes().raw_file("dtcg.toml", "validation_policy = \"abort\"\n");
    dtcg_cmd()
        .arg("resolve")
        .arg(fixture.manifest_path())
        .args(["-i", "theme=sepia"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no value 'sepia'"));
}

// ============================================================================
// list
// ============================================================================

#[test]
fn test_list_shows_ids() {
    let fixture = fixtures::themes();
    dtcg_cmd()
        .arg("list")
        .arg(fixture.manifest_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("theme-light"))
        .stdout(predicate::str::contains("theme-dark"));
}

#[test]
fn test_list_json() {
    let fixture = fixtures::themes();
    let output = dtcg_cmd()
        .arg("list")
        .arg(fixture.manifest_path())
        .arg("--json")
        .output()
        .unwrap();
    let ids: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ids, vec!["theme-light", "theme-dark"]);
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_clean_project() {
    let fixture = fixtures::themes();
    dtcg_cmd()
        .arg("check")
        .arg(fixture.manifest_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3 file(s)"));
}

#[test]
fn test_check_reports_cycle() {
    let fixture = TestProject::new()
        .file(
            "a.json",
            &json!({
                "x": {"$value": "{y}"},
                "y": {"$value": "{x}"}
            }),
        )
        .manifest(&json!({"sets": [{"name": "core", "files": ["a.json"]}]}));

    dtcg_cmd()
        .arg("check")
        .arg(fixture.manifest_path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("circular reference"));
}

#[test]
fn test_check_missing_required_file() {
    let fixture = TestProject::new()
        .manifest(&json!({"sets": [{"name": "core", "files": ["missing.json"]}]}));

    dtcg_cmd()
        .arg("check")
        .arg(fixture.manifest_path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("missing.json"));
}

#[test]
fn test_missing_manifest_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    dtcg_cmd()
        .arg("check")
        .arg(dir.path().join("manifest.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest not found"));
}
