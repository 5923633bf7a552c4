//! [`TestProject`] builder for token projects on disk.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Default manifest file name written by [`TestProject::manifest`].
pub const MANIFEST_FILE: &str = "manifest.json";

/// A temporary project directory holding a manifest and token documents.
///
/// # Example
///
/// ```rust,no_run
/// use dtcg_test_utils::TestProject;
/// use serde_json::json;
///
/// let project = TestProject::new()
///     .file("base.json", &json!({"color": {"$value": "#000", "$type": "color"}}))
///     .manifest(&json!({"sets": [{"name": "base", "files": ["base.json"]}]}));
/// project.assert_file_exists("manifest.json");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the manifest written by [`TestProject::manifest`].
    pub fn manifest_path(&self) -> PathBuf {
        self.path().join(MANIFEST_FILE)
    }

    /// Write a JSON document at `path`, creating parent directories.
    pub fn file(self, path: &str, document: &Value) -> Self {
        self.raw_file(path, &serde_json::to_string_pretty(document).unwrap())
    }

    /// Write `content` verbatim at `path`, creating parent directories.
    pub fn raw_file(self, path: &str, content: &str) -> Self {
        let full_path = self.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Could not write {}: {e}", full_path.display()));
        self
    }

    /// Write the manifest document as `manifest.json`.
    pub fn manifest(self, document: &Value) -> Self {
        self.file(MANIFEST_FILE, document)
    }

    /// Read a JSON document relative to the root.
    ///
    /// # Panics
    /// Panics if the file is missing or not valid JSON.
    pub fn read_json(&self, path: &str) -> Value {
        let full_path = self.path().join(path);
        let content = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Invalid JSON in {}: {e}", full_path.display()))
    }

    /// Assert that `path` (relative to the root) exists.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.path().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.path().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }
}
