//! Manifest-to-project loading
//!
//! Ties the collaborators together for one run: the manifest is read and
//! normalized by the front-end registry, discovery loads every file it
//! reaches through a [`FileSource`], and the project resolver links them.

use crate::config::EngineConfig;
use crate::discovery::Discovery;
use crate::error::{Error, Result};
use crate::project::{Project, resolve_project};
use dtcg_fs::{FileSource, FsSource, NormalizedPath};
use dtcg_manifest::{DocumentKind, FrontendRegistry, Manifest, SchemaValidator, StructuralValidator};
use std::path::{Path, PathBuf};

/// Loads a manifest and everything it references into a [`Project`].
pub struct ProjectLoader {
    registry: FrontendRegistry,
    validator: Box<dyn SchemaValidator>,
    config: EngineConfig,
}

impl ProjectLoader {
    /// Loader with the built-in front-ends and the structural validator.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: FrontendRegistry::with_builtins(),
            validator: Box::new(StructuralValidator::new()),
            config,
        }
    }

    pub fn with_registry(mut self, registry: FrontendRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load the manifest at `path` and resolve its project from disk.
    ///
    /// Files are resolved relative to the manifest's directory.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Project> {
        let path = path.as_ref();
        let base_dir = manifest_dir(path);
        let file_name = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());

        tracing::debug!(manifest = %path.display(), base_dir = %base_dir.display(), "Loading project");
        let source = FsSource::new(&base_dir);
        let manifest = self.read_manifest(&source, &NormalizedPath::new(&file_name))?;
        let project = self.resolve(&base_dir, manifest, &source);
        tracing::debug!(reads = source.reads(), cached = source.cached(), "File source stats");
        Ok(project)
    }

    /// Read, validate and normalize a manifest from `source`.
    pub fn read_manifest(&self, source: &dyn FileSource, path: &NormalizedPath) -> Result<Manifest> {
        let raw = source.load(path).map_err(|e| Error::ManifestLoad {
            path: path.to_native(),
            source: e,
        })?;
        if let Err(issues) = self.validator.validate(&raw, DocumentKind::Manifest) {
            return Err(dtcg_manifest::Error::Invalid {
                format: DocumentKind::Manifest.to_string(),
                issues,
            }
            .into());
        }
        Ok(self.registry.parse(&raw)?)
    }

    /// Discover and link the files of an already parsed manifest.
    pub fn resolve(
        &self,
        base_dir: impl AsRef<Path>,
        manifest: Manifest,
        source: &dyn FileSource,
    ) -> Project {
        let discovery = Discovery::new(source, self.validator.as_ref())
            .with_options(self.config.discovery_options())
            .run(&manifest);
        resolve_project(base_dir, Some(manifest), discovery)
    }
}

impl std::fmt::Debug for ProjectLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectLoader")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

fn manifest_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtcg_fs::MemorySource;
    use serde_json::json;

    #[test]
    fn reads_native_manifest_from_source() {
        let source = MemorySource::new().with(
            "manifest.json",
            json!({
                "sets": [{"name": "core", "files": ["base.json"]}],
                "modifiers": []
            }),
        );
        let loader = ProjectLoader::new(EngineConfig::default());

        let manifest = loader
            .read_manifest(&source, &NormalizedPath::new("manifest.json"))
            .unwrap();
        assert_eq!(manifest.format, "native");
        assert_eq!(manifest.sets[0].sources[0].path(), "base.json");
    }

    #[test]
    fn missing_manifest_is_a_load_error() {
        let loader = ProjectLoader::new(EngineConfig::default());
        let err = loader
            .read_manifest(&MemorySource::new(), &NormalizedPath::new("nope.json"))
            .unwrap_err();
        assert!(matches!(err, Error::ManifestLoad { .. }));
    }

    #[test]
    fn manifest_dir_defaults_to_current() {
        assert_eq!(manifest_dir(Path::new("manifest.json")), PathBuf::from("."));
        assert_eq!(manifest_dir(Path::new("tokens/manifest.json")), PathBuf::from("tokens"));
    }
}
