//! Loading a project the way every command needs it

use crate::error::{CliError, Result};
use dtcg_core::{EngineConfig, Project, ProjectLoader};
use dtcg_fs::NormalizedPath;
use std::path::{Path, PathBuf};

/// Config file picked up next to the manifest.
pub const CONFIG_FILE: &str = "dtcg.toml";

/// A loaded project together with the config it was loaded with.
pub struct Context {
    pub config: EngineConfig,
    pub project: Project,
}

impl Context {
    /// Load the manifest at `manifest`.
    ///
    /// An explicit `config` wins; otherwise `dtcg.toml` next to the
    /// manifest is used when present.
    pub fn load(manifest: &Path, config: Option<&Path>) -> Result<Self> {
        if !manifest.exists() {
            return Err(CliError::user(format!(
                "Manifest not found: {}",
                manifest.display()
            )));
        }

        let config = match config_path(manifest, config) {
            Some(path) => {
                tracing::debug!(config = %path.display(), "Using engine config");
                EngineConfig::load(&NormalizedPath::new(&path))?
            }
            None => EngineConfig::default(),
        };

        let project = ProjectLoader::new(config.clone()).load(manifest)?;
        Ok(Self { config, project })
    }
}

fn config_path(manifest: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let sibling = manifest
        .parent()
        .map(|dir| dir.join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    sibling.is_file().then_some(sibling)
}
