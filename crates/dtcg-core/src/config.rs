//! Engine configuration
//!
//! Loaded from `dtcg.toml` (or any format `dtcg-fs` can decode); every
//! field has a default so an empty file is valid.
//!
//! ```toml
//! max_rounds = 16
//! validation_policy = "abort"
//! parallel = false
//! ```

use crate::Result;
use crate::discovery::DiscoveryOptions;
use dtcg_fs::{DocumentStore, NormalizedPath};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with a permutation whose modifier input is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Record the input errors in the permutation metadata and keep going
    #[default]
    Continue,
    /// Fail the permutation
    Abort,
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown validation policy '{other}'")),
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationPolicy::Continue => write!(f, "continue"),
            ValidationPolicy::Abort => write!(f, "abort"),
        }
    }
}

fn default_parallel() -> bool {
    true
}

/// Settings for one resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cap on dependency discovery rounds; unbounded when absent
    #[serde(default)]
    pub max_rounds: Option<usize>,

    #[serde(default)]
    pub validation_policy: ValidationPolicy,

    /// Load files and generate permutations on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Treat warnings as failures when reporting
    #[serde(default)]
    pub fail_on_warnings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rounds: None,
            validation_policy: ValidationPolicy::default(),
            parallel: default_parallel(),
            fail_on_warnings: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let config: EngineConfig = DocumentStore::new().load(path)?;
        tracing::debug!(path = %path, ?config, "Loaded engine config");
        Ok(config)
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            max_rounds: self.max_rounds,
            parallel: self.parallel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config: EngineConfig = toml_from_str("");
        assert_eq!(config, EngineConfig::default());
        assert!(config.parallel);
        assert_eq!(config.max_rounds, None);
    }

    #[test]
    fn parses_all_fields() {
        let config: EngineConfig = toml_from_str(
            r#"
max_rounds = 4
validation_policy = "abort"
parallel = false
fail_on_warnings = true
"#,
        );
        assert_eq!(config.max_rounds, Some(4));
        assert_eq!(config.validation_policy, ValidationPolicy::Abort);
        assert!(!config.parallel);
        assert!(config.fail_on_warnings);
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("ABORT".parse::<ValidationPolicy>(), Ok(ValidationPolicy::Abort));
        assert!("sometimes".parse::<ValidationPolicy>().is_err());
    }

    fn toml_from_str(content: &str) -> EngineConfig {
        DocumentStore::decode(
            &NormalizedPath::new("dtcg.toml"),
            dtcg_fs::DocumentFormat::Toml,
            content,
        )
        .unwrap()
    }
}
