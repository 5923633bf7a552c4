//! Manifest front-end registry
//!
//! An explicit table mapping dialect names to front-ends. It is built once
//! from the built-in set and can be extended by callers through
//! [`FrontendRegistry::register`].

use crate::frontend::{ManifestFrontend, NativeFrontend, ResolverFrontend};
use crate::{Error, Manifest, Result};
use serde_json::Value;

/// Registry of manifest front-ends.
///
/// # Example
///
/// ```
/// use dtcg_manifest::FrontendRegistry;
/// use serde_json::json;
///
/// let registry = FrontendRegistry::with_builtins();
/// let manifest = registry
///     .parse(&json!({"sets": [{"name": "base", "files": ["base.json"]}]}))
///     .unwrap();
/// assert_eq!(manifest.format, "native");
/// ```
#[derive(Default)]
pub struct FrontendRegistry {
    frontends: Vec<Box<dyn ManifestFrontend>>,
}

impl FrontendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            frontends: Vec::new(),
        }
    }

    /// Create a registry with the built-in front-ends registered.
    ///
    /// Currently registers:
    /// - `native` -> [`NativeFrontend`]
    /// - `resolver` -> [`ResolverFrontend`]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.frontends.push(Box::new(NativeFrontend));
        registry.frontends.push(Box::new(ResolverFrontend));
        registry
    }

    /// Register an additional front-end.
    ///
    /// Names are unique; registering a name twice is an error.
    pub fn register(&mut self, frontend: Box<dyn ManifestFrontend>) -> Result<()> {
        if self.get(frontend.name()).is_some() {
            return Err(Error::DuplicateFrontend {
                name: frontend.name().to_string(),
            });
        }
        self.frontends.push(frontend);
        Ok(())
    }

    /// Look up a front-end by name.
    pub fn get(&self, name: &str) -> Option<&dyn ManifestFrontend> {
        self.frontends
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    /// Registered front-end names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.frontends.iter().map(|f| f.name()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.frontends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frontends.is_empty()
    }

    /// Find the single front-end claiming `raw`.
    pub fn detect(&self, raw: &Value) -> Result<&dyn ManifestFrontend> {
        let claimed: Vec<&dyn ManifestFrontend> = self
            .frontends
            .iter()
            .filter(|f| f.detect(raw))
            .map(|f| f.as_ref())
            .collect();

        match claimed.as_slice() {
            [] => Err(Error::UnknownFormat),
            [frontend] => Ok(*frontend),
            many => Err(Error::AmbiguousFormat {
                formats: many.iter().map(|f| f.name().to_string()).collect(),
            }),
        }
    }

    /// Detect, validate and normalize a raw manifest.
    pub fn parse(&self, raw: &Value) -> Result<Manifest> {
        let frontend = self.detect(raw)?;
        tracing::debug!(format = frontend.name(), "Detected manifest format");

        let issues = frontend.validate(raw);
        if !issues.is_empty() {
            return Err(Error::Invalid {
                format: frontend.name().to_string(),
                issues,
            });
        }

        let manifest = frontend.parse(raw)?;
        let issues = manifest.validate();
        if !issues.is_empty() {
            return Err(Error::Invalid {
                format: frontend.name().to_string(),
                issues,
            });
        }

        tracing::debug!(
            sets = manifest.sets.len(),
            modifiers = manifest.modifiers.len(),
            "Parsed manifest"
        );
        Ok(manifest)
    }
}

impl std::fmt::Debug for FrontendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendRegistry")
            .field("frontends", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_empty() {
        let registry = FrontendRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_with_builtins() {
        let registry = FrontendRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["native", "resolver"]);
        assert!(registry.get("native").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_register_rejects_duplicate_names() {
        let mut registry = FrontendRegistry::with_builtins();
        let err = registry.register(Box::new(NativeFrontend)).unwrap_err();
        assert!(matches!(err, Error::DuplicateFrontend { name } if name == "native"));
    }
}
