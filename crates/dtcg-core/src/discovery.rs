//! Round-based dependency discovery
//!
//! Starting from every source the manifest names, each round loads the
//! files not seen yet, builds and resolves their ASTs, and queues the
//! files their external references point at for the next round. The run
//! ends when a round finds nothing new or the round cap is reached.
//!
//! Files within one round are independent and may be loaded in parallel;
//! results are merged in path order before the next queue is computed, so
//! the outcome does not depend on scheduling.

use crate::ast::TokenAst;
use crate::diagnostic::Diagnostic;
use crate::fault::catch_fault;
use crate::resolve::analyze_document;
use dtcg_fs::{FileSource, NormalizedPath};
use dtcg_manifest::{DocumentKind, Manifest, SchemaValidator, Source};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Knobs for one discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Stop after this many rounds; unbounded when `None`
    pub max_rounds: Option<usize>,
    pub parallel: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_rounds: None,
            parallel: true,
        }
    }
}

/// Everything discovery found.
#[derive(Debug, Default)]
pub struct DiscoveryResult {
    /// Every file discovered, loaded or not, in discovery order
    pub files: Vec<String>,
    pub loaded: BTreeMap<String, TokenAst>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub rounds: usize,
    /// The round cap stopped discovery before the queue was empty
    pub truncated: bool,
}

impl DiscoveryResult {
    /// Loaded files in discovery order.
    pub fn loaded_files(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .map(String::as_str)
            .filter(|file| self.loaded.contains_key(*file))
    }
}

/// Discovers and loads every file reachable from a manifest.
pub struct Discovery<'a> {
    source: &'a dyn FileSource,
    validator: &'a dyn SchemaValidator,
    options: DiscoveryOptions,
}

impl<'a> Discovery<'a> {
    pub fn new(source: &'a dyn FileSource, validator: &'a dyn SchemaValidator) -> Self {
        Self {
            source,
            validator,
            options: DiscoveryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self, manifest: &Manifest) -> DiscoveryResult {
        let mut result = DiscoveryResult::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: Vec<String> = Vec::new();
        let mut required: HashSet<String> = HashSet::new();

        for source in manifest.sources() {
            match source {
                Source::Inline { path, document } => {
                    if !seen.insert(path.clone()) {
                        continue;
                    }
                    result.files.push(path.clone());
                    match self.validate(path, document) {
                        Ok(()) => {
                            let ast = analyze_document(path, document);
                            self.accept(ast, &mut result, &mut seen, &mut queue);
                        }
                        Err(message) => result.errors.push(Diagnostic::error(path, message)),
                    }
                }
                Source::File { path } => {
                    let path = NormalizedPath::new(path).normalize().as_str().to_string();
                    required.insert(path.clone());
                    if seen.insert(path.clone()) {
                        result.files.push(path.clone());
                        queue.push(path);
                    }
                }
            }
        }

        while !queue.is_empty() {
            if let Some(max) = self.options.max_rounds
                && result.rounds >= max
            {
                tracing::warn!(rounds = max, pending = queue.len(), "Discovery round cap reached");
                result.warnings.push(Diagnostic::warning(
                    "discovery",
                    format!(
                        "stopped after {max} round(s); {} file(s) not loaded: {}",
                        queue.len(),
                        queue.join(", ")
                    ),
                ));
                result.truncated = true;
                break;
            }

            result.rounds += 1;
            queue.sort();
            tracing::debug!(round = result.rounds, files = queue.len(), "Discovery round");

            let outcomes: Vec<(String, Result<TokenAst, String>)> = if self.options.parallel {
                queue
                    .par_iter()
                    .map(|path| (path.clone(), self.load(path)))
                    .collect()
            } else {
                queue
                    .iter()
                    .map(|path| (path.clone(), self.load(path)))
                    .collect()
            };

            let mut next = Vec::new();
            for (path, outcome) in outcomes {
                match outcome {
                    Ok(ast) => self.accept(ast, &mut result, &mut seen, &mut next),
                    Err(message) if required.contains(&path) => {
                        tracing::warn!(file = %path, %message, "Failed to load required file");
                        result.errors.push(Diagnostic::error(&path, message));
                    }
                    Err(message) => {
                        tracing::warn!(file = %path, %message, "Failed to load referenced file");
                        result.warnings.push(Diagnostic::warning(&path, message));
                    }
                }
            }
            queue = next;
        }

        tracing::info!(
            files = result.files.len(),
            loaded = result.loaded.len(),
            rounds = result.rounds,
            errors = result.errors.len(),
            "Discovery finished"
        );
        result
    }

    /// Load, validate and analyze one file.
    fn load(&self, path: &str) -> Result<TokenAst, String> {
        match catch_fault(|| self.load_inner(path)) {
            Ok(outcome) => outcome,
            Err(panic) => Err(format!("internal error while loading: {panic}")),
        }
    }

    fn load_inner(&self, path: &str) -> Result<TokenAst, String> {
        let document = self
            .source
            .load(&NormalizedPath::new(path))
            .map_err(|e| e.to_string())?;
        self.validate(path, &document)?;
        Ok(analyze_document(path, &document))
    }

    fn validate(&self, path: &str, document: &serde_json::Value) -> Result<(), String> {
        self.validator
            .validate(document, DocumentKind::Tokens)
            .map_err(|issues| {
                let issues: Vec<String> = issues.iter().map(ToString::to_string).collect();
                tracing::debug!(file = %path, ?issues, "Schema validation failed");
                format!("schema validation failed: {}", issues.join("; "))
            })
    }

    /// Record a loaded AST and queue the files it references.
    fn accept(
        &self,
        ast: TokenAst,
        result: &mut DiscoveryResult,
        seen: &mut HashSet<String>,
        queue: &mut Vec<String>,
    ) {
        for reference in &ast.external_references {
            if seen.insert(reference.file.clone()) {
                tracing::debug!(from = %ast.file, file = %reference.file, "Discovered dependency");
                result.files.push(reference.file.clone());
                queue.push(reference.file.clone());
            }
        }
        for warning in &ast.warnings {
            result
                .warnings
                .push(Diagnostic::warning(&ast.file, warning.clone()));
        }
        result.loaded.insert(ast.file.clone(), ast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtcg_fs::MemorySource;
    use dtcg_manifest::{StructuralValidator, TokenSet};
    use serde_json::json;

    fn manifest(files: &[&str]) -> Manifest {
        Manifest {
            sets: vec![TokenSet {
                name: "core".into(),
                description: None,
                sources: files.iter().map(|f| Source::file(*f)).collect(),
            }],
            ..Manifest::default()
        }
    }

    #[test]
    fn follows_references_across_rounds() {
        let source = MemorySource::new()
            .with("a.json", json!({"x": {"$value": {"$ref": "lib/b.json#/y"}}}))
            .with("lib/b.json", json!({"y": {"$value": {"$ref": "c.json#/z"}}}))
            .with("lib/c.json", json!({"z": {"$value": 1}}));
        let validator = StructuralValidator::new();

        let result = Discovery::new(&source, &validator).run(&manifest(&["a.json"]));

        assert_eq!(result.files, vec!["a.json", "lib/b.json", "lib/c.json"]);
        assert_eq!(result.rounds, 3);
        assert!(result.errors.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn required_failure_is_error_and_referenced_failure_is_warning() {
        let source = MemorySource::new()
            .with("a.json", json!({"x": {"$value": {"$ref": "gone.json#/y"}}}));
        let validator = StructuralValidator::new();

        let result = Discovery::new(&source, &validator).run(&manifest(&["a.json", "missing.json"]));

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].source, "missing.json");
        assert!(result.warnings.iter().any(|w| w.source == "gone.json"));
        assert_eq!(result.loaded.len(), 1);
    }

    #[test]
    fn round_cap_truncates_with_warning() {
        let source = MemorySource::new()
            .with("a.json", json!({"x": {"$value": {"$ref": "b.json#/y"}}}))
            .with("b.json", json!({"y": {"$value": 1}}));
        let validator = StructuralValidator::new();

        let result = Discovery::new(&source, &validator)
            .with_options(DiscoveryOptions {
                max_rounds: Some(1),
                parallel: false,
            })
            .run(&manifest(&["a.json"]));

        assert!(result.truncated);
        assert_eq!(result.rounds, 1);
        assert!(!result.loaded.contains_key("b.json"));
        assert_eq!(result.warnings.len(), 1);
    }
}
