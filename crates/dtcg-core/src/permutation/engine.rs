//! Permutation resolution
//!
//! For one selection the engine validates the input, collects the files
//! the selected sets and options contribute, merges them in order and
//! substitutes references by one hop. Every permutation in a batch is
//! produced independently: a failure is recorded in the report and the
//! rest of the batch continues.

use super::combinations::{self, DirectedTarget, Scope};
use super::id::permutation_id;
use super::{
    Assignment, GenerationReport, InputError, Permutation, PermutationFailure,
    PermutationMetadata, Selection,
};
use crate::ast::{NodeKind, build_ast, classify_node};
use crate::config::{EngineConfig, ValidationPolicy};
use crate::error::{Error, Result};
use crate::fault::catch_fault;
use crate::merge::merge_all;
use crate::project::Project;
use crate::resolve::reference::{
    ReferenceTarget, find_references, fragment_path, reference_text, resolve_file_path,
    select_member,
};
use dtcg_fs::NormalizedPath;
use dtcg_manifest::{Manifest, ModifierKind, Source};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Effective selection: modifier name -> selected values.
type Effective = BTreeMap<String, Vec<String>>;

/// Produces permutations of a resolved project.
#[derive(Debug)]
pub struct PermutationEngine<'a> {
    project: &'a Project,
    manifest: &'a Manifest,
    config: EngineConfig,
}

impl<'a> PermutationEngine<'a> {
    pub fn new(project: &'a Project) -> Result<Self> {
        Ok(Self {
            project,
            manifest: project.manifest()?,
            config: EngineConfig::default(),
        })
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Check a selection against the manifest.
    pub fn validate_input(&self, input: &Assignment) -> Vec<InputError> {
        self.effective_input(input, &Scope::all(self.manifest)).1
    }

    /// Apply defaults to a selection and drop its invalid parts.
    ///
    /// An invalid `oneOf` selection falls back to the modifier's default;
    /// unknown `anyOf` values are dropped.
    fn effective_input(&self, input: &Assignment, scope: &Scope) -> (Effective, Vec<InputError>) {
        let mut errors = Vec::new();
        for name in input.keys() {
            if self.manifest.modifier(name).is_none() {
                errors.push(InputError::UnknownModifier {
                    modifier: name.clone(),
                });
            }
        }

        let mut effective = Effective::new();
        for modifier in &self.manifest.modifiers {
            if !scope.has_modifier(&modifier.name) {
                continue;
            }
            let requested = input.get(&modifier.name).map(Selection::values);
            let mut values: Vec<String> = Vec::new();
            if let Some(requested) = requested {
                for value in &requested {
                    if modifier.option(value).is_some() {
                        if !values.contains(value) {
                            values.push(value.clone());
                        }
                    } else {
                        errors.push(InputError::UnknownValue {
                            modifier: modifier.name.clone(),
                            value: value.clone(),
                        });
                    }
                }
                if modifier.kind == ModifierKind::OneOf && requested.len() > 1 {
                    errors.push(InputError::MultipleValues {
                        modifier: modifier.name.clone(),
                        count: requested.len(),
                    });
                    values.clear();
                }
            }

            match modifier.kind {
                ModifierKind::OneOf => {
                    if values.len() != 1 {
                        values = modifier.default_value().map(String::from).into_iter().collect();
                    }
                }
                ModifierKind::AnyOf => {
                    values.sort_by_key(|v| modifier.option_index(v));
                }
            }
            effective.insert(modifier.name.clone(), values);
        }
        (effective, errors)
    }

    fn id_of(effective: &Effective) -> String {
        permutation_id(effective.iter().map(|(name, values)| (name.as_str(), values)))
    }

    /// Files contributed by a selection: sets first in declaration order,
    /// then selected options in manifest order, without duplicates.
    pub fn collect_files(&self, input: &Assignment) -> Vec<String> {
        let scope = Scope::all(self.manifest);
        let (effective, _) = self.effective_input(input, &scope);
        self.files_for(&effective, &scope)
    }

    fn files_for(&self, effective: &Effective, scope: &Scope) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let mut push = |source: &Source| {
            let path = source_path(source);
            if seen.insert(path.clone()) {
                files.push(path);
            }
        };

        for set in &self.manifest.sets {
            if scope.has_set(&set.name) {
                set.sources.iter().for_each(&mut push);
            }
        }
        for modifier in &self.manifest.modifiers {
            let Some(selected) = effective.get(&modifier.name) else {
                continue;
            };
            for option in &modifier.options {
                if selected.contains(&option.name) {
                    option.sources.iter().for_each(&mut push);
                }
            }
        }
        files
    }

    /// Resolve one selection over every set and modifier.
    pub fn resolve(&self, input: &Assignment) -> Result<Permutation> {
        self.generate(None, input, &Scope::all(self.manifest))
    }

    fn generate(&self, name: Option<String>, input: &Assignment, scope: &Scope) -> Result<Permutation> {
        let (effective, input_errors) = self.effective_input(input, scope);
        let id = Self::id_of(&effective);

        if !input_errors.is_empty() && self.config.validation_policy == ValidationPolicy::Abort {
            return Err(Error::InvalidInput {
                id,
                errors: input_errors,
            });
        }

        let mut metadata = PermutationMetadata {
            errors: input_errors.iter().map(ToString::to_string).collect(),
            ..PermutationMetadata::default()
        };

        let files = self.files_for(&effective, scope);
        let mut documents = Vec::with_capacity(files.len());
        for file in &files {
            match self.project.document(file) {
                Some(document) => documents.push(rebase_references(file, document)),
                None => metadata
                    .errors
                    .push(format!("file '{file}' was not loaded")),
            }
        }

        let merged = merge_all(&documents)?;
        let mut resolver = Substitution {
            snapshot: &merged,
            files: &files,
            project: self.project,
            metadata: &mut metadata,
        };
        let tokens = resolver.resolve_node(&merged, "");

        let ast = build_ast(&id, &tokens);
        metadata.file_count = documents.len();
        metadata.token_count = ast.token_count();
        metadata.group_count = ast.group_count();

        tracing::debug!(
            %id,
            files = metadata.file_count,
            tokens = metadata.token_count,
            unresolved = metadata.unresolved_references,
            "Resolved permutation"
        );

        Ok(Permutation {
            id,
            name,
            input: effective,
            files,
            tokens,
            metadata,
        })
    }

    /// Ids of every exhaustive permutation, in enumeration order.
    pub fn permutation_ids(&self) -> Result<Vec<String>> {
        let scope = Scope::all(self.manifest);
        Ok(combinations::exhaustive(self.manifest)?
            .iter()
            .map(|input| Self::id_of(&self.effective_input(input, &scope).0))
            .collect())
    }

    /// Every combination of every modifier.
    ///
    /// Individual failures land in the report; only an enumeration that
    /// cannot be built is an error.
    pub fn generate_all(&self) -> Result<GenerationReport> {
        let scope = Scope::all(self.manifest);
        let jobs: Vec<(Option<String>, Assignment, Scope)> =
            combinations::exhaustive(self.manifest)?
                .into_iter()
                .map(|input| (None, input, scope.clone()))
                .collect();
        Ok(self.run_batch(jobs))
    }

    /// The outputs named by the manifest's generation specs.
    pub fn generate_directed(&self) -> GenerationReport {
        let jobs = self
            .manifest
            .generate
            .iter()
            .flat_map(|spec| combinations::directed(self.manifest, spec))
            .map(|DirectedTarget { name, assignment, scope }| (Some(name), assignment, scope))
            .collect();
        self.run_batch(jobs)
    }

    fn run_batch(&self, jobs: Vec<(Option<String>, Assignment, Scope)>) -> GenerationReport {
        let run = |(name, input, scope): &(Option<String>, Assignment, Scope)| {
            let outcome = catch_fault(|| self.generate(name.clone(), input, scope));
            match outcome {
                Ok(Ok(permutation)) => Ok(permutation),
                Ok(Err(error)) => Err(self.failure(name, input, scope, error.to_string())),
                Err(panic) => Err(self.failure(
                    name,
                    input,
                    scope,
                    Error::Internal { message: panic }.to_string(),
                )),
            }
        };

        let outcomes: Vec<std::result::Result<Permutation, PermutationFailure>> =
            if self.config.parallel {
                jobs.par_iter().map(run).collect()
            } else {
                jobs.iter().map(run).collect()
            };

        let mut report = GenerationReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(permutation) => report.permutations.push(permutation),
                Err(failure) => {
                    tracing::warn!(id = %failure.id, error = %failure.error, "Permutation failed");
                    report.failures.push(failure);
                }
            }
        }
        tracing::info!(
            generated = report.permutations.len(),
            failed = report.failures.len(),
            "Generated permutations"
        );
        report
    }

    fn failure(
        &self,
        name: &Option<String>,
        input: &Assignment,
        scope: &Scope,
        error: String,
    ) -> PermutationFailure {
        PermutationFailure {
            id: Self::id_of(&self.effective_input(input, scope).0),
            name: name.clone(),
            error,
        }
    }
}

fn source_path(source: &Source) -> String {
    match source {
        Source::File { path } => NormalizedPath::new(path).normalize().as_str().to_string(),
        Source::Inline { path, .. } => path.clone(),
    }
}

/// Rewrite external `$ref`s of a document so they are relative to the
/// project base rather than to the file they were written in.
fn rebase_references(file: &str, document: &Value) -> Value {
    match document {
        Value::Object(map) => {
            if let Some(Value::String(raw)) = map.get("$ref")
                && let Some(ReferenceTarget::External { file: target, fragment }) =
                    ReferenceTarget::classify(raw)
            {
                let mut rebased = map.clone();
                let mut reference = resolve_file_path(file, &target);
                if let Some(fragment) = fragment {
                    reference.push('#');
                    reference.push_str(&fragment);
                }
                rebased.insert("$ref".into(), Value::String(reference));
                return Value::Object(rebased);
            }
            Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), rebase_references(file, value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rebase_references(file, item))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Single-hop substitution over a merged document.
///
/// Targets are read from the unsubstituted snapshot, so each reference
/// moves exactly one hop regardless of traversal order.
struct Substitution<'s> {
    snapshot: &'s Value,
    files: &'s [String],
    project: &'s Project,
    metadata: &'s mut PermutationMetadata,
}

impl Substitution<'_> {
    fn resolve_node(&mut self, node: &Value, path: &str) -> Value {
        let Value::Object(map) = node else {
            return node.clone();
        };

        match classify_node(map) {
            Some(NodeKind::Token) => {
                let mut token = map.clone();
                if let Some(value) = map.get("$value") {
                    let resolved = self.resolve_value(value, path);
                    token.insert("$value".into(), resolved);
                }
                Value::Object(token)
            }
            None if map.contains_key("$ref") => self.resolve_reference_node(node, path),
            _ => {
                let mut out = Map::with_capacity(map.len());
                for (key, child) in map {
                    if key.starts_with('$') {
                        out.insert(key.clone(), child.clone());
                    } else {
                        let child_path = join_path(path, key);
                        out.insert(key.clone(), self.resolve_node(child, &child_path));
                    }
                }
                Value::Object(out)
            }
        }
    }

    /// A bare `{"$ref": ...}` node is replaced by the whole target node.
    fn resolve_reference_node(&mut self, node: &Value, path: &str) -> Value {
        let Some(raw) = reference_text(node) else {
            self.unresolved(path, "malformed reference".into(), true);
            return node.clone();
        };
        self.metadata.reference_count += 1;
        match self.lookup(raw) {
            Some((target, _)) if target_is_reference(&target) => {
                self.unresolved(path, format!("reference '{raw}' points at another reference"), false);
                node.clone()
            }
            Some((target, _)) => {
                self.metadata.resolved_references += 1;
                target
            }
            None => {
                self.unresolved(path, format!("unresolved reference '{raw}'"), true);
                node.clone()
            }
        }
    }

    fn resolve_value(&mut self, value: &Value, path: &str) -> Value {
        if let Some(raw) = reference_text(value) {
            self.metadata.reference_count += 1;
            return match self.lookup(raw) {
                Some((target, member)) => match target_value(&target) {
                    Some(target_value) if find_references(&target_value).is_empty() => {
                        match select_member(&target_value, &member) {
                            Some(selected) => {
                                self.metadata.resolved_references += 1;
                                selected
                            }
                            None => {
                                self.unresolved(path, format!("reference '{raw}' selects a missing member"), true);
                                value.clone()
                            }
                        }
                    }
                    Some(_) => {
                        self.unresolved(
                            path,
                            format!("reference '{raw}' is part of a chain longer than one hop"),
                            false,
                        );
                        value.clone()
                    }
                    None => {
                        self.unresolved(path, format!("reference '{raw}' does not point at a token"), true);
                        value.clone()
                    }
                },
                None => {
                    self.unresolved(path, format!("unresolved reference '{raw}'"), true);
                    value.clone()
                }
            };
        }
        if let Value::Object(map) = value
            && map.contains_key("$ref")
        {
            self.metadata.reference_count += 1;
            self.unresolved(path, "malformed reference: $ref must be a string".into(), true);
            return value.clone();
        }

        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), self.resolve_value(child, path)))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.resolve_value(item, path)).collect())
            }
            other => other.clone(),
        }
    }

    /// Find the node a reference points at, plus the member to select in
    /// its value.
    fn lookup(&self, raw: &str) -> Option<(Value, Vec<String>)> {
        match ReferenceTarget::classify(raw)? {
            ReferenceTarget::Internal { path, member } => {
                Some((node_at(self.snapshot, &path)?.clone(), member))
            }
            ReferenceTarget::External { file, fragment } => {
                let (path, member) = fragment_path(fragment.as_deref()?)?;
                let document = if self.files.contains(&file) {
                    self.snapshot
                } else {
                    self.project.document(&file)?
                };
                Some((node_at(document, &path)?.clone(), member))
            }
        }
    }

    fn unresolved(&mut self, path: &str, message: String, error: bool) {
        self.metadata.unresolved_references += 1;
        let entry = format!("{path}: {message}");
        if error {
            self.metadata.errors.push(entry);
        } else {
            self.metadata.warnings.push(entry);
        }
    }
}

fn node_at<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(document, |node, segment| node.as_object()?.get(segment))
}

fn target_value(node: &Value) -> Option<Value> {
    let map = node.as_object()?;
    match classify_node(map) {
        Some(NodeKind::Token) => map.get("$value").cloned(),
        _ => None,
    }
}

fn target_is_reference(node: &Value) -> bool {
    match node.as_object() {
        Some(map) => classify_node(map).is_none() && map.contains_key("$ref"),
        None => false,
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
