//! Whole-project assembly
//!
//! Discovery leaves one resolved [`TokenAst`] per file with its external
//! edges accepted but unresolved. The project resolver links them:
//!
//! 1. file dependency graph from every external reference site
//! 2. cross-file reference index, with each site resolved to a concrete
//!    token in the target file
//! 3. cycle detection over qualified `file#path` nodes, so cycles may span
//!    files
//! 4. reference depths, types and resolved values recomputed across files

use crate::ast::{Token, TokenAst};
use crate::diagnostic::Diagnostic;
use crate::discovery::DiscoveryResult;
use crate::error::{Error, Result};
use crate::fault::catch_fault;
use crate::resolve::reference::{
    ReferenceTarget, fragment_path, resolve_file_path, select_member, substitute,
};
use crate::resolve::{ReferenceGraph, infer_from_value};
use dtcg_manifest::Manifest;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A reference site whose target lives in another file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossFileReference {
    pub from_file: String,
    pub from_token: String,
    pub target_file: String,
    pub fragment: Option<String>,
    /// Token path in the target file, once resolved
    pub resolved_path: Option<String>,
    pub valid: bool,
    pub circular: bool,
}

/// The in-memory assembly of one run.
#[derive(Debug, Default, Clone)]
pub struct Project {
    pub base_dir: PathBuf,
    pub manifest: Option<Manifest>,
    pub files: BTreeMap<String, TokenAst>,
    /// Loaded files in discovery order
    pub file_order: Vec<String>,
    pub cross_references: Vec<CrossFileReference>,
    /// File -> files it references
    pub dependency_graph: BTreeMap<String, BTreeSet<String>>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Project {
    /// Assemble loaded files without linking them.
    pub fn minimal(
        base_dir: impl AsRef<Path>,
        manifest: Option<Manifest>,
        discovery: DiscoveryResult,
    ) -> Self {
        let file_order = discovery.loaded_files().map(String::from).collect();
        let mut warnings: Vec<Diagnostic> = manifest
            .iter()
            .flat_map(|m| m.warnings.iter())
            .map(|w| Diagnostic::warning("manifest", w.as_str()))
            .collect();
        warnings.extend(discovery.warnings);
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            manifest,
            files: discovery.loaded,
            file_order,
            cross_references: Vec::new(),
            dependency_graph: BTreeMap::new(),
            errors: discovery.errors,
            warnings,
        }
    }

    pub fn manifest(&self) -> Result<&Manifest> {
        self.manifest.as_ref().ok_or(Error::MissingManifest)
    }

    pub fn file(&self, path: &str) -> Option<&TokenAst> {
        self.files.get(path)
    }

    /// The decoded source document of a loaded file.
    pub fn document(&self, path: &str) -> Option<&Value> {
        self.files.get(path).map(|ast| &ast.source)
    }

    pub fn token(&self, file: &str, path: &str) -> Option<&Token> {
        self.files.get(file)?.token(path)
    }

    /// Files `file` references directly.
    pub fn dependencies(&self, file: &str) -> impl Iterator<Item = &str> {
        self.dependency_graph
            .get(file)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    pub fn token_count(&self) -> usize {
        self.files.values().map(TokenAst::token_count).sum()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.token_errors().next().is_some()
    }

    /// Token-level errors as diagnostics keyed by file.
    pub fn token_errors(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.files.iter().flat_map(|(file, ast)| {
            ast.tokens().flat_map(move |token| {
                token
                    .errors
                    .iter()
                    .map(move |e| Diagnostic::error(file, format!("{}: {e}", token.path)))
            })
        })
    }

    /// Token-level warnings as diagnostics keyed by file.
    pub fn token_warnings(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.files.iter().flat_map(|(file, ast)| {
            ast.tokens().flat_map(move |token| {
                token
                    .warnings
                    .iter()
                    .map(move |w| Diagnostic::warning(file, format!("{}: {w}", token.path)))
            })
        })
    }

    fn token_mut(&mut self, file: &str, path: &str) -> Option<&mut Token> {
        self.files.get_mut(file)?.token_mut(path)
    }
}

/// Link discovered files into a project.
///
/// Never fails: an unexpected fault while linking leaves the unlinked
/// project with an error entry.
pub fn resolve_project(
    base_dir: impl AsRef<Path>,
    manifest: Option<Manifest>,
    discovery: DiscoveryResult,
) -> Project {
    link_guarded(Project::minimal(base_dir, manifest, discovery), link)
}

/// Run `link` on a copy of `unlinked`, keeping the copy only if it completes.
fn link_guarded(unlinked: Project, link: impl FnOnce(&mut Project)) -> Project {
    let mut scratch = unlinked.clone();
    let project = match catch_fault(move || {
        link(&mut scratch);
        scratch
    }) {
        Ok(linked) => linked,
        Err(message) => {
            tracing::warn!(%message, "Project resolution failed, returning unlinked project");
            let mut project = unlinked;
            project.errors.push(Diagnostic::error(
                "project",
                format!("project resolution failed: {message}"),
            ));
            project
        }
    };

    tracing::info!(
        files = project.files.len(),
        cross_references = project.cross_references.len(),
        errors = project.errors.len(),
        "Resolved project"
    );
    project
}

fn link(project: &mut Project) {
    build_dependency_graph(project);
    index_cross_references(project);
    detect_project_cycles(project);
    recompute_tokens(project);
}

fn build_dependency_graph(project: &mut Project) {
    for (file, ast) in &project.files {
        let deps = project.dependency_graph.entry(file.clone()).or_default();
        for reference in &ast.external_references {
            deps.insert(reference.file.clone());
        }
    }
}

fn index_cross_references(project: &mut Project) {
    let mut index = Vec::new();
    for (file, ast) in &project.files {
        for reference in &ast.external_references {
            let mut entry = CrossFileReference {
                from_file: file.clone(),
                from_token: reference.from.clone(),
                target_file: reference.file.clone(),
                fragment: reference.fragment.clone(),
                resolved_path: None,
                valid: false,
                circular: false,
            };
            match project.files.get(&reference.file) {
                None => {}
                Some(_) if reference.fragment.is_none() => entry.valid = true,
                Some(target) => {
                    if let Some((path, _)) = reference.fragment.as_deref().and_then(fragment_path)
                        && target.token(&path).is_some()
                    {
                        entry.resolved_path = Some(path);
                        entry.valid = true;
                    }
                }
            }
            index.push(entry);
        }
    }

    for entry in &index {
        match (&entry.resolved_path, entry.valid) {
            (Some(path), true) => {
                let referrer = format!("{}#{}", entry.from_file, entry.from_token);
                if let Some(target) = project.token_mut(&entry.target_file, path) {
                    target.referenced_by.push(referrer);
                }
            }
            (None, true) => {}
            (_, false) => {
                let message = if project.files.contains_key(&entry.target_file) {
                    format!(
                        "reference into '{}' names no token: {}",
                        entry.target_file,
                        entry.fragment.as_deref().unwrap_or_default()
                    )
                } else {
                    format!("referenced file '{}' was not loaded", entry.target_file)
                };
                if let Some(token) = project.token_mut(&entry.from_file, &entry.from_token) {
                    token.invalidate(message.clone());
                }
                project.errors.push(Diagnostic::error(
                    &entry.from_file,
                    format!("{}: {message}", entry.from_token),
                ));
            }
        }
    }

    tracing::debug!(
        references = index.len(),
        invalid = index.iter().filter(|r| !r.valid).count(),
        "Indexed cross-file references"
    );
    project.cross_references = index;
}

fn qualified(file: &str, path: &str) -> String {
    format!("{file}#{path}")
}

fn split_qualified(node: &str) -> Option<(&str, &str)> {
    node.split_once('#')
}

fn detect_project_cycles(project: &mut Project) {
    let mut graph = ReferenceGraph::new();
    for (file, ast) in &project.files {
        for edge in &ast.references {
            if edge.valid
                && !edge.circular
                && !edge.external
                && let Some(target) = &edge.resolved_path
            {
                graph.add_edge(&qualified(file, &edge.from), &qualified(file, target));
            }
        }
    }
    for entry in &project.cross_references {
        if entry.valid
            && let Some(target) = &entry.resolved_path
        {
            graph.add_edge(
                &qualified(&entry.from_file, &entry.from_token),
                &qualified(&entry.target_file, target),
            );
        }
    }

    for cycle in graph.find_cycles() {
        let message = format!("circular reference: {cycle}");
        for node in &cycle.nodes {
            if let Some((file, path)) = split_qualified(node)
                && let Some(token) = project.token_mut(file, path)
            {
                token.invalidate(message.clone());
                token.reference_depth = -1;
            }
        }
        for (from, to) in cycle.edges() {
            let (Some((from_file, from_path)), Some((to_file, to_path))) =
                (split_qualified(from), split_qualified(to))
            else {
                continue;
            };
            if from_file == to_file {
                if let Some(edge) = project
                    .files
                    .get_mut(from_file)
                    .and_then(|ast| ast.reference_from_mut(from_path))
                {
                    edge.circular = true;
                }
            } else {
                for entry in project.cross_references.iter_mut().filter(|r| {
                    r.from_file == from_file
                        && r.from_token == from_path
                        && r.target_file == to_file
                        && r.resolved_path.as_deref() == Some(to_path)
                }) {
                    entry.circular = true;
                }
            }
        }

        let origin = cycle
            .nodes
            .first()
            .and_then(|node| split_qualified(node))
            .map_or("project", |(file, _)| file);
        tracing::debug!(%cycle, "Found cross-file reference cycle");
        project.errors.push(Diagnostic::error(origin, message));
    }
}

/// A resolvable hop out of a reference site.
struct Hop {
    file: String,
    path: String,
    member: Vec<String>,
}

/// Borrowed view used by the cross-file walks.
struct Linker<'a> {
    files: &'a BTreeMap<String, TokenAst>,
    cross: HashMap<(&'a str, &'a str), Vec<&'a CrossFileReference>>,
}

impl<'a> Linker<'a> {
    fn new(project: &'a Project) -> Self {
        let mut cross: HashMap<(&str, &str), Vec<&CrossFileReference>> = HashMap::new();
        for entry in &project.cross_references {
            cross
                .entry((entry.from_file.as_str(), entry.from_token.as_str()))
                .or_default()
                .push(entry);
        }
        Self {
            files: &project.files,
            cross,
        }
    }

    /// Follow a raw reference written in `file` one hop, if it resolves.
    fn hop(&self, file: &str, from: &str, raw: &str) -> Option<Hop> {
        match ReferenceTarget::classify(raw)? {
            ReferenceTarget::Internal { path, member } => {
                self.files.get(file)?.token(&path)?;
                Some(Hop {
                    file: file.to_string(),
                    path,
                    member,
                })
            }
            ReferenceTarget::External {
                file: target,
                fragment,
            } => {
                let target_file = resolve_file_path(file, &target);
                let entry = self
                    .cross
                    .get(&(file, from))?
                    .iter()
                    .find(|r| r.target_file == target_file && r.fragment == fragment)?;
                if !entry.valid || entry.circular {
                    return None;
                }
                let (path, member) = fragment_path(fragment.as_deref()?)?;
                Some(Hop {
                    file: target_file,
                    path,
                    member,
                })
            }
        }
    }

    /// First-edge hop for a token, used by depth and type walks.
    fn first_hop(&self, file: &str, token: &Token) -> Option<Hop> {
        let ast = self.files.get(file)?;
        let edge = ast.reference_from(&token.path)?;
        if !edge.valid || edge.circular {
            return None;
        }
        self.hop(file, &token.path, edge.to.as_deref()?)
    }

    fn depth(
        &self,
        file: &str,
        path: &str,
        memo: &mut HashMap<String, i32>,
        visited: &mut HashSet<String>,
    ) -> i32 {
        let key = qualified(file, path);
        if let Some(depth) = memo.get(&key) {
            return *depth;
        }
        if !visited.insert(key.clone()) {
            return -1;
        }
        let depth = match self.files.get(file).and_then(|ast| ast.token(path)) {
            None => -1,
            Some(token) if !token.valid => -1,
            Some(token) if !token.has_reference => 0,
            Some(token) => match self.first_hop(file, token) {
                Some(hop) => {
                    let inner = self.depth(&hop.file, &hop.path, memo, visited);
                    if inner < 0 { -1 } else { inner + 1 }
                }
                None => -1,
            },
        };
        memo.insert(key, depth);
        depth
    }

    fn resolved_type(
        &self,
        file: &str,
        path: &str,
        memo: &mut HashMap<String, Option<String>>,
        visited: &mut HashSet<String>,
    ) -> Option<String> {
        let key = qualified(file, path);
        if let Some(cached) = memo.get(&key) {
            return cached.clone();
        }
        if !visited.insert(key.clone()) {
            return None;
        }
        let token = self.files.get(file)?.token(path)?;
        let resolved = if let Some(explicit) = token.explicit_type() {
            Some(explicit.to_string())
        } else if let Some(hop) = self.first_hop(file, token)
            && hop.member.is_empty()
        {
            self.resolved_type(&hop.file, &hop.path, memo, visited)
        } else {
            infer_from_value(&token.value).map(String::from)
        };
        memo.insert(key, resolved.clone());
        resolved
    }

    fn resolved_value(
        &self,
        file: &str,
        path: &str,
        memo: &mut HashMap<String, Option<Value>>,
        visited: &mut HashSet<String>,
    ) -> Option<Value> {
        let key = qualified(file, path);
        if let Some(cached) = memo.get(&key) {
            return cached.clone();
        }
        if !visited.insert(key.clone()) {
            return None;
        }
        let token = self.files.get(file)?.token(path)?;
        let value = if !token.valid {
            None
        } else if !token.has_reference {
            Some(token.value.clone())
        } else {
            Some(substitute(&token.value, &mut |raw| {
                let hop = self.hop(file, path, raw)?;
                let target = self.resolved_value(&hop.file, &hop.path, memo, visited)?;
                select_member(&target, &hop.member)
            }))
        };
        memo.insert(key, value.clone());
        value
    }
}

/// Recompute depth, type and value of every token across file bounds.
fn recompute_tokens(project: &mut Project) {
    let updates: Vec<(String, String, i32, Option<String>, Option<Value>)> = {
        let linker = Linker::new(project);
        let mut depths = HashMap::new();
        let mut depth_visited = HashSet::new();
        let mut types = HashMap::new();
        let mut type_visited = HashSet::new();
        let mut values = HashMap::new();
        let mut value_visited = HashSet::new();

        project
            .files
            .iter()
            .flat_map(|(file, ast)| ast.tokens().map(move |token| (file, token)))
            .map(|(file, token)| {
                (
                    file.clone(),
                    token.path.clone(),
                    linker.depth(file, &token.path, &mut depths, &mut depth_visited),
                    linker.resolved_type(file, &token.path, &mut types, &mut type_visited),
                    linker.resolved_value(file, &token.path, &mut values, &mut value_visited),
                )
            })
            .collect()
    };

    for (file, path, depth, resolved_type, resolved_value) in updates {
        if let Some(token) = project.token_mut(&file, &path) {
            token.reference_depth = depth;
            token.resolved_type = resolved_type;
            token.resolved_value = resolved_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use dtcg_fs::MemorySource;
    use dtcg_manifest::{Source, StructuralValidator, TokenSet};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn discover(source: &MemorySource, files: &[&str]) -> (Manifest, DiscoveryResult) {
        let manifest = Manifest {
            sets: vec![TokenSet {
                name: "core".into(),
                description: None,
                sources: files.iter().map(|f| Source::file(*f)).collect(),
            }],
            ..Manifest::default()
        };
        let validator = StructuralValidator::new();
        let discovery = Discovery::new(source, &validator).run(&manifest);
        (manifest, discovery)
    }

    fn project(source: &MemorySource, files: &[&str]) -> Project {
        let (manifest, discovery) = discover(source, files);
        resolve_project(".", Some(manifest), discovery)
    }

    fn tokens_of(project: &Project) -> Vec<(String, Vec<Token>)> {
        project
            .files
            .iter()
            .map(|(file, ast)| (file.clone(), ast.tokens().cloned().collect()))
            .collect()
    }

    #[test]
    fn resolves_cross_file_chain() {
        let source = MemorySource::new()
            .with("base.json", json!({"blue": {"$value": "#00f", "$type": "color"}}))
            .with(
                "theme.json",
                json!({
                    "primary": {"$value": {"$ref": "base.json#/blue"}},
                    "accent": {"$value": "{primary}"}
                }),
            );
        let project = project(&source, &["theme.json"]);

        assert!(project.errors.is_empty(), "{:?}", project.errors);
        assert_eq!(project.file_order, vec!["theme.json", "base.json"]);
        assert_eq!(project.dependencies("theme.json").collect::<Vec<_>>(), vec!["base.json"]);

        let accent = project.token("theme.json", "accent").unwrap();
        assert_eq!(accent.reference_depth, 2);
        assert_eq!(accent.resolved_value, Some(json!("#00f")));
        assert_eq!(accent.resolved_type.as_deref(), Some("color"));

        let blue = project.token("base.json", "blue").unwrap();
        assert_eq!(blue.referenced_by, vec!["theme.json#primary"]);
    }

    #[test]
    fn unknown_fragment_is_an_error() {
        let source = MemorySource::new()
            .with("base.json", json!({"blue": {"$value": "#00f"}}))
            .with("theme.json", json!({"primary": {"$value": {"$ref": "base.json#/red"}}}));
        let project = project(&source, &["theme.json"]);

        assert_eq!(project.errors.len(), 1);
        assert!(!project.token("theme.json", "primary").unwrap().valid);
        assert!(!project.cross_references[0].valid);
    }

    #[test]
    fn cycles_may_span_files() {
        let source = MemorySource::new()
            .with("a.json", json!({"x": {"$value": {"$ref": "b.json#/y"}}}))
            .with("b.json", json!({"y": {"$value": {"$ref": "a.json#/x"}}}));
        let project = project(&source, &["a.json"]);

        assert_eq!(project.errors.len(), 1);
        assert!(project.errors[0].message.contains("a.json#x -> b.json#y -> a.json#x"));
        assert!(!project.token("a.json", "x").unwrap().valid);
        assert!(!project.token("b.json", "y").unwrap().valid);
        assert!(project.cross_references.iter().all(|r| r.circular));
    }

    #[test]
    fn fault_while_linking_restores_unlinked_files() {
        let source = MemorySource::new()
            .with("base.json", json!({"blue": {"$value": "#00f"}}))
            .with(
                "theme.json",
                json!({
                    "primary": {"$value": {"$ref": "base.json#/red"}},
                    "accent": {"$value": {"$ref": "base.json#/blue"}}
                }),
            );
        let (manifest, discovery) = discover(&source, &["theme.json"]);
        let unlinked = Project::minimal(".", Some(manifest), discovery);
        let expected = tokens_of(&unlinked);

        // fail after tokens were already invalidated and back-linked
        let project = link_guarded(unlinked, |project| {
            build_dependency_graph(project);
            index_cross_references(project);
            assert!(!project.token("theme.json", "primary").unwrap().valid);
            panic!("linker exploded");
        });

        assert_eq!(tokens_of(&project), expected);
        assert!(project.token("theme.json", "primary").unwrap().valid);
        assert!(project.token("base.json", "blue").unwrap().referenced_by.is_empty());
        assert!(project.cross_references.is_empty());
        assert!(project.dependency_graph.is_empty());
        assert_eq!(project.errors.len(), 1);
        assert_eq!(
            project.errors[0].message,
            "project resolution failed: linker exploded"
        );
        assert_eq!(project.file_order, vec!["theme.json", "base.json"]);
    }

    #[test]
    fn manifest_warnings_become_project_warnings() {
        let source = MemorySource::new().with("base.json", json!({"a": {"$value": 1}}));
        let (mut manifest, discovery) = discover(&source, &["base.json"]);
        manifest.warnings.push("fragment ignored".into());

        let project = resolve_project(".", Some(manifest), discovery);
        assert_eq!(
            project.warnings,
            vec![Diagnostic::warning("manifest", "fragment ignored")]
        );
    }

    #[test]
    fn missing_manifest_is_reported() {
        let project = resolve_project(".", None, DiscoveryResult::default());
        assert!(matches!(project.manifest(), Err(Error::MissingManifest)));
    }
}
