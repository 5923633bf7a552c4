//! Resolution engine for DTCG design-token projects
//!
//! This crate turns a manifest plus a set of token documents into fully
//! merged, reference-resolved permutations, one per modifier combination:
//!
//! - **AST**: structural tree of tokens and groups per document
//! - **Resolution**: reference resolution, cycle detection, type inference
//! - **Discovery**: round-based loading of every file the manifest reaches
//! - **Project**: whole-project assembly with cross-file references
//! - **Merge**: conflict-aware structural merge of token documents
//! - **Permutations**: modifier combinatorics, file selection, resolution
//!
//! # Architecture
//!
//! ```text
//!   manifest ──> Discovery ──> Project ──> PermutationEngine ──> Permutation
//!                   │             │               │
//!              AST + resolve   cycles/xrefs     merge
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dtcg_core::{EngineConfig, ProjectLoader, PermutationEngine};
//!
//! let project = ProjectLoader::new(EngineConfig::default()).load("tokens/manifest.json")?;
//! let engine = PermutationEngine::new(&project)?;
//! let report = engine.generate_all()?;
//! ```

pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod discovery;
pub mod error;
mod fault;
pub mod loader;
pub mod merge;
pub mod permutation;
pub mod project;
pub mod resolve;
pub mod transform;

pub use ast::{
    AstBuilder, ExternalReference, Group, GroupId, NodeId, NodeKind, Reference, Token, TokenAst,
    TokenId, build_ast,
};
pub use config::{EngineConfig, ValidationPolicy};
pub use diagnostic::{Diagnostic, Severity};
pub use discovery::{Discovery, DiscoveryOptions, DiscoveryResult};
pub use error::{Error, Result};
pub use loader::ProjectLoader;
pub use merge::{COMPOSITE_TYPES, MergeError, merge_all, merge_documents};
pub use permutation::{
    Assignment, DirectedTarget, GenerationReport, InputError, Permutation, PermutationEngine,
    PermutationFailure, PermutationMetadata, Scope, Selection, permutation_id,
};
pub use project::{CrossFileReference, Project, resolve_project};
pub use resolve::{ReferenceTarget, analyze_document};
pub use transform::{
    FnTransform, Flatten, StripMetadata, Transform, TransformError, apply_transforms, transform_fn,
};
