//! Single-document resolution passes
//!
//! Passes run in a fixed order over a freshly built [`TokenAst`]:
//! reference resolution, cycle detection, type inference, then reference
//! depths and resolved values.

pub mod cycles;
pub mod reference;
pub mod resolver;
pub mod types;
pub mod values;

pub use cycles::{Cycle, ReferenceGraph, detect_cycles};
pub use reference::ReferenceTarget;
pub use resolver::resolve_references;
pub use types::{infer_from_value, infer_types};
pub use values::{compute_depths, resolve_values};

use crate::ast::{TokenAst, build_ast};
use serde_json::Value;

/// Run every resolution pass on an already built AST.
pub fn analyze(ast: &mut TokenAst) -> Vec<Cycle> {
    resolve_references(ast);
    let cycles = detect_cycles(ast);
    infer_types(ast);
    compute_depths(ast);
    resolve_values(ast);
    cycles
}

/// Build and fully resolve one document.
pub fn analyze_document(file: &str, document: &Value) -> TokenAst {
    let mut ast = build_ast(file, document);
    analyze(&mut ast);
    ast
}
