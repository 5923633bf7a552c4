//! Error types for dtcg-core

use crate::merge::MergeError;
use crate::permutation::InputError;
use std::path::PathBuf;

/// Result type for dtcg-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dtcg-core operations
///
/// Most problems found while resolving tokens are collected as
/// diagnostics on the structures being built. Only the ones that abort an
/// operation surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Manifest file could not be loaded
    #[error("Failed to load manifest {path}: {source}")]
    ManifestLoad {
        path: PathBuf,
        #[source]
        source: dtcg_fs::LoadError,
    },

    /// Project was assembled without a manifest
    #[error("Project has no manifest")]
    MissingManifest,

    /// Structural merge conflict
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Modifier input rejected under the abort policy
    #[error("Invalid input for permutation {id}: {}", format_input_errors(.errors))]
    InvalidInput { id: String, errors: Vec<InputError> },

    /// Exhaustive enumeration would not fit in memory
    #[error("Modifier '{modifier}' has too many options ({options}) to enumerate every combination")]
    TooManyCombinations { modifier: String, options: usize },

    /// A transform hook failed
    #[error("Transform '{transform}' failed for permutation {permutation}: {message}")]
    Transform {
        transform: String,
        permutation: String,
        message: String,
    },

    /// Unexpected fault caught at a recovery boundary
    #[error("Internal error: {message}")]
    Internal { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from dtcg-fs
    #[error(transparent)]
    Fs(#[from] dtcg_fs::Error),

    /// Manifest error from dtcg-manifest
    #[error(transparent)]
    Manifest(#[from] dtcg_manifest::Error),
}

fn format_input_errors(errors: &[InputError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
