//! Error types for dtcg-manifest

use crate::schema::FieldError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] dtcg_fs::Error),

    #[error("No registered manifest front-end recognizes this document")]
    UnknownFormat,

    #[error("Manifest is claimed by several front-ends: {}", .formats.join(", "))]
    AmbiguousFormat { formats: Vec<String> },

    #[error("Front-end already registered: {name}")]
    DuplicateFrontend { name: String },

    #[error("Failed to parse {format} manifest: {message}")]
    Parse { format: String, message: String },

    #[error("Invalid {format} manifest: {}", format_issues(.issues))]
    Invalid {
        format: String,
        issues: Vec<FieldError>,
    },
}

fn format_issues(issues: &[FieldError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
