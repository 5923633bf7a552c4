//! Error types for dtcg-fs

use std::path::PathBuf;

/// Result type for dtcg-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dtcg-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} document at {path}: {message}")]
    DocumentParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} document at {path}: {message}")]
    DocumentSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported document format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Classified failure returned by a [`crate::FileSource`].
///
/// Unlike [`Error`] this is cheap to clone so discovery can keep it in
/// its diagnostics after the load attempt is over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },
}

impl LoadError {
    /// Path of the file that failed to load.
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path }
            | Self::Parse { path, .. }
            | Self::PermissionDenied { path }
            | Self::Io { path, .. } => path,
        }
    }

    /// Classify an I/O error raised while reading `path`.
    pub fn from_io(path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io {
                path,
                message: err.to_string(),
            },
        }
    }

    /// Classify a dtcg-fs error raised while loading `path`.
    pub fn classify(path: impl Into<String>, err: Error) -> Self {
        let path = path.into();
        match err {
            Error::Io { source, .. } => Self::from_io(path, &source),
            Error::DocumentParse { message, .. } => Self::Parse { path, message },
            Error::UnsupportedFormat { extension } => Self::Parse {
                path,
                message: format!("unsupported document format '{extension}'"),
            },
            other => Self::Io {
                path,
                message: other.to_string(),
            },
        }
    }
}
