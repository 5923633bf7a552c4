//! File sources consumed by dependency discovery
//!
//! A [`FileSource`] maps a project-relative path to a decoded document or a
//! classified [`LoadError`]. [`FsSource`] reads from disk below a base
//! directory and caches every decoded document by canonical absolute path
//! for the lifetime of one run. [`MemorySource`] serves documents held in
//! memory and is what tests and embedders use.

use crate::store::{DocumentFormat, DocumentStore};
use crate::{LoadError, NormalizedPath, io};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Access to token and manifest documents by project-relative path.
pub trait FileSource: Send + Sync {
    /// Load and decode the document at `path`.
    fn load(&self, path: &NormalizedPath) -> Result<Arc<Value>, LoadError>;
}

/// Filesystem-backed source rooted at a base directory.
#[derive(Debug)]
pub struct FsSource {
    base_dir: PathBuf,
    cache: DashMap<PathBuf, Arc<Value>>,
    reads: AtomicUsize,
}

impl FsSource {
    /// Create a source resolving relative paths against `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            cache: DashMap::new(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of documents actually read from disk (cache misses).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of cached documents.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn absolute(&self, path: &NormalizedPath) -> PathBuf {
        if path.is_absolute() {
            path.to_native()
        } else {
            self.base_dir.join(path.to_native())
        }
    }
}

impl FileSource for FsSource {
    fn load(&self, path: &NormalizedPath) -> Result<Arc<Value>, LoadError> {
        let absolute = self.absolute(path);
        let canonical =
            dunce::canonicalize(&absolute).map_err(|e| LoadError::from_io(path.as_str(), &e))?;

        if let Some(cached) = self.cache.get(&canonical) {
            tracing::debug!(file = %path, "Document cache hit");
            return Ok(Arc::clone(cached.value()));
        }

        let native = NormalizedPath::new(&canonical);
        let format =
            DocumentFormat::detect(&native).map_err(|e| LoadError::classify(path.as_str(), e))?;
        let content = io::read_text(&native).map_err(|e| LoadError::classify(path.as_str(), e))?;
        let value: Value = DocumentStore::decode(&native, format, &content)
            .map_err(|e| LoadError::classify(path.as_str(), e))?;

        self.reads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(file = %path, format = format.name(), "Loaded document");

        let value = Arc::new(value);
        self.cache.insert(canonical, Arc::clone(&value));
        Ok(value)
    }
}

/// In-memory source keyed by normalized path.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: HashMap<String, Arc<Value>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document.
    pub fn insert(&mut self, path: &str, document: Value) {
        let key = NormalizedPath::new(path).normalize();
        self.files.insert(key.as_str().to_string(), Arc::new(document));
    }

    /// Builder-style [`MemorySource::insert`].
    pub fn with(mut self, path: &str, document: Value) -> Self {
        self.insert(path, document);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSource for MemorySource {
    fn load(&self, path: &NormalizedPath) -> Result<Arc<Value>, LoadError> {
        let key = path.normalize();
        self.files
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: path.as_str().to_string(),
            })
    }
}
