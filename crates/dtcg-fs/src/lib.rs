//! File access layer for the DTCG token resolver
//!
//! Provides normalized path handling, format-detecting document decoding,
//! the [`FileSource`] abstraction consumed by dependency discovery, and
//! atomic output writes.

pub mod error;
pub mod io;
pub mod path;
pub mod source;
pub mod store;

pub use error::{Error, LoadError, Result};
pub use path::NormalizedPath;
pub use source::{FileSource, FsSource, MemorySource};
pub use store::{DocumentFormat, DocumentStore};
