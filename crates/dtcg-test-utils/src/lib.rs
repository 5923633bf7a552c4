//! Shared test utilities for the DTCG token resolver workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`project`]: [`TestProject`](project::TestProject) builder for token projects on disk
//! - [`fixtures`]: canned token documents and the on-disk fixture projects

pub mod fixtures;
pub mod project;

pub use project::TestProject;
