//! Manifest front-ends
//!
//! A front-end recognizes one manifest dialect, validates it field by
//! field, and normalizes it into a [`Manifest`].

mod native;
mod resolver;

pub use native::NativeFrontend;
pub use resolver::ResolverFrontend;

use crate::schema::FieldError;
use crate::{Manifest, Result};
use serde_json::Value;

/// Capability set of one manifest dialect.
pub trait ManifestFrontend: Send + Sync {
    /// Unique dialect name, e.g. `native`
    fn name(&self) -> &'static str;

    /// Whether this front-end claims the raw document.
    fn detect(&self, raw: &Value) -> bool;

    /// Field-level checks on the raw document; empty when valid.
    fn validate(&self, raw: &Value) -> Vec<FieldError>;

    /// Normalize the raw document.
    fn parse(&self, raw: &Value) -> Result<Manifest>;
}

/// Deserialize `raw` into a dialect-specific shape, attributing errors to `format`.
pub(crate) fn from_value<T: serde::de::DeserializeOwned>(format: &str, raw: &Value) -> Result<T> {
    serde_json::from_value(raw.clone()).map_err(|e| crate::Error::Parse {
        format: format.to_string(),
        message: e.to_string(),
    })
}
