//! Manifest handling for the DTCG token resolver.
//!
//! Raw manifests come in several dialects. Each dialect is a
//! [`ManifestFrontend`] registered in a [`FrontendRegistry`]; exactly one
//! front-end must claim a raw manifest and normalize it into the
//! [`Manifest`] shape the resolution engine works with.
//!
//! The crate also carries the [`SchemaValidator`] seam consulted before a
//! token or manifest document is accepted.

pub mod error;
pub mod frontend;
pub mod manifest;
pub mod registry;
pub mod schema;

pub use error::{Error, Result};
pub use frontend::{ManifestFrontend, NativeFrontend, ResolverFrontend};
pub use manifest::{
    GenerateSpec, Manifest, Modifier, ModifierKind, ModifierOption, ModifierRef, Source, TokenSet,
};
pub use registry::FrontendRegistry;
pub use schema::{DocumentKind, FieldError, SchemaValidator, StructuralValidator};
