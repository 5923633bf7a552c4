//! Command implementations for dtcg-cli

pub mod check;
pub mod list;
pub mod resolve;

pub use check::run_check;
pub use list::run_list;
pub use resolve::{ResolveOptions, run_resolve};
