//! List permutation ids

use colored::Colorize;
use dtcg_core::PermutationEngine;
use std::path::Path;

use crate::context::Context;
use crate::error::Result;

/// Run the list command
pub fn run_list(manifest: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let context = Context::load(manifest, config)?;
    let engine = PermutationEngine::new(&context.project)?.with_config(context.config.clone());
    let ids = engine.permutation_ids()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ids)?);
        return Ok(());
    }

    let manifest = context.project.manifest()?;
    println!("{}", "Permutations".bold());
    println!();
    for id in &ids {
        println!("  {}", id.green());
    }
    println!();
    println!(
        "{} {} permutation(s) across {} modifier(s).",
        "Total:".dimmed(),
        ids.len(),
        manifest.modifiers.len()
    );
    Ok(())
}
