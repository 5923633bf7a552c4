//! Check a project for load, reference and cycle problems

use colored::Colorize;
use dtcg_core::{Diagnostic, Project};
use std::path::Path;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Run the check command
///
/// Fails when any error is found, or any warning under
/// `fail_on_warnings`.
pub fn run_check(manifest: &Path, config: Option<&Path>) -> Result<()> {
    let context = Context::load(manifest, config)?;
    let project = &context.project;

    let (errors, warnings) = collect(project);
    for diagnostic in &errors {
        println!("{} {}", "error:".red().bold(), diagnostic);
    }
    for diagnostic in &warnings {
        println!("{} {}", "warning:".yellow().bold(), diagnostic);
    }

    println!(
        "{} {} file(s), {} token(s), {} cross-file reference(s)",
        "Checked".green().bold(),
        project.files.len(),
        project.token_count(),
        project.cross_references.len()
    );

    if !errors.is_empty() {
        return Err(CliError::user(format!("{} error(s) found", errors.len())));
    }
    if context.config.fail_on_warnings && !warnings.is_empty() {
        return Err(CliError::user(format!(
            "{} warning(s) found and fail_on_warnings is set",
            warnings.len()
        )));
    }
    Ok(())
}

fn collect(project: &Project) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
    let errors = project
        .errors
        .iter()
        .cloned()
        .chain(project.token_errors())
        .collect();
    let warnings = project
        .warnings
        .iter()
        .cloned()
        .chain(project.token_warnings())
        .collect();
    (errors, warnings)
}
