//! Resolve permutations and print or write them

use colored::Colorize;
use dtcg_core::{
    Assignment, Flatten, GenerationReport, Permutation, PermutationEngine, Selection,
    StripMetadata, Transform, apply_transforms,
};
use dtcg_fs::{DocumentStore, NormalizedPath};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::context::Context;
use crate::error::{CliError, Result};

/// Flags of the resolve command.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub inputs: Vec<String>,
    pub all: bool,
    pub directed: bool,
    pub out_dir: Option<PathBuf>,
    pub json: bool,
    pub flatten: bool,
    pub strip_metadata: bool,
}

impl ResolveOptions {
    fn transforms(&self) -> Vec<Box<dyn Transform>> {
        let mut transforms: Vec<Box<dyn Transform>> = Vec::new();
        if self.strip_metadata {
            transforms.push(Box::new(StripMetadata));
        }
        if self.flatten {
            transforms.push(Box::new(Flatten));
        }
        transforms
    }
}

/// Parse `NAME=VALUE[,VALUE]` selections.
pub fn parse_inputs(inputs: &[String]) -> Result<Assignment> {
    let mut assignment = Assignment::new();
    for input in inputs {
        let Some((name, value)) = input.split_once('=') else {
            return Err(CliError::user(format!(
                "Invalid input '{input}': expected NAME=VALUE"
            )));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::user(format!(
                "Invalid input '{input}': modifier name is empty"
            )));
        }
        assignment.insert(name.to_string(), Selection::parse(value));
    }
    Ok(assignment)
}

/// Run the resolve command
pub fn run_resolve(manifest: &Path, config: Option<&Path>, options: &ResolveOptions) -> Result<()> {
    let context = Context::load(manifest, config)?;
    for diagnostic in &context.project.errors {
        eprintln!("{} {}", "error:".red().bold(), diagnostic);
    }
    for diagnostic in &context.project.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), diagnostic);
    }

    let engine = PermutationEngine::new(&context.project)?.with_config(context.config.clone());
    let transforms = options.transforms();

    if !options.all && !options.directed {
        let input = parse_inputs(&options.inputs)?;
        let permutation = engine.resolve(&input)?;
        report_metadata(&permutation);
        return emit(&[permutation], &transforms, options);
    }

    let report = if options.all {
        engine.generate_all()?
    } else {
        engine.generate_directed()
    };
    emit(&report.permutations, &transforms, options)?;
    finish(&report)
}

fn emit(permutations: &[Permutation], transforms: &[Box<dyn Transform>], options: &ResolveOptions) -> Result<()> {
    if let Some(out_dir) = &options.out_dir {
        for permutation in permutations {
            let path = write_output(out_dir, permutation, transforms, options.json)?;
            println!(
                "{} {} -> {}",
                "Wrote".green().bold(),
                permutation.output_name(),
                path.display()
            );
        }
        return Ok(());
    }

    let rendered: Vec<Value> = permutations
        .iter()
        .map(|p| render(p, transforms, options.json))
        .collect::<Result<_>>()?;
    let output = match rendered.as_slice() {
        [single] => serde_json::to_string_pretty(single)?,
        _ => serde_json::to_string_pretty(&rendered)?,
    };
    println!("{output}");
    Ok(())
}

/// The tokens after transforms, or the whole record with `--json`.
fn render(permutation: &Permutation, transforms: &[Box<dyn Transform>], record: bool) -> Result<Value> {
    let tokens = apply_transforms(permutation, transforms)?;
    if !record {
        return Ok(tokens);
    }
    let mut value = serde_json::to_value(permutation)?;
    if let Value::Object(map) = &mut value {
        map.insert("tokens".into(), tokens);
    }
    Ok(value)
}

fn write_output(
    out_dir: &Path,
    permutation: &Permutation,
    transforms: &[Box<dyn Transform>],
    record: bool,
) -> Result<PathBuf> {
    let name = output_file_name(permutation.output_name())?;
    let path = out_dir.join(name);
    let value = render(permutation, transforms, record)?;
    DocumentStore::new().save(&NormalizedPath::new(&path), &value)?;
    tracing::debug!(path = %path.display(), "Wrote permutation");
    Ok(path)
}

/// `<name>.json`, refusing names that would leave the output directory.
fn output_file_name(name: &str) -> Result<String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(CliError::user(format!(
            "Invalid output name '{name}': must be a plain file name"
        )));
    }
    Ok(format!("{name}.json"))
}

fn report_metadata(permutation: &Permutation) {
    for error in &permutation.metadata.errors {
        eprintln!("{} {}: {}", "error:".red().bold(), permutation.id, error);
    }
    for warning in &permutation.metadata.warnings {
        eprintln!("{} {}: {}", "warning:".yellow().bold(), permutation.id, warning);
    }
}

fn finish(report: &GenerationReport) -> Result<()> {
    report.permutations.iter().for_each(report_metadata);
    for failure in &report.failures {
        eprintln!("{} {}: {}", "failed:".red().bold(), failure.id, failure.error);
    }
    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} of {} permutation(s) failed",
            report.failures.len(),
            report.failures.len() + report.permutations.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_multi_values() {
        let input = parse_inputs(&["theme=dark".into(), "features=a,b".into()]).unwrap();
        assert_eq!(input["theme"], Selection::from("dark"));
        assert_eq!(input["features"], Selection::from(vec!["a", "b"]));
    }

    #[test]
    fn rejects_input_without_equals() {
        let err = parse_inputs(&["theme".into()]).unwrap_err();
        assert!(err.to_string().contains("expected NAME=VALUE"));
    }

    #[test]
    fn output_names_stay_inside_out_dir() {
        assert_eq!(output_file_name("web-dark").unwrap(), "web-dark.json");
        assert_eq!(output_file_name("theme-a&features-x,y").unwrap(), "theme-a&features-x,y.json");
        for name in ["", ".", "..", "../escape", "nested/web", "..\\escape"] {
            let err = output_file_name(name).unwrap_err();
            assert!(err.to_string().contains("must be a plain file name"), "{name}");
        }
    }

    #[test]
    fn transforms_follow_flags() {
        let options = ResolveOptions {
            flatten: true,
            strip_metadata: true,
            ..ResolveOptions::default()
        };
        let names: Vec<String> = options
            .transforms()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["strip-metadata", "flatten"]);
    }
}
