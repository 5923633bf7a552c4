//! DTCG token resolver CLI
//!
//! Resolves design-token permutations from a manifest and reports project
//! diagnostics.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use commands::ResolveOptions;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Resolve {
            manifest,
            inputs,
            all,
            directed,
            out_dir,
            json,
            flatten,
            strip_metadata,
        } => {
            let options = ResolveOptions {
                inputs,
                all,
                directed,
                out_dir,
                json,
                flatten,
                strip_metadata,
            };
            commands::run_resolve(&manifest, config, &options)
        }
        Commands::List { manifest, json } => commands::run_list(&manifest, config, json),
        Commands::Check { manifest } => commands::run_check(&manifest, config),
    }
}

fn init_tracing(verbose: bool) {
    if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
