//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DTCG token resolver - merge and resolve design-token permutations
#[derive(Parser, Debug)]
#[command(name = "dtcg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (defaults to dtcg.toml next to the manifest)
    #[arg(short, long, global = true, env = "DTCG_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve permutations of a token project
    ///
    /// Examples:
    ///   dtcg resolve manifest.json -i theme=dark
    ///   dtcg resolve manifest.json -i features=motion,contrast --json
    ///   dtcg resolve manifest.json --all --out-dir dist
    ///   dtcg resolve manifest.json --directed --out-dir dist --flatten
    Resolve {
        /// Path to the manifest
        manifest: PathBuf,

        /// Modifier selection, NAME=VALUE[,VALUE]
        #[arg(short, long = "input", value_name = "NAME=VALUE")]
        inputs: Vec<String>,

        /// Resolve every combination of every modifier
        #[arg(long, conflicts_with_all = ["directed", "inputs"])]
        all: bool,

        /// Resolve the outputs named by the manifest's generate entries
        #[arg(long, conflicts_with = "inputs")]
        directed: bool,

        /// Write one `<name>.json` per permutation into this directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Print full permutation records as JSON
        #[arg(long)]
        json: bool,

        /// Flatten groups into dotted token paths
        #[arg(long)]
        flatten: bool,

        /// Drop $description and $extensions from the output
        #[arg(long)]
        strip_metadata: bool,
    },

    /// List the ids of every permutation
    List {
        /// Path to the manifest
        manifest: PathBuf,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Load and link a project, reporting its diagnostics
    Check {
        /// Path to the manifest
        manifest: PathBuf,
    },
}
