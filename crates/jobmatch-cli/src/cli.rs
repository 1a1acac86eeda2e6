//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

// ============================================================================
// CLI argument types
// ============================================================================

/// Content-based job recommendation over sharded embeddings.
#[derive(Parser, Debug)]
#[command(name = "jobmatch", author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "JOBMATCH_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output, including per-request timings.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show corpus statistics.
    Stats {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Encode a postings file into a shard under `store.shard_dir`.
    Embed {
        /// Postings file, a JSON array (e.g. `avisos_programador.json`).
        input: PathBuf,

        /// Shard tag (defaults to the file stem without `avisos_`).
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Recommend postings for a profile.
    Recommend {
        /// Profile text.
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,

        /// Read the profile text from a file.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Number of recommendations (defaults to `search.default_k`).
        #[arg(short)]
        k: Option<usize>,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Run the engine over the test profiles and write the prediction file.
    Predict {
        /// Recommendations per profile (defaults to `evaluation.prediction_k`).
        #[arg(short)]
        k: Option<usize>,
    },

    /// Derive the ground-truth file from the prediction file.
    Label,

    /// Compute metrics for the stored predictions.
    Evaluate {
        /// Metric cutoff (defaults to `evaluation.metric_k`).
        #[arg(short)]
        k: Option<usize>,
    },

    /// Compare the engine against the random, recency, and lexical baselines.
    Compare {
        /// Metric cutoff (defaults to `evaluation.metric_k`).
        #[arg(short)]
        k: Option<usize>,

        /// Seed for the random baseline (defaults to `evaluation.random_seed`).
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Configuration operations.
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,
}

// ============================================================================
// Tests
// ============================================================================
