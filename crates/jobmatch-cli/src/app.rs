//! The `jobmatch` application: logging setup and command dispatch.

use jobmatch_core::{Error, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command, ConfigAction};
use crate::config::JobmatchConfig;
use crate::handlers;

/// Process exit code for a failed run.
///
/// | Code | Failure |
/// |------|---------|
/// | 1 | anything else |
/// | 2 | configuration |
/// | 3 | shard ingestion |
/// | 4 | query (profile, dimension, corpus not built) |
pub fn exit_code(err: &Error) -> u8 {
    if err.is_ingestion() {
        3
    } else if err.is_query() {
        4
    } else if matches!(err, Error::Config(_)) {
        2
    } else {
        1
    }
}

/// The CLI application bound to a loaded configuration.
pub struct JobmatchCli {
    name: String,
    config: JobmatchConfig,
    version: String,
}

impl JobmatchCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(name: impl Into<String>, args: &CliArgs) -> Result<Self> {
        let config = JobmatchConfig::load(args.config.as_deref())?;
        Ok(Self::new(name, config))
    }

    pub fn new(name: impl Into<String>, config: JobmatchConfig) -> Self {
        Self {
            name: name.into(),
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn config(&self) -> &JobmatchConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    /// Records emitted through `log` by the library crates are forwarded.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // A subscriber may already be installed (tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);
        let verbose = args.verbose || self.config.search.verbose;

        match args.command {
            Some(Command::Embed { input, tag }) => {
                handlers::embed(&self.config, &input, tag.as_deref()).await
            }
            Some(Command::Stats { json }) => handlers::stats(&self.config, json).await,
            Some(Command::Recommend { text, file, k, json }) => {
                let request = handlers::RecommendRequest {
                    text,
                    file,
                    k: k.unwrap_or(self.config.search.default_k),
                    json,
                    verbose,
                };
                handlers::recommend(&self.config, request).await
            }
            Some(Command::Predict { k }) => {
                let k = k.unwrap_or(self.config.evaluation.prediction_k);
                handlers::predict(&self.config, k, verbose).await
            }
            Some(Command::Label) => handlers::label(&self.config),
            Some(Command::Evaluate { k }) => {
                handlers::evaluate(&self.config, k.unwrap_or(self.config.evaluation.metric_k))
            }
            Some(Command::Compare { k, seed }) => {
                let k = k.unwrap_or(self.config.evaluation.metric_k);
                let seed = seed.unwrap_or(self.config.evaluation.random_seed);
                handlers::compare(&self.config, k, seed).await
            }
            Some(Command::Config(cmd)) => match cmd.command {
                ConfigAction::Path => handlers::config_path(args.config.as_deref()),
                ConfigAction::Show => handlers::config_show(&self.config),
            },
            Some(Command::Version) => {
                println!("{} {}", self.name, self.version);
                Ok(())
            }
            None => {
                println!("{} {}: use --help for usage", self.name, self.version);
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
