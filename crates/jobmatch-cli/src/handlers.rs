//! Command handlers.
//!
//! Each handler builds what it needs from the configuration, delegates to
//! the library crates, and prints results to stdout. Progress goes through
//! `tracing` to stderr.

use jobmatch_core::traits::ConfigProvider;
use jobmatch_core::{Error, Result};
use jobmatch_eval::{
    EvaluationReport, artifacts, compare_models, evaluate_files, format_comparison_table,
    label_file, predict_to_file, standard_lineup,
};
use jobmatch_vector::{
    EmbeddingProvider, EmbeddingStore, MockEmbeddingProvider, Recommendation,
    RecommendationEngine, build_shard,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{EmbeddingConfig, JobmatchConfig, ProviderKind};

// ============================================================================
// Engine construction
// ============================================================================

/// Mock vector width when no corpus dimension is known.
const MOCK_DIMENSION: usize = 384;

/// Build the configured embedding provider.
///
/// The mock provider's width defaults to `corpus_dimension`.
pub fn build_provider(
    config: &EmbeddingConfig,
    corpus_dimension: usize,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::Mock => {
            let dimension = config.dimension.unwrap_or(corpus_dimension);
            Ok(Arc::new(MockEmbeddingProvider::new(dimension)))
        }
        ProviderKind::Fastembed => fastembed_provider(config),
    }
}

#[cfg(feature = "fastembed")]
fn fastembed_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider =
        jobmatch_vector::FastEmbedProvider::new(&config.model, config.cache_path.as_deref())?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "fastembed"))]
fn fastembed_provider(_config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(Error::config(
        "embedding provider 'fastembed' requires building with --features fastembed; \
         set embedding.provider = \"mock\" for smoke tests",
    ))
}

/// Load shards and stand up the engine.
pub fn load_engine(config: &JobmatchConfig, verbose: bool) -> Result<RecommendationEngine> {
    let shard_config = config.shard_config()?;
    tracing::info!(
        "Loading shards matching '{}' from {}",
        shard_config.pattern(),
        shard_config.dir.display()
    );
    let store = EmbeddingStore::open(&shard_config)?;
    let report = store.report();
    tracing::info!(
        "Loaded {} records from {} shard(s) ({} skipped, {} duplicates, {} invalid)",
        store.len(),
        report.shards_loaded.len(),
        report.shards_skipped.len(),
        report.duplicates_dropped,
        report.invalid_dropped
    );
    for skipped in &report.shards_skipped {
        tracing::warn!("Skipped shard '{}': {}", skipped.shard, skipped.reason);
    }

    let provider = build_provider(&config.embedding, store.dimension())?;
    Ok(RecommendationEngine::from_store(provider, store).with_verbose(verbose))
}

// ============================================================================
// Shard commands
// ============================================================================

pub async fn embed(config: &JobmatchConfig, input: &Path, tag: Option<&str>) -> Result<()> {
    let shard_config = config.shard_config()?;
    let provider = build_provider(&config.embedding, MOCK_DIMENSION)?;
    tracing::info!(
        "Encoding {} with '{}' into {}",
        input.display(),
        provider.name(),
        shard_config.dir.display()
    );
    let written = build_shard(provider.as_ref(), input, &shard_config, tag).await?;
    println!("Shard '{}' written to {}", written.tag, written.path.display());
    Ok(())
}

// ============================================================================
// Query commands
// ============================================================================

pub async fn stats(config: &JobmatchConfig, json: bool) -> Result<()> {
    let engine = load_engine(config, false)?;
    let stats = engine.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total jobs:          {}", stats.total_jobs);
    println!("Embedding dimension: {}", stats.embedding_dimension);
    println!("Index:               {}", stats.index_kind);
    if stats.degenerate_rows > 0 {
        println!("Zero-norm rows:      {}", stats.degenerate_rows);
    }
    println!("\nShards:");
    for (tag, count) in &stats.shards {
        println!("  {tag:<24} {count:>6}");
    }
    println!("\nCategories:");
    for (category, count) in &stats.categories {
        println!("  {category:<24} {count:>6}");
    }
    Ok(())
}

/// Arguments of `jobmatch recommend`.
#[derive(Debug, Clone)]
pub struct RecommendRequest {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub k: usize,
    pub json: bool,
    pub verbose: bool,
}

impl RecommendRequest {
    fn profile_text(&self) -> Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => {
                std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))
            }
            (None, None) => Err(Error::invalid_profile("no profile text or file given")),
        }
    }
}

pub async fn recommend(config: &JobmatchConfig, request: RecommendRequest) -> Result<()> {
    let profile = request.profile_text()?;
    let engine = load_engine(config, request.verbose)?;
    let recommendations = engine.recommend(&profile, request.k).await?;

    if request.json {
        println!("{}", serde_json::to_string_pretty(&recommendations)?);
    } else {
        print_recommendations(&recommendations);
    }
    Ok(())
}

fn print_recommendations(recommendations: &[Recommendation]) {
    if recommendations.is_empty() {
        println!("No recommendations.");
        return;
    }
    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "{:>2}. [{:.4}] {} ({}, {})",
            rank + 1,
            rec.score,
            rec.title,
            rec.category,
            rec.source
        );
        println!("    {}", rec.description_preview);
    }
}

// ============================================================================
// Evaluation commands
// ============================================================================

pub async fn predict(config: &JobmatchConfig, k: usize, verbose: bool) -> Result<()> {
    let engine = load_engine(config, verbose)?;
    let output = config.predictions_path()?;
    let summary = predict_to_file(&engine, &config.profiles_path()?, &output, k).await?;
    println!(
        "Predictions for {}/{} profile(s) written to {}",
        summary.succeeded,
        summary.profiles,
        output.display()
    );
    for failure in &summary.failures {
        println!("  failed: {} ({})", failure.profile_id, failure.error);
    }
    Ok(())
}

pub fn label(config: &JobmatchConfig) -> Result<()> {
    let output = config.ground_truth_path()?;
    let ground_truth = label_file(&config.predictions_path()?, &output, &config.category_rules())?;
    println!(
        "Ground truth for {} profile(s) written to {}",
        ground_truth.len(),
        output.display()
    );
    Ok(())
}

pub fn evaluate(config: &JobmatchConfig, k: usize) -> Result<()> {
    let report = evaluate_files(
        "Content-based",
        &config.predictions_path()?,
        &config.ground_truth_path()?,
        k,
    )?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    for id in &report.missing {
        println!("Warning: no ground truth for {id}");
    }
    match report.means {
        Some(means) => {
            let k = report.k;
            println!("Precision@{k}:  {:.4}", means.precision);
            println!("Recall@{k}:     {:.4}", means.recall);
            println!("MRR:           {:.4}", means.mrr);
            println!("Hit Rate@{k}:   {:.4}", means.hit_rate);
        }
        None => println!("No results to evaluate."),
    }
}

pub async fn compare(config: &JobmatchConfig, k: usize, seed: u64) -> Result<()> {
    let engine = Arc::new(load_engine(config, false)?);
    let profiles = artifacts::load_profiles(&config.profiles_path()?)?;
    let ground_truth = artifacts::load_ground_truth(&config.ground_truth_path()?)?;

    let lineup = standard_lineup(engine, seed, config.evaluation.lexical_max_features)?;
    let reports = compare_models(&lineup, &profiles, &ground_truth, k).await?;
    println!("{}", format_comparison_table(&reports));
    Ok(())
}

// ============================================================================
// Config commands
// ============================================================================

pub fn config_path(explicit: Option<&str>) -> Result<()> {
    match JobmatchConfig::resolve_config_path(explicit) {
        Some(path) => {
            let state = if path.exists() { "" } else { " (not found)" };
            println!("{}{state}", path.display());
        }
        None => println!("No config path could be determined"),
    }
    Ok(())
}

pub fn config_show(config: &JobmatchConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    println!("# base_path resolves to {}", config.base_path()?.display());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
