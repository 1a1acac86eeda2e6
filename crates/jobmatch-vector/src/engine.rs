//! Recommendation engine: profile text → embedding → k-NN → presentation.
//!
//! Each request takes one snapshot of the installed [`Corpus`] and uses it
//! throughout, so a concurrent [`RecommendationEngine::rebuild`] never mixes
//! records from two snapshots in one result. Provider errors are returned
//! unchanged; the engine does not retry.

use jobmatch_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;

use crate::corpus::{Corpus, CorpusHandle};
use crate::embedding::EmbeddingProvider;
use crate::store::EmbeddingStore;
use crate::types::{CorpusStats, JobRecord, Recommendation, SearchResult};

/// Content-based recommender over an installed corpus.
pub struct RecommendationEngine {
    provider: Arc<dyn EmbeddingProvider>,
    corpus: CorpusHandle,
    verbose: bool,
}

impl RecommendationEngine {
    /// An engine with no corpus installed yet.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            corpus: CorpusHandle::empty(),
            verbose: false,
        }
    }

    /// An engine serving the index built from `store`.
    pub fn from_store(provider: Arc<dyn EmbeddingProvider>, store: EmbeddingStore) -> Self {
        let engine = Self::new(provider);
        engine.rebuild(store);
        engine
    }

    /// Log embedding, search, and total latency for every request.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Rebuild the index from `store` and swap it in.
    pub fn rebuild(&self, store: EmbeddingStore) {
        self.install(Corpus::build(store));
    }

    /// Swap in a prebuilt corpus.
    pub fn install(&self, corpus: Corpus) {
        if corpus.dimension() != self.provider.dimension() && !corpus.is_empty() {
            log::warn!(
                "Corpus dimension {} differs from provider '{}' ({}); queries will fail",
                corpus.dimension(),
                self.provider.name(),
                self.provider.dimension()
            );
        }
        self.corpus.install(corpus);
    }

    /// The current corpus snapshot.
    pub fn corpus(&self) -> Result<Arc<Corpus>> {
        self.corpus.current()
    }

    /// Statistics of the current corpus.
    pub fn stats(&self) -> Result<CorpusStats> {
        Ok(self.corpus()?.stats())
    }

    /// Record by global index in the current corpus.
    pub fn get_job(&self, global_index: usize) -> Result<JobRecord> {
        self.corpus()?.get(global_index).cloned()
    }

    /// Name of the embedding provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Recommend the `k` postings most similar to `profile_text`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidProfile`] for empty or whitespace-only text
    /// - [`Error::IndexNotBuilt`] if no corpus is installed
    /// - [`Error::QueryDimension`] if the provider's vector width differs
    ///   from the index
    /// - any provider error, unchanged
    pub async fn recommend(&self, profile_text: &str, k: usize) -> Result<Vec<Recommendation>> {
        let started = Instant::now();
        validate_profile(profile_text)?;
        let corpus = self.corpus()?;

        let embed_started = Instant::now();
        let query = self.provider.embed(profile_text).await?;
        let embed_elapsed = embed_started.elapsed();

        let search_started = Instant::now();
        let hits = corpus.search(&query, k)?;
        let search_elapsed = search_started.elapsed();

        let recommendations = present(&corpus, &hits)?;
        self.report_timing(
            embed_elapsed.as_secs_f64(),
            search_elapsed.as_secs_f64(),
            started.elapsed().as_secs_f64(),
            recommendations.len(),
        );
        Ok(recommendations)
    }

    /// Recommend for several profiles with a single `embed_batch` call.
    ///
    /// Output `i` equals `recommend(profile_texts[i], k)`.
    pub async fn recommend_batch(
        &self,
        profile_texts: &[&str],
        k: usize,
    ) -> Result<Vec<Vec<Recommendation>>> {
        for text in profile_texts {
            validate_profile(text)?;
        }
        let corpus = self.corpus()?;
        let queries = self.provider.embed_batch(profile_texts).await?;
        if queries.len() != profile_texts.len() {
            return Err(Error::operation(format!(
                "provider '{}' returned {} embeddings for {} texts",
                self.provider.name(),
                queries.len(),
                profile_texts.len()
            )));
        }
        queries
            .iter()
            .map(|query| present(&corpus, &corpus.search(query, k)?))
            .collect()
    }

    /// Recommend for an already-embedded profile.
    pub fn recommend_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<Recommendation>> {
        let corpus = self.corpus()?;
        present(&corpus, &corpus.search(query, k)?)
    }

    fn report_timing(&self, embed_secs: f64, search_secs: f64, total_secs: f64, found: usize) {
        if self.verbose {
            log::info!(
                "Profile embedding: {embed_secs:.3}s, search: {search_secs:.3}s, \
                 total: {total_secs:.3}s ({found} results)"
            );
        } else {
            log::debug!("recommend: {found} results in {total_secs:.3}s");
        }
    }
}

impl std::fmt::Debug for RecommendationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationEngine")
            .field("provider", &self.provider.name())
            .field("built", &self.corpus.is_built())
            .field("verbose", &self.verbose)
            .finish()
    }
}

fn validate_profile(profile_text: &str) -> Result<()> {
    if profile_text.trim().is_empty() {
        return Err(Error::invalid_profile("profile text must not be empty"));
    }
    Ok(())
}

fn present(corpus: &Corpus, hits: &[SearchResult]) -> Result<Vec<Recommendation>> {
    hits.iter()
        .map(|hit| {
            corpus
                .get(hit.global_index)
                .map(|record| Recommendation::from_record(record, hit.score))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
