//! Immutable corpus snapshots and atomic replacement.
//!
//! A [`Corpus`] pairs the records of an [`EmbeddingStore`] with the
//! [`SimilarityIndex`] built from its matrix. [`CorpusHandle`] publishes the
//! current snapshot through `arc-swap`: readers grab an `Arc<Corpus>` without
//! locking, and [`CorpusHandle::install`] replaces it in one atomic store.
//! A reader that loaded the previous snapshot keeps using it until it drops
//! its `Arc`.

use arc_swap::ArcSwapOption;
use jobmatch_core::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::index::{INDEX_KIND, SimilarityIndex};
use crate::store::EmbeddingStore;
use crate::types::{CorpusStats, JobRecord, SearchResult};

/// Records plus their similarity index.
#[derive(Debug, Clone)]
pub struct Corpus {
    records: Vec<JobRecord>,
    index: SimilarityIndex,
    shard_counts: BTreeMap<String, usize>,
}

impl Corpus {
    /// Build the index for `store` and freeze both.
    pub fn build(store: EmbeddingStore) -> Self {
        let (records, matrix, shard_counts) = store.into_parts();
        let index = SimilarityIndex::build(matrix);
        Self {
            records,
            index,
            shard_counts,
        }
    }

    /// All records, indexed by `global_index`.
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    /// Record by global index.
    pub fn get(&self, global_index: usize) -> Result<&JobRecord> {
        self.records.get(global_index).ok_or_else(|| {
            Error::not_found(format!(
                "global index {global_index} out of range (corpus has {} records)",
                self.records.len()
            ))
        })
    }

    /// The similarity index.
    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// k-NN over the index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.index.search(query, k)
    }

    /// Corpus statistics.
    pub fn stats(&self) -> CorpusStats {
        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for record in &self.records {
            *categories
                .entry(record.category_or_unknown().to_string())
                .or_insert(0) += 1;
        }
        CorpusStats {
            total_jobs: self.records.len(),
            embedding_dimension: self.dimension(),
            shards: self.shard_counts.clone(),
            categories,
            degenerate_rows: self.index.degenerate_rows(),
            index_kind: INDEX_KIND.to_string(),
        }
    }
}

/// Atomically swappable slot for the current [`Corpus`].
#[derive(Debug, Default)]
pub struct CorpusHandle {
    current: ArcSwapOption<Corpus>,
}

impl CorpusHandle {
    /// A handle with nothing installed; searches fail with
    /// [`Error::IndexNotBuilt`].
    pub fn empty() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// A handle serving `corpus`.
    pub fn new(corpus: Corpus) -> Self {
        Self {
            current: ArcSwapOption::from_pointee(corpus),
        }
    }

    /// Publish `corpus`, returning the snapshot it replaced.
    pub fn install(&self, corpus: Corpus) -> Option<Arc<Corpus>> {
        log::info!(
            "Installing corpus snapshot: {} records, dimension {}",
            corpus.len(),
            corpus.dimension()
        );
        self.current.swap(Some(Arc::new(corpus)))
    }

    /// The current snapshot.
    ///
    /// # Errors
    ///
    /// [`Error::IndexNotBuilt`] if nothing has been installed.
    pub fn current(&self) -> Result<Arc<Corpus>> {
        self.current.load_full().ok_or(Error::IndexNotBuilt)
    }

    /// Whether a snapshot is installed.
    pub fn is_built(&self) -> bool {
        self.current.load().is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================
