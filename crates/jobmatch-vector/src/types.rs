//! Common types for the embedding store, index, and engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel used for absent `source`, `scraped_at`, and `category` values.
pub const UNKNOWN: &str = "unknown";

/// Maximum number of characters kept in a description preview.
pub const PREVIEW_CHARS: usize = 200;

// ============================================================================
// Records
// ============================================================================

/// An immutable job posting after ingestion.
///
/// `global_index` is dense, zero-based, and contiguous across the merged
/// corpus. It equals the record's position in the store and the row of its
/// vector in the [`EmbeddingMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Corpus-wide identifier assigned at merge time.
    pub global_index: usize,

    /// Posting title.
    pub title: String,

    /// Posting description (non-empty after trimming).
    pub description: String,

    /// Optional category tag carried by the shard entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Where the posting was scraped from.
    pub source: String,

    /// Scrape timestamp as written by the producer.
    pub scraped_at: String,

    /// Identifier of the shard the record came from.
    pub shard_tag: String,

    /// Pre-normalised text, when the producer kept it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned_text: Option<String>,
}

impl JobRecord {
    /// Category, or the [`UNKNOWN`] sentinel.
    pub fn category_or_unknown(&self) -> &str {
        self.category.as_deref().unwrap_or(UNKNOWN)
    }

    /// Text used for lexical matching: `cleaned_text` when present,
    /// otherwise the description.
    pub fn lexical_text(&self) -> &str {
        self.cleaned_text.as_deref().unwrap_or(&self.description)
    }
}

// ============================================================================
// Embedding matrix
// ============================================================================

/// Row-major `f32` matrix; row `i` belongs to record `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingMatrix {
    data: Vec<f32>,
    rows: usize,
    dimension: usize,
}

impl EmbeddingMatrix {
    /// Create an empty matrix with a fixed column count.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            data: Vec::new(),
            rows: 0,
            dimension,
        }
    }

    /// Build a matrix from rows. Returns `None` if rows differ in width.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Option<Self> {
        let dimension = rows.first().map_or(0, Vec::len);
        let mut matrix = Self::with_dimension(dimension);
        for row in rows {
            if row.len() != dimension {
                return None;
            }
            matrix.data.extend_from_slice(&row);
            matrix.rows += 1;
        }
        Some(matrix)
    }

    /// Append a row. The caller guarantees `row.len() == self.dimension()`.
    pub(crate) fn push_row(&mut self, row: &[f32]) {
        debug_assert_eq!(row.len(), self.dimension);
        self.data.extend_from_slice(row);
        self.rows += 1;
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.rows()`.
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Iterate over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0, and a zero-width matrix has no usable rows.
        self.data.chunks_exact(self.dimension.max(1)).take(self.rows)
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let rows = self.rows;
        self.data.chunks_exact_mut(self.dimension.max(1)).take(rows)
    }
}

// ============================================================================
// Search types
// ============================================================================

/// A single k-NN hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Global index of the matched record.
    pub global_index: usize,

    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// A presentation-ready recommendation.
///
/// `category` is always present; absent categories become [`UNKNOWN`].
/// Every field except `id` may be absent when reading prediction files
/// written by other tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Global index of the record.
    pub id: usize,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// First [`PREVIEW_CHARS`] characters, with `...` appended when cut.
    #[serde(default)]
    pub description_preview: String,
    /// Similarity rounded to 4 decimal places.
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub scraped_at: String,
    #[serde(default)]
    pub shard_tag: String,
    #[serde(default)]
    pub category: String,
}

impl Recommendation {
    /// Build a recommendation from a record and its raw similarity.
    pub fn from_record(record: &JobRecord, score: f32) -> Self {
        Self {
            id: record.global_index,
            title: record.title.clone(),
            description: record.description.clone(),
            description_preview: description_preview(&record.description),
            score: round_score(score),
            source: record.source.clone(),
            scraped_at: record.scraped_at.clone(),
            shard_tag: record.shard_tag.clone(),
            category: record.category_or_unknown().to_string(),
        }
    }
}

/// Truncate to [`PREVIEW_CHARS`] characters, appending `...` when cut.
pub fn description_preview(description: &str) -> String {
    match description.char_indices().nth(PREVIEW_CHARS) {
        Some((byte_idx, _)) => format!("{}...", &description[..byte_idx]),
        None => description.to_string(),
    }
}

/// Round a similarity to 4 decimal places.
pub fn round_score(score: f32) -> f64 {
    (f64::from(score) * 10_000.0).round() / 10_000.0
}

// ============================================================================
// Statistics
// ============================================================================

/// Summary of an indexed corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Total records indexed.
    pub total_jobs: usize,

    /// Embedding dimension.
    pub embedding_dimension: usize,

    /// Records per shard tag.
    pub shards: BTreeMap<String, usize>,

    /// Records per category (absent categories under [`UNKNOWN`]).
    pub categories: BTreeMap<String, usize>,

    /// Rows with zero norm; they score 0 against every query.
    pub degenerate_rows: usize,

    /// Index implementation.
    pub index_kind: String,
}

// ============================================================================
// Tests
// ============================================================================
