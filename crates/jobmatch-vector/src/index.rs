//! Exact cosine-similarity index.
//!
//! Rows are L2-normalised once at build time; a query is normalised and
//! scored against every row by inner product, O(N·D) per query. Results are
//! ordered by descending score, with equal scores broken by ascending global
//! index so rankings are reproducible.
//!
//! Zero-norm rows are kept as all-zero vectors and therefore score exactly 0
//! against every query.

use jobmatch_core::{Error, Result};
use std::cmp::Ordering;

use crate::types::{EmbeddingMatrix, SearchResult};

/// Identifier reported in corpus statistics.
pub const INDEX_KIND: &str = "exact-inner-product";

/// Scale `v` to unit length in place.
///
/// Returns `false`, leaving `v` untouched, when its norm is zero.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm = v
        .iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt();
    if norm == 0.0 {
        return false;
    }
    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    true
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    // `+ 0.0` folds a -0.0 result into 0.0 so it ties with degenerate rows.
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>() + 0.0
}

/// Ranking order: higher score first, then lower global index.
fn rank_order(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.global_index.cmp(&b.global_index))
}

/// Immutable brute-force similarity index.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    vectors: EmbeddingMatrix,
    degenerate_rows: usize,
}

impl SimilarityIndex {
    /// Normalise every row of `matrix` and take ownership of it.
    pub fn build(mut matrix: EmbeddingMatrix) -> Self {
        let mut degenerate_rows = 0;
        for row in matrix.rows_mut() {
            if !l2_normalize(row) {
                degenerate_rows += 1;
            }
        }
        if degenerate_rows > 0 {
            log::warn!("{degenerate_rows} zero-norm embedding row(s) will score 0 for every query");
        }
        Self {
            vectors: matrix,
            degenerate_rows,
        }
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.vectors.rows()
    }

    /// Whether the index has no rows.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    /// Rows that could not be normalised.
    pub fn degenerate_rows(&self) -> usize {
        self.degenerate_rows
    }

    /// Normalised row `i`.
    pub fn vector(&self, i: usize) -> Option<&[f32]> {
        (i < self.len()).then(|| self.vectors.row(i))
    }

    /// The `min(k, N)` rows most similar to `query`.
    ///
    /// # Errors
    ///
    /// - [`Error::QueryDimension`] if `query.len()` differs from the index
    /// - [`Error::InvalidData`] if the query is non-finite or has zero norm
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let query = self.prepare_query(query)?;
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<SearchResult> = self
            .vectors
            .iter_rows()
            .enumerate()
            .map(|(global_index, row)| SearchResult {
                global_index,
                score: dot(&query, row),
            })
            .collect();

        let k = k.min(scored.len());
        if k == 0 {
            return Ok(Vec::new());
        }
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank_order);
            scored.truncate(k);
        }
        scored.sort_by(rank_order);
        Ok(scored)
    }

    fn prepare_query(&self, query: &[f32]) -> Result<Vec<f32>> {
        if query.len() != self.dimension() {
            return Err(Error::QueryDimension {
                expected: self.dimension(),
                actual: query.len(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid_data("query vector contains non-finite values"));
        }
        let mut query = query.to_vec();
        if !l2_normalize(&mut query) {
            return Err(Error::invalid_data("query vector has zero norm"));
        }
        Ok(query)
    }
}

// ============================================================================
// Tests
// ============================================================================
