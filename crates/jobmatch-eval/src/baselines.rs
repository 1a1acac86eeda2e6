//! Baseline rankers used as comparison points for the content-based engine.
//!
//! - [`RandomRecommender`]: `k` distinct records sampled uniformly without
//!   replacement from a seeded generator.
//! - [`RecencyRecommender`]: the most recently scraped records, identical
//!   for every profile.
//! - [`LexicalRecommender`]: TF-IDF cosine similarity between the profile
//!   text and each record's text.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use jobmatch_core::{Error, Result};
use jobmatch_vector::JobRecord;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cmp::Ordering;
use std::sync::Mutex;

use crate::lexical::{SparseVector, TfIdfVectorizer};
use crate::recommender::{Recommender, RecommenderKind, require_profile};

// ============================================================================
// Random
// ============================================================================

/// Seeded uniform sampler.
///
/// Two instances with the same seed and corpus size produce the same
/// sequence of rankings.
#[derive(Debug)]
pub struct RandomRecommender {
    corpus_len: usize,
    rng: Mutex<StdRng>,
}

impl RandomRecommender {
    pub fn new(corpus_len: usize, seed: u64) -> Self {
        Self {
            corpus_len,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Sample `min(k, N)` distinct global indices.
    pub fn sample(&self, k: usize) -> Result<Vec<usize>> {
        let amount = k.min(self.corpus_len);
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| Error::operation("random baseline generator lock poisoned"))?;
        Ok(rand::seq::index::sample(&mut *rng, self.corpus_len, amount).into_vec())
    }
}

#[async_trait]
impl Recommender for RandomRecommender {
    fn kind(&self) -> RecommenderKind {
        RecommenderKind::Random
    }

    async fn rank(&self, _profile: Option<&str>, k: usize) -> Result<Vec<usize>> {
        self.sample(k)
    }
}

// ============================================================================
// Recency
// ============================================================================

/// Parse a scrape timestamp.
///
/// Accepts RFC 3339, `%Y-%m-%dT%H:%M:%S%.f`, `%Y-%m-%d %H:%M:%S`, and
/// `%Y-%m-%d` (midnight), tried in that order. Offsets are converted to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Most-recent-first ranking, computed once.
#[derive(Debug, Clone)]
pub struct RecencyRecommender {
    ranking: Vec<usize>,
}

impl RecencyRecommender {
    /// Order `records` newest first. Unparsable timestamps sort after every
    /// parsable one; ties keep ascending global index.
    pub fn new(records: &[JobRecord]) -> Self {
        let mut keyed: Vec<(Option<NaiveDateTime>, usize)> = records
            .iter()
            .map(|r| (parse_timestamp(&r.scraped_at), r.global_index))
            .collect();
        let unparsable = keyed.iter().filter(|(ts, _)| ts.is_none()).count();
        if unparsable > 0 {
            log::debug!("{unparsable} record(s) with unparsable scraped_at ranked last");
        }
        keyed.sort_by(|(ta, ia), (tb, ib)| recency_order(ta, tb).then_with(|| ia.cmp(ib)));
        Self {
            ranking: keyed.into_iter().map(|(_, idx)| idx).collect(),
        }
    }

    pub fn top(&self, k: usize) -> Vec<usize> {
        self.ranking.iter().take(k).copied().collect()
    }
}

fn recency_order(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl Recommender for RecencyRecommender {
    fn kind(&self) -> RecommenderKind {
        RecommenderKind::Recency
    }

    async fn rank(&self, _profile: Option<&str>, k: usize) -> Result<Vec<usize>> {
        Ok(self.top(k))
    }
}

// ============================================================================
// Lexical
// ============================================================================

/// TF-IDF ranker over record text.
#[derive(Debug, Clone)]
pub struct LexicalRecommender {
    vectorizer: TfIdfVectorizer,
    documents: Vec<SparseVector>,
}

impl LexicalRecommender {
    /// Fit on each record's [`JobRecord::lexical_text`].
    pub fn new(records: &[JobRecord], max_features: usize) -> Self {
        let texts: Vec<&str> = records.iter().map(JobRecord::lexical_text).collect();
        let vectorizer = TfIdfVectorizer::fit(&texts, max_features);
        Self::from_vectorizer(vectorizer, &texts)
    }

    pub fn from_vectorizer<S: AsRef<str>>(vectorizer: TfIdfVectorizer, texts: &[S]) -> Self {
        let documents = texts
            .iter()
            .map(|t| vectorizer.transform(t.as_ref()))
            .collect();
        Self {
            vectorizer,
            documents,
        }
    }

    /// Top `min(k, N)` records by cosine similarity to `profile_text`,
    /// ties broken by ascending global index.
    pub fn scores(&self, profile_text: &str, k: usize) -> Vec<(usize, f64)> {
        let query = self.vectorizer.transform(profile_text);
        let mut scored: Vec<(usize, f64)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(idx, doc)| (idx, query.dot(doc)))
            .collect();
        scored.sort_by(|(ia, sa), (ib, sb)| sb.total_cmp(sa).then_with(|| ia.cmp(ib)));
        scored.truncate(k);
        scored
    }
}

#[async_trait]
impl Recommender for LexicalRecommender {
    fn kind(&self) -> RecommenderKind {
        RecommenderKind::Lexical
    }

    async fn rank(&self, profile: Option<&str>, k: usize) -> Result<Vec<usize>> {
        let text = require_profile(profile)?;
        Ok(self.scores(text, k).into_iter().map(|(idx, _)| idx).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(idx: usize, description: &str, scraped_at: &str) -> JobRecord {
        JobRecord {
            global_index: idx,
            title: format!("job {idx}"),
            description: description.to_string(),
            category: None,
            source: "unknown".into(),
            scraped_at: scraped_at.to_string(),
            shard_tag: "t".into(),
            cleaned_text: None,
        }
    }

    // ------------------------------------------------------------------------
    // Random
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_random_is_seeded_and_distinct() {
        let a = RandomRecommender::new(50, 42);
        let b = RandomRecommender::new(50, 42);
        let ra = a.rank(None, 10).await.unwrap();
        let rb = b.rank(Some("ignored"), 10).await.unwrap();
        assert_eq!(ra, rb);

        let mut sorted = ra.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 10);
        assert!(ra.iter().all(|&i| i < 50));
    }

    #[test]
    fn test_random_clips_k() {
        let r = RandomRecommender::new(3, 7);
        let mut ids = r.sample(10).unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(RandomRecommender::new(0, 7).sample(5).unwrap().is_empty());
    }

    // ------------------------------------------------------------------------
    // Recency
    // ------------------------------------------------------------------------

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-05-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp("2025-05-01T10:00:00.123456").is_some());
        assert!(parse_timestamp("2025-05-01 10:00:00").is_some());
        assert_eq!(
            parse_timestamp("2025-05-01"),
            NaiveDate::from_ymd_opt(2025, 5, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert!(parse_timestamp("unknown").is_none());
    }

    #[tokio::test]
    async fn test_recency_order() {
        let records = vec![
            record(0, "a", "2025-01-01"),
            record(1, "b", "unknown"),
            record(2, "c", "2025-03-01T08:00:00"),
            record(3, "d", "2025-01-01 00:00:00"),
            record(4, "e", "2025-02-15 12:00:00"),
        ];
        let r = RecencyRecommender::new(&records);
        assert_eq!(r.top(10), vec![2, 4, 0, 3, 1]);
        assert_eq!(r.rank(Some("anything"), 2).await.unwrap(), vec![2, 4]);
        assert_eq!(r.rank(None, 2).await.unwrap(), vec![2, 4]);
    }

    // ------------------------------------------------------------------------
    // Lexical
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_lexical_ranks_by_overlap() {
        let mut cleaned = record(2, "ignored description", "unknown");
        cleaned.cleaned_text = Some("python django backend".into());
        let records = vec![
            record(0, "contador publico auditoria niif", "unknown"),
            record(1, "python backend rust backend", "unknown"),
            cleaned,
            record(3, "marketing digital", "unknown"),
        ];
        let lexical = LexicalRecommender::new(&records, 5000);

        let ranked = lexical.rank(Some("backend python"), 3).await.unwrap();
        assert_eq!(ranked.len(), 3);
        assert!(ranked[..2].contains(&1));
        assert!(ranked[..2].contains(&2));
        // Zero-score records fall back to index order.
        assert_eq!(ranked[2], 0);
    }

    #[tokio::test]
    async fn test_lexical_requires_profile() {
        let lexical = LexicalRecommender::new(&[record(0, "rust", "unknown")], 10);
        assert!(matches!(
            lexical.rank(None, 1).await,
            Err(Error::InvalidProfile(_))
        ));
        assert!(matches!(
            lexical.rank(Some("  "), 1).await,
            Err(Error::InvalidProfile(_))
        ));
    }
}
