//! The ranking capability shared by the engine and the baselines.
//!
//! Every strategy answers `rank(profile, k)` with up to `k` global indices
//! in rank order, so the metrics evaluator treats them identically.

use async_trait::async_trait;
use jobmatch_core::{Error, Result};
use jobmatch_vector::RecommendationEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ranking strategies under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommenderKind {
    ContentBased,
    Lexical,
    Recency,
    Random,
}

impl RecommenderKind {
    /// Every strategy, in comparison-table order.
    pub const ALL: [RecommenderKind; 4] = [
        RecommenderKind::ContentBased,
        RecommenderKind::Lexical,
        RecommenderKind::Recency,
        RecommenderKind::Random,
    ];

    /// Label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            RecommenderKind::ContentBased => "Content-based",
            RecommenderKind::Lexical => "TF-IDF",
            RecommenderKind::Recency => "Recency",
            RecommenderKind::Random => "Random",
        }
    }

    /// Whether rankings depend on the profile text.
    pub fn uses_profile(self) -> bool {
        matches!(self, RecommenderKind::ContentBased | RecommenderKind::Lexical)
    }
}

impl std::fmt::Display for RecommenderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A ranking strategy.
#[async_trait]
pub trait Recommender: Send + Sync {
    fn kind(&self) -> RecommenderKind;

    /// Name for reports. Defaults to the kind's label.
    fn name(&self) -> &str {
        self.kind().label()
    }

    /// Up to `k` global indices, best first.
    ///
    /// Strategies that ignore the profile accept `None`; the others return
    /// [`Error::InvalidProfile`] for `None` or blank text.
    async fn rank(&self, profile: Option<&str>, k: usize) -> Result<Vec<usize>>;
}

pub(crate) fn require_profile(profile: Option<&str>) -> Result<&str> {
    match profile {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(Error::invalid_profile("profile text is required")),
    }
}

/// The embedding engine as a [`Recommender`].
#[derive(Debug, Clone)]
pub struct ContentBasedRecommender {
    engine: Arc<RecommendationEngine>,
}

impl ContentBasedRecommender {
    pub fn new(engine: Arc<RecommendationEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }
}

#[async_trait]
impl Recommender for ContentBasedRecommender {
    fn kind(&self) -> RecommenderKind {
        RecommenderKind::ContentBased
    }

    async fn rank(&self, profile: Option<&str>, k: usize) -> Result<Vec<usize>> {
        let text = require_profile(profile)?;
        let recs = self.engine.recommend(text, k).await?;
        Ok(recs.into_iter().map(|r| r.id).collect())
    }
}
