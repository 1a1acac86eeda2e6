//! Ranking-quality metrics.
//!
//! For a ranking `r` (ordered ids), a relevance set `R`, and a cutoff `k`:
//!
//! | metric | value |
//! |---|---|
//! | precision@k | `|r[..k] ∩ R| / k` (0 when `k == 0`) |
//! | recall@k | `|r[..k] ∩ R| / |R|` (0 when `R` is empty) |
//! | reciprocal rank | `1 / rank` of the first relevant id in the *full* ranking, else 0 |
//! | hit-rate@k | 1 if `r[..k]` holds any relevant id, else 0 |
//!
//! Per-profile samples are reduced into a [`MetricSummary`] of sums and a
//! count; summaries from independent workers merge in any order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::artifacts::RelevanceSet;

fn relevant_in_top_k(ranked: &[usize], relevant: &BTreeSet<usize>, k: usize) -> usize {
    ranked
        .iter()
        .take(k)
        .filter(|id| relevant.contains(id))
        .count()
}

pub fn precision_at_k(ranked: &[usize], relevant: &BTreeSet<usize>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    relevant_in_top_k(ranked, relevant, k) as f64 / k as f64
}

pub fn recall_at_k(ranked: &[usize], relevant: &BTreeSet<usize>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    relevant_in_top_k(ranked, relevant, k) as f64 / relevant.len() as f64
}

/// Reciprocal of the 1-based rank of the first relevant id anywhere in
/// `ranked`.
pub fn reciprocal_rank(ranked: &[usize], relevant: &BTreeSet<usize>) -> f64 {
    ranked
        .iter()
        .position(|id| relevant.contains(id))
        .map_or(0.0, |pos| 1.0 / (pos + 1) as f64)
}

pub fn hit_rate_at_k(ranked: &[usize], relevant: &BTreeSet<usize>, k: usize) -> f64 {
    if relevant_in_top_k(ranked, relevant, k) > 0 {
        1.0
    } else {
        0.0
    }
}

/// Metrics for one profile at a fixed cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub precision: f64,
    pub recall: f64,
    pub reciprocal_rank: f64,
    pub hit: f64,
}

impl MetricSample {
    pub fn compute(ranked: &[usize], relevant: &BTreeSet<usize>, k: usize) -> Self {
        Self {
            precision: precision_at_k(ranked, relevant, k),
            recall: recall_at_k(ranked, relevant, k),
            reciprocal_rank: reciprocal_rank(ranked, relevant),
            hit: hit_rate_at_k(ranked, relevant, k),
        }
    }
}

/// Arithmetic means over evaluated profiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricMeans {
    pub precision: f64,
    pub recall: f64,
    pub mrr: f64,
    pub hit_rate: f64,
}

/// Running sums of [`MetricSample`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSummary {
    count: usize,
    precision: f64,
    recall: f64,
    reciprocal_rank: f64,
    hit: f64,
}

impl MetricSummary {
    pub fn add(&mut self, sample: &MetricSample) {
        self.count += 1;
        self.precision += sample.precision;
        self.recall += sample.recall;
        self.reciprocal_rank += sample.reciprocal_rank;
        self.hit += sample.hit;
    }

    /// Combine with a summary computed elsewhere.
    pub fn merge(&mut self, other: &MetricSummary) {
        self.count += other.count;
        self.precision += other.precision;
        self.recall += other.recall;
        self.reciprocal_rank += other.reciprocal_rank;
        self.hit += other.hit;
    }

    /// Number of samples added.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Means, or `None` when nothing was evaluated.
    pub fn means(&self) -> Option<MetricMeans> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(MetricMeans {
            precision: self.precision / n,
            recall: self.recall / n,
            mrr: self.reciprocal_rank / n,
            hit_rate: self.hit / n,
        })
    }
}

impl<'a> Extend<&'a MetricSample> for MetricSummary {
    fn extend<I: IntoIterator<Item = &'a MetricSample>>(&mut self, iter: I) {
        for sample in iter {
            self.add(sample);
        }
    }
}

/// Aggregated evaluation of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model: String,
    pub k: usize,
    /// Profiles that contributed to the means.
    pub evaluated: usize,
    /// Profiles with predictions but no relevance labels, excluded from the
    /// means.
    pub missing: Vec<String>,
    pub means: Option<MetricMeans>,
}

/// Evaluate `rankings` against `relevance` at cutoff `k`.
///
/// Profiles absent from `relevance` are logged, listed in
/// [`EvaluationReport::missing`], and excluded from the means.
pub fn evaluate(
    model: &str,
    rankings: &BTreeMap<String, Vec<usize>>,
    relevance: &RelevanceSet,
    k: usize,
) -> EvaluationReport {
    let mut summary = MetricSummary::default();
    let mut missing = Vec::new();

    for (profile_id, ranked) in rankings {
        let Some(relevant) = relevance.get(profile_id) else {
            log::warn!("No ground truth for profile '{profile_id}'; excluded from {model} metrics");
            missing.push(profile_id.clone());
            continue;
        };
        summary.add(&MetricSample::compute(ranked, relevant, k));
    }

    if !missing.is_empty() {
        log::warn!(
            "{model}: {} of {} profile(s) had no ground truth",
            missing.len(),
            rankings.len()
        );
    }

    EvaluationReport {
        model: model.to_string(),
        k,
        evaluated: summary.count(),
        missing,
        means: summary.means(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(ids: &[usize]) -> BTreeSet<usize> {
        ids.iter().copied().collect()
    }

    // ------------------------------------------------------------------------
    // Single-profile metrics
    // ------------------------------------------------------------------------

    #[test]
    fn test_reference_example() {
        let ranked = [1, 2, 3, 4, 5];
        let relevant = set(&[2, 5]);
        assert!((precision_at_k(&ranked, &relevant, 5) - 0.4).abs() < 1e-12);
        assert_eq!(recall_at_k(&ranked, &relevant, 5), 1.0);
        assert_eq!(reciprocal_rank(&ranked, &relevant), 0.5);
        assert_eq!(hit_rate_at_k(&ranked, &relevant, 5), 1.0);
    }

    #[test]
    fn test_empty_relevance_is_zero_not_nan() {
        let ranked = [1, 2, 3];
        let relevant = BTreeSet::new();
        assert_eq!(recall_at_k(&ranked, &relevant, 3), 0.0);
        assert_eq!(precision_at_k(&ranked, &relevant, 3), 0.0);
        assert_eq!(reciprocal_rank(&ranked, &relevant), 0.0);
        assert_eq!(hit_rate_at_k(&ranked, &relevant, 3), 0.0);
    }

    #[test]
    fn test_reciprocal_rank_looks_past_cutoff() {
        let ranked = [9, 8, 7, 6, 5, 4];
        let relevant = set(&[4]);
        assert_eq!(hit_rate_at_k(&ranked, &relevant, 3), 0.0);
        assert!((reciprocal_rank(&ranked, &relevant) - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_precision_divides_by_k_for_short_rankings() {
        let ranked = [1];
        let relevant = set(&[1]);
        assert_eq!(precision_at_k(&ranked, &relevant, 10), 0.1);
        assert_eq!(precision_at_k(&ranked, &relevant, 0), 0.0);
    }

    // ------------------------------------------------------------------------
    // Aggregation
    // ------------------------------------------------------------------------

    #[test]
    fn test_evaluate_reports_missing_profiles() {
        let mut rankings = BTreeMap::new();
        rankings.insert("a".to_string(), vec![1, 2, 3, 4, 5]);
        rankings.insert("b".to_string(), vec![7, 8]);
        rankings.insert("c".to_string(), vec![1]);
        let mut relevance = RelevanceSet::new();
        relevance.insert("a".to_string(), set(&[2, 5]));
        relevance.insert("b".to_string(), set(&[7]));

        let report = evaluate("cbf", &rankings, &relevance, 5);
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.missing, vec!["c".to_string()]);
        let means = report.means.unwrap();
        assert!((means.precision - (0.4 + 0.2) / 2.0).abs() < 1e-12);
        assert_eq!(means.recall, 1.0);
        assert_eq!(means.mrr, 0.75);
        assert_eq!(means.hit_rate, 1.0);
    }

    #[test]
    fn test_evaluate_nothing_labelled() {
        let mut rankings = BTreeMap::new();
        rankings.insert("a".to_string(), vec![1]);
        let report = evaluate("random", &rankings, &RelevanceSet::new(), 10);
        assert_eq!(report.evaluated, 0);
        assert!(report.means.is_none());
    }

    #[test]
    fn test_merge_equals_sequential() {
        let samples = [
            MetricSample::compute(&[1, 2, 3], &set(&[2]), 3),
            MetricSample::compute(&[4, 5, 6], &set(&[9]), 3),
            MetricSample::compute(&[7, 8, 9], &set(&[7, 9]), 3),
        ];
        let mut all = MetricSummary::default();
        all.extend(&samples);

        let mut left = MetricSummary::default();
        left.extend(&samples[..1]);
        let mut right = MetricSummary::default();
        right.extend(&samples[1..]);
        right.merge(&left);

        assert_eq!(all.count(), right.count());
        let (a, b) = (all.means().unwrap(), right.means().unwrap());
        assert!((a.precision - b.precision).abs() < 1e-12);
        assert!((a.mrr - b.mrr).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_metrics_bounded(
            ranked in prop::collection::hash_set(0usize..60, 0..30),
            relevant in prop::collection::btree_set(0usize..60, 0..15),
            k in 0usize..40,
        ) {
            let ranked: Vec<usize> = ranked.into_iter().collect();
            let sample = MetricSample::compute(&ranked, &relevant, k);
            for value in [sample.precision, sample.recall, sample.reciprocal_rank, sample.hit] {
                prop_assert!(value.is_finite());
                prop_assert!((0.0..=1.0).contains(&value));
            }
            prop_assert!(sample.hit == 0.0 || sample.reciprocal_rank > 0.0);
        }
    }
}
