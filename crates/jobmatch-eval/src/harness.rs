//! End-to-end evaluation runs: predict, label, evaluate, compare.

use jobmatch_core::Result;
use jobmatch_vector::RecommendationEngine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::artifacts::{
    self, GroundTruth, PredictionEntry, PredictionSet, TestProfile, relevance_sets,
};
use crate::baselines::{LexicalRecommender, RandomRecommender, RecencyRecommender};
use crate::ground_truth::{CategoryRules, GroundTruthBuilder};
use crate::metrics::{EvaluationReport, evaluate};
use crate::recommender::{ContentBasedRecommender, Recommender};

// ============================================================================
// Predictions
// ============================================================================

/// A profile the engine could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFailure {
    pub profile_id: String,
    pub error: String,
}

/// Outcome of [`run_predictions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub profiles: usize,
    pub succeeded: usize,
    pub failures: Vec<ProfileFailure>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Recommend `k` postings for every profile.
///
/// A profile that fails is logged and listed in the summary; the rest of the
/// run continues.
pub async fn run_predictions(
    engine: &RecommendationEngine,
    profiles: &[TestProfile],
    k: usize,
) -> (PredictionSet, RunSummary) {
    let mut predictions = PredictionSet::new();
    let mut summary = RunSummary {
        profiles: profiles.len(),
        ..RunSummary::default()
    };

    for profile in profiles {
        log::info!(
            "Processing profile {} ({})",
            profile.id,
            profile.expected_category
        );
        match engine.recommend(&profile.text, k).await {
            Ok(recommendations) => {
                summary.succeeded += 1;
                predictions.insert(
                    profile.id.clone(),
                    PredictionEntry {
                        expected_category: profile.expected_category.clone(),
                        profile_text: profile.text.clone(),
                        recommendations,
                    },
                );
            }
            Err(e) => {
                log::warn!("Profile {} failed: {e}", profile.id);
                summary.failures.push(ProfileFailure {
                    profile_id: profile.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Predictions complete: {}/{} profile(s) succeeded",
        summary.succeeded,
        summary.profiles
    );
    (predictions, summary)
}

/// Read profiles, run predictions, and write the prediction file.
pub async fn predict_to_file(
    engine: &RecommendationEngine,
    profiles_path: &Path,
    output_path: &Path,
    k: usize,
) -> Result<RunSummary> {
    let profiles = artifacts::load_profiles(profiles_path)?;
    let (predictions, summary) = run_predictions(engine, &profiles, k).await;
    artifacts::save_predictions(output_path, &predictions)?;
    log::info!("Predictions written to {}", output_path.display());
    Ok(summary)
}

// ============================================================================
// Labels and metrics
// ============================================================================

/// Derive ground truth from predictions.
pub fn generate_labels(predictions: &PredictionSet, rules: &CategoryRules) -> GroundTruth {
    GroundTruthBuilder::new(rules.clone()).build(predictions)
}

/// Prediction file → ground-truth file.
pub fn label_file(
    predictions_path: &Path,
    output_path: &Path,
    rules: &CategoryRules,
) -> Result<GroundTruth> {
    let predictions = artifacts::load_predictions(predictions_path)?;
    let ground_truth = generate_labels(&predictions, rules);
    artifacts::save_ground_truth(output_path, &ground_truth)?;
    log::info!("Ground truth written to {}", output_path.display());
    Ok(ground_truth)
}

/// Evaluate stored predictions against ground truth.
pub fn calculate_metrics(
    model: &str,
    predictions: &PredictionSet,
    ground_truth: &GroundTruth,
    k: usize,
) -> EvaluationReport {
    evaluate(
        model,
        &artifacts::ranked_ids(predictions),
        &relevance_sets(ground_truth),
        k,
    )
}

/// [`calculate_metrics`] over files.
pub fn evaluate_files(
    model: &str,
    predictions_path: &Path,
    ground_truth_path: &Path,
    k: usize,
) -> Result<EvaluationReport> {
    let predictions = artifacts::load_predictions(predictions_path)?;
    let ground_truth = artifacts::load_ground_truth(ground_truth_path)?;
    Ok(calculate_metrics(model, &predictions, &ground_truth, k))
}

// ============================================================================
// Comparison
// ============================================================================

/// Rankings from `recommender` for every profile.
pub async fn collect_rankings(
    recommender: &dyn Recommender,
    profiles: &[TestProfile],
    k: usize,
) -> Result<BTreeMap<String, Vec<usize>>> {
    let mut rankings = BTreeMap::new();
    for profile in profiles {
        let profile_text = recommender
            .kind()
            .uses_profile()
            .then_some(profile.text.as_str());
        let ranked = recommender.rank(profile_text, k).await?;
        rankings.insert(profile.id.clone(), ranked);
    }
    Ok(rankings)
}

/// Content-based engine plus the three baselines over the engine's corpus.
pub fn standard_lineup(
    engine: Arc<RecommendationEngine>,
    seed: u64,
    lexical_max_features: usize,
) -> Result<Vec<Box<dyn Recommender>>> {
    let corpus = engine.corpus()?;
    let records = corpus.records();
    log::info!("Preparing baselines over {} record(s)", records.len());
    Ok(vec![
        Box::new(ContentBasedRecommender::new(engine)),
        Box::new(LexicalRecommender::new(records, lexical_max_features)),
        Box::new(RecencyRecommender::new(records)),
        Box::new(RandomRecommender::new(records.len(), seed)),
    ])
}

/// Evaluate each recommender over the same profiles and ground truth.
pub async fn compare_models(
    recommenders: &[Box<dyn Recommender>],
    profiles: &[TestProfile],
    ground_truth: &GroundTruth,
    k: usize,
) -> Result<Vec<EvaluationReport>> {
    let relevance = relevance_sets(ground_truth);
    let mut reports = Vec::with_capacity(recommenders.len());
    for recommender in recommenders {
        log::info!("Evaluating {}", recommender.name());
        let rankings = collect_rankings(recommender.as_ref(), profiles, k).await?;
        reports.push(evaluate(recommender.name(), &rankings, &relevance, k));
    }
    Ok(reports)
}

/// Fixed-width comparison table with 4 decimal places.
pub fn format_comparison_table(reports: &[EvaluationReport]) -> String {
    let k = reports.first().map_or(0, |r| r.k);
    let headers = [
        "Model".to_string(),
        format!("Precision@{k}"),
        format!("Recall@{k}"),
        "MRR".to_string(),
        format!("Hit Rate@{k}"),
    ];
    let model_width = reports
        .iter()
        .map(|r| r.model.chars().count())
        .chain(std::iter::once(headers[0].len()))
        .max()
        .unwrap_or(headers[0].len());

    let mut out = format!("{:<model_width$}", headers[0]);
    for header in &headers[1..] {
        out.push_str(&format!("  {header:>12}"));
    }
    out.push('\n');

    for report in reports {
        out.push_str(&format!("{:<model_width$}", report.model));
        let values = report.means.map(|m| [m.precision, m.recall, m.mrr, m.hit_rate]);
        for i in 0..4 {
            match values {
                Some(v) => out.push_str(&format!("  {:>12.4}", v[i])),
                None => out.push_str(&format!("  {:>12}", "-")),
            }
        }
        out.push('\n');
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
