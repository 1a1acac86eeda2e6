//! Evaluation artifact formats and their JSON persistence.
//!
//! Three files flow through an evaluation run:
//!
//! - **Test profiles** (`test_profiles.json`): ordered list of
//!   `{id, expected_category, text}`.
//! - **Predictions** (`prediction_results.json`): profile id →
//!   `{expected_category, profile_text, recommendations}`.
//! - **Ground truth** (`ground_truth.json`): profile id →
//!   `{relevant_ids, total_evaluated}`.
//!
//! Files written by the earlier Spanish-language tooling
//! (`categoria_esperada`, `texto`, `recomendaciones`, `ofertas_relevantes`,
//! ...) are accepted on read; output always uses the English names.

use jobmatch_core::{Error, Result};
use jobmatch_vector::Recommendation;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A candidate profile used for offline evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestProfile {
    pub id: String,
    #[serde(alias = "categoria_esperada")]
    pub expected_category: String,
    #[serde(alias = "texto")]
    pub text: String,
}

impl TestProfile {
    pub fn new(
        id: impl Into<String>,
        expected_category: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            expected_category: expected_category.into(),
            text: text.into(),
        }
    }
}

/// The engine's recommendations for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEntry {
    #[serde(alias = "categoria_esperada")]
    pub expected_category: String,
    #[serde(alias = "texto_perfil")]
    pub profile_text: String,
    #[serde(alias = "recomendaciones")]
    pub recommendations: Vec<Recommendation>,
}

impl PredictionEntry {
    /// Recommended ids in rank order.
    pub fn ranked_ids(&self) -> Vec<usize> {
        self.recommendations.iter().map(|r| r.id).collect()
    }
}

/// Predictions keyed by profile id.
pub type PredictionSet = BTreeMap<String, PredictionEntry>;

/// Heuristic relevance labels for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthEntry {
    #[serde(alias = "ofertas_relevantes")]
    pub relevant_ids: Vec<usize>,
    #[serde(alias = "total_evaluadas")]
    pub total_evaluated: usize,
}

/// Ground-truth labels keyed by profile id.
pub type GroundTruth = BTreeMap<String, GroundTruthEntry>;

/// Profile id → set of relevant global indices.
pub type RelevanceSet = BTreeMap<String, BTreeSet<usize>>;

/// Collapse ground-truth entries into relevance sets.
pub fn relevance_sets(ground_truth: &GroundTruth) -> RelevanceSet {
    ground_truth
        .iter()
        .map(|(id, entry)| (id.clone(), entry.relevant_ids.iter().copied().collect()))
        .collect()
}

/// Ranked ids per profile, as consumed by the metrics evaluator.
pub fn ranked_ids(predictions: &PredictionSet) -> BTreeMap<String, Vec<usize>> {
    predictions
        .iter()
        .map(|(id, entry)| (id.clone(), entry.ranked_ids()))
        .collect()
}

// ============================================================================
// Persistence
// ============================================================================

/// Deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path).map_err(|e| Error::io_with_path(e, path))?;
    let value = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(value)
}

/// Serialize `value` as pretty JSON, creating parent directories first.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| Error::io_with_path(e, path))
}

pub fn load_profiles(path: &Path) -> Result<Vec<TestProfile>> {
    read_json(path)
}

pub fn load_predictions(path: &Path) -> Result<PredictionSet> {
    read_json(path)
}

pub fn save_predictions(path: &Path, predictions: &PredictionSet) -> Result<()> {
    write_json(path, predictions)
}

pub fn load_ground_truth(path: &Path) -> Result<GroundTruth> {
    read_json(path)
}

pub fn save_ground_truth(path: &Path, ground_truth: &GroundTruth) -> Result<()> {
    write_json(path, ground_truth)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_profiles_accept_spanish_keys() {
        let json = r#"[
            {"id": "p1", "categoria_esperada": "contador", "texto": "NIIF y auditoría"},
            {"id": "p2", "expected_category": "marketing", "text": "SEO"}
        ]"#;
        let profiles: Vec<TestProfile> = serde_json::from_str(json).unwrap();
        assert_eq!(profiles[0], TestProfile::new("p1", "contador", "NIIF y auditoría"));
        assert_eq!(profiles[1].expected_category, "marketing");
    }

    #[test]
    fn test_prediction_entry_tolerates_sparse_recommendations() {
        let json = r#"{
            "categoria_esperada": "desarrollador",
            "texto_perfil": "Rust",
            "recomendaciones": [{"id": 4, "category": "programador"}, {"id": 1}]
        }"#;
        let entry: PredictionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.ranked_ids(), vec![4, 1]);
        assert_eq!(entry.recommendations[0].category, "programador");
        assert_eq!(entry.recommendations[1].category, "");
    }

    #[test]
    fn test_ground_truth_round_trip_uses_english_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ground_truth.json");

        let mut gt = GroundTruth::new();
        gt.insert(
            "p1".to_string(),
            GroundTruthEntry {
                relevant_ids: vec![3, 1],
                total_evaluated: 20,
            },
        );
        save_ground_truth(&path, &gt).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("relevant_ids"));
        assert!(!raw.contains("ofertas_relevantes"));
        assert_eq!(load_ground_truth(&path).unwrap(), gt);
    }

    #[test]
    fn test_ground_truth_accepts_spanish_keys() {
        let json = r#"{"p1": {"ofertas_relevantes": [2, 5], "total_evaluadas": 10}}"#;
        let gt: GroundTruth = serde_json::from_str(json).unwrap();
        let sets = relevance_sets(&gt);
        assert_eq!(sets["p1"], BTreeSet::from([2, 5]));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = load_profiles(&path).unwrap_err();
        assert!(matches!(err, Error::IoWithPath { .. }));
        assert!(err.to_string().contains("absent.json"));
    }
}
