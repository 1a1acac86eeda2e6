//! Heuristic relevance labels derived from the engine's own predictions.
//!
//! A predicted posting is labelled relevant to a profile when the posting's
//! category contains the profile's expected category, or one of the
//! substrings the [`CategoryRules`] table lists as equivalent to it.
//! Comparison is case-insensitive.
//!
//! These labels are a proxy signal produced by the system under evaluation.
//! They are not independent human judgments.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::artifacts::{GroundTruth, GroundTruthEntry, PredictionEntry, PredictionSet};

/// Expected category → additional category substrings accepted as a match.
///
/// The expected category itself always matches; the table only adds
/// equivalences. Entries are directional, so a symmetric pair needs both
/// directions (see [`CategoryRules::with_synonym`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRules {
    equivalents: BTreeMap<String, BTreeSet<String>>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::empty().with_synonym("desarrollador", "programador")
    }
}

impl CategoryRules {
    /// Rules with no equivalences: only the expected category matches.
    pub fn empty() -> Self {
        Self {
            equivalents: BTreeMap::new(),
        }
    }

    /// Build from a configuration table.
    pub fn from_table<I, K, V, S>(table: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Self::empty();
        for (expected, substrings) in table {
            for substring in substrings {
                rules = rules.with_equivalent(expected.as_ref(), substring.as_ref());
            }
        }
        rules
    }

    /// Accept `substring` for profiles expecting `expected`.
    pub fn with_equivalent(mut self, expected: &str, substring: &str) -> Self {
        let substring = normalize(substring);
        if !substring.is_empty() {
            self.equivalents
                .entry(normalize(expected))
                .or_default()
                .insert(substring);
        }
        self
    }

    /// Treat `a` and `b` as interchangeable in both directions.
    pub fn with_synonym(self, a: &str, b: &str) -> Self {
        self.with_equivalent(a, b).with_equivalent(b, a)
    }

    /// The table as plain lists, for configuration output.
    pub fn to_table(&self) -> BTreeMap<String, Vec<String>> {
        self.equivalents
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect()
    }

    /// Whether a posting in `job_category` is relevant to a profile
    /// expecting `expected`.
    ///
    /// A blank expected category matches nothing.
    pub fn matches(&self, expected: &str, job_category: &str) -> bool {
        let expected = normalize(expected);
        if expected.is_empty() {
            return false;
        }
        let category = job_category.to_lowercase();
        if category.contains(&expected) {
            return true;
        }
        self.equivalents
            .get(&expected)
            .is_some_and(|subs| subs.iter().any(|s| category.contains(s.as_str())))
    }
}

fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Labels prediction files with [`CategoryRules`].
#[derive(Debug, Clone, Default)]
pub struct GroundTruthBuilder {
    rules: CategoryRules,
}

impl GroundTruthBuilder {
    pub fn new(rules: CategoryRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    /// Relevant ids among one profile's predictions, in rank order.
    pub fn label(&self, entry: &PredictionEntry) -> GroundTruthEntry {
        let mut seen = BTreeSet::new();
        let relevant_ids = entry
            .recommendations
            .iter()
            .filter(|rec| self.rules.matches(&entry.expected_category, &rec.category))
            .map(|rec| rec.id)
            .filter(|id| seen.insert(*id))
            .collect();
        GroundTruthEntry {
            relevant_ids,
            total_evaluated: entry.recommendations.len(),
        }
    }

    /// Label every profile in `predictions`.
    pub fn build(&self, predictions: &PredictionSet) -> GroundTruth {
        let ground_truth: GroundTruth = predictions
            .iter()
            .map(|(id, entry)| (id.clone(), self.label(entry)))
            .collect();
        let labelled: usize = ground_truth.values().map(|e| e.relevant_ids.len()).sum();
        log::info!(
            "Labelled {} profile(s): {labelled} relevant posting(s)",
            ground_truth.len()
        );
        ground_truth
    }
}

// ============================================================================
// Tests
// ============================================================================
