//! Multi-shard embedding store.
//!
//! [`StoreBuilder`] merges shards one at a time into a local accumulator and
//! [`StoreBuilder::finish`] hands back a read-only [`EmbeddingStore`]. Global
//! indices are assigned during that single sequential pass, so a fixed set of
//! shard files always yields the same indices.
//!
//! # Ingestion rules
//!
//! - Records without a usable title or description (missing, non-string, or
//!   blank after trimming) are dropped before indexing.
//! - Exact `(title, description)` duplicates are dropped across the whole
//!   corpus; the first occurrence keeps its position.
//! - Every shard's vector width must equal the first non-empty shard's.

use jobmatch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::shard::{self, FailureMode, RawJobEntry, Shard, ShardConfig, ShardPath, ShardPolicy};
use crate::types::{EmbeddingMatrix, JobRecord, UNKNOWN};

// ============================================================================
// Load report
// ============================================================================

/// A shard left out of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedShard {
    pub shard: String,
    pub reason: String,
}

/// What happened while building a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Tags of shards merged into the corpus, in merge order.
    pub shards_loaded: Vec<String>,

    /// Shards skipped under a `Skip` policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shards_skipped: Vec<SkippedShard>,

    /// Records dropped for a missing or blank title/description.
    pub invalid_dropped: usize,

    /// Records dropped as `(title, description)` duplicates.
    pub duplicates_dropped: usize,
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates shards into a corpus.
#[derive(Debug)]
pub struct StoreBuilder {
    policy: ShardPolicy,
    records: Vec<JobRecord>,
    matrix: Option<EmbeddingMatrix>,
    seen: HashSet<(String, String)>,
    shard_counts: BTreeMap<String, usize>,
    report: LoadReport,
}

impl StoreBuilder {
    /// Create an empty builder.
    pub fn new(policy: ShardPolicy) -> Self {
        Self {
            policy,
            records: Vec::new(),
            matrix: None,
            seen: HashSet::new(),
            shard_counts: BTreeMap::new(),
            report: LoadReport::default(),
        }
    }

    /// Merge the next shard.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] when the shard's width differs from the
    /// corpus and the policy says `Fail`. Under `Skip` the shard is recorded
    /// in the report and `Ok(())` is returned.
    pub fn add_shard(&mut self, shard: Shard) -> Result<()> {
        if let Some(actual) = shard.dimension() {
            match self.matrix.as_ref().map(EmbeddingMatrix::dimension) {
                Some(expected) if expected != actual => {
                    let err = Error::DimensionMismatch {
                        shard: shard.tag().to_string(),
                        expected,
                        actual,
                    };
                    let mode = self.policy.on_dimension_mismatch;
                    return self.reject(shard.tag(), err, mode);
                }
                Some(_) => {}
                None => self.matrix = Some(EmbeddingMatrix::with_dimension(actual)),
            }
        }

        let tag = shard.tag().to_string();
        let mut kept = 0usize;
        for (entry, row) in shard.iter() {
            let Some((title, description)) = usable_text(entry) else {
                self.report.invalid_dropped += 1;
                continue;
            };

            if !self.seen.insert((title.to_string(), description.to_string())) {
                self.report.duplicates_dropped += 1;
                continue;
            }

            let record = JobRecord {
                global_index: self.records.len(),
                title: title.to_string(),
                description: description.to_string(),
                category: entry.category.clone(),
                source: entry.source.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                scraped_at: entry
                    .scraped_at
                    .clone()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                shard_tag: tag.clone(),
                cleaned_text: entry.cleaned_text.clone(),
            };
            self.records.push(record);
            if let Some(matrix) = self.matrix.as_mut() {
                matrix.push_row(row);
            }
            kept += 1;
        }

        log::debug!(
            "Merged shard '{tag}': {kept} of {} records kept",
            shard.len()
        );
        self.shard_counts.insert(tag.clone(), kept);
        self.report.shards_loaded.push(tag);
        Ok(())
    }

    /// Account for a shard that could not be read.
    ///
    /// # Errors
    ///
    /// Returns `err` unchanged when the malformed policy says `Fail`.
    pub fn add_failure(&mut self, tag: &str, err: Error) -> Result<()> {
        let mode = self.policy.on_malformed;
        self.reject(tag, err, mode)
    }

    fn reject(&mut self, tag: &str, err: Error, mode: FailureMode) -> Result<()> {
        match mode {
            FailureMode::Fail => Err(err),
            FailureMode::Skip => {
                log::warn!("Skipping shard '{tag}': {err}");
                self.report.shards_skipped.push(SkippedShard {
                    shard: tag.to_string(),
                    reason: err.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Freeze the accumulated corpus.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if no shard was merged.
    pub fn finish(self) -> Result<EmbeddingStore> {
        if self.report.shards_loaded.is_empty() {
            return Err(Error::invalid_data(format!(
                "no shard could be loaded ({} skipped)",
                self.report.shards_skipped.len()
            )));
        }

        let matrix = self.matrix.unwrap_or_default();
        log::info!(
            "Loaded {} records from {} shard(s), dimension {} ({} invalid, {} duplicates dropped)",
            self.records.len(),
            self.report.shards_loaded.len(),
            matrix.dimension(),
            self.report.invalid_dropped,
            self.report.duplicates_dropped
        );

        Ok(EmbeddingStore {
            records: self.records,
            matrix,
            shard_counts: self.shard_counts,
            report: self.report,
        })
    }
}

fn usable_text(entry: &RawJobEntry) -> Option<(&str, &str)> {
    let title = entry.title.as_deref()?;
    let description = entry.description.as_deref()?;
    if title.trim().is_empty() || description.trim().is_empty() {
        return None;
    }
    Some((title, description))
}

// ============================================================================
// Store
// ============================================================================

/// Read-only merged corpus: records and their vectors, row-aligned.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    records: Vec<JobRecord>,
    matrix: EmbeddingMatrix,
    shard_counts: BTreeMap<String, usize>,
    report: LoadReport,
}

impl EmbeddingStore {
    /// Discover and load every shard under `config`.
    pub fn open(config: &ShardConfig) -> Result<Self> {
        let shards = shard::discover_shards(config)?;
        Self::load(shards, config.policy)
    }

    /// Load the given shard files, merged in lexicographic tag order.
    pub fn load(mut shards: Vec<ShardPath>, policy: ShardPolicy) -> Result<Self> {
        shards.sort();
        let mut builder = StoreBuilder::new(policy);
        for shard_path in &shards {
            match Shard::read(shard_path) {
                Ok(shard) => builder.add_shard(shard)?,
                Err(err) => builder.add_failure(&shard_path.tag, err)?,
            }
        }
        builder.finish()
    }

    /// All records, indexed by `global_index`.
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    /// The embedding matrix, row `i` for record `i`.
    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension (0 when no shard had vectors).
    pub fn dimension(&self) -> usize {
        self.matrix.dimension()
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

    /// Kept records per shard tag.
    pub fn shard_counts(&self) -> &BTreeMap<String, usize> {
        &self.shard_counts
    }

    /// Report from the load that built this store.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Whether indices are exactly `0..N` in order and rows match records.
    pub fn is_contiguous(&self) -> bool {
        self.matrix.rows() == self.records.len()
            && self
                .records
                .iter()
                .enumerate()
                .all(|(i, r)| r.global_index == i)
    }

    /// Split into records, matrix, and per-shard counts.
    pub fn into_parts(self) -> (Vec<JobRecord>, EmbeddingMatrix, BTreeMap<String, usize>) {
        (self.records, self.matrix, self.shard_counts)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::{ShardFile, write_shard};
    use tempfile::tempdir;

    fn entries(prefix: &str, n: usize) -> Vec<RawJobEntry> {
        (0..n)
            .map(|i| RawJobEntry::new(format!("{prefix} {i}"), format!("desc {prefix} {i}")))
            .collect()
    }

    fn rows(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let mut v = vec![0.0; dim];
                v[i % dim] = 1.0;
                v
            })
            .collect()
    }

    fn shard(tag: &str, n: usize, dim: usize) -> Shard {
        Shard::from_parts(tag, entries(tag, n), rows(n, dim)).unwrap()
    }

    // ------------------------------------------------------------------------
    // Index assignment
    // ------------------------------------------------------------------------

    #[test]
    fn test_global_indices_contiguous() {
        let mut builder = StoreBuilder::new(ShardPolicy::default());
        builder.add_shard(shard("a", 2, 3)).unwrap();
        builder.add_shard(shard("b", 3, 3)).unwrap();
        builder.add_shard(shard("c", 1, 3)).unwrap();
        let store = builder.finish().unwrap();

        assert_eq!(store.len(), 6);
        assert!(store.is_contiguous());
        let indices: Vec<usize> = store.records().iter().map(|r| r.global_index).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());

        let tags: Vec<&str> = store.records().iter().map(|r| r.shard_tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "a", "b", "b", "b", "c"]);
        assert_eq!(store.records()[2].title, "b 0");
        assert_eq!(store.matrix().rows(), 6);
    }

    #[test]
    fn test_defaults_for_missing_metadata() {
        let mut builder = StoreBuilder::new(ShardPolicy::default());
        builder.add_shard(shard("a", 1, 2)).unwrap();
        let store = builder.finish().unwrap();
        let record = store.get(0).unwrap();
        assert_eq!(record.source, UNKNOWN);
        assert_eq!(record.scraped_at, UNKNOWN);
        assert!(record.category.is_none());
    }

    #[test]
    fn test_get_out_of_range() {
        let mut builder = StoreBuilder::new(ShardPolicy::default());
        builder.add_shard(shard("a", 1, 2)).unwrap();
        let store = builder.finish().unwrap();
        assert!(matches!(store.get(1), Err(Error::NotFound(_))));
    }

    // ------------------------------------------------------------------------
    // Ingestion filter
    // ------------------------------------------------------------------------

    #[test]
    fn test_duplicates_dropped_across_shards() {
        let a = Shard::from_parts(
            "a",
            vec![
                RawJobEntry::new("Dev", "Rust backend"),
                RawJobEntry::new("QA", "Testing"),
            ],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        let b = Shard::from_parts(
            "b",
            vec![
                RawJobEntry::new("Ops", "Kubernetes"),
                RawJobEntry::new("Dev", "Rust backend"),
            ],
            vec![vec![0.5, 0.5], vec![0.9, 0.1]],
        )
        .unwrap();

        let mut builder = StoreBuilder::new(ShardPolicy::default());
        builder.add_shard(a).unwrap();
        builder.add_shard(b).unwrap();
        let store = builder.finish().unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.report().duplicates_dropped, 1);
        let dev: Vec<&JobRecord> = store.records().iter().filter(|r| r.title == "Dev").collect();
        assert_eq!(dev.len(), 1);
        assert_eq!(dev[0].global_index, 0);
        assert_eq!(dev[0].shard_tag, "a");
        // The kept row is the first occurrence's vector.
        assert_eq!(store.matrix().row(0), &[1.0, 0.0]);
        assert_eq!(store.records()[2].title, "Ops");
        assert_eq!(store.matrix().row(2), &[0.5, 0.5]);
        assert_eq!(store.shard_counts().get("b"), Some(&1));
    }

    #[test]
    fn test_invalid_records_dropped_before_indexing() {
        let mut missing_title = RawJobEntry::new("", "x");
        missing_title.title = None;
        let parts = vec![
            RawJobEntry::new("Contador", "Balances"),
            RawJobEntry::new("Blank", "   \n\t"),
            missing_title,
            RawJobEntry::new("   ", "Has description"),
            RawJobEntry::new("Asistente", "Agenda"),
        ];
        let shard = Shard::from_parts("a", parts, rows(5, 5)).unwrap();

        let mut builder = StoreBuilder::new(ShardPolicy::default());
        builder.add_shard(shard).unwrap();
        let store = builder.finish().unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.report().invalid_dropped, 3);
        assert_eq!(store.records()[1].title, "Asistente");
        assert_eq!(store.records()[1].global_index, 1);
        assert_eq!(store.matrix().row(1), rows(5, 5)[4].as_slice());
    }

    // ------------------------------------------------------------------------
    // Dimension validation
    // ------------------------------------------------------------------------

    #[test]
    fn test_dimension_mismatch_fails_by_default() {
        let mut builder = StoreBuilder::new(ShardPolicy::default());
        builder.add_shard(shard("a", 2, 3)).unwrap();
        let err = builder.add_shard(shard("b", 2, 4)).unwrap_err();
        match err {
            Error::DimensionMismatch {
                shard,
                expected,
                actual,
            } => {
                assert_eq!(shard, "b");
                assert_eq!(expected, 3);
                assert_eq!(actual, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dimension_mismatch_skip_policy() {
        let mut builder = StoreBuilder::new(ShardPolicy::lenient());
        builder.add_shard(shard("a", 2, 3)).unwrap();
        builder.add_shard(shard("b", 2, 4)).unwrap();
        builder.add_shard(shard("c", 1, 3)).unwrap();
        let store = builder.finish().unwrap();

        assert_eq!(store.len(), 3);
        assert!(store.is_contiguous());
        assert_eq!(store.report().shards_loaded, vec!["a", "c"]);
        assert_eq!(store.report().shards_skipped[0].shard, "b");
    }

    #[test]
    fn test_empty_shard_does_not_fix_dimension() {
        let mut builder = StoreBuilder::new(ShardPolicy::default());
        builder.add_shard(shard("a", 0, 3)).unwrap();
        builder.add_shard(shard("b", 2, 5)).unwrap();
        let store = builder.finish().unwrap();
        assert_eq!(store.dimension(), 5);
        assert_eq!(store.shard_counts().get("a"), Some(&0));
    }

    // ------------------------------------------------------------------------
    // Loading from disk
    // ------------------------------------------------------------------------

    fn write(dir: &std::path::Path, tag: &str, n: usize, dim: usize) {
        write_shard(
            &dir.join(format!("vectors_{tag}.json")),
            &ShardFile {
                metadata: entries(tag, n),
                embeddings: rows(n, dim),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_open_merges_in_tag_order() {
        let dir = tempdir().unwrap();
        write(dir.path(), "vendedor", 1, 4);
        write(dir.path(), "asistente", 2, 4);
        write(dir.path(), "marketing", 3, 4);

        let store = EmbeddingStore::open(&ShardConfig::new(dir.path())).unwrap();
        assert_eq!(store.len(), 6);
        assert!(store.is_contiguous());
        assert_eq!(store.records()[0].shard_tag, "asistente");
        assert_eq!(store.records()[2].shard_tag, "marketing");
        assert_eq!(store.records()[5].shard_tag, "vendedor");
    }

    #[test]
    fn test_open_skips_malformed_shard() {
        let dir = tempdir().unwrap();
        write(dir.path(), "asistente", 2, 4);
        std::fs::write(dir.path().join("vectors_broken.json"), "[1, 2").unwrap();
        write(dir.path(), "contador", 1, 4);

        let store = EmbeddingStore::open(&ShardConfig::new(dir.path())).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.report().shards_skipped.len(), 1);
        assert_eq!(store.report().shards_skipped[0].shard, "broken");
    }

    #[test]
    fn test_open_strict_policy_fails_on_malformed() {
        let dir = tempdir().unwrap();
        write(dir.path(), "asistente", 2, 4);
        std::fs::write(dir.path().join("vectors_broken.json"), "[1, 2").unwrap();

        let config = ShardConfig::new(dir.path()).with_policy(ShardPolicy::strict());
        let err = EmbeddingStore::open(&config).unwrap_err();
        assert!(matches!(err, Error::MalformedShard { .. }));
    }

    #[test]
    fn test_open_dimension_mismatch_leaves_store_unbuilt() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a", 2, 4);
        write(dir.path(), "b", 2, 8);

        let err = EmbeddingStore::open(&ShardConfig::new(dir.path())).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { ref shard, .. } if shard == "b"));
    }

    #[test]
    fn test_all_shards_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("vectors_x.json"), "nope").unwrap();
        let err = EmbeddingStore::open(&ShardConfig::new(dir.path())).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_load_order_independent_of_input_order() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b", 1, 2);
        write(dir.path(), "a", 1, 2);
        let paths = vec![
            ShardPath {
                tag: "b".into(),
                path: dir.path().join("vectors_b.json"),
            },
            ShardPath {
                tag: "a".into(),
                path: dir.path().join("vectors_a.json"),
            },
        ];
        let store = EmbeddingStore::load(paths, ShardPolicy::default()).unwrap();
        assert_eq!(store.records()[0].shard_tag, "a");
    }
}
