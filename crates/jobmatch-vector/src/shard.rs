//! Shard container format and discovery.
//!
//! A shard is one JSON file named `<prefix><tag>.<extension>` (by default
//! `vectors_<tag>.json`) holding a record array and a row-aligned embedding
//! matrix:
//!
//! ```json
//! {
//!   "metadata": [{"title": "...", "description": "...", "source": "...",
//!                 "scraped_at": "...", "category": "..."}],
//!   "embeddings": [[0.12, -0.03, ...]]
//! }
//! ```
//!
//! Parsing a shard is independent of every other shard; only the merge in
//! [`StoreBuilder`](crate::store::StoreBuilder) has to run sequentially.

use jobmatch_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::types::EmbeddingMatrix;

// ============================================================================
// Configuration
// ============================================================================

/// What to do when a shard cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Log, record in the load report, and continue with the other shards.
    Skip,
    /// Abort the whole load with the shard's error.
    Fail,
}

/// Per-defect handling for shard ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardPolicy {
    /// Unreadable or unparsable containers. Default: skip.
    pub on_malformed: FailureMode,

    /// Vector width differs from the first shard. Default: fail.
    pub on_dimension_mismatch: FailureMode,
}

impl Default for ShardPolicy {
    fn default() -> Self {
        Self {
            on_malformed: FailureMode::Skip,
            on_dimension_mismatch: FailureMode::Fail,
        }
    }
}

impl ShardPolicy {
    /// Every defect aborts the load.
    pub fn strict() -> Self {
        Self {
            on_malformed: FailureMode::Fail,
            on_dimension_mismatch: FailureMode::Fail,
        }
    }

    /// Every defect skips the offending shard.
    pub fn lenient() -> Self {
        Self {
            on_malformed: FailureMode::Skip,
            on_dimension_mismatch: FailureMode::Skip,
        }
    }
}

/// Where shards live and how they are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardConfig {
    /// Directory scanned for shard files.
    pub dir: PathBuf,

    /// File name prefix preceding the shard tag.
    pub prefix: String,

    /// File extension, without the dot.
    pub extension: String,

    /// Defect handling.
    pub policy: ShardPolicy,
}

impl ShardConfig {
    /// Default naming (`vectors_<tag>.json`) under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "vectors_".to_string(),
            extension: "json".to_string(),
            policy: ShardPolicy::default(),
        }
    }

    /// Override the defect policy.
    pub fn with_policy(mut self, policy: ShardPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Glob pattern matched inside [`dir`](Self::dir).
    pub fn pattern(&self) -> String {
        format!("{}*.{}", self.prefix, self.extension)
    }

    /// Where the shard tagged `tag` is written.
    pub fn path_for(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{}{tag}.{}", self.prefix, self.extension))
    }

    /// Shard tag for `path`, or `None` if it does not follow the convention.
    pub fn tag_for(&self, path: &Path) -> Option<String> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        if ext != self.extension {
            return None;
        }
        let stem = path.file_stem().and_then(|s| s.to_str())?;
        let tag = stem.strip_prefix(&self.prefix)?;
        (!tag.is_empty()).then(|| tag.to_string())
    }
}

/// A discovered shard file and its identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShardPath {
    pub tag: String,
    pub path: PathBuf,
}

/// Find every shard in `config.dir`, sorted lexicographically by tag.
///
/// # Errors
///
/// [`Error::NoShardsFound`] when nothing matches.
pub fn discover_shards(config: &ShardConfig) -> Result<Vec<ShardPath>> {
    // Only the file name part may contain wildcards.
    let dir = glob::Pattern::escape(&config.dir.to_string_lossy());
    let pattern = Path::new(&dir).join(config.pattern());
    let pattern_str = pattern.to_string_lossy();
    let entries = glob::glob(&pattern_str)
        .map_err(|e| Error::config(format!("invalid shard pattern '{pattern_str}': {e}")))?;

    let mut shards = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => match config.tag_for(&path) {
                Some(tag) => shards.push(ShardPath { tag, path }),
                None => log::debug!("Ignoring {} (no shard tag)", path.display()),
            },
            Err(e) => log::warn!("Unreadable entry while scanning for shards: {e}"),
        }
    }

    if shards.is_empty() {
        return Err(Error::NoShardsFound {
            dir: config.dir.clone(),
            pattern: config.pattern(),
        });
    }

    shards.sort();
    log::info!(
        "Found {} shard file(s) in {}",
        shards.len(),
        config.dir.display()
    );
    Ok(shards)
}

// ============================================================================
// Container contents
// ============================================================================

/// One entry of a shard's record array, before validation.
///
/// String fields holding anything other than a JSON string read as `None`.
/// Keys other than the known ones are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawJobEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub scraped_at: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub cleaned_text: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawJobEntry {
    /// Entry with the two required text fields set.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_scraped_at(mut self, scraped_at: impl Into<String>) -> Self {
        self.scraped_at = Some(scraped_at.into());
        self
    }

    pub fn with_cleaned_text(mut self, cleaned_text: impl Into<String>) -> Self {
        self.cleaned_text = Some(cleaned_text.into());
        self
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

/// On-disk layout of a shard container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardFile {
    pub metadata: Vec<RawJobEntry>,
    pub embeddings: Vec<Vec<f32>>,
}

/// A parsed, structurally valid shard.
#[derive(Debug, Clone)]
pub struct Shard {
    tag: String,
    entries: Vec<RawJobEntry>,
    vectors: EmbeddingMatrix,
}

impl Shard {
    /// Assemble a shard from in-memory parts.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedShard`] if the record and vector counts differ,
    /// rows are ragged, rows have zero width, or values are not finite.
    pub fn from_parts(
        tag: impl Into<String>,
        entries: Vec<RawJobEntry>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let tag = tag.into();
        if entries.len() != embeddings.len() {
            return Err(Error::malformed_shard(
                &tag,
                format!(
                    "{} records but {} embedding rows",
                    entries.len(),
                    embeddings.len()
                ),
            ));
        }
        if embeddings.first().is_some_and(Vec::is_empty) {
            return Err(Error::malformed_shard(&tag, "zero-width embedding rows"));
        }
        if embeddings.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::malformed_shard(&tag, "non-finite embedding value"));
        }
        let vectors = EmbeddingMatrix::from_rows(embeddings)
            .ok_or_else(|| Error::malformed_shard(&tag, "embedding rows differ in width"))?;

        Ok(Self {
            tag,
            entries,
            vectors,
        })
    }

    /// Read and parse a shard file.
    ///
    /// Unreadable files are reported as [`Error::MalformedShard`] so the
    /// store's policy applies to them too.
    pub fn read(shard: &ShardPath) -> Result<Self> {
        let file = File::open(&shard.path)
            .map_err(|e| Error::malformed_shard(&shard.tag, format!("cannot open: {e}")))?;
        let parsed: ShardFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::malformed_shard(&shard.tag, format!("invalid JSON: {e}")))?;
        Self::from_parts(shard.tag.clone(), parsed.metadata, parsed.embeddings)
    }

    /// Shard identifier.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Number of entries (and vector rows).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the shard has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector width, or `None` for an empty shard.
    pub fn dimension(&self) -> Option<usize> {
        (!self.vectors.is_empty()).then(|| self.vectors.dimension())
    }

    /// Entries paired with their vector rows, in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&RawJobEntry, &[f32])> {
        self.entries.iter().zip(self.vectors.iter_rows())
    }
}

/// Write a shard container to `path`, creating missing parent directories.
pub fn write_shard(path: &Path, shard: &ShardFile) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }
    let json = serde_json::to_string(shard)?;
    std::fs::write(path, json).map_err(|e| Error::io_with_path(e, path))
}

// ============================================================================
// Tests
// ============================================================================
