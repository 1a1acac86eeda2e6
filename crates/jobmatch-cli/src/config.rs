//! Configuration for the `jobmatch` binary.
//!
//! Provides the [`JobmatchConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `JOBMATCH_CONFIG` environment variable
//! 3. XDG default: `~/.config/jobmatch/config.toml`
//! 4. Built-in defaults
//!
//! `JOBMATCH_<SECTION>_<KEY>` environment variables overlay string values.

use confyg::{Confygery, env};
use jobmatch_core::traits::ConfigProvider;
use jobmatch_core::{Error, Result};
use jobmatch_eval::CategoryRules;
use jobmatch_vector::{FailureMode, ShardConfig, ShardPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "JOBMATCH_CONFIG";

// ============================================================================
// Configuration structs
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobmatchConfig {
    /// Project name, used for env var prefixes and default paths.
    pub project_name: String,

    /// Base path for shard and evaluation data. Defaults to the working
    /// directory.
    pub base_path: Option<String>,

    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub evaluation: EvaluationConfig,
}

/// Shard discovery and ingestion policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding shard containers. Defaults to `<base_path>/processed`.
    pub shard_dir: Option<String>,
    pub shard_prefix: String,
    pub shard_extension: String,
    pub on_malformed: FailureMode,
    pub on_dimension_mismatch: FailureMode,
}

/// Embedding backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local inference; requires the `fastembed` feature.
    Fastembed,
    /// Deterministic hash-based vectors for smoke tests.
    Mock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub model: String,
    /// Mock provider width. Defaults to the corpus dimension.
    pub dimension: Option<usize>,
    /// Model download cache.
    pub cache_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_k: usize,
    /// Log per-request embedding and search latency.
    pub verbose: bool,
}

/// Offline evaluation artifacts and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Artifact directory. Defaults to `<base_path>/evaluation`.
    pub data_dir: Option<String>,
    pub profiles_file: String,
    pub predictions_file: String,
    pub ground_truth_file: String,
    /// Recommendations stored per profile by `predict`.
    pub prediction_k: usize,
    /// Cutoff for precision, recall, and hit rate.
    pub metric_k: usize,
    pub random_seed: u64,
    pub lexical_max_features: usize,
    /// Expected category → category substrings accepted as equivalent.
    pub synonyms: BTreeMap<String, Vec<String>>,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for JobmatchConfig {
    fn default() -> Self {
        Self {
            project_name: "jobmatch".to_string(),
            base_path: None,
            store: StoreConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let policy = ShardPolicy::default();
        Self {
            shard_dir: None,
            shard_prefix: "vectors_".to_string(),
            shard_extension: "json".to_string(),
            on_malformed: policy.on_malformed,
            on_dimension_mismatch: policy.on_dimension_mismatch,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Fastembed,
            model: "paraphrase-multilingual-minilm-l12-v2".to_string(),
            dimension: None,
            cache_path: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: 10,
            verbose: false,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            profiles_file: "test_profiles.json".to_string(),
            predictions_file: "prediction_results.json".to_string(),
            ground_truth_file: "ground_truth.json".to_string(),
            prediction_k: 20,
            metric_k: 10,
            random_seed: 42,
            lexical_max_features: jobmatch_eval::DEFAULT_MAX_FEATURES,
            synonyms: CategoryRules::default().to_table(),
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl JobmatchConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path) {
            if path.exists() {
                builder
                    .add_file(&path.to_string_lossy())
                    .map_err(|e| Error::config(format!("config file: {e}")))?;
            }
        }

        let mut env_opts = env::Options::with_top_level("JOBMATCH");
        for section in ["store", "embedding", "search", "evaluation"] {
            env_opts.add_section(section);
        }
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("jobmatch").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    // ------------------------------------------------------------------------
    // Library-facing views
    // ------------------------------------------------------------------------

    pub fn shard_policy(&self) -> ShardPolicy {
        ShardPolicy {
            on_malformed: self.store.on_malformed,
            on_dimension_mismatch: self.store.on_dimension_mismatch,
        }
    }

    pub fn shard_config(&self) -> Result<ShardConfig> {
        let mut config = ShardConfig::new(self.shard_dir()?).with_policy(self.shard_policy());
        config.prefix = self.store.shard_prefix.clone();
        config.extension = self.store.shard_extension.clone();
        Ok(config)
    }

    pub fn category_rules(&self) -> CategoryRules {
        CategoryRules::from_table(&self.evaluation.synonyms)
    }

    pub fn profiles_path(&self) -> Result<PathBuf> {
        Ok(self.evaluation_dir()?.join(&self.evaluation.profiles_file))
    }

    pub fn predictions_path(&self) -> Result<PathBuf> {
        Ok(self.evaluation_dir()?.join(&self.evaluation.predictions_file))
    }

    pub fn ground_truth_path(&self) -> Result<PathBuf> {
        Ok(self.evaluation_dir()?.join(&self.evaluation.ground_truth_file))
    }
}

// ============================================================================
// ConfigProvider implementation
// ============================================================================

impl ConfigProvider for JobmatchConfig {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn base_path(&self) -> Result<PathBuf> {
        match &self.base_path {
            Some(p) => Ok(PathBuf::from(p)),
            None => std::env::current_dir()
                .map_err(|e| Error::config(format!("Could not determine base path: {e}"))),
        }
    }

    fn shard_dir(&self) -> Result<PathBuf> {
        match &self.store.shard_dir {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(self.base_path()?.join("processed")),
        }
    }

    fn evaluation_dir(&self) -> Result<PathBuf> {
        match &self.evaluation.data_dir {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(self.base_path()?.join("evaluation")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Default tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_jobmatch_config_default() {
        let config = JobmatchConfig::default();
        assert_eq!(config.project_name, "jobmatch");
        assert!(config.base_path.is_none());
        assert_eq!(config.store.shard_prefix, "vectors_");
        assert_eq!(config.store.on_malformed, FailureMode::Skip);
        assert_eq!(config.store.on_dimension_mismatch, FailureMode::Fail);
        assert_eq!(config.embedding.provider, ProviderKind::Fastembed);
        assert_eq!(config.search.default_k, 10);
        assert_eq!(config.evaluation.prediction_k, 20);
        assert_eq!(config.evaluation.metric_k, 10);
        assert_eq!(config.evaluation.random_seed, 42);
        assert_eq!(config.evaluation.lexical_max_features, 5000);
        assert_eq!(
            config.evaluation.synonyms.get("desarrollador"),
            Some(&vec!["programador".to_string()])
        );
    }

    // ------------------------------------------------------------------------
    // Serialization tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_jobmatch_config_from_toml() {
        let toml_str = r#"
            base_path = "/data"

            [store]
            shard_dir = "/data/clean"
            on_dimension_mismatch = "skip"

            [embedding]
            provider = "mock"
            dimension = 8

            [search]
            default_k = 5
            verbose = true

            [evaluation]
            metric_k = 5

            [evaluation.synonyms]
            asistente = ["secretari"]
        "#;

        let config: JobmatchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.base_path.as_deref(), Some("/data"));
        assert_eq!(config.store.on_dimension_mismatch, FailureMode::Skip);
        assert_eq!(config.store.on_malformed, FailureMode::Skip);
        assert_eq!(config.embedding.provider, ProviderKind::Mock);
        assert_eq!(config.embedding.dimension, Some(8));
        assert!(config.search.verbose);
        assert_eq!(config.evaluation.metric_k, 5);
        assert_eq!(config.evaluation.prediction_k, 20);

        let rules = config.category_rules();
        assert!(rules.matches("asistente", "secretaria ejecutiva"));
        assert!(!rules.matches("desarrollador", "programador"));
    }

    #[test]
    fn test_jobmatch_config_to_toml_round_trip() {
        let config = JobmatchConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("project_name = \"jobmatch\""));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("default_k = 10"));

        let parsed: JobmatchConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    // ------------------------------------------------------------------------
    // Loading tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_jobmatch_config_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                project_name = "loaded"
                [store]
                shard_prefix = "emb_"
            "#,
        )
        .unwrap();

        let config = JobmatchConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.project_name, "loaded");
        assert_eq!(config.store.shard_prefix, "emb_");
        assert_eq!(config.store.shard_extension, "json");
    }

    #[test]
    fn test_jobmatch_config_load_defaults() {
        let config = JobmatchConfig::load(Some("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.project_name, "jobmatch");
        assert_eq!(config.evaluation.metric_k, 10);
    }

    #[test]
    fn test_resolve_config_path_explicit() {
        let path = JobmatchConfig::resolve_config_path(Some("/explicit/config.toml"));
        assert_eq!(path, Some(PathBuf::from("/explicit/config.toml")));
    }

    #[test]
    fn test_default_config_path_shape() {
        if let Some(p) = JobmatchConfig::default_config_path() {
            assert!(p.ends_with("jobmatch/config.toml"));
        }
    }

    // ------------------------------------------------------------------------
    // Derived paths
    // ------------------------------------------------------------------------

    #[test]
    fn test_paths_follow_base_path() {
        let config = JobmatchConfig {
            base_path: Some("/project".into()),
            ..Default::default()
        };
        assert_eq!(config.shard_dir().unwrap(), PathBuf::from("/project/processed"));
        assert_eq!(
            config.predictions_path().unwrap(),
            PathBuf::from("/project/evaluation/prediction_results.json")
        );
        assert_eq!(
            config.ground_truth_path().unwrap(),
            PathBuf::from("/project/evaluation/ground_truth.json")
        );
    }

    #[test]
    fn test_explicit_dirs_override_base_path() {
        let mut config = JobmatchConfig {
            base_path: Some("/project".into()),
            ..Default::default()
        };
        config.store.shard_dir = Some("/shards".into());
        config.store.shard_prefix = "emb_".into();
        config.store.on_malformed = FailureMode::Fail;
        config.evaluation.data_dir = Some("/eval".into());

        let shards = config.shard_config().unwrap();
        assert_eq!(shards.dir, PathBuf::from("/shards"));
        assert_eq!(shards.pattern(), "emb_*.json");
        assert_eq!(shards.policy, ShardPolicy::strict());
        assert_eq!(
            config.profiles_path().unwrap(),
            PathBuf::from("/eval/test_profiles.json")
        );
    }

    #[test]
    fn test_base_path_defaults_to_cwd() {
        let config = JobmatchConfig::default();
        assert_eq!(config.base_path().unwrap(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_jobmatch_config_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JobmatchConfig>();
    }
}
