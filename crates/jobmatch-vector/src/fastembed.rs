//! Local sentence embeddings through `fastembed`.
//!
//! Profiles and postings are mostly Spanish, so the default is the
//! multilingual paraphrase MiniLM, the same family the shards were encoded
//! with. Every request, single or batched, goes through one blocking call on
//! the tokio blocking pool while holding the model lock.
//!
//! Requires the `fastembed` feature.

use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use jobmatch_core::{Error, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "paraphrase-multilingual-minilm-l12-v2";

/// Texts per inference batch.
const BATCH_SIZE: usize = 64;

struct ModelSpec {
    name: &'static str,
    alias: &'static str,
    model: EmbeddingModel,
}

const MODELS: &[ModelSpec] = &[
    ModelSpec {
        name: DEFAULT_MODEL,
        alias: "ParaphraseMLMiniLML12V2",
        model: EmbeddingModel::ParaphraseMLMiniLML12V2,
    },
    ModelSpec {
        name: "multilingual-e5-small",
        alias: "MultilingualE5Small",
        model: EmbeddingModel::MultilingualE5Small,
    },
    ModelSpec {
        name: "multilingual-e5-base",
        alias: "MultilingualE5Base",
        model: EmbeddingModel::MultilingualE5Base,
    },
];

fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    MODELS
        .iter()
        .find(|spec| spec.name == name || spec.alias == name)
        .map(|spec| spec.model.clone())
        .ok_or_else(|| {
            let known: Vec<&str> = MODELS.iter().map(|spec| spec.name).collect();
            Error::config(format!(
                "unknown sentence model '{name}' (known: {})",
                known.join(", ")
            ))
        })
}

/// Multilingual sentence-embedding backend.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedProvider {
    /// Load `model_name`, downloading it into `cache_path` on first use.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an unknown model name, [`Error::Operation`]
    /// if the model cannot be loaded.
    pub fn new(model_name: &str, cache_path: Option<&str>) -> Result<Self> {
        let mut init = InitOptions::new(resolve_model(model_name)?);
        if let Some(path) = cache_path {
            init = init.with_cache_dir(PathBuf::from(path));
        }

        let mut model = TextEmbedding::try_new(init).map_err(|e| {
            Error::operation(format!("cannot load sentence model '{model_name}': {e}"))
        })?;
        let dimension = encode(&mut model, vec!["perfil".to_string()])?
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::operation(format!("model '{model_name}' returned no vector")))?;

        log::info!("Loaded sentence model {model_name} (dimension {dimension})");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimension,
            model_name: model_name.to_string(),
        })
    }

    /// Load [`DEFAULT_MODEL`].
    pub fn multilingual(cache_path: Option<&str>) -> Result<Self> {
        Self::new(DEFAULT_MODEL, cache_path)
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let expected = texts.len();
        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| Error::operation("sentence model lock poisoned"))?;
            encode(&mut model, texts)
        })
        .await
        .map_err(|e| Error::operation(format!("embedding task aborted: {e}")))??;

        if vectors.len() != expected {
            return Err(Error::operation(format!(
                "model '{}' returned {} vectors for {expected} texts",
                self.model_name,
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

fn encode(model: &mut TextEmbedding, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
    let count = texts.len();
    model
        .embed(texts, Some(BATCH_SIZE))
        .map_err(|e| Error::operation(format!("encoding {count} text(s) failed: {e}")))
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::operation("no vector returned for profile text"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.iter().map(|t| (*t).to_string()).collect()).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_names_and_aliases() {
        for spec in MODELS {
            assert!(resolve_model(spec.name).is_ok(), "{}", spec.name);
            assert!(resolve_model(spec.alias).is_ok(), "{}", spec.alias);
        }
    }

    #[test]
    fn test_resolve_model_unknown_lists_known_models() {
        let err = resolve_model("bge-small-en-v1.5").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(DEFAULT_MODEL));
    }

    #[tokio::test]
    #[ignore = "requires model download (~120MB)"]
    async fn test_multilingual_profile_and_postings() {
        let provider = FastEmbedProvider::multilingual(None).unwrap();
        assert_eq!(provider.dimension(), 384);

        let profile = provider.embed("Desarrollador backend con Python").await.unwrap();
        let postings = provider
            .embed_batch(&["Desarrollador backend con Python", "contador público"])
            .await
            .unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(profile.len(), 384);
        let drift: f32 = profile.iter().zip(&postings[0]).map(|(a, b)| (a - b).abs()).sum();
        assert!(drift < 1e-3);
    }
}
