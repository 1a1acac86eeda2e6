//! Building shards from scraped postings.
//!
//! A postings file (`avisos_<tag>.json`) is a JSON array of posting objects.
//! Each posting's title and description are joined as `"<title>. <description>"`,
//! normalised by [`clean_text`], stored back as `cleaned_text`, and encoded in
//! one [`EmbeddingProvider::embed_batch`] call. The result is written as the
//! shard `vectors_<tag>.json` that [`EmbeddingStore`](crate::EmbeddingStore)
//! loads.
//!
//! Postings without a usable title or description are still written; the
//! store drops them at load time like any other invalid record.

use jobmatch_core::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::embedding::EmbeddingProvider;
use crate::shard::{RawJobEntry, ShardConfig, ShardFile, ShardPath, write_shard};

/// File name prefix of raw postings files.
pub const POSTINGS_PREFIX: &str = "avisos_";

/// Lowercase `text`, keep letters, digits and Spanish accented vowels,
/// and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_whitespace() || c.is_ascii_alphanumeric() || "áéíóúñ".contains(*c))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"<title>. <description>"`, with absent fields as empty strings.
pub fn combined_text(entry: &RawJobEntry) -> String {
    format!(
        "{}. {}",
        entry.title.as_deref().unwrap_or_default(),
        entry.description.as_deref().unwrap_or_default()
    )
}

/// Shard tag implied by a postings file name: the stem without
/// [`POSTINGS_PREFIX`].
pub fn postings_tag(path: &Path) -> Option<String> {
    let stem = path.file_stem().and_then(|s| s.to_str())?;
    let tag = stem.strip_prefix(POSTINGS_PREFIX).unwrap_or(stem);
    (!tag.is_empty()).then(|| tag.to_string())
}

/// Read a postings file.
pub fn load_postings(path: &Path) -> Result<Vec<RawJobEntry>> {
    let file = File::open(path).map_err(|e| Error::io_with_path(e, path))?;
    let postings: Vec<RawJobEntry> = serde_json::from_reader(BufReader::new(file))?;
    Ok(postings)
}

/// Fill `cleaned_text` on every posting and encode them into a shard.
///
/// # Errors
///
/// - [`Error::InvalidData`] if `postings` is empty
/// - [`Error::Operation`] if the provider fails or returns vectors of the
///   wrong count or width
pub async fn encode_postings(
    provider: &dyn EmbeddingProvider,
    mut postings: Vec<RawJobEntry>,
) -> Result<ShardFile> {
    if postings.is_empty() {
        return Err(Error::invalid_data("no postings to encode"));
    }

    let texts: Vec<String> = postings
        .iter()
        .map(|entry| clean_text(&combined_text(entry)))
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let embeddings = provider.embed_batch(&refs).await?;

    if embeddings.len() != postings.len() {
        return Err(Error::operation(format!(
            "provider '{}' returned {} vectors for {} postings",
            provider.name(),
            embeddings.len(),
            postings.len()
        )));
    }
    let dimension = provider.dimension();
    if let Some(pos) = embeddings.iter().position(|v| v.len() != dimension) {
        return Err(Error::operation(format!(
            "provider '{}' gave a {}-wide vector for posting {pos}, expected {dimension}",
            provider.name(),
            embeddings[pos].len()
        )));
    }

    for (entry, text) in postings.iter_mut().zip(texts) {
        entry.cleaned_text = Some(text);
    }
    Ok(ShardFile {
        metadata: postings,
        embeddings,
    })
}

/// Encode the postings in `input` and write them as a shard under
/// `config.dir`. The tag defaults to [`postings_tag`] of `input`.
pub async fn build_shard(
    provider: &dyn EmbeddingProvider,
    input: &Path,
    config: &ShardConfig,
    tag: Option<&str>,
) -> Result<ShardPath> {
    let tag = match tag {
        Some(tag) if !tag.trim().is_empty() => tag.trim().to_string(),
        Some(_) => return Err(Error::config("shard tag must not be blank")),
        None => postings_tag(input).ok_or_else(|| {
            Error::config(format!(
                "cannot derive a shard tag from {}; pass one explicitly",
                input.display()
            ))
        })?,
    };

    let postings = load_postings(input)?;
    log::info!(
        "Encoding {} posting(s) from {} with '{}'",
        postings.len(),
        input.display(),
        provider.name()
    );
    let shard = encode_postings(provider, postings).await?;

    let path = config.path_for(&tag);
    write_shard(&path, &shard)?;
    log::info!(
        "Wrote shard '{tag}' ({} rows, dimension {}) to {}",
        shard.metadata.len(),
        provider.dimension(),
        path.display()
    );
    Ok(ShardPath { tag, path })
}

// ============================================================================
// Tests
// ============================================================================
