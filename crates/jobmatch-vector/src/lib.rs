#![doc = include_str!("../README.md")]

pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod index;
pub mod ingest;
pub mod shard;
pub mod store;
pub mod types;

#[cfg(feature = "fastembed")]
pub mod fastembed;

// Re-exports — corpus and engine
pub use corpus::{Corpus, CorpusHandle};
pub use engine::RecommendationEngine;

// Re-exports — embedding
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider, StaticEmbeddingProvider};
#[cfg(feature = "fastembed")]
pub use fastembed::FastEmbedProvider;

// Re-exports — ingestion
pub use ingest::{POSTINGS_PREFIX, build_shard, clean_text, encode_postings, load_postings};
pub use shard::{
    FailureMode, RawJobEntry, Shard, ShardConfig, ShardFile, ShardPath, ShardPolicy,
    discover_shards, write_shard,
};
pub use store::{EmbeddingStore, LoadReport, SkippedShard, StoreBuilder};

// Re-exports — index and types
pub use index::{INDEX_KIND, SimilarityIndex, l2_normalize};
pub use types::{
    CorpusStats, EmbeddingMatrix, JobRecord, Recommendation, SearchResult, UNKNOWN,
    description_preview, round_score,
};
