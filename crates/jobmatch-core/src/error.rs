//! Error types for jobmatch operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all jobmatch crates. Uses `thiserror` for derive macros.
//!
//! Variants fall into three groups:
//!
//! - **Ingestion**: [`Error::NoShardsFound`], [`Error::DimensionMismatch`],
//!   [`Error::MalformedShard`]
//! - **Query**: [`Error::InvalidProfile`], [`Error::QueryDimension`],
//!   [`Error::IndexNotBuilt`]
//! - **Infrastructure**: I/O, JSON, configuration, provider failures

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in jobmatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error without path context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific file.
    #[error("I/O error at {path}: {source}")]
    IoWithPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Runtime failure in a collaborator (embedding provider, task join, ...).
    #[error("Operation failed: {0}")]
    Operation(String),

    /// No shard containers matched the naming convention.
    #[error("No shard files matching '{pattern}' found in {dir}")]
    NoShardsFound { dir: PathBuf, pattern: String },

    /// A shard's vector width disagrees with the corpus dimension.
    #[error("Shard '{shard}' has embedding dimension {actual}, expected {expected}")]
    DimensionMismatch {
        shard: String,
        expected: usize,
        actual: usize,
    },

    /// A shard container could not be read or parsed.
    #[error("Malformed shard '{shard}': {reason}")]
    MalformedShard { shard: String, reason: String },

    /// A query vector's width disagrees with the indexed dimension.
    #[error("Query vector has dimension {actual}, index expects {expected}")]
    QueryDimension { expected: usize, actual: usize },

    /// Empty or unusable profile text.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Search was attempted before any index was installed.
    #[error("Similarity index has not been built")]
    IndexNotBuilt,
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create an operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create an invalid profile error.
    pub fn invalid_profile(msg: impl Into<String>) -> Self {
        Self::InvalidProfile(msg.into())
    }

    /// Create a malformed shard error.
    pub fn malformed_shard(shard: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedShard {
            shard: shard.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path that caused it.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether this error was raised while ingesting shard containers.
    pub fn is_ingestion(&self) -> bool {
        matches!(
            self,
            Self::NoShardsFound { .. }
                | Self::DimensionMismatch { .. }
                | Self::MalformedShard { .. }
        )
    }

    /// Whether this error was raised while answering a query.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::InvalidProfile(_) | Self::QueryDimension { .. } | Self::IndexNotBuilt
        )
    }
}

/// Result type alias using jobmatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert!(matches!(Error::config("x"), Error::Config(m) if m == "x"));
        assert!(matches!(Error::not_found("x"), Error::NotFound(_)));
        assert!(matches!(Error::invalid_data("x"), Error::InvalidData(_)));
        assert!(matches!(Error::operation("x"), Error::Operation(_)));
        assert!(matches!(Error::invalid_profile("x"), Error::InvalidProfile(_)));
    }

    #[test]
    fn test_dimension_mismatch_names_shard() {
        let err = Error::DimensionMismatch {
            shard: "vendedor".to_string(),
            expected: 384,
            actual: 128,
        };
        let msg = err.to_string();
        assert!(msg.contains("vendedor"));
        assert!(msg.contains("384"));
        assert!(msg.contains("128"));
    }

    #[test]
    fn test_io_with_path_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io_with_path(io, "/data/vectors_a.json");
        assert!(err.to_string().contains("/data/vectors_a.json"));
    }

    #[test]
    fn test_json_from() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_classification() {
        assert!(Error::malformed_shard("a", "bad").is_ingestion());
        assert!(
            Error::NoShardsFound {
                dir: PathBuf::from("/tmp"),
                pattern: "vectors_*.json".into()
            }
            .is_ingestion()
        );
        assert!(Error::IndexNotBuilt.is_query());
        assert!(Error::QueryDimension { expected: 3, actual: 2 }.is_query());
        assert!(!Error::config("x").is_query());
        assert!(!Error::IndexNotBuilt.is_ingestion());
    }
}
