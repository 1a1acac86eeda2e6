//! Jobmatch Core — shared error types and traits.
//!
//! This crate provides the foundational types used across all jobmatch
//! crates. It has no internal jobmatch dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`traits`]: Configuration abstraction

#![doc = include_str!("../README.md")]

pub mod error;
pub mod traits;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use traits::ConfigProvider;
