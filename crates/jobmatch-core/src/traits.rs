//! Core traits for jobmatch.
//!
//! [`ConfigProvider`] abstracts over where shard containers and evaluation
//! artifacts live, so the library crates never read configuration files or
//! environment variables themselves.

use std::path::PathBuf;

use crate::Result;

/// Trait for application configuration.
///
/// # Bounds
///
/// - `Send + Sync`: Configuration must be shareable across threads
/// - `Clone`: Configuration can be duplicated for passing to subsystems
/// - `'static`: Configuration lifetime is not borrowed
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use jobmatch_core::traits::ConfigProvider;
/// use jobmatch_core::Result;
///
/// #[derive(Clone)]
/// struct FixtureConfig {
///     root: PathBuf,
/// }
///
/// impl ConfigProvider for FixtureConfig {
///     fn project_name(&self) -> &str {
///         "fixture"
///     }
///
///     fn base_path(&self) -> Result<PathBuf> {
///         Ok(self.root.clone())
///     }
/// }
///
/// let config = FixtureConfig { root: PathBuf::from("/data") };
/// assert_eq!(config.shard_dir().unwrap(), PathBuf::from("/data/processed"));
/// assert_eq!(config.evaluation_dir().unwrap(), PathBuf::from("/data/evaluation"));
/// ```
pub trait ConfigProvider: Send + Sync + Clone + 'static {
    /// The project name, used for env var prefixes and default paths.
    fn project_name(&self) -> &str;

    /// Base path for all project data.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be determined.
    fn base_path(&self) -> Result<PathBuf>;

    /// Directory that holds the `vectors_*` shard containers.
    ///
    /// Defaults to `<base_path>/processed`.
    fn shard_dir(&self) -> Result<PathBuf> {
        Ok(self.base_path()?.join("processed"))
    }

    /// Directory that holds profiles, predictions, and ground truth.
    ///
    /// Defaults to `<base_path>/evaluation`.
    fn evaluation_dir(&self) -> Result<PathBuf> {
        Ok(self.base_path()?.join("evaluation"))
    }
}

// ============================================================================
// Tests
// ============================================================================
