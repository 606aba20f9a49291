//! Database builder for fluent configuration

use std::path::PathBuf;
use std::sync::Arc;
use suitestore_core::{Error, IdGenerator, Result};

use super::config::{IdStrategy, StoreConfig};
use super::Database;
use crate::feed::OverflowPolicy;

// ============================================================================
// Database Builder Pattern
// ============================================================================

/// Builder for Database configuration
///
/// # Three Ways to Open a Database
///
/// ```text
/// use suitestore_engine::Database;
///
/// // 1. Settings from suitestore.toml in the directory
/// let db = Database::open("/data/results")?;
///
/// // 2. Builder for explicit settings
/// let db = Database::builder()
///     .path("/data/results")
///     .feed_capacity(64)
///     .overflow(OverflowPolicy::Block)
///     .open()?;
///
/// // 3. In memory (no files, testing)
/// let db = Database::ephemeral()?;
/// ```
///
/// Settings given to the builder are written to `suitestore.toml` when
/// opening a directory. An explicit id generator is not persisted.
#[derive(Clone)]
pub struct DatabaseBuilder {
    /// Database directory (required for open())
    path: Option<PathBuf>,
    config: StoreConfig,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl DatabaseBuilder {
    /// Create new builder with default settings
    pub fn new() -> Self {
        Self {
            path: None,
            config: StoreConfig::default(),
            ids: None,
        }
    }

    /// Set database directory
    ///
    /// Required for `open()`. Use `ephemeral()` for no-file testing.
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// True if a directory was set
    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    /// Replace all settings at once
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Maximum number of undelivered change events
    pub fn feed_capacity(mut self, capacity: usize) -> Self {
        self.config.feed_capacity = capacity;
        self
    }

    /// What publishing does when the change feed is full
    pub fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.config.feed_overflow = policy;
        self
    }

    /// Built-in id generation strategy
    pub fn id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.config.id_generator = strategy;
        self
    }

    /// Use a custom id generator, overriding the configured strategy
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Open the database
    ///
    /// If the same directory is already open, returns that instance and its
    /// settings are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No path was configured (use `.path()` or `.ephemeral()`)
    /// - The settings are invalid
    /// - Directory creation or the storage engine open fails
    pub fn open(self) -> Result<Arc<Database>> {
        let path = self.path.ok_or_else(|| {
            Error::invalid_model(
                "DatabaseBuilder::open() requires a path. Use ephemeral() for testing.",
            )
        })?;
        self.config.validate()?;
        std::fs::create_dir_all(&path)?;
        self.config
            .write_to_file(&path.join(super::CONFIG_FILE_NAME))?;
        Database::open_dir(path, self.config, self.ids)
    }

    /// Open an in-memory database with these settings
    pub fn ephemeral(self) -> Result<Arc<Database>> {
        Database::ephemeral_with(self.config, self.ids)
    }
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DatabaseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseBuilder")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("custom_ids", &self.ids.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suitestore_core::SequentialIds;

    #[test]
    fn test_open_requires_path() {
        let err = DatabaseBuilder::new().open().unwrap_err();
        assert!(err.is_invalid_model());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Database::builder().feed_capacity(0).ephemeral().unwrap_err();
        assert!(err.is_invalid_model());
    }

    #[test]
    fn test_settings_reach_database() {
        let db = Database::builder()
            .feed_capacity(8)
            .overflow(OverflowPolicy::DropNewest)
            .ephemeral()
            .unwrap();
        assert_eq!(db.config().feed_capacity, 8);
        assert_eq!(db.config().feed_overflow, OverflowPolicy::DropNewest);
        assert_eq!(db.feed_stats().capacity, 8);
    }

    #[test]
    fn test_custom_id_generator() {
        let db = Database::builder()
            .id_generator(Arc::new(SequentialIds::starting_after(41)))
            .ephemeral()
            .unwrap();
        assert_eq!(db.next_id(), "42");
    }

    #[test]
    fn test_open_writes_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::builder()
            .path(dir.path())
            .id_strategy(IdStrategy::Sequential)
            .open()
            .unwrap();
        drop(db);
        let cfg = StoreConfig::from_file(&dir.path().join(super::super::CONFIG_FILE_NAME)).unwrap();
        assert_eq!(cfg.id_generator, IdStrategy::Sequential);
    }
}
