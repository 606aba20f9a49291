//! Store configuration via `suitestore.toml`
//!
//! On first open, a default `suitestore.toml` is created in the data
//! directory. To change settings, edit the file and reopen the store.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use suitestore_core::{Error, IdGenerator, Result, SequentialIds, UniqueIds};

use crate::feed::OverflowPolicy;

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "suitestore.toml";

/// Database file name placed in the data directory.
pub const DATA_FILE_NAME: &str = "suitestore.redb";

/// Default change feed capacity
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// How new document ids are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Random 32-character hex ids
    #[default]
    Unique,
    /// Decimal counter continuing after the largest numeric id on disk
    Sequential,
}

impl IdStrategy {
    /// Build a generator; `last_numeric_id` seeds sequential ids
    pub fn generator(&self, last_numeric_id: u64) -> Arc<dyn IdGenerator> {
        match self {
            IdStrategy::Unique => Arc::new(UniqueIds),
            IdStrategy::Sequential => Arc::new(SequentialIds::starting_after(last_numeric_id)),
        }
    }
}

/// Store configuration loaded from `suitestore.toml`.
///
/// # Example
///
/// ```toml
/// feed_capacity = 1024
/// feed_overflow = "drop_oldest"
/// id_generator = "unique"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of undelivered change events.
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
    /// What a publish does when the change feed is full.
    #[serde(default)]
    pub feed_overflow: OverflowPolicy,
    /// How document ids are generated.
    #[serde(default)]
    pub id_generator: IdStrategy,
}

fn default_feed_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            feed_capacity: DEFAULT_FEED_CAPACITY,
            feed_overflow: OverflowPolicy::default(),
            id_generator: IdStrategy::default(),
        }
    }
}

impl StoreConfig {
    /// Reject settings the store cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.feed_capacity == 0 {
            return Err(Error::invalid_model(
                "feed_capacity in suitestore.toml must be at least 1",
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Suitestore configuration
#
# Maximum number of change events waiting for a subscriber (default: 1024)
feed_capacity = 1024

# What a commit does when the change feed is full:
#   "drop_oldest" = discard the oldest undelivered event (default)
#   "drop_newest" = discard the event being published
#   "block"       = wait for a subscriber; stalls all writers until drained
feed_overflow = "drop_oldest"

# Document id generation: "unique" (default) or "sequential"
id_generator = "unique"
"#
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::unknown(format!("failed to read config file '{}'", path.display()), e)
        })?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            Error::unknown(format!("failed to parse config file '{}'", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::unknown(
                    format!("failed to write default config file '{}'", path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::unknown("failed to serialize config", e))?;
        std::fs::write(path, content).map_err(|e| {
            Error::unknown(format!("failed to write config file '{}'", path.display()), e)
        })
    }
}
