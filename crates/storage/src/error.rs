//! Engine error conversion
//!
//! Every `redb` failure surfaces as [`Error::Unknown`] with the failing step
//! as its message and the engine error as its source.

use suitestore_core::{Error, Result};

/// Map engine results into the store's error taxonomy
pub trait StorageResultExt<T> {
    /// Wrap an engine failure as `Unknown`, naming the step that failed
    fn or_unknown(self, context: &str) -> Result<T>;
}

impl<T, E> StorageResultExt<T> for std::result::Result<T, E>
where
    E: Into<redb::Error>,
{
    fn or_unknown(self, context: &str) -> Result<T> {
        self.map_err(|e| Error::unknown(context, e.into()))
    }
}
