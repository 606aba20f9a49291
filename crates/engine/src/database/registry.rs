//! Registry of open databases
//!
//! The storage engine holds an exclusive lock on its data file, so a
//! directory may only be open once per process. Opening it again returns the
//! live instance. Entries are weak and are removed when the database is dropped.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Weak;

use super::Database;

/// Open databases by canonical data directory
pub(super) static OPEN_DATABASES: Lazy<Mutex<HashMap<PathBuf, Weak<Database>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
