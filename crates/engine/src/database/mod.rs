//! Database struct and open/close logic
//!
//! This module provides the main Database struct that orchestrates:
//! - Storage initialization (file-backed or in-memory)
//! - Configuration (`suitestore.toml`)
//! - Collection registration and index rebuilds
//! - The write transaction API and change publication
//!
//! ## Transaction API
//!
//! `db.transaction(|ctx| { ... })` runs the closure inside the single write
//! transaction. Returning `Ok` commits and then publishes every change the
//! closure recorded; returning `Err` aborts and publishes nothing.
//!
//! `db.read(|view| { ... })` runs the closure against one read snapshot.

pub mod builder;
pub mod config;
mod registry;

pub use builder::DatabaseBuilder;
pub use config::{IdStrategy, StoreConfig, CONFIG_FILE_NAME, DATA_FILE_NAME};

use crate::collection::{CollectionSchema, DocumentCollection};
use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use crate::feed::{ChangeFeed, ChangeOp, ChangeStream, FeedStats, PendingChange};
use dashmap::DashMap;
use registry::OPEN_DATABASES;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use suitestore_core::{Collection, Document, Entity, Error, IdGenerator, Result};
use suitestore_storage::{codec, DocumentStore, ReadTxn, StoreView, WriteTxn};
use tracing::{info, warn};

// ============================================================================
// Database Struct
// ============================================================================

/// Main database struct
///
/// Create a database with [`Database::open`], [`Database::builder`] or
/// [`Database::ephemeral`]. Repositories hold an `Arc<Database>` and are
/// otherwise stateless.
///
/// # Example
///
/// ```text
/// use suitestore_engine::Database;
///
/// let db = Database::open("/path/to/data")?;
/// let suites = db.register(schema)?;
/// let stream = db.changes();
/// ```
pub struct Database {
    /// Data directory path (None for ephemeral databases)
    data_dir: Option<PathBuf>,

    /// Document store over the ordered KV engine
    store: DocumentStore,

    /// Writer lock and transaction metrics
    coordinator: TransactionCoordinator,

    /// Outbound change events
    feed: ChangeFeed,

    /// Assigns ids on insert
    ids: Arc<dyn IdGenerator>,

    /// Set to false at close to reject new writes
    accepting_writes: AtomicBool,

    /// Set once by the first close
    closed: AtomicBool,

    /// Registered collection schemas, keyed by collection
    ///
    /// Values are `Arc<CollectionSchema<T>>` for the collection's document
    /// type.
    collections: DashMap<Collection, Arc<dyn Any + Send + Sync>>,

    /// Configuration the database was opened with
    config: StoreConfig,
}

impl Database {
    /// Open the database in directory `path`
    ///
    /// Reads `suitestore.toml` from the directory, creating it with defaults
    /// if missing. Opening a directory that is already open in this process
    /// returns the same instance.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        StoreConfig::write_default_if_missing(&config_path)?;
        let cfg = StoreConfig::from_file(&config_path)?;

        Self::open_dir(data_dir, cfg, None)
    }

    /// Open the database in directory `path` with an explicit configuration
    ///
    /// The configuration is written to `suitestore.toml` so later
    /// [`Database::open`] calls pick up the same settings.
    pub fn open_with_config<P: AsRef<Path>>(path: P, cfg: StoreConfig) -> Result<Arc<Self>> {
        cfg.validate()?;
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        cfg.write_to_file(&data_dir.join(CONFIG_FILE_NAME))?;
        Self::open_dir(data_dir, cfg, None)
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Open a database that lives only in memory
    pub fn ephemeral() -> Result<Arc<Self>> {
        Self::ephemeral_with(StoreConfig::default(), None)
    }

    pub(crate) fn ephemeral_with(
        cfg: StoreConfig,
        ids: Option<Arc<dyn IdGenerator>>,
    ) -> Result<Arc<Self>> {
        cfg.validate()?;
        let store = DocumentStore::ephemeral()?;
        let db = Self::from_parts(store, None, cfg, ids)?;
        info!(target: "suitestore::db", "Opened ephemeral database");
        Ok(Arc::new(db))
    }

    pub(crate) fn open_dir(
        data_dir: PathBuf,
        cfg: StoreConfig,
        ids: Option<Arc<dyn IdGenerator>>,
    ) -> Result<Arc<Self>> {
        std::fs::create_dir_all(&data_dir)?;
        let canonical_path = data_dir.canonicalize()?;

        // Held across open so only one thread creates the instance
        let mut registry = OPEN_DATABASES.lock();
        if let Some(existing) = registry.get(&canonical_path).and_then(Weak::upgrade) {
            // Release the registry before `existing` can drop
            drop(registry);
            if existing.is_closed() {
                return Err(Error::internal(format!(
                    "database at {} is closed but still referenced; drop every handle before reopening",
                    canonical_path.display()
                )));
            }
            info!(target: "suitestore::db", path = ?canonical_path, "Returning existing database instance");
            return Ok(existing);
        }

        let store = DocumentStore::open(canonical_path.join(DATA_FILE_NAME))?;
        let started_empty = store.started_empty();
        let db = Arc::new(Self::from_parts(store, Some(canonical_path.clone()), cfg, ids)?);
        registry.insert(canonical_path.clone(), Arc::downgrade(&db));

        info!(
            target: "suitestore::db",
            path = ?canonical_path,
            started_empty,
            feed_capacity = db.config.feed_capacity,
            feed_overflow = ?db.config.feed_overflow,
            "Opened database"
        );
        Ok(db)
    }

    fn from_parts(
        store: DocumentStore,
        data_dir: Option<PathBuf>,
        cfg: StoreConfig,
        ids: Option<Arc<dyn IdGenerator>>,
    ) -> Result<Self> {
        let ids = match ids {
            Some(ids) => ids,
            None => {
                let last = match cfg.id_generator {
                    IdStrategy::Sequential => last_numeric_id(&store)?,
                    IdStrategy::Unique => 0,
                };
                cfg.id_generator.generator(last)
            }
        };
        Ok(Self {
            data_dir,
            store,
            coordinator: TransactionCoordinator::new(),
            feed: ChangeFeed::new(cfg.feed_capacity, cfg.feed_overflow),
            ids,
            accepting_writes: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            collections: DashMap::new(),
            config: cfg,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// True if the database file did not exist before this open
    ///
    /// Always true for ephemeral databases.
    pub fn started_empty(&self) -> bool {
        self.store.started_empty()
    }

    /// Data directory, `None` for ephemeral databases
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Configuration the database was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Check if the database has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Subscribe to changes committed from now on
    ///
    /// Each stream has its own queue and receives every later event.
    pub fn changes(&self) -> ChangeStream {
        self.feed.subscribe()
    }

    /// Change feed metrics
    pub fn feed_stats(&self) -> FeedStats {
        self.feed.stats()
    }

    /// Write transaction metrics
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    /// Generate a fresh document id
    pub fn next_id(&self) -> String {
        self.ids.next_id()
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Register a collection and rebuild its indexes from stored documents
    ///
    /// Registering the same document type again replaces its schema.
    pub fn register<T: Document>(
        self: &Arc<Self>,
        schema: CollectionSchema<T>,
    ) -> Result<DocumentCollection<T>> {
        let schema = Arc::new(schema);
        let indexed = self.transaction(|ctx| ctx.txn().rebuild_indexes(schema.indexes()))?;
        self.collections.insert(
            T::COLLECTION,
            Arc::clone(&schema) as Arc<dyn Any + Send + Sync>,
        );
        info!(
            target: "suitestore::index",
            collection = %T::COLLECTION,
            indexes = schema.indexes().len(),
            documents = indexed,
            "Registered collection"
        );
        Ok(DocumentCollection::new(Arc::clone(self), schema))
    }

    /// Handle to a previously registered collection
    pub fn collection<T: Document>(self: &Arc<Self>) -> Result<DocumentCollection<T>> {
        let entry = self
            .collections
            .get(&T::COLLECTION)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| Error::not_found(format!("collection '{}'", T::COLLECTION)))?;
        let schema = entry.downcast::<CollectionSchema<T>>().map_err(|_| {
            Error::internal(format!(
                "collection '{}' registered with another document type",
                T::COLLECTION
            ))
        })?;
        Ok(DocumentCollection::new(Arc::clone(self), schema))
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Execute a closure inside the write transaction
    ///
    /// Waits for any in-flight writer. On `Ok` the transaction commits and
    /// the recorded changes are published in order; on `Err` it aborts and
    /// nothing is published.
    pub fn transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut WriteContext<'_>) -> Result<R>,
    {
        self.check_accepting()?;
        let _writer = self.coordinator.lock_writer();
        // Close may have started while this thread waited for the lock
        self.check_accepting()?;

        let txn = self.store.begin_write()?;
        self.coordinator.record_start();

        let mut ctx = WriteContext {
            txn: &txn,
            ids: self.ids.as_ref(),
            changes: Vec::new(),
        };
        let result = f(&mut ctx);
        let changes = ctx.changes;

        match result {
            Ok(value) => {
                if let Err(e) = txn.commit() {
                    self.coordinator.record_abort();
                    return Err(e);
                }
                self.coordinator.record_commit();
                for change in changes {
                    // Rejections are logged by the feed
                    let _ = self.feed.publish(change);
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    warn!(target: "suitestore::txn", error = %abort_err, "Abort failed");
                }
                self.coordinator.record_abort();
                Err(e)
            }
        }
    }

    /// Execute a closure against one read snapshot
    pub fn read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&ReadTxn) -> Result<R>,
    {
        let view = self.store.begin_read()?;
        f(&view)
    }

    fn check_accepting(&self) -> Result<()> {
        if self.accepting_writes.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::internal("database is closed"))
        }
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Close the database. Idempotent.
    ///
    /// Stops new writes, releases publishers blocked on a full feed, waits
    /// for the in-flight writer to finish publishing, then closes the feed.
    /// Subscribers can still drain queued events. Reads keep working.
    ///
    /// The data file stays locked until the last handle is dropped, and
    /// opening the directory again fails until then.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.accepting_writes.store(false, Ordering::SeqCst);
        self.feed.seal();
        drop(self.coordinator.lock_writer());
        self.feed.close();

        let metrics = self.coordinator.metrics();
        info!(
            target: "suitestore::db",
            path = ?self.data_dir,
            committed = metrics.total_committed,
            aborted = metrics.total_aborted,
            "Closed database"
        );
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close();
        if let Some(dir) = &self.data_dir {
            let mut registry = OPEN_DATABASES.lock();
            let is_self = registry
                .get(dir)
                .map(|weak| std::ptr::eq(weak.as_ptr(), self))
                .unwrap_or(false);
            if is_self {
                registry.remove(dir);
            }
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("data_dir", &self.data_dir)
            .field("closed", &self.is_closed())
            .field("config", &self.config)
            .finish()
    }
}

fn last_numeric_id(store: &DocumentStore) -> Result<u64> {
    let view = store.begin_read()?;
    let mut last = 0u64;
    for collection in Collection::ALL {
        view.scan_documents(collection, &mut |json| {
            let entity: Entity = codec::decode(json)?;
            if let Ok(n) = entity.id.parse::<u64>() {
                last = last.max(n);
            }
            Ok(true)
        })?;
    }
    Ok(last)
}

// ============================================================================
// Write Context
// ============================================================================

/// Handle to the active write transaction passed to transaction closures
///
/// Changes recorded here are published only if the transaction commits.
pub struct WriteContext<'a> {
    txn: &'a WriteTxn,
    ids: &'a dyn IdGenerator,
    changes: Vec<PendingChange>,
}

impl<'a> WriteContext<'a> {
    /// The engine transaction; also a [`StoreView`] that sees its own writes
    pub fn txn(&self) -> &'a WriteTxn {
        self.txn
    }

    /// Generate a fresh document id
    pub fn next_id(&self) -> String {
        self.ids.next_id()
    }

    /// Queue a change event for publication after commit
    pub fn record<T: Document>(&mut self, op: ChangeOp, doc: &T) -> Result<()> {
        self.changes.push(PendingChange {
            op,
            collection: T::COLLECTION,
            document: serde_json::to_value(doc)?,
        });
        Ok(())
    }

    /// Number of change events recorded so far
    pub fn recorded(&self) -> usize {
        self.changes.len()
    }
}
