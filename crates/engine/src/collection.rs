//! Typed collection handles
//!
//! A [`DocumentCollection`] binds a document type to its schema (ordering
//! index plus secondary indexes) and runs every operation through the
//! database's transaction API. Each mutating operation:
//!
//! 1. reads the current document inside the write transaction
//! 2. validates and stamps the new version
//! 3. writes the document and moves its index entries
//! 4. updates the collection aggregate and bumps its version
//! 5. records the change event
//!
//! all in one transaction. The `*_in` variants take a [`WriteContext`] so
//! several operations can share a transaction.

use crate::database::{Database, WriteContext};
use crate::feed::ChangeOp;
use crate::query::{self, Page};
use crate::versioning;
use std::sync::Arc;
use suitestore_core::{Aggregate, Document, Error, Patch, Result, Timestamp};
use suitestore_storage::{IndexDef, IndexSet, IndexValue, ReadTxn, StoreView};
use tracing::debug;

/// Name of the index every collection carries on the soft-delete flag
pub const DELETED_INDEX: &str = "deleted";

fn deleted_flag<T: Document>(doc: &T) -> Option<IndexValue> {
    Some(IndexValue::Bool(doc.is_deleted()))
}

// ============================================================================
// Schema
// ============================================================================

/// Index layout of one collection
#[derive(Debug, Clone)]
pub struct CollectionSchema<T> {
    order: &'static str,
    indexes: IndexSet<T>,
}

impl<T: Document> CollectionSchema<T> {
    /// Schema paged through `order`, plus the soft-delete index
    pub fn new(order: IndexDef<T>) -> Self {
        let name = order.name();
        let indexes = IndexSet::new()
            .with(IndexDef::new(DELETED_INDEX, deleted_flag::<T>))
            .with(order);
        Self {
            order: name,
            indexes,
        }
    }

    /// Add a secondary index
    pub fn with_index(mut self, def: IndexDef<T>) -> Self {
        self.indexes.insert(def);
        self
    }

    /// The ordering index used by pagination
    pub fn order(&self) -> Result<&IndexDef<T>> {
        self.index(self.order)
    }

    /// All indexes, including the ordering and soft-delete indexes
    pub fn indexes(&self) -> &IndexSet<T> {
        &self.indexes
    }

    /// Look up an index by name
    pub fn index(&self, name: &str) -> Result<&IndexDef<T>> {
        self.indexes.get(name).ok_or_else(|| {
            Error::invalid_model(format!("no index '{}' on {}", name, T::COLLECTION))
        })
    }
}

// ============================================================================
// Collection Handle
// ============================================================================

/// Handle to one registered collection
pub struct DocumentCollection<T> {
    db: Arc<Database>,
    schema: Arc<CollectionSchema<T>>,
}

impl<T> Clone for DocumentCollection<T> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            schema: Arc::clone(&self.schema),
        }
    }
}

impl<T: Document> std::fmt::Debug for DocumentCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCollection")
            .field("order", &self.schema.order)
            .field("indexes", &self.schema.indexes.len())
            .finish()
    }
}

impl<T: Document> DocumentCollection<T> {
    pub(crate) fn new(db: Arc<Database>, schema: Arc<CollectionSchema<T>>) -> Self {
        Self { db, schema }
    }

    /// The database this collection lives in
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// The collection's schema
    pub fn schema(&self) -> &CollectionSchema<T> {
        &self.schema
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Insert a new document, returning it with its assigned id and version
    ///
    /// Any id or version on `doc` is replaced. Fails with `InvalidModel` if
    /// validation fails.
    pub fn insert(&self, doc: T) -> Result<T> {
        self.db.transaction(|ctx| self.insert_in(ctx, doc))
    }

    /// [`insert`](Self::insert) inside an existing transaction
    pub fn insert_in(&self, ctx: &mut WriteContext<'_>, mut doc: T) -> Result<T> {
        doc.validate()?;
        let id = ctx.next_id();
        if ctx.txn().get::<T>(T::COLLECTION, &id)?.is_some() {
            return Err(Error::internal(format!(
                "generated id {}:{} is already in use",
                T::COLLECTION,
                id
            )));
        }
        versioning::stamp_insert(&mut doc, id)?;
        self.write(ctx, None, &doc, ChangeOp::Insert)?;
        Ok(doc)
    }

    /// Apply a partial update, returning the stored document
    ///
    /// Fails with `InvalidModel` for an empty patch or if the result does
    /// not validate, and with `NotFound` for an unknown id.
    pub fn set(&self, id: &str, patch: T::Patch) -> Result<T> {
        self.db.transaction(|ctx| self.set_in(ctx, id, patch))
    }

    /// [`set`](Self::set) inside an existing transaction
    pub fn set_in(&self, ctx: &mut WriteContext<'_>, id: &str, patch: T::Patch) -> Result<T> {
        if patch.is_empty() {
            return Err(Error::invalid_model(format!(
                "empty update for {}:{}",
                T::COLLECTION,
                id
            )));
        }
        self.update_in(ctx, id, |doc| {
            patch.apply_to(doc);
            Ok(())
        })
    }

    /// Mutate a document with `f`, returning the stored document
    ///
    /// The mutation is validated and counted as one version. `f` may not
    /// touch the base fields (id, version, deletion markers).
    pub fn update<F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        self.db.transaction(|ctx| self.update_in(ctx, id, f))
    }

    /// [`update`](Self::update) inside an existing transaction
    pub fn update_in<F>(&self, ctx: &mut WriteContext<'_>, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let previous = self.get_in(ctx, id)?;
        let mut doc = previous.clone();
        f(&mut doc)?;
        doc.validate()?;
        if doc.entity() != previous.entity() {
            return Err(Error::invalid_model(format!(
                "base fields of {}:{} cannot change",
                T::COLLECTION,
                id
            )));
        }
        versioning::stamp_update(&mut doc);
        self.write(ctx, Some(&previous), &doc, ChangeOp::Update)?;
        Ok(doc)
    }

    /// Soft-delete a document
    ///
    /// Returns false if it was already deleted, in which case nothing is
    /// written and no event is published.
    pub fn delete(&self, id: &str, at: Timestamp) -> Result<bool> {
        self.db.transaction(|ctx| self.delete_in(ctx, id, at))
    }

    /// [`delete`](Self::delete) inside an existing transaction
    pub fn delete_in(&self, ctx: &mut WriteContext<'_>, id: &str, at: Timestamp) -> Result<bool> {
        let previous = self.get_in(ctx, id)?;
        let mut doc = previous.clone();
        if !versioning::mark_deleted(&mut doc, at) {
            return Ok(false);
        }
        self.write(ctx, Some(&previous), &doc, ChangeOp::Update)?;
        Ok(true)
    }

    /// Soft-delete every live document in one transaction
    ///
    /// Returns the number of documents deleted. One event is published per
    /// deleted document.
    pub fn delete_all(&self, at: Timestamp) -> Result<usize> {
        self.db.transaction(|ctx| {
            let ids = ctx.txn().ids_equal(
                T::COLLECTION,
                DELETED_INDEX,
                &IndexValue::Bool(false),
            )?;
            let mut deleted = 0;
            for id in &ids {
                if self.delete_in(ctx, id, at)? {
                    deleted += 1;
                }
            }
            debug!(target: "suitestore::db", collection = %T::COLLECTION, deleted, "Deleted all");
            Ok(deleted)
        })
    }

    fn write(
        &self,
        ctx: &mut WriteContext<'_>,
        previous: Option<&T>,
        doc: &T,
        op: ChangeOp,
    ) -> Result<()> {
        let txn = ctx.txn();
        txn.put(self.schema.indexes(), doc)?;

        let mut agg: T::Agg = txn.get_agg(T::COLLECTION)?;
        if let Some(previous) = previous {
            agg.account(previous, -1);
        }
        agg.account(doc, 1);
        agg.set_version(agg.version() + 1);
        txn.put_agg(T::COLLECTION, &agg)?;

        ctx.record(op, doc)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Fetch one document by id, deleted or not
    pub fn get(&self, id: &str) -> Result<T> {
        self.db.read(|view| fetch(view, id))
    }

    /// [`get`](Self::get) inside an existing transaction
    pub fn get_in(&self, ctx: &WriteContext<'_>, id: &str) -> Result<T> {
        fetch(ctx.txn(), id)
    }

    /// One page in descending order of the ordering index
    pub fn page(&self, from_id: Option<&str>, limit: usize, include_deleted: bool) -> Result<Page<T>> {
        self.db.read(|view| self.page_in(view, from_id, limit, include_deleted))
    }

    /// [`page`](Self::page) against an existing snapshot
    pub fn page_in<V: StoreView>(
        &self,
        view: &V,
        from_id: Option<&str>,
        limit: usize,
        include_deleted: bool,
    ) -> Result<Page<T>> {
        query::page(view, self.schema.order()?, from_id, limit, include_deleted)
    }

    /// Substring match over id and search text
    pub fn fuzzy_find(&self, needle: &str, include_deleted: bool) -> Result<Vec<T>> {
        self.db
            .read(|view| query::fuzzy_find(view, needle, include_deleted))
    }

    /// Every document, live ones first, ids ascending within each group
    pub fn find_all(&self, include_deleted: bool) -> Result<Vec<T>> {
        let deleted = self.schema.index(DELETED_INDEX)?;
        self.db.read(|view| {
            let mut all = query::find_equal(view, deleted, &IndexValue::Bool(false), true)?;
            if include_deleted {
                all.extend(query::find_equal(view, deleted, &IndexValue::Bool(true), true)?);
            }
            Ok(all)
        })
    }

    /// Documents whose `index` value equals `value`, ids ascending
    pub fn find_by(&self, index: &str, value: impl Into<IndexValue>, include_deleted: bool) -> Result<Vec<T>> {
        let def = self.schema.index(index)?;
        let value = value.into();
        self.db
            .read(|view| query::find_equal(view, def, &value, include_deleted))
    }

    /// Number of index entries equal to `value`
    pub fn count_by(&self, index: &str, value: impl Into<IndexValue>) -> Result<u64> {
        let value = value.into();
        self.db.read(|view| self.count_in(view, index, &value))
    }

    /// [`count_by`](Self::count_by) against an existing snapshot
    pub fn count_in<V: StoreView>(&self, view: &V, index: &str, value: &IndexValue) -> Result<u64> {
        let def = self.schema.index(index)?;
        view.count_equal(T::COLLECTION, def.name(), value)
    }

    /// Current aggregate counters
    pub fn aggregate(&self) -> Result<T::Agg> {
        self.db.read(|view| self.aggregate_in(view))
    }

    /// [`aggregate`](Self::aggregate) against an existing snapshot
    pub fn aggregate_in<V: StoreView>(&self, view: &V) -> Result<T::Agg> {
        view.get_agg(T::COLLECTION)
    }

    /// Run `f` against one read snapshot
    pub fn read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&ReadTxn) -> Result<R>,
    {
        self.db.read(f)
    }
}

fn fetch<T: Document, V: StoreView>(view: &V, id: &str) -> Result<T> {
    view.get(T::COLLECTION, id)?
        .ok_or_else(|| Error::not_found(format!("{}:{}", T::COLLECTION, id)))
}
