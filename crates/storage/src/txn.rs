//! Read and write transactions
//!
//! A [`WriteTxn`] is the only way to change stored data. Writing a document
//! through [`WriteTxn::put`] keeps every registered index in step: the
//! previous version's entries are removed and the new version's entries
//! inserted in the same engine transaction. Nothing is visible to readers
//! until [`WriteTxn::commit`].

use crate::codec;
use crate::error::StorageResultExt;
use crate::index::{collection_prefix, prefix_end, IndexSet};
use crate::keys::{self, DOCUMENTS, INDEXES};
use crate::view::{document_scan_table, index_scan_table, IdVisitor, JsonVisitor, StoreView};
use redb::ReadableTable;
use serde::Serialize;
use std::ops::Bound;
use suitestore_core::{Collection, Document, Result};
use tracing::debug;

/// Read-only snapshot taken when the transaction began
pub struct ReadTxn {
    inner: redb::ReadTransaction,
}

impl ReadTxn {
    pub(crate) fn new(inner: redb::ReadTransaction) -> Self {
        Self { inner }
    }
}

impl StoreView for ReadTxn {
    fn raw_get(&self, key: &str) -> Result<Option<String>> {
        let table = self.inner.open_table(DOCUMENTS).or_unknown("open documents")?;
        let value = table.get(key).or_unknown("read document")?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn raw_index_scan(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        reverse: bool,
        visit: &mut IdVisitor<'_>,
    ) -> Result<()> {
        let table = self.inner.open_table(INDEXES).or_unknown("open indexes")?;
        index_scan_table(&table, lower, upper, reverse, visit)
    }

    fn raw_document_scan(&self, start: &str, end: &str, visit: &mut JsonVisitor<'_>) -> Result<()> {
        let table = self.inner.open_table(DOCUMENTS).or_unknown("open documents")?;
        document_scan_table(&table, start, end, visit)
    }
}

/// The single active write transaction
///
/// Dropping a `WriteTxn` without committing discards every change.
pub struct WriteTxn {
    inner: redb::WriteTransaction,
}

impl WriteTxn {
    pub(crate) fn new(inner: redb::WriteTransaction) -> Self {
        Self { inner }
    }

    /// Write a document and update its index entries
    ///
    /// Returns the previously stored version, if any.
    pub fn put<T: Document>(&self, indexes: &IndexSet<T>, doc: &T) -> Result<Option<T>> {
        let collection = T::COLLECTION;
        let json = codec::encode(doc)?;
        let previous: Option<T> = {
            let mut table = self.inner.open_table(DOCUMENTS).or_unknown("open documents")?;
            let old = table
                .insert(keys::document_key(collection, doc.id()).as_str(), json.as_str())
                .or_unknown("write document")?;
            match old {
                Some(old) => Some(codec::decode(old.value())?),
                None => None,
            }
        };

        let old_entries = previous
            .as_ref()
            .map(|p| indexes.entries(p))
            .unwrap_or_default();
        let new_entries = indexes.entries(doc);

        let mut table = self.inner.open_table(INDEXES).or_unknown("open indexes")?;
        for key in old_entries.iter().filter(|k| !new_entries.contains(k)) {
            table.remove(key.as_slice()).or_unknown("remove index entry")?;
        }
        for key in new_entries.iter().filter(|k| !old_entries.contains(k)) {
            table
                .insert(key.as_slice(), doc.id())
                .or_unknown("write index entry")?;
        }
        Ok(previous)
    }

    /// Overwrite a collection's aggregate row
    pub fn put_agg<A: Serialize>(&self, collection: Collection, agg: &A) -> Result<()> {
        let json = codec::encode(agg)?;
        let mut table = self.inner.open_table(DOCUMENTS).or_unknown("open documents")?;
        table
            .insert(keys::agg_key(collection).as_str(), json.as_str())
            .or_unknown("write aggregate")?;
        Ok(())
    }

    /// Drop every index entry of the collection and re-derive them from the
    /// stored documents using `indexes`
    ///
    /// Returns the number of documents indexed.
    pub fn rebuild_indexes<T: Document>(&self, indexes: &IndexSet<T>) -> Result<usize> {
        let collection = T::COLLECTION;
        let prefix = collection_prefix(collection);
        let end = prefix_end(&prefix);

        let mut stale = Vec::new();
        {
            let table = self.inner.open_table(INDEXES).or_unknown("open indexes")?;
            let upper = match &end {
                Some(end) => Bound::Excluded(end.as_slice()),
                None => Bound::Unbounded,
            };
            let range = table
                .range::<&[u8]>((Bound::Included(prefix.as_slice()), upper))
                .or_unknown("index range")?;
            for entry in range {
                let (key, _) = entry.or_unknown("index entry")?;
                stale.push(key.value().to_vec());
            }
        }

        let docs: Vec<T> = self.all_documents(collection)?;
        let mut table = self.inner.open_table(INDEXES).or_unknown("open indexes")?;
        for key in &stale {
            table.remove(key.as_slice()).or_unknown("remove index entry")?;
        }
        for doc in &docs {
            for key in indexes.entries(doc) {
                table
                    .insert(key.as_slice(), doc.id())
                    .or_unknown("write index entry")?;
            }
        }

        debug!(
            target: "suitestore::index",
            collection = %collection,
            indexes = indexes.len(),
            removed = stale.len(),
            documents = docs.len(),
            "Rebuilt indexes"
        );
        Ok(docs.len())
    }

    /// Make every change durable and visible
    pub fn commit(self) -> Result<()> {
        self.inner.commit().or_unknown("commit")
    }

    /// Discard every change
    pub fn abort(self) -> Result<()> {
        self.inner.abort().or_unknown("abort")
    }
}

impl StoreView for WriteTxn {
    fn raw_get(&self, key: &str) -> Result<Option<String>> {
        let table = self.inner.open_table(DOCUMENTS).or_unknown("open documents")?;
        let value = table.get(key).or_unknown("read document")?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn raw_index_scan(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        reverse: bool,
        visit: &mut IdVisitor<'_>,
    ) -> Result<()> {
        let table = self.inner.open_table(INDEXES).or_unknown("open indexes")?;
        index_scan_table(&table, lower, upper, reverse, visit)
    }

    fn raw_document_scan(&self, start: &str, end: &str, visit: &mut JsonVisitor<'_>) -> Result<()> {
        let table = self.inner.open_table(DOCUMENTS).or_unknown("open documents")?;
        document_scan_table(&table, start, end, visit)
    }
}
