//! Read primitives shared by read and write transactions
//!
//! [`StoreView`] is implemented by both [`ReadTxn`](crate::ReadTxn) (a
//! snapshot) and [`WriteTxn`](crate::WriteTxn) (sees its own uncommitted
//! writes). Implementors supply three raw table accessors; every typed read
//! and scan primitive is built on top of them.

use crate::codec;
use crate::error::StorageResultExt;
use crate::index::{index_prefix, prefix_end, value_prefix, IndexValue};
use crate::keys;
use redb::ReadableTable;
use serde::de::DeserializeOwned;
use std::ops::Bound;
use suitestore_core::{Collection, Result};

/// Callback over index entries; receives the id, returns false to stop
pub type IdVisitor<'a> = dyn FnMut(&str) -> Result<bool> + 'a;

/// Callback over documents; receives the stored JSON, returns false to stop
pub type JsonVisitor<'a> = dyn FnMut(&str) -> Result<bool> + 'a;

/// Read access to documents, aggregate rows and indexes
pub trait StoreView {
    /// Raw value of a `documents` key
    fn raw_get(&self, key: &str) -> Result<Option<String>>;

    /// Visit `indexes` entries within `(lower, upper)`, ascending or descending
    fn raw_index_scan(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        reverse: bool,
        visit: &mut IdVisitor<'_>,
    ) -> Result<()>;

    /// Visit `documents` values with keys in `[start, end)`, ascending
    fn raw_document_scan(&self, start: &str, end: &str, visit: &mut JsonVisitor<'_>) -> Result<()>;

    /// Fetch one document
    fn get<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>> {
        match self.raw_get(&keys::document_key(collection, id))? {
            Some(json) => Ok(Some(codec::decode(&json)?)),
            None => Ok(None),
        }
    }

    /// Fetch a collection's aggregate row; a missing row reads as zero
    fn get_agg<A: DeserializeOwned + Default>(&self, collection: Collection) -> Result<A> {
        match self.raw_get(&keys::agg_key(collection))? {
            Some(json) => codec::decode(&json),
            None => Ok(A::default()),
        }
    }

    /// Visit ids whose `index` value equals `value`, ids ascending
    fn scan_equal(
        &self,
        collection: Collection,
        index: &str,
        value: &IndexValue,
        visit: &mut IdVisitor<'_>,
    ) -> Result<()> {
        let prefix = value_prefix(collection, index, value);
        scan_prefix(self, &prefix, false, visit)
    }

    /// Ids whose `index` value equals `value`, ids ascending
    fn ids_equal(&self, collection: Collection, index: &str, value: &IndexValue) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        self.scan_equal(collection, index, value, &mut |id| {
            ids.push(id.to_string());
            Ok(true)
        })?;
        Ok(ids)
    }

    /// Number of documents whose `index` value equals `value`
    fn count_equal(&self, collection: Collection, index: &str, value: &IndexValue) -> Result<u64> {
        let mut count = 0u64;
        self.scan_equal(collection, index, value, &mut |_| {
            count += 1;
            Ok(true)
        })?;
        Ok(count)
    }

    /// Visit every entry of `index` in ascending value order
    fn scan_ascending(&self, collection: Collection, index: &str, visit: &mut IdVisitor<'_>) -> Result<()> {
        let prefix = index_prefix(collection, index);
        scan_prefix(self, &prefix, false, visit)
    }

    /// Visit entries of `index` in descending value order
    ///
    /// With a pivot `(value, id)` the scan starts at that exact entry,
    /// inclusive; the pivot id is visited first if it is indexed.
    fn scan_descending(
        &self,
        collection: Collection,
        index: &str,
        pivot: Option<(&IndexValue, &str)>,
        visit: &mut IdVisitor<'_>,
    ) -> Result<()> {
        let prefix = index_prefix(collection, index);
        match pivot {
            None => scan_prefix(self, &prefix, true, visit),
            Some((value, id)) => {
                let mut upper = value_prefix(collection, index, value);
                upper.extend_from_slice(id.as_bytes());
                self.raw_index_scan(
                    Bound::Included(prefix.as_slice()),
                    Bound::Included(upper.as_slice()),
                    true,
                    visit,
                )
            }
        }
    }

    /// Visit every stored document of a collection in key order
    fn scan_documents(&self, collection: Collection, visit: &mut JsonVisitor<'_>) -> Result<()> {
        let (start, end) = keys::collection_range(collection);
        self.raw_document_scan(&start, &end, visit)
    }

    /// Every stored document of a collection, deleted ones included
    fn all_documents<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let mut docs = Vec::new();
        self.scan_documents(collection, &mut |json| {
            docs.push(codec::decode(json)?);
            Ok(true)
        })?;
        Ok(docs)
    }
}

fn scan_prefix<V: StoreView + ?Sized>(
    view: &V,
    prefix: &[u8],
    reverse: bool,
    visit: &mut IdVisitor<'_>,
) -> Result<()> {
    let end = prefix_end(prefix);
    let upper = match &end {
        Some(end) => Bound::Excluded(end.as_slice()),
        None => Bound::Unbounded,
    };
    view.raw_index_scan(Bound::Included(prefix), upper, reverse, visit)
}

pub(crate) fn index_scan_table<T>(
    table: &T,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    reverse: bool,
    visit: &mut IdVisitor<'_>,
) -> Result<()>
where
    T: ReadableTable<&'static [u8], &'static str>,
{
    let range = table.range::<&[u8]>((lower, upper)).or_unknown("index range")?;
    if reverse {
        for entry in range.rev() {
            let (_, id) = entry.or_unknown("index entry")?;
            if !visit(id.value())? {
                break;
            }
        }
    } else {
        for entry in range {
            let (_, id) = entry.or_unknown("index entry")?;
            if !visit(id.value())? {
                break;
            }
        }
    }
    Ok(())
}

pub(crate) fn document_scan_table<T>(
    table: &T,
    start: &str,
    end: &str,
    visit: &mut JsonVisitor<'_>,
) -> Result<()>
where
    T: ReadableTable<&'static str, &'static str>,
{
    for entry in table.range::<&str>(start..end).or_unknown("document range")? {
        let (_, json) = entry.or_unknown("document entry")?;
        if !visit(json.value())? {
            break;
        }
    }
    Ok(())
}
