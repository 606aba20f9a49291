//! Query and pagination
//!
//! Pages are descending scans over a collection's ordering index:
//! - without a cursor the scan starts at the largest ordering value
//! - with a cursor it resumes at the cursor document's stored ordering value
//!   (deleted documents keep theirs), inclusive, skipping the cursor itself
//!
//! `next_id` names the last document returned and is only set when at
//! least one more qualifying document exists. Passing it back as the cursor
//! yields the next page.
//!
//! All functions read through a [`StoreView`], so a page and any counts read
//! alongside it come from the same snapshot.

use serde::{Deserialize, Serialize};
use suitestore_core::{Document, Error, Result};
use suitestore_storage::{IndexDef, StoreView};

/// One page of documents, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Documents in descending ordering-value order
    pub items: Vec<T>,
    /// Cursor for the next page; absent on the last page
    pub next_id: Option<String>,
}

impl<T> Page<T> {
    /// True if no more pages follow
    pub fn is_last(&self) -> bool {
        self.next_id.is_none()
    }
}

/// Read one page through `order`
pub fn page<T, V>(
    view: &V,
    order: &IndexDef<T>,
    from_id: Option<&str>,
    limit: usize,
    include_deleted: bool,
) -> Result<Page<T>>
where
    T: Document,
    V: StoreView,
{
    if limit == 0 {
        return Err(Error::invalid_model("page limit must be positive"));
    }
    let collection = T::COLLECTION;

    let pivot = match from_id {
        Some(id) => {
            let cursor: T = view
                .get(collection, id)?
                .ok_or_else(|| Error::not_found(format!("{}:{}", collection, id)))?;
            let value = order.extract(&cursor).ok_or_else(|| {
                Error::internal(format!(
                    "cursor {}:{} has no '{}' value",
                    collection,
                    id,
                    order.name()
                ))
            })?;
            Some((value, id))
        }
        None => None,
    };

    let mut items: Vec<T> = Vec::with_capacity(limit.min(256));
    let mut next_id = None;
    view.scan_descending(
        collection,
        order.name(),
        pivot.as_ref().map(|(value, id)| (value, *id)),
        &mut |id| {
            if from_id == Some(id) {
                return Ok(true);
            }
            let doc: T = load(view, id)?;
            if doc.is_deleted() && !include_deleted {
                return Ok(true);
            }
            if items.len() == limit {
                next_id = items.last().map(|last| last.id().to_string());
                return Ok(false);
            }
            items.push(doc);
            Ok(true)
        },
    )?;

    Ok(Page { items, next_id })
}

/// Unindexed substring match over id and search text, in key order
///
/// Visits every document of the collection.
pub fn fuzzy_find<T, V>(view: &V, needle: &str, include_deleted: bool) -> Result<Vec<T>>
where
    T: Document,
    V: StoreView,
{
    let mut found = Vec::new();
    view.scan_documents(T::COLLECTION, &mut |json| {
        let doc: T = serde_json::from_str(json)?;
        if (include_deleted || !doc.is_deleted())
            && (doc.id().contains(needle) || doc.search_text().contains(needle))
        {
            found.push(doc);
        }
        Ok(true)
    })?;
    Ok(found)
}

/// Documents whose `index` value equals `value`, ids ascending
pub fn find_equal<T, V>(
    view: &V,
    index: &IndexDef<T>,
    value: &suitestore_storage::IndexValue,
    include_deleted: bool,
) -> Result<Vec<T>>
where
    T: Document,
    V: StoreView,
{
    let mut found = Vec::new();
    view.scan_equal(T::COLLECTION, index.name(), value, &mut |id| {
        let doc: T = load(view, id)?;
        if include_deleted || !doc.is_deleted() {
            found.push(doc);
        }
        Ok(true)
    })?;
    Ok(found)
}

fn load<T: Document, V: StoreView>(view: &V, id: &str) -> Result<T> {
    view.get(T::COLLECTION, id)?.ok_or_else(|| {
        Error::internal(format!(
            "index entry points at missing document {}:{}",
            T::COLLECTION,
            id
        ))
    })
}
