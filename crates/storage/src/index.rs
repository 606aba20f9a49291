//! Secondary indexes
//!
//! An index maps a value extracted from each document, plus the document id,
//! to the id. Entries live in the `indexes` table under
//! `{collection}\0{index}\0{encoded value}{id}`, so:
//! - an equality scan is a prefix scan over `{collection}\0{index}\0{value}`
//! - an ordered scan is a range scan over `{collection}\0{index}\0`
//! - equal values are ordered by id, ascending, byte-wise
//!
//! The value encoding is order-preserving: comparing encoded bytes gives the
//! same answer as comparing the values. Every encoding is self-delimiting, so
//! no value's encoding is a prefix of another's.
//!
//! Extractors return `None` to leave a document out of an index entirely;
//! this is how partial indexes (e.g. status of live documents only) are
//! declared.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use suitestore_core::{Collection, Document, Timestamp};

const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_STR: u8 = 0x03;

/// A comparable value extracted from a document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexValue {
    /// Flag
    Bool(bool),
    /// Integer or timestamp
    Int(i64),
    /// Text
    Str(String),
}

impl IndexValue {
    /// Append the order-preserving encoding of this value to `buf`
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            IndexValue::Bool(b) => {
                buf.push(TAG_BOOL);
                buf.push(u8::from(*b));
            }
            IndexValue::Int(v) => {
                buf.push(TAG_INT);
                // Flipping the sign bit makes two's complement sort as unsigned
                let biased = (*v as u64) ^ (1 << 63);
                let mut word = [0u8; 8];
                BigEndian::write_u64(&mut word, biased);
                buf.extend_from_slice(&word);
            }
            IndexValue::Str(s) => {
                buf.push(TAG_STR);
                for &byte in s.as_bytes() {
                    buf.push(byte);
                    if byte == 0x00 {
                        buf.push(0xFF);
                    }
                }
                buf.extend_from_slice(&[0x00, 0x00]);
            }
        }
    }

    /// Order-preserving encoding of this value
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        self.encode_into(&mut buf);
        buf
    }
}

impl From<bool> for IndexValue {
    fn from(v: bool) -> Self {
        IndexValue::Bool(v)
    }
}

impl From<i64> for IndexValue {
    fn from(v: i64) -> Self {
        IndexValue::Int(v)
    }
}

impl From<Timestamp> for IndexValue {
    fn from(ts: Timestamp) -> Self {
        IndexValue::Int(ts.as_millis())
    }
}

impl From<&str> for IndexValue {
    fn from(v: &str) -> Self {
        IndexValue::Str(v.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(v: String) -> Self {
        IndexValue::Str(v)
    }
}

/// Prefix shared by every entry of one index
pub fn index_prefix(collection: Collection, index: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(collection.as_str().len() + index.len() + 2);
    key.extend_from_slice(collection.as_str().as_bytes());
    key.push(0x00);
    key.extend_from_slice(index.as_bytes());
    key.push(0x00);
    key
}

/// Prefix shared by every entry of one index whose value equals `value`
pub fn value_prefix(collection: Collection, index: &str, value: &IndexValue) -> Vec<u8> {
    let mut key = index_prefix(collection, index);
    value.encode_into(&mut key);
    key
}

/// Full key of one index entry
pub fn entry_key(collection: Collection, index: &str, value: &IndexValue, id: &str) -> Vec<u8> {
    let mut key = value_prefix(collection, index, value);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Prefix shared by every index entry of a collection
pub fn collection_prefix(collection: Collection) -> Vec<u8> {
    let mut key = collection.as_str().as_bytes().to_vec();
    key.push(0x00);
    key
}

/// Smallest key greater than every key starting with `prefix`
///
/// Returns `None` when no such key exists (the prefix is all `0xFF`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Extraction function for one index
pub type Extractor<T> = fn(&T) -> Option<IndexValue>;

/// Named index definition over documents of type `T`
pub struct IndexDef<T> {
    name: &'static str,
    extract: Extractor<T>,
}

impl<T> IndexDef<T> {
    /// Define an index
    pub const fn new(name: &'static str, extract: Extractor<T>) -> Self {
        Self { name, extract }
    }

    /// Index name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Value this index holds for `doc`, if any
    pub fn extract(&self, doc: &T) -> Option<IndexValue> {
        (self.extract)(doc)
    }
}

impl<T> Clone for IndexDef<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            extract: self.extract,
        }
    }
}

impl<T> fmt::Debug for IndexDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDef").field("name", &self.name).finish()
    }
}

/// All index definitions registered for one collection
pub struct IndexSet<T> {
    defs: Vec<IndexDef<T>>,
}

impl<T: Document> IndexSet<T> {
    /// Empty set
    pub fn new() -> Self {
        Self { defs: Vec::new() }
    }

    /// Collection the indexed documents live in
    pub fn collection(&self) -> Collection {
        T::COLLECTION
    }

    /// Add a definition, replacing any previous one with the same name
    pub fn with(mut self, def: IndexDef<T>) -> Self {
        self.insert(def);
        self
    }

    /// Add a definition, replacing any previous one with the same name
    pub fn insert(&mut self, def: IndexDef<T>) {
        match self.defs.iter_mut().find(|d| d.name == def.name) {
            Some(existing) => *existing = def,
            None => self.defs.push(def),
        }
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Option<&IndexDef<T>> {
        self.defs.iter().find(|d| d.name == name)
    }

    /// Check whether an index is defined
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All definitions, in registration order
    pub fn iter(&self) -> impl Iterator<Item = &IndexDef<T>> {
        self.defs.iter()
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Check whether no index is defined
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Entry keys `doc` contributes, one per index it is included in
    pub fn entries(&self, doc: &T) -> Vec<Vec<u8>> {
        self.defs
            .iter()
            .filter_map(|def| {
                def.extract(doc)
                    .map(|value| entry_key(T::COLLECTION, def.name, &value, doc.id()))
            })
            .collect()
    }
}

impl<T: Document> Default for IndexSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for IndexSet<T> {
    fn clone(&self) -> Self {
        Self {
            defs: self.defs.clone(),
        }
    }
}

impl<T> fmt::Debug for IndexSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.defs.iter()).finish()
    }
}
