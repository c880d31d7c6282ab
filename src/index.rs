//! Ordered persistent per-column index.
//!
//! An [`Index`] maps column values to the rids of rows holding them, kept
//! in key order under the column's comparison (NULL first, numerics
//! signed, strings by byte order, booleans false < true). The whole index
//! is loaded into an ordered set on open and the file is rewritten on
//! flush; between flushes every heap mutation updates the set, so the
//! index never disagrees with the heap within a session.
//!
//! Equality probes are lower-bound walks: the executor starts at
//! `lower_bound(key)` and stops at the first entry whose key differs.

mod error;

pub use error::IndexError;

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};

use crate::datum::{Type, Value};
use crate::heap::Rid;

const INDEX_MAGIC: u32 = 0x5348_4958; // "SHIX"

/// An index key: a column value under the total index ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexKey(pub Value);

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.index_cmp(&other.0)
    }
}

/// One `(key, rid)` index entry, ordered by key then rid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexEntry {
    /// Key value.
    pub key: IndexKey,
    /// Rid of the row holding the key.
    pub rid: Rid,
}

/// A persistent ordered index over one column.
pub struct Index {
    path: PathBuf,
    key_type: Type,
    entries: BTreeSet<IndexEntry>,
    dirty: bool,
}

impl Index {
    /// Creates a fresh, empty index file.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Io` when the file cannot be written.
    pub fn create(path: impl Into<PathBuf>, key_type: Type) -> Result<Self, IndexError> {
        let mut index = Self {
            path: path.into(),
            key_type,
            entries: BTreeSet::new(),
            dirty: true,
        };
        index.flush()?;
        Ok(index)
    }

    /// Opens an existing index file, loading every entry.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Corrupted` for malformed files.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let path = path.into();
        let data = fs::read(&path)?;
        let mut buf = &data[..];

        if buf.remaining() < 11 {
            return Err(IndexError::Corrupted("truncated header".to_string()));
        }
        let magic = buf.get_u32_le();
        if magic != INDEX_MAGIC {
            return Err(IndexError::Corrupted(format!("bad magic {:#x}", magic)));
        }
        let tag = buf.get_u8();
        let capacity = buf.get_u16_le();
        let key_type = Type::from_tag(tag, capacity)
            .ok_or_else(|| IndexError::Corrupted(format!("unknown key type tag {}", tag)))?;
        let count = buf.get_u32_le() as usize;

        let mut entries = BTreeSet::new();
        for _ in 0..count {
            if buf.remaining() < 1 {
                return Err(IndexError::Corrupted("truncated entry".to_string()));
            }
            let is_null = buf.get_u8() != 0;
            let key = if is_null {
                Value::Null
            } else {
                let (value, consumed) = Value::deserialize(buf, key_type)?;
                buf.advance(consumed);
                value
            };
            if buf.remaining() < 8 {
                return Err(IndexError::Corrupted("truncated rid".to_string()));
            }
            let rid = Rid::from_u64(buf.get_u64_le());
            entries.insert(IndexEntry {
                key: IndexKey(key),
                rid,
            });
        }

        Ok(Self {
            path,
            key_type,
            entries,
            dirty: false,
        })
    }

    /// Returns the path of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the declared key type.
    pub fn key_type(&self) -> Type {
        self.key_type
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts an entry. Duplicate `(key, rid)` pairs collapse.
    pub fn insert(&mut self, key: Value, rid: Rid) {
        self.entries.insert(IndexEntry {
            key: IndexKey(key),
            rid,
        });
        self.dirty = true;
    }

    /// Removes an entry. Returns false if it was absent.
    pub fn remove(&mut self, key: &Value, rid: Rid) -> bool {
        let removed = self.entries.remove(&IndexEntry {
            key: IndexKey(key.clone()),
            rid,
        });
        self.dirty |= removed;
        removed
    }

    /// Iterates entries in key order starting at the first entry whose key
    /// is `>= key`.
    pub fn lower_bound<'a>(&'a self, key: &Value) -> impl Iterator<Item = &'a IndexEntry> + 'a {
        let from = IndexEntry {
            key: IndexKey(key.clone()),
            rid: Rid::MIN,
        };
        self.entries.range(from..)
    }

    /// Iterates every entry in key order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Returns true if any entry carries exactly `key`.
    pub fn contains_key(&self, key: &Value) -> bool {
        self.lower_bound(key)
            .next()
            .is_some_and(|e| e.key.0 == *key)
    }

    /// Rewrites the index file if anything changed since the last flush.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Io` when the file cannot be written.
    pub fn flush(&mut self) -> Result<(), IndexError> {
        if !self.dirty {
            return Ok(());
        }

        let mut buf = BytesMut::new();
        buf.put_u32_le(INDEX_MAGIC);
        buf.put_u8(self.key_type.tag());
        buf.put_u16_le(self.key_type.capacity().unwrap_or(0));
        buf.put_u32_le(self.entries.len() as u32);
        for entry in &self.entries {
            if entry.key.0.is_null() {
                buf.put_u8(1);
            } else {
                buf.put_u8(0);
                let mut value_buf = vec![0u8; entry.key.0.serialized_size()];
                entry.key.0.serialize(&mut value_buf)?;
                buf.put_slice(&value_buf);
            }
            buf.put_u64_le(entry.rid.to_u64());
        }

        fs::write(&self.path, &buf)?;
        self.dirty = false;
        Ok(())
    }

    /// Flushes and removes the index file.
    pub fn drop_file(self) -> Result<(), IndexError> {
        fs::remove_file(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(n: u32) -> Rid {
        Rid { page: n, slot: 0 }
    }

    #[test]
    fn test_ordered_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = Index::create(dir.path().join("t.a.tindex"), Type::Int).unwrap();
        for (i, key) in [30i64, 10, 20, 10].into_iter().enumerate() {
            index.insert(Value::Int(key), rid(i as u32));
        }
        let keys: Vec<i64> = index
            .iter()
            .map(|e| match e.key.0 {
                Value::Int(n) => n,
                _ => panic!("wrong key type"),
            })
            .collect();
        assert_eq!(keys, vec![10, 10, 20, 30]);
    }

    #[test]
    fn test_lower_bound_probe() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = Index::create(dir.path().join("t.a.tindex"), Type::Int).unwrap();
        for i in 0..10i64 {
            index.insert(Value::Int(i * 2), rid(i as u32));
        }
        // Exact hit
        let hits: Vec<_> = index
            .lower_bound(&Value::Int(6))
            .take_while(|e| e.key.0 == Value::Int(6))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rid, rid(3));
        // Missing key: walk starts at the next larger key, probe sees a
        // mismatch immediately
        let first = index.lower_bound(&Value::Int(7)).next().unwrap();
        assert_eq!(first.key.0, Value::Int(8));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = Index::create(dir.path().join("t.a.tindex"), Type::Int).unwrap();
        index.insert(Value::Int(1), rid(0));
        index.insert(Value::Int(1), rid(1));
        assert!(index.remove(&Value::Int(1), rid(0)));
        assert!(!index.remove(&Value::Int(1), rid(0)));
        assert_eq!(index.len(), 1);
        assert!(index.contains_key(&Value::Int(1)));
    }

    #[test]
    fn test_flush_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.s.tindex");
        {
            let mut index = Index::create(&path, Type::Varchar(8)).unwrap();
            index.insert(Value::Str("b".into()), rid(0));
            index.insert(Value::Str("a".into()), rid(1));
            index.insert(Value::Null, rid(2));
            index.flush().unwrap();
        }
        let index = Index::open(&path).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.key_type(), Type::Varchar(8));
        let first = index.iter().next().unwrap();
        assert!(first.key.0.is_null()); // NULL sorts first
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tindex");
        std::fs::write(&path, b"not an index").unwrap();
        assert!(matches!(Index::open(&path), Err(IndexError::Corrupted(_))));
    }
}
