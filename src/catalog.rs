//! Persistent database descriptor.
//!
//! The `<db>.database` file records the database name and the ordered list
//! of its tables. It is read on `USE`, rewritten after every structural
//! mutation, and rewritten again on close. Dropping a table shifts the
//! tail of the list to close the gap, preserving creation order for the
//! survivors.
//!
//! The on-disk form is a length-prefixed blob rather than the bounded
//! fixed-layout struct it replaces; the identifier and table-count bounds
//! are still enforced on every mutation.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};

/// Longest permitted identifier (databases, tables, columns).
pub const MAX_NAME_LEN: usize = 64;

/// Most tables one database may hold.
pub const MAX_TABLE_NUM: usize = 64;

const CATALOG_MAGIC: u32 = 0x5348_4442; // "SHDB"

/// Errors from catalog operations.
#[derive(Debug)]
pub enum CatalogError {
    /// Underlying file I/O failure.
    Io(std::io::Error),
    /// The catalog file is structurally invalid.
    Corrupted(String),
    /// Identifier exceeds [`MAX_NAME_LEN`].
    NameTooLong {
        /// Offending identifier.
        name: String,
    },
    /// The database already holds [`MAX_TABLE_NUM`] tables.
    TooManyTables,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "catalog I/O error: {}", e),
            CatalogError::Corrupted(msg) => write!(f, "catalog corrupted: {}", msg),
            CatalogError::NameTooLong { name } => {
                write!(f, "identifier `{}` is too long", name)
            }
            CatalogError::TooManyTables => {
                write!(f, "too many tables (limit {})", MAX_TABLE_NUM)
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e)
    }
}

/// Returns the catalog file path for a database.
pub fn catalog_path(dir: &Path, db: &str) -> PathBuf {
    dir.join(format!("{}.database", db))
}

/// The in-memory catalog: database name plus ordered table names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Database name.
    pub db_name: String,
    /// Table names in creation order.
    pub table_names: Vec<String>,
}

impl Catalog {
    /// Creates an empty catalog for a fresh database.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NameTooLong` for over-long database names.
    pub fn new(db_name: &str) -> Result<Self, CatalogError> {
        check_name(db_name)?;
        Ok(Self {
            db_name: db_name.to_string(),
            table_names: Vec::new(),
        })
    }

    /// Loads the catalog from its file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` when the file is missing and
    /// `CatalogError::Corrupted` for malformed content.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = fs::read(path)?;
        let mut buf = &data[..];

        if buf.remaining() < 4 {
            return Err(CatalogError::Corrupted("truncated header".to_string()));
        }
        let magic = buf.get_u32_le();
        if magic != CATALOG_MAGIC {
            return Err(CatalogError::Corrupted(format!("bad magic {:#x}", magic)));
        }

        let db_name = get_name(&mut buf)?;
        if buf.remaining() < 4 {
            return Err(CatalogError::Corrupted("truncated table count".to_string()));
        }
        let count = buf.get_u32_le() as usize;
        if count > MAX_TABLE_NUM {
            return Err(CatalogError::Corrupted(format!(
                "table count {} exceeds limit {}",
                count, MAX_TABLE_NUM
            )));
        }

        let mut table_names = Vec::with_capacity(count);
        for _ in 0..count {
            table_names.push(get_name(&mut buf)?);
        }

        Ok(Self {
            db_name,
            table_names,
        })
    }

    /// Writes the catalog to its file, replacing any previous content.
    pub fn store(&self, path: &Path) -> Result<(), CatalogError> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(CATALOG_MAGIC);
        put_name(&mut buf, &self.db_name)?;
        buf.put_u32_le(self.table_names.len() as u32);
        for name in &self.table_names {
            put_name(&mut buf, name)?;
        }
        fs::write(path, &buf)?;
        Ok(())
    }

    /// Returns the position of a table, if present.
    pub fn table_id(&self, name: &str) -> Option<usize> {
        self.table_names.iter().position(|n| n == name)
    }

    /// Returns true when the catalog lists `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.table_id(name).is_some()
    }

    /// Appends a table name.
    ///
    /// # Errors
    ///
    /// Fails when the name is over-long or the table limit is reached.
    /// Duplicates are the caller's responsibility.
    pub fn add_table(&mut self, name: &str) -> Result<(), CatalogError> {
        check_name(name)?;
        if self.table_names.len() >= MAX_TABLE_NUM {
            return Err(CatalogError::TooManyTables);
        }
        self.table_names.push(name.to_string());
        Ok(())
    }

    /// Removes a table name, shifting the tail up. Returns its old id.
    pub fn remove_table(&mut self, name: &str) -> Option<usize> {
        let id = self.table_id(name)?;
        self.table_names.remove(id);
        Some(id)
    }

    /// Rewrites the slot of `old` with `new`.
    pub fn rename_table(&mut self, old: &str, new: &str) -> Result<(), CatalogError> {
        check_name(new)?;
        if let Some(id) = self.table_id(old) {
            self.table_names[id] = new.to_string();
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), CatalogError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(CatalogError::NameTooLong {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn put_name(buf: &mut BytesMut, name: &str) -> Result<(), CatalogError> {
    check_name(name)?;
    buf.put_u16_le(name.len() as u16);
    buf.put_slice(name.as_bytes());
    Ok(())
}

fn get_name(buf: &mut &[u8]) -> Result<String, CatalogError> {
    if buf.remaining() < 2 {
        return Err(CatalogError::Corrupted("truncated name".to_string()));
    }
    let len = buf.get_u16_le() as usize;
    if len == 0 || len > MAX_NAME_LEN || buf.remaining() < len {
        return Err(CatalogError::Corrupted("invalid name length".to_string()));
    }
    let name = String::from_utf8(buf[..len].to_vec())
        .map_err(|e| CatalogError::Corrupted(e.to_string()))?;
    buf.advance(len);
    Ok(name)
}
