//! Table handle: header + heap + per-column indexes.
//!
//! A [`Table`] owns the storage of one table: its `<name>.thead` header,
//! its `<name>.tdata` heap, and one `<name>.<col>.tindex` per indexed
//! column. All row mutations go through the handle so the indexes never
//! drift from the heap.
//!
//! Every row carries the synthetic `__rowid__` INT as its last positional
//! column, assigned from the header's counter on insert and never shown
//! by `SELECT *`.

mod error;
mod header;

pub use error::TableError;
pub use header::{ColumnMeta, TableHeader};

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::catalog::MAX_NAME_LEN;
use crate::datum::{Type, Value};
use crate::heap::{HeapFile, Record, Rid};
use crate::index::Index;

/// Name of the synthetic rowid column.
pub const ROWID_COLUMN: &str = "__rowid__";

/// Returns the header file path for a table.
pub fn head_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}.thead", table))
}

/// Returns the heap file path for a table.
pub fn data_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}.tdata", table))
}

/// Returns the index file path for a table column.
pub fn index_path(dir: &Path, table: &str, column: &str) -> PathBuf {
    dir.join(format!("{}.{}.tindex", table, column))
}

/// An open table.
pub struct Table {
    dir: PathBuf,
    header: TableHeader,
    heap: HeapFile,
    /// Open index per indexed column id.
    indexes: BTreeMap<usize, Index>,
}

impl Table {
    /// Creates a new table with the given columns.
    ///
    /// Primary key columns get an index immediately.
    ///
    /// # Errors
    ///
    /// Returns `TableError::DuplicateColumn` for repeated column names and
    /// `TableError::NameTooLong` for over-long identifiers.
    pub fn create(dir: &Path, name: &str, columns: Vec<ColumnMeta>) -> Result<Self, TableError> {
        if name.len() > MAX_NAME_LEN {
            return Err(TableError::NameTooLong {
                name: name.to_string(),
            });
        }
        for (i, col) in columns.iter().enumerate() {
            if col.name.len() > MAX_NAME_LEN {
                return Err(TableError::NameTooLong {
                    name: col.name.clone(),
                });
            }
            if col.name == ROWID_COLUMN
                || columns[..i].iter().any(|other| other.name == col.name)
            {
                return Err(TableError::DuplicateColumn {
                    name: col.name.clone(),
                });
            }
        }

        let indexed: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect();

        let header = TableHeader {
            name: name.to_string(),
            next_rowid: 1,
            columns,
            indexed: indexed.clone(),
        };

        let heap = HeapFile::open(data_path(dir, name))?;
        let mut indexes = BTreeMap::new();
        for id in indexed {
            let ty = header.columns[id].ty;
            let index = Index::create(index_path(dir, name, &header.columns[id].name), ty)?;
            indexes.insert(id, index);
        }

        let table = Self {
            dir: dir.to_path_buf(),
            header,
            heap,
            indexes,
        };
        table.save_header()?;
        Ok(table)
    }

    /// Opens an existing table under its storage name.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Corrupted` for malformed headers and
    /// `TableError::Io` when a storage file is missing.
    pub fn open(dir: &Path, name: &str) -> Result<Self, TableError> {
        let data = fs::read(head_path(dir, name))?;
        let header = TableHeader::decode(&data)?;

        let heap = HeapFile::open(data_path(dir, name))?;
        let mut indexes = BTreeMap::new();
        for &id in &header.indexed {
            let col_name = &header.columns[id].name;
            let index = Index::open(index_path(dir, name, col_name))?;
            indexes.insert(id, index);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            header,
            heap,
            indexes,
        })
    }

    /// Returns the table's embedded name.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Rewrites the embedded name (used after a file-level rename).
    pub fn set_name(&mut self, name: &str) -> Result<(), TableError> {
        self.header.name = name.to_string();
        self.save_header()
    }

    /// Declared columns in declaration order (without `__rowid__`).
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.header.columns
    }

    /// Number of declared columns (without `__rowid__`).
    pub fn column_count(&self) -> usize {
        self.header.columns.len()
    }

    /// Resolves a column name to its positional id.
    ///
    /// `__rowid__` resolves to the position just past the declared columns.
    pub fn lookup_column(&self, name: &str) -> Option<usize> {
        if name == ROWID_COLUMN {
            return Some(self.header.columns.len());
        }
        self.header.columns.iter().position(|c| c.name == name)
    }

    /// Positional schema of stored records: declared types plus the rowid.
    pub fn record_schema(&self) -> Vec<Type> {
        let mut schema: Vec<Type> = self.header.columns.iter().map(|c| c.ty).collect();
        schema.push(Type::Int);
        schema
    }

    /// Returns the index on a column, if one exists.
    pub fn get_index(&self, column: usize) -> Option<&Index> {
        self.indexes.get(&column)
    }

    /// Returns true when the column has an index.
    pub fn has_index(&self, column: usize) -> bool {
        self.indexes.contains_key(&column)
    }

    /// Names of the indexed columns, in column order.
    pub fn indexed_columns(&self) -> Vec<String> {
        self.header
            .indexed
            .iter()
            .map(|&id| self.header.columns[id].name.clone())
            .collect()
    }

    /// Inserts one row of declared-column values.
    ///
    /// Checks types, NOT NULL, and UNIQUE / PRIMARY KEY before touching
    /// the heap, assigns the next `__rowid__`, then updates every index.
    ///
    /// # Errors
    ///
    /// Constraint and type violations leave the table unchanged.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<Rid, TableError> {
        if values.len() != self.header.columns.len() {
            return Err(TableError::ArityMismatch {
                expected: self.header.columns.len(),
                found: values.len(),
            });
        }

        let mut row = Vec::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            let col = &self.header.columns[i];
            if !col.ty.accepts(&value) {
                return Err(TableError::TypeMismatch {
                    column: col.name.clone(),
                    expected: col.ty.to_string(),
                    found: value.type_name().to_string(),
                });
            }
            row.push(col.ty.coerce(value));
        }

        for (i, value) in row.iter().enumerate() {
            let col = &self.header.columns[i];
            let rejects_null = col.rejects_null();
            let rejects_duplicates = col.rejects_duplicates();
            let col_name = col.name.clone();
            if rejects_null && value.is_null() {
                return Err(TableError::NotNullViolation { column: col_name });
            }
            if rejects_duplicates && !value.is_null() && self.value_exists(i, value, None)? {
                return Err(TableError::UniqueViolation { column: col_name });
            }
        }

        let rowid = self.header.next_rowid;
        self.header.next_rowid += 1;
        row.push(Value::Int(rowid));

        let record = Record::new(row);
        let rid = self.heap.insert(&record.to_bytes())?;

        for (&col, index) in self.indexes.iter_mut() {
            index.insert(record.values[col].clone(), rid);
        }

        self.save_header()?;
        Ok(rid)
    }

    /// Reads the row at `rid`.
    pub fn get(&mut self, rid: Rid) -> Result<Record, TableError> {
        let bytes = self.heap.get(rid)?;
        Ok(Record::deserialize(&bytes, &self.record_schema())?)
    }

    /// Removes the row at `rid`, cleaning up its index entries.
    ///
    /// Returns false if the rid is already dead.
    pub fn remove(&mut self, rid: Rid) -> Result<bool, TableError> {
        let record = match self.get(rid) {
            Ok(record) => record,
            Err(TableError::Heap(crate::heap::HeapError::InvalidRid(_))) => return Ok(false),
            Err(e) => return Err(e),
        };
        if !self.heap.delete(rid)? {
            return Ok(false);
        }
        for (&col, index) in self.indexes.iter_mut() {
            index.remove(&record.values[col], rid);
        }
        Ok(true)
    }

    /// Rewrites one column of the row at `rid`.
    ///
    /// Returns false when the new payload does not fit its page; the row
    /// is left unchanged in that case.
    ///
    /// # Errors
    ///
    /// Constraint and type violations leave the row unchanged.
    pub fn modify(&mut self, rid: Rid, column: usize, value: Value) -> Result<bool, TableError> {
        let col = self
            .header
            .columns
            .get(column)
            .ok_or_else(|| TableError::ColumnNotFound {
                name: format!("#{}", column),
            })?
            .clone();

        if !col.ty.accepts(&value) {
            return Err(TableError::TypeMismatch {
                column: col.name.clone(),
                expected: col.ty.to_string(),
                found: value.type_name().to_string(),
            });
        }
        let value = col.ty.coerce(value);

        if col.rejects_null() && value.is_null() {
            return Err(TableError::NotNullViolation {
                column: col.name.clone(),
            });
        }
        if col.rejects_duplicates()
            && !value.is_null()
            && self.value_exists(column, &value, Some(rid))?
        {
            return Err(TableError::UniqueViolation {
                column: col.name.clone(),
            });
        }

        let mut record = self.get(rid)?;
        let old = std::mem::replace(&mut record.values[column], value.clone());
        if !self.heap.update(rid, &record.to_bytes())? {
            return Ok(false);
        }

        if let Some(index) = self.indexes.get_mut(&column) {
            index.remove(&old, rid);
            index.insert(value, rid);
        }
        Ok(true)
    }

    /// Rids of every live row in insertion order.
    pub fn scan_rids(&mut self) -> Result<Vec<Rid>, TableError> {
        Ok(self.heap.scan_all()?.into_iter().map(|(rid, _)| rid).collect())
    }

    /// Every live row with its rid, in insertion order.
    pub fn scan(&mut self) -> Result<Vec<(Rid, Record)>, TableError> {
        let schema = self.record_schema();
        let mut rows = Vec::new();
        for (rid, bytes) in self.heap.scan_all()? {
            rows.push((rid, Record::deserialize(&bytes, &schema)?));
        }
        Ok(rows)
    }

    /// Returns true if any row (other than `exclude`) holds `value` in
    /// `column`. Uses the column's index when it has one.
    pub fn value_exists(
        &mut self,
        column: usize,
        value: &Value,
        exclude: Option<Rid>,
    ) -> Result<bool, TableError> {
        if let Some(index) = self.indexes.get(&column) {
            let hit = index
                .lower_bound(value)
                .take_while(|e| e.key.0.compare(value) == Some(std::cmp::Ordering::Equal))
                .any(|e| Some(e.rid) != exclude);
            return Ok(hit);
        }

        for (rid, record) in self.scan()? {
            if Some(rid) == exclude {
                continue;
            }
            if record.values[column].compare(value) == Some(std::cmp::Ordering::Equal) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Builds an ordered index over `column` by full scan.
    ///
    /// # Errors
    ///
    /// Returns `TableError::IndexExists` if the column is already indexed.
    pub fn create_index(&mut self, column: &str) -> Result<(), TableError> {
        let col = self
            .lookup_column(column)
            .filter(|&c| c < self.header.columns.len())
            .ok_or_else(|| TableError::ColumnNotFound {
                name: column.to_string(),
            })?;
        if self.indexes.contains_key(&col) {
            return Err(TableError::IndexExists {
                column: column.to_string(),
            });
        }

        let ty = self.header.columns[col].ty;
        let mut index = Index::create(index_path(&self.dir, &self.header.name, column), ty)?;
        for (rid, record) in self.scan()? {
            index.insert(record.values[col].clone(), rid);
        }
        index.flush()?;
        debug!(
            "built index on {}.{} ({} entries)",
            self.header.name,
            column,
            index.len()
        );

        self.indexes.insert(col, index);
        self.header.indexed.push(col);
        self.header.indexed.sort_unstable();
        self.save_header()
    }

    /// Drops the index on `column` and removes its file.
    ///
    /// # Errors
    ///
    /// Returns `TableError::IndexNotFound` if the column has no index.
    pub fn drop_index(&mut self, column: &str) -> Result<(), TableError> {
        let col = self
            .lookup_column(column)
            .ok_or_else(|| TableError::ColumnNotFound {
                name: column.to_string(),
            })?;
        let index = self
            .indexes
            .remove(&col)
            .ok_or_else(|| TableError::IndexNotFound {
                column: column.to_string(),
            })?;
        index.drop_file()?;
        self.header.indexed.retain(|&id| id != col);
        self.save_header()
    }

    /// Appends a column; existing rows get the DEFAULT or NULL.
    ///
    /// # Errors
    ///
    /// Fails before touching storage when the new column is NOT NULL
    /// without a default, or when its name collides.
    pub fn alter_add_column(&mut self, meta: ColumnMeta) -> Result<(), TableError> {
        if meta.name == ROWID_COLUMN || self.lookup_column(&meta.name).is_some() {
            return Err(TableError::DuplicateColumn { name: meta.name });
        }
        if meta.name.len() > MAX_NAME_LEN {
            return Err(TableError::NameTooLong { name: meta.name });
        }

        let fill = match &meta.default {
            Some(value) => {
                if !meta.ty.accepts(value) {
                    return Err(TableError::TypeMismatch {
                        column: meta.name.clone(),
                        expected: meta.ty.to_string(),
                        found: value.type_name().to_string(),
                    });
                }
                meta.ty.coerce(value.clone())
            }
            None => Value::Null,
        };
        if meta.rejects_null() && fill.is_null() {
            return Err(TableError::NotNullViolation {
                column: meta.name.clone(),
            });
        }

        let mut rows = self.scan()?;
        let declared = self.header.columns.len();
        for (_, record) in rows.iter_mut() {
            record.values.insert(declared, fill.clone());
        }

        self.header.columns.push(meta);
        self.rebuild_storage(rows)
    }

    /// Drops a column, rewriting the heap without it.
    pub fn alter_drop_column(&mut self, column: &str) -> Result<(), TableError> {
        let col = self
            .lookup_column(column)
            .filter(|&c| c < self.header.columns.len())
            .ok_or_else(|| TableError::ColumnNotFound {
                name: column.to_string(),
            })?;
        if self.header.columns.len() == 1 {
            return Err(TableError::LastColumn {
                column: column.to_string(),
            });
        }

        if self.indexes.contains_key(&col) {
            self.drop_index(column)?;
        }

        let mut rows = self.scan()?;
        for (_, record) in rows.iter_mut() {
            record.values.remove(col);
        }

        self.header.columns.remove(col);
        // Shift index ids past the removed column; rebuild_storage reopens
        // the index handles from the updated header
        for id in self.header.indexed.iter_mut() {
            if *id > col {
                *id -= 1;
            }
        }

        self.rebuild_storage(rows)
    }

    /// Retypes a column and replaces its constraints, rewriting the heap.
    ///
    /// # Errors
    ///
    /// Fails without touching storage when any stored value does not fit
    /// the new type or the new constraints.
    pub fn alter_modify_column(&mut self, meta: ColumnMeta) -> Result<(), TableError> {
        let col = self
            .lookup_column(&meta.name)
            .filter(|&c| c < self.header.columns.len())
            .ok_or_else(|| TableError::ColumnNotFound {
                name: meta.name.clone(),
            })?;

        let mut rows = self.scan()?;
        let mut seen = Vec::new();
        for (_, record) in rows.iter_mut() {
            let value = record.values[col].clone();
            if !meta.ty.accepts(&value) {
                return Err(TableError::TypeMismatch {
                    column: meta.name.clone(),
                    expected: meta.ty.to_string(),
                    found: value.type_name().to_string(),
                });
            }
            let value = meta.ty.coerce(value);
            if meta.rejects_null() && value.is_null() {
                return Err(TableError::NotNullViolation {
                    column: meta.name.clone(),
                });
            }
            if meta.rejects_duplicates() && !value.is_null() {
                if seen
                    .iter()
                    .any(|v: &Value| v.compare(&value) == Some(std::cmp::Ordering::Equal))
                {
                    return Err(TableError::UniqueViolation {
                        column: meta.name.clone(),
                    });
                }
                seen.push(value.clone());
            }
            record.values[col] = value;
        }

        self.header.columns[col] = meta;
        self.rebuild_storage(rows)
    }

    /// Renames a column, carrying its index file along.
    pub fn alter_rename_column(&mut self, old: &str, new: &str) -> Result<(), TableError> {
        let col = self
            .lookup_column(old)
            .filter(|&c| c < self.header.columns.len())
            .ok_or_else(|| TableError::ColumnNotFound {
                name: old.to_string(),
            })?;
        if new == ROWID_COLUMN || self.lookup_column(new).is_some() {
            return Err(TableError::DuplicateColumn {
                name: new.to_string(),
            });
        }
        if new.len() > MAX_NAME_LEN {
            return Err(TableError::NameTooLong {
                name: new.to_string(),
            });
        }

        if let Some(mut index) = self.indexes.remove(&col) {
            index.flush()?;
            let old_path = index_path(&self.dir, &self.header.name, old);
            let new_path = index_path(&self.dir, &self.header.name, new);
            drop(index);
            fs::rename(&old_path, &new_path)?;
            self.indexes.insert(col, Index::open(&new_path)?);
        }

        self.header.columns[col].name = new.to_string();
        self.save_header()
    }

    /// Writes the `SHOW TABLE` block.
    pub fn dump_info(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "======== Table Info Begin ========")?;
        writeln!(out, "Table name    = {}", self.header.name)?;
        writeln!(out, "Column number = {}", self.header.columns.len())?;
        writeln!(out, "Row counter   = {}", self.header.next_rowid)?;
        for (i, col) in self.header.columns.iter().enumerate() {
            let mut notes = Vec::new();
            if col.primary_key {
                notes.push("PRIMARY KEY".to_string());
            }
            if col.not_null {
                notes.push("NOT NULL".to_string());
            }
            if col.unique {
                notes.push("UNIQUE".to_string());
            }
            if let Some(default) = &col.default {
                notes.push(format!("DEFAULT {}", default.to_text()));
            }
            if self.indexes.contains_key(&i) {
                notes.push("INDEXED".to_string());
            }
            let suffix = if notes.is_empty() {
                String::new()
            } else {
                format!(", {}", notes.join(", "))
            };
            writeln!(out, "  [column] {} {}{}", col.name, col.ty, suffix)?;
        }
        writeln!(out, "======== Table Info End   ========")?;
        Ok(())
    }

    /// Flushes header, heap, and every index.
    pub fn flush(&mut self) -> Result<(), TableError> {
        self.save_header()?;
        for index in self.indexes.values_mut() {
            index.flush()?;
        }
        self.heap.sync()?;
        Ok(())
    }

    /// Flushes and closes the table.
    pub fn close(mut self) -> Result<(), TableError> {
        self.flush()
    }

    /// Removes every storage file of this table.
    pub fn drop_files(mut self) -> Result<(), TableError> {
        let name = self.header.name.clone();
        let dir = self.dir.clone();
        let index_columns: Vec<String> = self
            .header
            .indexed
            .iter()
            .map(|&id| self.header.columns[id].name.clone())
            .collect();
        self.indexes.clear();

        fs::remove_file(data_path(&dir, &name))?;
        fs::remove_file(head_path(&dir, &name))?;
        for col in index_columns {
            fs::remove_file(index_path(&dir, &name, &col))?;
        }
        Ok(())
    }

    fn save_header(&self) -> Result<(), TableError> {
        fs::write(
            head_path(&self.dir, &self.header.name),
            self.header.encode()?,
        )?;
        Ok(())
    }

    /// Truncates the heap and reloads it (and every index) from `rows`.
    ///
    /// Rowids inside the records are preserved; rids are reassigned.
    fn rebuild_storage(&mut self, rows: Vec<(Rid, Record)>) -> Result<(), TableError> {
        self.heap.truncate()?;

        let mut fresh = BTreeMap::new();
        for &id in &self.header.indexed {
            let col = &self.header.columns[id];
            let index = Index::create(index_path(&self.dir, &self.header.name, &col.name), col.ty)?;
            fresh.insert(id, index);
        }
        self.indexes = fresh;

        for (_, record) in rows {
            let rid = self.heap.insert(&record.to_bytes())?;
            for (&col, index) in self.indexes.iter_mut() {
                index.insert(record.values[col].clone(), rid);
            }
        }

        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_col(name: &str) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            ty: Type::Int,
            not_null: false,
            unique: false,
            primary_key: false,
            default: None,
        }
    }

    fn open_test_table(dir: &Path) -> Table {
        Table::create(
            dir,
            "t",
            vec![
                ColumnMeta {
                    name: "id".to_string(),
                    ty: Type::Int,
                    not_null: false,
                    unique: false,
                    primary_key: true,
                    default: None,
                },
                ColumnMeta {
                    name: "label".to_string(),
                    ty: Type::Varchar(16),
                    not_null: false,
                    unique: false,
                    primary_key: false,
                    default: Some(Value::Str("n/a".to_string())),
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_create_indexes_primary_key() {
        let dir = tempfile::tempdir().unwrap();
        let table = open_test_table(dir.path());
        assert!(table.has_index(0));
        assert!(!table.has_index(1));
    }

    #[test]
    fn test_insert_assigns_rowids() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_test_table(dir.path());
        for i in 0..3 {
            table
                .insert(vec![Value::Int(i), Value::Str(format!("r{}", i))])
                .unwrap();
        }
        let rows = table.scan().unwrap();
        let rowids: Vec<_> = rows
            .iter()
            .map(|(_, r)| r.values.last().unwrap().clone())
            .collect();
        assert_eq!(rowids, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_insert_constraint_checks() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_test_table(dir.path());
        table
            .insert(vec![Value::Int(1), Value::Str("x".into())])
            .unwrap();
        assert!(matches!(
            table.insert(vec![Value::Int(1), Value::Str("y".into())]),
            Err(TableError::UniqueViolation { .. })
        ));
        assert!(matches!(
            table.insert(vec![Value::Null, Value::Str("y".into())]),
            Err(TableError::NotNullViolation { .. })
        ));
        assert!(matches!(
            table.insert(vec![Value::Str("oops".into()), Value::Null]),
            Err(TableError::TypeMismatch { .. })
        ));
        assert!(matches!(
            table.insert(vec![Value::Int(2)]),
            Err(TableError::ArityMismatch { .. })
        ));
        // Failed inserts must not consume storage
        assert_eq!(table.scan().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_cleans_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_test_table(dir.path());
        let rid = table
            .insert(vec![Value::Int(7), Value::Str("x".into())])
            .unwrap();
        assert!(table.remove(rid).unwrap());
        assert!(!table.remove(rid).unwrap());
        assert_eq!(table.get_index(0).unwrap().len(), 0);
        // The key is free again
        table
            .insert(vec![Value::Int(7), Value::Str("again".into())])
            .unwrap();
    }

    #[test]
    fn test_modify_updates_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_test_table(dir.path());
        let rid = table
            .insert(vec![Value::Int(1), Value::Str("x".into())])
            .unwrap();
        assert!(table.modify(rid, 0, Value::Int(9)).unwrap());
        let index = table.get_index(0).unwrap();
        assert!(index.contains_key(&Value::Int(9)));
        assert!(!index.contains_key(&Value::Int(1)));
        // Same rid still addresses the row
        assert_eq!(table.get(rid).unwrap().values[0], Value::Int(9));
    }

    #[test]
    fn test_create_index_by_scan() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_test_table(dir.path());
        for i in [3i64, 1, 2] {
            table
                .insert(vec![Value::Int(i), Value::Str("x".into())])
                .unwrap();
        }
        table.create_index("label").unwrap();
        assert!(table.has_index(1));
        assert_eq!(table.get_index(1).unwrap().len(), 3);
        assert!(matches!(
            table.create_index("label"),
            Err(TableError::IndexExists { .. })
        ));
    }

    #[test]
    fn test_alter_add_and_drop_column() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_test_table(dir.path());
        table
            .insert(vec![Value::Int(1), Value::Str("x".into())])
            .unwrap();

        let mut extra = int_col("extra");
        extra.default = Some(Value::Int(42));
        table.alter_add_column(extra).unwrap();
        assert_eq!(table.column_count(), 3);
        let rows = table.scan().unwrap();
        assert_eq!(rows[0].1.values[2], Value::Int(42));
        // Rowid still trails the row
        assert_eq!(rows[0].1.values[3], Value::Int(1));

        table.alter_drop_column("label").unwrap();
        assert_eq!(table.column_count(), 2);
        let rows = table.scan().unwrap();
        assert_eq!(rows[0].1.values, vec![Value::Int(1), Value::Int(42), Value::Int(1)]);
        // The primary key index survived the rewrite
        assert!(table.has_index(0));
        assert!(table.get_index(0).unwrap().contains_key(&Value::Int(1)));
    }

    #[test]
    fn test_alter_modify_column_retypes() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_test_table(dir.path());
        table
            .insert(vec![Value::Int(1), Value::Str("x".into())])
            .unwrap();

        let mut extra = int_col("extra");
        extra.default = Some(Value::Int(5));
        table.alter_add_column(extra).unwrap();

        let retyped = ColumnMeta {
            name: "extra".to_string(),
            ty: Type::Float,
            not_null: false,
            unique: false,
            primary_key: false,
            default: None,
        };
        table.alter_modify_column(retyped).unwrap();
        let rows = table.scan().unwrap();
        assert_eq!(rows[0].1.values[2], Value::Float(5.0));

        // Incompatible retype is rejected and changes nothing
        let bad = ColumnMeta {
            name: "extra".to_string(),
            ty: Type::Bool,
            not_null: false,
            unique: false,
            primary_key: false,
            default: None,
        };
        assert!(matches!(
            table.alter_modify_column(bad),
            Err(TableError::TypeMismatch { .. })
        ));
        assert_eq!(table.scan().unwrap()[0].1.values[2], Value::Float(5.0));
    }

    #[test]
    fn test_alter_rename_column_moves_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_test_table(dir.path());
        table
            .insert(vec![Value::Int(1), Value::Str("x".into())])
            .unwrap();
        table.alter_rename_column("id", "key_id").unwrap();
        assert!(table.lookup_column("id").is_none());
        assert!(table.lookup_column("key_id").is_some());
        assert!(index_path(dir.path(), "t", "key_id").exists());
        assert!(!index_path(dir.path(), "t", "id").exists());
    }

    #[test]
    fn test_reopen_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut table = open_test_table(dir.path());
            table
                .insert(vec![Value::Int(1), Value::Str("persisted".into())])
                .unwrap();
            table.close().unwrap();
        }
        let mut table = Table::open(dir.path(), "t").unwrap();
        assert_eq!(table.name(), "t");
        let rows = table.scan().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.values[1], Value::Str("persisted".into()));
        // Rowid counter continues after reopen
        table
            .insert(vec![Value::Int(2), Value::Str("next".into())])
            .unwrap();
        let rows = table.scan().unwrap();
        assert_eq!(rows[1].1.values[2], Value::Int(2));
    }

    #[test]
    fn test_lookup_rowid_column() {
        let dir = tempfile::tempdir().unwrap();
        let table = open_test_table(dir.path());
        assert_eq!(table.lookup_column(ROWID_COLUMN), Some(2));
        assert_eq!(table.lookup_column("missing"), None);
    }
}
