//! Open-database lifecycle.
//!
//! A [`Database`] owns the loaded catalog and one open [`Table`] handle
//! per listed table, in catalog order. Structural mutations update the
//! catalog file immediately; `close` flushes everything a final time.

mod error;

pub use error::{EngineError, ObjectKind};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::catalog::{catalog_path, Catalog};
use crate::table::{self, ColumnMeta, Table};

/// An open database: catalog plus open table handles.
pub struct Database {
    dir: PathBuf,
    catalog: Catalog,
    /// Open handles, parallel to `catalog.table_names`.
    tables: Vec<Table>,
}

impl Database {
    /// Creates a fresh database descriptor at `<dir>/<name>.database`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::AlreadyExists` when the descriptor exists.
    pub fn create(dir: &Path, name: &str) -> Result<(), EngineError> {
        let path = catalog_path(dir, name);
        if path.exists() {
            return Err(EngineError::AlreadyExists {
                kind: ObjectKind::Database,
                name: name.to_string(),
            });
        }
        Catalog::new(name)?.store(&path)?;
        Ok(())
    }

    /// Opens a database, reading its catalog and opening every table.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` when the descriptor is missing.
    pub fn open(dir: &Path, name: &str) -> Result<Self, EngineError> {
        let path = catalog_path(dir, name);
        if !path.exists() {
            return Err(EngineError::NotFound {
                kind: ObjectKind::Database,
                name: name.to_string(),
            });
        }
        let catalog = Catalog::load(&path)?;

        let mut tables = Vec::with_capacity(catalog.table_names.len());
        for table_name in &catalog.table_names {
            tables.push(Table::open(dir, table_name)?);
        }
        debug!("opened database `{}` ({} tables)", name, tables.len());

        Ok(Self {
            dir: dir.to_path_buf(),
            catalog,
            tables,
        })
    }

    /// Returns the database name.
    pub fn name(&self) -> &str {
        &self.catalog.db_name
    }

    /// Returns the table names in catalog order.
    pub fn table_names(&self) -> &[String] {
        &self.catalog.table_names
    }

    /// Returns a table's catalog position.
    pub fn table_id(&self, name: &str) -> Option<usize> {
        self.catalog.table_id(name)
    }

    /// Returns the table at a catalog position.
    pub fn table(&self, id: usize) -> &Table {
        &self.tables[id]
    }

    /// Returns the table at a catalog position, mutably.
    pub fn table_mut(&mut self, id: usize) -> &mut Table {
        &mut self.tables[id]
    }

    /// Looks a table up by name, mutably.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        let id = self.catalog.table_id(name)?;
        Some(&mut self.tables[id])
    }

    /// Creates a table and registers it in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::AlreadyExists` for duplicate names; failures
    /// before the first disk write leave the catalog untouched.
    pub fn create_table(
        &mut self,
        name: &str,
        columns: Vec<ColumnMeta>,
    ) -> Result<(), EngineError> {
        if self.catalog.contains(name) {
            return Err(EngineError::AlreadyExists {
                kind: ObjectKind::Table,
                name: name.to_string(),
            });
        }
        self.catalog.add_table(name)?;

        let table = match Table::create(&self.dir, name, columns) {
            Ok(table) => table,
            Err(e) => {
                // Unregister the half-added entry
                self.catalog.remove_table(name);
                return Err(e.into());
            }
        };
        self.tables.push(table);
        self.save_catalog()
    }

    /// Drops a table: removes its storage and closes the catalog gap.
    pub fn drop_table(&mut self, name: &str) -> Result<(), EngineError> {
        let id = self.require_table(name)?;
        let table = self.tables.remove(id);
        self.catalog.remove_table(name);
        table.drop_files()?;
        self.save_catalog()
    }

    /// Renames a table: storage files first, then the catalog slot, then a
    /// reopen under the new name. A failure at any step renames the files
    /// back and reopens under the original name.
    pub fn rename_table(&mut self, old: &str, new: &str) -> Result<(), EngineError> {
        let id = self.require_table(old)?;
        if self.catalog.contains(new) {
            return Err(EngineError::AlreadyExists {
                kind: ObjectKind::Table,
                name: new.to_string(),
            });
        }

        let table = self.tables.remove(id);
        let index_columns = table.indexed_columns();
        if let Err(e) = table.close() {
            // The handle is gone; reopen before reporting
            self.reopen_at(id, old)?;
            return Err(e.into());
        }

        let mut pairs: Vec<(PathBuf, PathBuf)> = vec![
            (table::data_path(&self.dir, old), table::data_path(&self.dir, new)),
            (table::head_path(&self.dir, old), table::head_path(&self.dir, new)),
        ];
        for col in &index_columns {
            pairs.push((
                table::index_path(&self.dir, old, col),
                table::index_path(&self.dir, new, col),
            ));
        }

        let mut renamed: Vec<&(PathBuf, PathBuf)> = Vec::new();
        for pair in &pairs {
            if let Err(e) = fs::rename(&pair.0, &pair.1) {
                for (from, to) in renamed.into_iter().rev() {
                    let _ = fs::rename(to, from);
                }
                self.reopen_at(id, old)?;
                return Err(EngineError::StorageIo {
                    detail: format!("rename failed: {}", e),
                });
            }
            renamed.push(pair);
        }

        match Table::open(&self.dir, new) {
            Ok(mut reopened) => {
                reopened.set_name(new)?;
                self.tables.insert(id, reopened);
                self.catalog.rename_table(old, new)?;
                self.save_catalog()?;
                debug!("renamed table `{}` to `{}`", old, new);
                Ok(())
            }
            Err(e) => {
                for (from, to) in pairs.iter().rev() {
                    let _ = fs::rename(to, from);
                }
                self.reopen_at(id, old)?;
                Err(e.into())
            }
        }
    }

    /// Writes the `SHOW DATABASE` block.
    pub fn show_info(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "======== Database Info Begin ========")?;
        writeln!(out, "Database name = {}", self.catalog.db_name)?;
        writeln!(out, "Table number  = {}", self.catalog.table_names.len())?;
        for name in &self.catalog.table_names {
            writeln!(out, "  [table] name = {}", name)?;
        }
        writeln!(out, "======== Database Info End   ========")?;
        Ok(())
    }

    /// Flushes every table and rewrites the catalog.
    pub fn close(mut self) -> Result<(), EngineError> {
        for table in self.tables.drain(..) {
            table.close()?;
        }
        self.catalog
            .store(&catalog_path(&self.dir, &self.catalog.db_name))?;
        Ok(())
    }

    /// Drops every table's storage and removes the catalog file.
    pub fn drop_database(mut self) -> Result<(), EngineError> {
        for table in self.tables.drain(..) {
            table.drop_files()?;
        }
        fs::remove_file(catalog_path(&self.dir, &self.catalog.db_name))?;
        Ok(())
    }

    fn require_table(&self, name: &str) -> Result<usize, EngineError> {
        self.catalog
            .table_id(name)
            .ok_or_else(|| EngineError::NotFound {
                kind: ObjectKind::Table,
                name: name.to_string(),
            })
    }

    fn reopen_at(&mut self, id: usize, name: &str) -> Result<(), EngineError> {
        let table = Table::open(&self.dir, name).map_err(|e| EngineError::Internal {
            detail: format!("failed to reopen `{}` after rollback: {}", name, e),
        })?;
        self.tables.insert(id, table);
        Ok(())
    }

    fn save_catalog(&self) -> Result<(), EngineError> {
        self.catalog
            .store(&catalog_path(&self.dir, &self.catalog.db_name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Type;

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

    #[test]
    fn test_create_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        Database::create(dir.path(), "d").unwrap();
        assert!(matches!(
            Database::create(dir.path(), "d"),
            Err(EngineError::AlreadyExists { .. })
        ));

        let mut db = Database::open(dir.path(), "d").unwrap();
        db.create_table("t1", vec![int_col("a")]).unwrap();
        db.create_table("t2", vec![int_col("b")]).unwrap();
        db.close().unwrap();

        let db = Database::open(dir.path(), "d").unwrap();
        assert_eq!(db.table_names(), &["t1".to_string(), "t2".to_string()]);
    }

    #[test]
    fn test_open_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Database::open(dir.path(), "nope"),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_drop_table_shifts_catalog() {
        let dir = tempfile::tempdir().unwrap();
        Database::create(dir.path(), "d").unwrap();
        let mut db = Database::open(dir.path(), "d").unwrap();
        for name in ["a", "b", "c"] {
            db.create_table(name, vec![int_col("x")]).unwrap();
        }
        db.drop_table("b").unwrap();
        assert_eq!(db.table_names(), &["a".to_string(), "c".to_string()]);
        assert!(!table::head_path(dir.path(), "b").exists());
        db.close().unwrap();

        let db = Database::open(dir.path(), "d").unwrap();
        assert_eq!(db.table_names(), &["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_rename_table_moves_files() {
        let dir = tempfile::tempdir().unwrap();
        Database::create(dir.path(), "d").unwrap();
        let mut db = Database::open(dir.path(), "d").unwrap();
        let mut pk = int_col("a");
        pk.primary_key = true;
        db.create_table("t", vec![pk]).unwrap();
        db.rename_table("t", "u").unwrap();

        assert!(db.table_id("t").is_none());
        assert!(db.table_id("u").is_some());
        assert!(table::head_path(dir.path(), "u").exists());
        assert!(table::index_path(dir.path(), "u", "a").exists());
        assert!(!table::head_path(dir.path(), "t").exists());
        assert_eq!(db.get_table_mut("u").unwrap().name(), "u");
    }

    #[test]
    fn test_rename_reversibility() {
        let dir = tempfile::tempdir().unwrap();
        Database::create(dir.path(), "d").unwrap();
        let mut db = Database::open(dir.path(), "d").unwrap();
        db.create_table("t", vec![int_col("a")]).unwrap();

        let before = fs::read(table::head_path(dir.path(), "t")).unwrap();
        db.rename_table("t", "u").unwrap();
        db.rename_table("u", "t").unwrap();
        let after = fs::read(table::head_path(dir.path(), "t")).unwrap();
        assert_eq!(before, after);
        assert_eq!(db.table_names(), &["t".to_string()]);
    }

    #[test]
    fn test_rename_to_existing_fails() {
        let dir = tempfile::tempdir().unwrap();
        Database::create(dir.path(), "d").unwrap();
        let mut db = Database::open(dir.path(), "d").unwrap();
        db.create_table("a", vec![int_col("x")]).unwrap();
        db.create_table("b", vec![int_col("x")]).unwrap();
        assert!(matches!(
            db.rename_table("a", "b"),
            Err(EngineError::AlreadyExists { .. })
        ));
        // Both tables still usable
        assert!(db.get_table_mut("a").is_some());
        assert!(db.get_table_mut("b").is_some());
    }

    #[test]
    fn test_drop_database_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        Database::create(dir.path(), "d").unwrap();
        let mut db = Database::open(dir.path(), "d").unwrap();
        db.create_table("t", vec![int_col("a")]).unwrap();
        db.drop_database().unwrap();
        assert!(!catalog_path(dir.path(), "d").exists());
        assert!(!table::head_path(dir.path(), "t").exists());
        assert!(!table::data_path(dir.path(), "t").exists());
    }
}
