//! Statement dispatch and the DDL/DML facade.
//!
//! A [`Session`] owns everything a statement touches: the currently open
//! database, the row-evaluation cache, the result sink, and the operation
//! logger. Every statement runs inside a [`RowCacheGuard`], so nothing
//! published for one statement survives into the next.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::datum::Value;
use crate::db::{Database, EngineError, ObjectKind};
use crate::executor::{
    self, eval, Aggregator, ExecutorError, Projection, Relation, RowCache, RowCacheGuard,
};
use crate::heap::Rid;
use crate::logger::{Logger, OperationType};
use crate::sql::{
    AlterAction, ColumnDef, Expr, InsertStmt, OutputTarget, SelectStmt, Statement, UpdateStmt,
};
use crate::table::{ColumnMeta, TableError, ROWID_COLUMN};

/// What a successfully executed statement hands back to the shell.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to report beyond success.
    None,
    /// An informational line for the diagnostic stream.
    Info(String),
    /// The session should terminate.
    Exit,
}

/// Where query results go.
pub enum OutputSink {
    /// Standard output.
    Stdout,
    /// A file, truncated when the sink was switched.
    File(BufWriter<File>),
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Stdout => io::stdout().write(buf),
            OutputSink::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout => io::stdout().flush(),
            OutputSink::File(file) => file.flush(),
        }
    }
}

/// One interactive session: current database, row cache, sink, logger.
pub struct Session {
    data_dir: PathBuf,
    db: Option<Database>,
    cache: RowCache,
    out: OutputSink,
    logger: Logger,
    closed: bool,
}

impl Session {
    /// Opens a session rooted at `data_dir` (created when missing).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::StorageIo` when the directory cannot be made.
    pub fn new(data_dir: &Path, user: Option<&str>) -> Result<Self, EngineError> {
        std::fs::create_dir_all(data_dir)?;
        let logger = Logger::new(data_dir);
        if let Some(user) = user {
            logger.set_user(user);
        }
        logger.log_success(OperationType::SystemStart, "", "", 0, "session started");
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            db: None,
            cache: RowCache::new(),
            out: OutputSink::Stdout,
            logger,
            closed: false,
        })
    }

    /// Name of the currently open database, if any.
    pub fn current_database(&self) -> Option<&str> {
        self.db.as_ref().map(|db| db.name())
    }

    /// True when nothing is published in the row cache (statement
    /// boundaries must leave it this way).
    pub fn row_cache_is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Executes one parsed statement.
    ///
    /// # Errors
    ///
    /// Every failure is logged (and duplicated to the error log) before
    /// it is returned.
    pub fn execute(&mut self, stmt: &Statement) -> Result<Outcome, EngineError> {
        let result = self.dispatch(stmt);
        if let Err(e) = &result {
            let (op, table, sql) = describe_statement(stmt);
            self.logger.log_failure(op, &table, &sql, &e.to_string());
        }
        result
    }

    /// Flushes and closes the open database. Idempotent.
    pub fn close(&mut self) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(db) = self.db.take() {
            db.close()?;
        }
        self.logger.set_database("");
        self.logger
            .log_success(OperationType::SystemQuit, "", "", 0, "session closed");
        Ok(())
    }

    fn dispatch(&mut self, stmt: &Statement) -> Result<Outcome, EngineError> {
        match stmt {
            Statement::CreateDatabase { name } => self.create_database(name),
            Statement::DropDatabase { name } => self.drop_database(name),
            Statement::UseDatabase { name } => self.use_database(name),
            Statement::ShowDatabase { name } => self.show_database(name),
            Statement::CreateTable(create) => self.create_table(&create.name, &create.columns),
            Statement::DropTable { name } => self.drop_table(name),
            Statement::ShowTable { name } => self.show_table(name),
            Statement::RenameTable { old, new } => self.rename_table(old, new),
            Statement::AlterTable { table, action } => self.alter_table(table, action),
            Statement::CreateIndex { table, column } => self.create_index(table, column),
            Statement::DropIndex { table, column } => self.drop_index(table, column),
            Statement::Insert(insert) => self.insert(insert),
            Statement::Delete(delete) => self.delete(&delete.table, delete.where_clause.as_ref()),
            Statement::Update(update) => self.update(update),
            Statement::Select(select) => self.select(select),
            Statement::Output { target } => self.switch_output(target),
            Statement::Exit => {
                self.close()?;
                Ok(Outcome::Exit)
            }
        }
    }

    // --- Database operations ---

    fn create_database(&mut self, name: &str) -> Result<Outcome, EngineError> {
        Database::create(&self.data_dir, name)?;
        self.logger.log_success(
            OperationType::DbCreate,
            "",
            &format!("CREATE DATABASE {}", name),
            0,
            &format!("database '{}' created", name),
        );
        Ok(Outcome::None)
    }

    fn use_database(&mut self, name: &str) -> Result<Outcome, EngineError> {
        if let Some(db) = self.db.take() {
            db.close()?;
        }
        self.db = Some(Database::open(&self.data_dir, name)?);
        self.logger.set_database(name);
        self.logger.log_success(
            OperationType::DbUse,
            "",
            &format!("USE {}", name),
            0,
            &format!("switched to database '{}'", name),
        );
        Ok(Outcome::None)
    }

    fn drop_database(&mut self, name: &str) -> Result<Outcome, EngineError> {
        let db = match self.db.take_if(|db| db.name() == name) {
            Some(db) => {
                self.logger.set_database("");
                db
            }
            None => Database::open(&self.data_dir, name)?,
        };
        db.drop_database()?;
        self.logger.log_success(
            OperationType::DbDrop,
            "",
            &format!("DROP DATABASE {}", name),
            0,
            &format!("database '{}' dropped", name),
        );
        Ok(Outcome::None)
    }

    fn show_database(&mut self, name: &str) -> Result<Outcome, EngineError> {
        match &self.db {
            Some(db) if db.name() == name => db.show_info(&mut self.out)?,
            _ => {
                let db = Database::open(&self.data_dir, name)?;
                db.show_info(&mut self.out)?;
                db.close()?;
            }
        }
        self.out.flush()?;
        self.logger
            .log_success(OperationType::DbShow, "", &format!("SHOW DATABASE {}", name), 0, "");
        Ok(Outcome::None)
    }

    // --- Table DDL ---

    fn create_table(
        &mut self,
        name: &str,
        defs: &[ColumnDef],
    ) -> Result<Outcome, EngineError> {
        let columns = defs
            .iter()
            .map(column_meta)
            .collect::<Result<Vec<_>, EngineError>>()?;
        let column_count = columns.len();

        self.require_db()?.create_table(name, columns)?;
        self.logger.log_success(
            OperationType::TableCreate,
            name,
            &format!("CREATE TABLE {}", name),
            0,
            &format!("table '{}' created with {} columns", name, column_count),
        );
        Ok(Outcome::None)
    }

    fn drop_table(&mut self, name: &str) -> Result<Outcome, EngineError> {
        self.require_db()?.drop_table(name)?;
        self.logger.log_success(
            OperationType::TableDrop,
            name,
            &format!("DROP TABLE {}", name),
            0,
            &format!("table '{}' dropped", name),
        );
        Ok(Outcome::None)
    }

    fn show_table(&mut self, name: &str) -> Result<Outcome, EngineError> {
        let db = self.db.as_ref().ok_or(EngineError::NotOpen)?;
        let id = db.table_id(name).ok_or_else(|| EngineError::NotFound {
            kind: ObjectKind::Table,
            name: name.to_string(),
        })?;
        db.table(id).dump_info(&mut self.out)?;
        self.out.flush()?;
        self.logger
            .log_success(OperationType::TableShow, name, &format!("SHOW TABLE {}", name), 0, "");
        Ok(Outcome::None)
    }

    fn rename_table(&mut self, old: &str, new: &str) -> Result<Outcome, EngineError> {
        self.require_db()?.rename_table(old, new)?;
        self.logger.log_success(
            OperationType::TableRename,
            old,
            &format!("RENAME TABLE {} TO {}", old, new),
            0,
            &format!("table '{}' renamed to '{}'", old, new),
        );
        Ok(Outcome::Info(format!(
            "Table renamed from `{}` to `{}`.",
            old, new
        )))
    }

    fn alter_table(&mut self, table: &str, action: &AlterAction) -> Result<Outcome, EngineError> {
        let db = self.require_db()?;
        let handle = db
            .get_table_mut(table)
            .ok_or_else(|| EngineError::NotFound {
                kind: ObjectKind::Table,
                name: table.to_string(),
            })?;

        let (op, message) = match action {
            AlterAction::AddColumn(def) => {
                handle.alter_add_column(column_meta(def)?)?;
                (
                    OperationType::TableAlterAdd,
                    format!("column '{}' added to '{}'", def.name, table),
                )
            }
            AlterAction::DropColumn(column) => {
                handle.alter_drop_column(column)?;
                (
                    OperationType::TableAlterDrop,
                    format!("column '{}' dropped from '{}'", column, table),
                )
            }
            AlterAction::ModifyColumn(def) => {
                handle.alter_modify_column(column_meta(def)?)?;
                (
                    OperationType::TableAlterModify,
                    format!("column '{}' modified in '{}'", def.name, table),
                )
            }
            AlterAction::RenameColumn { old, new } => {
                handle.alter_rename_column(old, new)?;
                (
                    OperationType::TableAlterRename,
                    format!("column '{}' renamed to '{}' in '{}'", old, new, table),
                )
            }
        };
        self.logger
            .log_success(op, table, &format!("ALTER TABLE {}", table), 0, &message);
        Ok(Outcome::None)
    }

    fn create_index(&mut self, table: &str, column: &str) -> Result<Outcome, EngineError> {
        let db = self.require_db()?;
        let handle = db
            .get_table_mut(table)
            .ok_or_else(|| EngineError::NotFound {
                kind: ObjectKind::Table,
                name: table.to_string(),
            })?;
        handle.create_index(column)?;
        self.logger.log_success(
            OperationType::IndexCreate,
            table,
            &format!("CREATE INDEX ON {}({})", table, column),
            0,
            &format!("index created on {}({})", table, column),
        );
        Ok(Outcome::None)
    }

    fn drop_index(&mut self, table: &str, column: &str) -> Result<Outcome, EngineError> {
        let db = self.require_db()?;
        let handle = db
            .get_table_mut(table)
            .ok_or_else(|| EngineError::NotFound {
                kind: ObjectKind::Table,
                name: table.to_string(),
            })?;
        handle.drop_index(column)?;
        self.logger.log_success(
            OperationType::IndexDrop,
            table,
            &format!("DROP INDEX ON {}({})", table, column),
            0,
            &format!("index on {}({}) dropped", table, column),
        );
        Ok(Outcome::None)
    }

    // --- DML ---

    fn insert(&mut self, stmt: &InsertStmt) -> Result<Outcome, EngineError> {
        let db = self.db.as_mut().ok_or(EngineError::NotOpen)?;
        let tid = db
            .table_id(&stmt.table)
            .ok_or_else(|| EngineError::NotFound {
                kind: ObjectKind::Table,
                name: stmt.table.clone(),
            })?;
        let columns = db.table(tid).columns().to_vec();

        // Which declared column each VALUES position feeds
        let mapping: Vec<usize> = if stmt.columns.is_empty() {
            (0..columns.len()).collect()
        } else {
            let mut mapping = Vec::with_capacity(stmt.columns.len());
            for name in &stmt.columns {
                if name == ROWID_COLUMN {
                    return Err(EngineError::NotFound {
                        kind: ObjectKind::Column,
                        name: name.clone(),
                    });
                }
                let cid = columns
                    .iter()
                    .position(|c| c.name == *name)
                    .ok_or_else(|| EngineError::NotFound {
                        kind: ObjectKind::Column,
                        name: name.clone(),
                    })?;
                if mapping.contains(&cid) {
                    return Err(EngineError::AlreadyExists {
                        kind: ObjectKind::Column,
                        name: name.clone(),
                    });
                }
                mapping.push(cid);
            }
            mapping
        };

        let scratch = RowCache::new();
        let mut succeeded = 0u64;
        let mut failed = 0u64;

        'rows: for row in &stmt.rows {
            if row.len() != mapping.len() {
                debug!(
                    "insert into {}: expected {} values, got {}",
                    stmt.table,
                    mapping.len(),
                    row.len()
                );
                failed += 1;
                continue;
            }

            // Unlisted columns fall back to their DEFAULT (or NULL)
            let mut values: Vec<Value> = columns
                .iter()
                .map(|c| c.default.clone().unwrap_or(Value::Null))
                .collect();
            for (expr, &cid) in row.iter().zip(mapping.iter()) {
                match eval(expr, &scratch) {
                    Ok(value) => values[cid] = value,
                    Err(e) => {
                        debug!("insert into {}: {}", stmt.table, e);
                        failed += 1;
                        continue 'rows;
                    }
                }
            }

            match db.table_mut(tid).insert(values) {
                Ok(_) => succeeded += 1,
                Err(e) if row_fatal(&e) => return Err(e.into()),
                Err(e) => {
                    debug!("insert into {}: {}", stmt.table, e);
                    failed += 1;
                }
            }
        }

        let note = if failed > 0 {
            format!("{} row(s) failed", failed)
        } else {
            String::new()
        };
        self.logger.log_success(
            OperationType::DataInsert,
            &stmt.table,
            &format!("INSERT INTO {} ({} rows)", stmt.table, stmt.rows.len()),
            succeeded,
            &note,
        );
        Ok(Outcome::Info(format!(
            "{} row(s) inserted, {} row(s) failed.",
            succeeded, failed
        )))
    }

    fn delete(&mut self, table: &str, cond: Option<&Expr>) -> Result<Outcome, EngineError> {
        let db = self.db.as_mut().ok_or(EngineError::NotOpen)?;
        let tid = db.table_id(table).ok_or_else(|| EngineError::NotFound {
            kind: ObjectKind::Table,
            name: table.to_string(),
        })?;
        let relations = vec![Relation {
            live_name: table.to_string(),
            table_id: tid,
        }];

        // Collect matching rids first, remove afterwards: removal must not
        // run under a live scan
        let mut matches: Vec<Rid> = Vec::new();
        {
            let mut guard = RowCacheGuard::new(&mut self.cache);
            let mut on_row = |_: &RowCache, rids: &[Rid]| -> Result<bool, ExecutorError> {
                matches.push(rids[0]);
                Ok(true)
            };
            executor::iterate(db, &relations, cond, &mut guard, &mut on_row)?;
        }

        let mut removed = 0u64;
        for rid in matches {
            removed += db.table_mut(tid).remove(rid)? as u64;
        }

        self.logger.log_success(
            OperationType::DataDelete,
            table,
            &format!("DELETE FROM {}", table),
            removed,
            "",
        );
        Ok(Outcome::Info(format!("{} row(s) deleted.", removed)))
    }

    fn update(&mut self, stmt: &UpdateStmt) -> Result<Outcome, EngineError> {
        let db = self.db.as_mut().ok_or(EngineError::NotOpen)?;
        let tid = db
            .table_id(&stmt.table)
            .ok_or_else(|| EngineError::NotFound {
                kind: ObjectKind::Table,
                name: stmt.table.clone(),
            })?;
        let cid = db
            .table(tid)
            .columns()
            .iter()
            .position(|c| c.name == stmt.column)
            .ok_or_else(|| EngineError::NotFound {
                kind: ObjectKind::Column,
                name: stmt.column.clone(),
            })?;
        let relations = vec![Relation {
            live_name: stmt.table.clone(),
            table_id: tid,
        }];

        // Evaluate the assignment per matching row while its tuple is
        // cached, apply the writes afterwards
        let mut failed = 0u64;
        let mut pending: Vec<(Rid, Value)> = Vec::new();
        {
            let mut guard = RowCacheGuard::new(&mut self.cache);
            let value_expr = &stmt.value;
            let mut on_row = |cache: &RowCache, rids: &[Rid]| -> Result<bool, ExecutorError> {
                match eval(value_expr, cache) {
                    Ok(value) => pending.push((rids[0], value)),
                    Err(e) => {
                        debug!("update {}: {}", stmt.table, e);
                        failed += 1;
                    }
                }
                Ok(true)
            };
            executor::iterate(db, &relations, stmt.where_clause.as_ref(), &mut guard, &mut on_row)?;
        }

        let mut succeeded = 0u64;
        for (rid, value) in pending {
            match db.table_mut(tid).modify(rid, cid, value) {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) if row_fatal(&e) => return Err(e.into()),
                Err(e) => {
                    debug!("update {}: {}", stmt.table, e);
                    failed += 1;
                }
            }
        }

        let note = if failed > 0 {
            format!("{} row(s) failed", failed)
        } else {
            String::new()
        };
        self.logger.log_success(
            OperationType::DataUpdate,
            &stmt.table,
            &format!("UPDATE {} SET {}", stmt.table, stmt.column),
            succeeded,
            &note,
        );
        Ok(Outcome::Info(format!(
            "{} row(s) updated, {} row(s) failed.",
            succeeded, failed
        )))
    }

    // --- Queries ---

    fn select(&mut self, stmt: &SelectStmt) -> Result<Outcome, EngineError> {
        let db = self.db.as_mut().ok_or(EngineError::NotOpen)?;

        let mut relations = Vec::with_capacity(stmt.tables.len());
        for tref in &stmt.tables {
            let tid = db
                .table_id(&tref.name)
                .ok_or_else(|| EngineError::NotFound {
                    kind: ObjectKind::Table,
                    name: tref.name.clone(),
                })?;
            relations.push(Relation {
                live_name: tref.live_name().to_string(),
                table_id: tid,
            });
        }

        if stmt
            .where_clause
            .as_ref()
            .is_some_and(Expr::contains_aggregate)
        {
            return Err(EngineError::Evaluation {
                detail: "aggregate calls are not allowed in WHERE".to_string(),
            });
        }

        let projection = executor::build_projection(db, &relations, &stmt.items);
        let is_aggregate = projection.exprs.iter().any(Expr::contains_aggregate);

        let out = &mut self.out;
        writeln!(out, "{}", projection.headers.join(","))?;

        let cond = stmt.where_clause.as_ref();
        let mut guard = RowCacheGuard::new(&mut self.cache);

        let count = if is_aggregate {
            run_aggregate(db, &relations, &projection, cond, &mut guard, out)?
        } else if !stmt.order_by.is_empty() {
            let mut buffered: Vec<Vec<Value>> = Vec::new();
            let mut seen: HashSet<String> = HashSet::new();
            {
                let exprs = &projection.exprs;
                let distinct = stmt.distinct;
                let mut on_row = |cache: &RowCache, _: &[Rid]| -> Result<bool, ExecutorError> {
                    let values = project_row(exprs, cache)?;
                    if distinct && !seen.insert(executor::row_key(&values)) {
                        return Ok(true);
                    }
                    buffered.push(values);
                    Ok(true)
                };
                executor::iterate(db, &relations, cond, &mut guard, &mut on_row)?;
            }

            // Dedup happened on arrival; now the stable sort
            let keys = executor::resolve_order_keys(&projection, &stmt.order_by);
            buffered.sort_by(|a, b| executor::compare_rows(a, b, &keys));
            for values in &buffered {
                writeln!(out, "{}", format_row(values))?;
            }
            buffered.len() as u64
        } else {
            let mut seen: HashSet<String> = HashSet::new();
            let mut count = 0u64;
            {
                let exprs = &projection.exprs;
                let distinct = stmt.distinct;
                let mut on_row = |cache: &RowCache, _: &[Rid]| -> Result<bool, ExecutorError> {
                    let values = project_row(exprs, cache)?;
                    if distinct && !seen.insert(executor::row_key(&values)) {
                        return Ok(true);
                    }
                    writeln!(out, "{}", format_row(&values)).map_err(ExecutorError::Output)?;
                    count += 1;
                    Ok(true)
                };
                executor::iterate(db, &relations, cond, &mut guard, &mut on_row)?;
            }
            count
        };

        drop(guard);
        writeln!(self.out)?;
        self.out.flush()?;

        let first_table = stmt.tables.first().map(|t| t.name.as_str()).unwrap_or("");
        self.logger.log_success(
            OperationType::DataSelect,
            first_table,
            &format!("SELECT FROM {}", first_table),
            count,
            "",
        );
        Ok(Outcome::Info(format!("{} row(s) selected.", count)))
    }

    // --- Output sink ---

    fn switch_output(&mut self, target: &OutputTarget) -> Result<Outcome, EngineError> {
        self.out.flush()?;
        self.out = match target {
            OutputTarget::Stdout => OutputSink::Stdout,
            OutputTarget::File(path) => OutputSink::File(BufWriter::new(File::create(path)?)),
        };
        let description = match target {
            OutputTarget::Stdout => "stdout".to_string(),
            OutputTarget::File(path) => path.clone(),
        };
        self.logger.log_success(
            OperationType::Output,
            "",
            &format!("OUTPUT TO {}", description),
            0,
            "",
        );
        Ok(Outcome::None)
    }

    fn require_db(&mut self) -> Result<&mut Database, EngineError> {
        self.db.as_mut().ok_or(EngineError::NotOpen)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(db) = self.db.take() {
            let _ = db.close();
        }
    }
}

/// Runs the single-aggregate mode and writes its one result row.
fn run_aggregate(
    db: &mut Database,
    relations: &[Relation],
    projection: &Projection,
    cond: Option<&Expr>,
    cache: &mut RowCache,
    out: &mut OutputSink,
) -> Result<u64, EngineError> {
    let (func, arg) = match projection.exprs.as_slice() {
        [Expr::Aggregate { func, arg }] => (*func, arg.clone()),
        _ => {
            return Err(EngineError::Evaluation {
                detail: "aggregate queries take exactly one aggregate expression".to_string(),
            });
        }
    };

    let mut agg = Aggregator::new(func);
    {
        let mut on_row = |cache: &RowCache, _: &[Rid]| -> Result<bool, ExecutorError> {
            match &arg {
                None => agg.update(None)?,
                Some(expr) => {
                    let value = eval(expr, cache)?;
                    agg.update(Some(value))?;
                }
            }
            Ok(true)
        };
        executor::iterate(db, relations, cond, cache, &mut on_row)?;
    }

    writeln!(out, "{}", agg.finish().to_text())?;
    Ok(agg.rows())
}

/// Evaluates every projection expression against the cached tuple.
fn project_row(exprs: &[Expr], cache: &RowCache) -> Result<Vec<Value>, ExecutorError> {
    let mut values = Vec::with_capacity(exprs.len());
    for expr in exprs {
        values.push(eval(expr, cache)?);
    }
    Ok(values)
}

/// Renders one result row: display texts joined by commas, no quoting.
fn format_row(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_text)
        .collect::<Vec<_>>()
        .join(",")
}

/// Lowers a parsed column definition, evaluating its DEFAULT literal.
fn column_meta(def: &ColumnDef) -> Result<ColumnMeta, EngineError> {
    let default = match &def.default {
        Some(expr) => {
            let value = eval(expr, &RowCache::new()).map_err(EngineError::from)?;
            if !def.ty.accepts(&value) {
                return Err(EngineError::TypeMismatch {
                    detail: format!(
                        "DEFAULT for `{}`: expected {}, found {}",
                        def.name,
                        def.ty,
                        value.type_name()
                    ),
                });
            }
            Some(def.ty.coerce(value))
        }
        None => None,
    };
    Ok(ColumnMeta {
        name: def.name.clone(),
        ty: def.ty,
        not_null: def.not_null,
        unique: def.unique,
        primary_key: def.primary_key,
        default,
    })
}

/// True for failures that should abort a multi-row statement instead of
/// being counted against one row.
fn row_fatal(e: &TableError) -> bool {
    matches!(
        e,
        TableError::Heap(_)
            | TableError::Index(_)
            | TableError::Io(_)
            | TableError::Serialization(_)
            | TableError::Corrupted(_)
    )
}

/// Log metadata for a statement that failed before its own logging ran.
fn describe_statement(stmt: &Statement) -> (OperationType, String, String) {
    match stmt {
        Statement::CreateDatabase { name } => (
            OperationType::DbCreate,
            String::new(),
            format!("CREATE DATABASE {}", name),
        ),
        Statement::DropDatabase { name } => (
            OperationType::DbDrop,
            String::new(),
            format!("DROP DATABASE {}", name),
        ),
        Statement::UseDatabase { name } => {
            (OperationType::DbUse, String::new(), format!("USE {}", name))
        }
        Statement::ShowDatabase { name } => (
            OperationType::DbShow,
            String::new(),
            format!("SHOW DATABASE {}", name),
        ),
        Statement::CreateTable(create) => (
            OperationType::TableCreate,
            create.name.clone(),
            format!("CREATE TABLE {}", create.name),
        ),
        Statement::DropTable { name } => (
            OperationType::TableDrop,
            name.clone(),
            format!("DROP TABLE {}", name),
        ),
        Statement::ShowTable { name } => (
            OperationType::TableShow,
            name.clone(),
            format!("SHOW TABLE {}", name),
        ),
        Statement::RenameTable { old, new } => (
            OperationType::TableRename,
            old.clone(),
            format!("RENAME TABLE {} TO {}", old, new),
        ),
        Statement::AlterTable { table, action } => {
            let op = match action {
                AlterAction::AddColumn(_) => OperationType::TableAlterAdd,
                AlterAction::DropColumn(_) => OperationType::TableAlterDrop,
                AlterAction::ModifyColumn(_) => OperationType::TableAlterModify,
                AlterAction::RenameColumn { .. } => OperationType::TableAlterRename,
            };
            (op, table.clone(), format!("ALTER TABLE {}", table))
        }
        Statement::CreateIndex { table, column } => (
            OperationType::IndexCreate,
            table.clone(),
            format!("CREATE INDEX ON {}({})", table, column),
        ),
        Statement::DropIndex { table, column } => (
            OperationType::IndexDrop,
            table.clone(),
            format!("DROP INDEX ON {}({})", table, column),
        ),
        Statement::Insert(insert) => (
            OperationType::DataInsert,
            insert.table.clone(),
            format!("INSERT INTO {}", insert.table),
        ),
        Statement::Delete(delete) => (
            OperationType::DataDelete,
            delete.table.clone(),
            format!("DELETE FROM {}", delete.table),
        ),
        Statement::Update(update) => (
            OperationType::DataUpdate,
            update.table.clone(),
            format!("UPDATE {} SET {}", update.table, update.column),
        ),
        Statement::Select(select) => {
            let first = select
                .tables
                .first()
                .map(|t| t.name.clone())
                .unwrap_or_default();
            (
                OperationType::DataSelect,
                first.clone(),
                format!("SELECT FROM {}", first),
            )
        }
        Statement::Output { .. } => (OperationType::Output, String::new(), "OUTPUT TO".to_string()),
        Statement::Exit => (OperationType::SystemQuit, String::new(), "EXIT".to_string()),
    }
}
