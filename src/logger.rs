//! Structured operation log.
//!
//! Every statement leaves one human-readable block in the operation log;
//! failed operations are duplicated into the error log. The format:
//!
//! ```text
//! ================================================================================
//! [2026-01-31 12:34:56] [INFO] [admin] TABLE_CREATE
//! --------------------------------------------------------------------------------
//! Database: school
//! Table: student
//! SQL: CREATE TABLE student ...
//! Status: SUCCESS
//! Affected rows: 0
//! Message: Table 'student' created
//! ================================================================================
//! ```
//!
//! Files are opened lazily in append mode on first write. The logger is
//! shared behind a `parking_lot` mutex so the session can hand it around
//! freely.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        };
        write!(f, "{}", s)
    }
}

/// What kind of statement produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    DbCreate,
    DbDrop,
    DbUse,
    DbShow,
    TableCreate,
    TableDrop,
    TableShow,
    TableRename,
    TableAlterAdd,
    TableAlterDrop,
    TableAlterModify,
    TableAlterRename,
    IndexCreate,
    IndexDrop,
    DataInsert,
    DataDelete,
    DataUpdate,
    DataSelect,
    Output,
    SystemStart,
    SystemQuit,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationType::DbCreate => "DB_CREATE",
            OperationType::DbDrop => "DB_DROP",
            OperationType::DbUse => "DB_USE",
            OperationType::DbShow => "DB_SHOW",
            OperationType::TableCreate => "TABLE_CREATE",
            OperationType::TableDrop => "TABLE_DROP",
            OperationType::TableShow => "TABLE_SHOW",
            OperationType::TableRename => "TABLE_RENAME",
            OperationType::TableAlterAdd => "TABLE_ALTER_ADD",
            OperationType::TableAlterDrop => "TABLE_ALTER_DROP",
            OperationType::TableAlterModify => "TABLE_ALTER_MODIFY",
            OperationType::TableAlterRename => "TABLE_ALTER_RENAME",
            OperationType::IndexCreate => "INDEX_CREATE",
            OperationType::IndexDrop => "INDEX_DROP",
            OperationType::DataInsert => "DATA_INSERT",
            OperationType::DataDelete => "DATA_DELETE",
            OperationType::DataUpdate => "DATA_UPDATE",
            OperationType::DataSelect => "DATA_SELECT",
            OperationType::Output => "OUTPUT",
            OperationType::SystemStart => "SYSTEM_START",
            OperationType::SystemQuit => "SYSTEM_QUIT",
        };
        write!(f, "{}", s)
    }
}

/// One log record.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub user: String,
    pub level: LogLevel,
    pub op: OperationType,
    pub database: String,
    pub table: String,
    pub sql: String,
    pub success: bool,
    pub affected_rows: u64,
    pub message: String,
}

struct LoggerInner {
    log_path: PathBuf,
    error_log_path: PathBuf,
    log_file: Option<File>,
    error_log_file: Option<File>,
    user: String,
    database: String,
    min_level: LogLevel,
}

impl LoggerInner {
    fn ensure_open(&mut self) {
        if self.log_file.is_none() {
            self.log_file = open_append(&self.log_path);
        }
        if self.error_log_file.is_none() {
            self.error_log_file = open_append(&self.error_log_path);
        }
    }

    fn write_entry(&mut self, entry: &LogEntry) {
        self.ensure_open();
        if let Some(file) = self.log_file.as_mut() {
            let _ = write_block(file, entry);
        }
        if !entry.success || entry.level >= LogLevel::Error {
            if let Some(file) = self.error_log_file.as_mut() {
                let _ = write_block(file, entry);
            }
        }
    }
}

fn open_append(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

fn write_block(file: &mut File, entry: &LogEntry) -> std::io::Result<()> {
    writeln!(file, "{}", "=".repeat(80))?;
    writeln!(
        file,
        "[{}] [{}] [{}] {}",
        entry.timestamp, entry.level, entry.user, entry.op
    )?;
    writeln!(file, "{}", "-".repeat(80))?;
    writeln!(
        file,
        "Database: {}",
        if entry.database.is_empty() { "-" } else { &entry.database }
    )?;
    if !entry.table.is_empty() {
        writeln!(file, "Table: {}", entry.table)?;
    }
    if !entry.sql.is_empty() {
        writeln!(file, "SQL: {}", entry.sql)?;
    }
    writeln!(
        file,
        "Status: {}",
        if entry.success { "SUCCESS" } else { "FAILED" }
    )?;
    writeln!(file, "Affected rows: {}", entry.affected_rows)?;
    if !entry.message.is_empty() {
        writeln!(file, "Message: {}", entry.message)?;
    }
    writeln!(file, "{}", "=".repeat(80))?;
    writeln!(file)?;
    file.flush()
}

/// The operation logger.
pub struct Logger {
    inner: Mutex<LoggerInner>,
}

impl Logger {
    /// Creates a logger writing `shaledb.log` / `shaledb_error.log`
    /// under `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            inner: Mutex::new(LoggerInner {
                log_path: dir.join("shaledb.log"),
                error_log_path: dir.join("shaledb_error.log"),
                log_file: None,
                error_log_file: None,
                user: "admin".to_string(),
                database: String::new(),
                min_level: LogLevel::Debug,
            }),
        }
    }

    /// Sets the advisory user recorded in every entry.
    pub fn set_user(&self, user: &str) {
        self.inner.lock().user = user.to_string();
    }

    /// Sets the current database recorded in every entry.
    pub fn set_database(&self, database: &str) {
        self.inner.lock().database = database.to_string();
    }

    /// Drops entries below this level.
    pub fn set_min_level(&self, level: LogLevel) {
        self.inner.lock().min_level = level;
    }

    /// Writes one entry.
    pub fn log(
        &self,
        level: LogLevel,
        op: OperationType,
        table: &str,
        sql: &str,
        success: bool,
        affected_rows: u64,
        message: &str,
    ) {
        let mut inner = self.inner.lock();
        if level < inner.min_level {
            return;
        }
        let entry = LogEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            user: inner.user.clone(),
            level,
            op,
            database: inner.database.clone(),
            table: table.to_string(),
            sql: sql.to_string(),
            success,
            affected_rows,
            message: message.to_string(),
        };
        inner.write_entry(&entry);
    }

    /// Convenience: successful operation at INFO.
    pub fn log_success(
        &self,
        op: OperationType,
        table: &str,
        sql: &str,
        affected_rows: u64,
        message: &str,
    ) {
        self.log(LogLevel::Info, op, table, sql, true, affected_rows, message);
    }

    /// Convenience: failed operation at ERROR; duplicated to the error log.
    pub fn log_failure(&self, op: OperationType, table: &str, sql: &str, message: &str) {
        self.log(LogLevel::Error, op, table, sql, false, 0, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_written_and_errors_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(dir.path());
        logger.set_user("tester");
        logger.set_database("d");

        logger.log_success(OperationType::DataInsert, "t", "INSERT INTO t", 3, "ok");
        logger.log_failure(OperationType::DataInsert, "t", "INSERT INTO t", "boom");

        let log = std::fs::read_to_string(dir.path().join("shaledb.log")).unwrap();
        assert!(log.contains("[INFO] [tester] DATA_INSERT"));
        assert!(log.contains("Affected rows: 3"));
        assert!(log.contains("Status: SUCCESS"));
        assert!(log.contains("Status: FAILED"));
        assert!(log.contains("Database: d"));

        let errors = std::fs::read_to_string(dir.path().join("shaledb_error.log")).unwrap();
        assert!(errors.contains("Message: boom"));
        assert!(!errors.contains("Status: SUCCESS"));
    }

    #[test]
    fn test_min_level_filter() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(dir.path());
        logger.set_min_level(LogLevel::Warning);
        logger.log_success(OperationType::DataSelect, "t", "SELECT", 0, "quiet");
        assert!(!dir.path().join("shaledb.log").exists()
            || !std::fs::read_to_string(dir.path().join("shaledb.log"))
                .unwrap()
                .contains("quiet"));
    }
}
