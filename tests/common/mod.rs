//! Shared helpers for engine-level integration tests.
//!
//! Each test gets its own scratch directory and drives the engine the
//! way the shell does: parse, execute, and read query results back from
//! a file sink.

use shaledb::db::EngineError;
use shaledb::session::{Outcome, Session};
use shaledb::sql::Parser;

/// One test database: scratch directory plus an open session.
pub struct TestDb {
    pub dir: tempfile::TempDir,
    pub session: Session,
}

/// Opens a fresh session in a fresh scratch directory.
pub fn open_test_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), Some("tester")).unwrap();
    TestDb { dir, session }
}

/// Parses and executes one statement, panicking on failure.
pub fn exec(session: &mut Session, sql: &str) -> Outcome {
    let stmt = Parser::parse_sql(sql).unwrap();
    session
        .execute(&stmt)
        .unwrap_or_else(|e| panic!("statement `{}` failed: {}", sql, e))
}

/// Parses and executes one statement, returning the engine error.
pub fn exec_err(session: &mut Session, sql: &str) -> EngineError {
    let stmt = Parser::parse_sql(sql).unwrap();
    match session.execute(&stmt) {
        Ok(_) => panic!("statement `{}` unexpectedly succeeded", sql),
        Err(e) => e,
    }
}

/// Runs a query with the sink switched to a scratch file and returns the
/// written lines (header first, trailing blank dropped) plus the
/// informational message.
pub fn query(db: &mut TestDb, sql: &str) -> (Vec<String>, String) {
    let out_path = db.dir.path().join("query_out.csv");
    exec(
        &mut db.session,
        &format!("OUTPUT TO '{}'", out_path.display()),
    );
    let outcome = exec(&mut db.session, sql);
    let info = match outcome {
        Outcome::Info(message) => message,
        other => panic!("query `{}` produced {:?}", sql, other),
    };

    let content = std::fs::read_to_string(&out_path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    (lines, info)
}

/// Like [`query`], but drops the header and returns data rows only.
pub fn query_rows(db: &mut TestDb, sql: &str) -> Vec<String> {
    let (mut lines, _) = query(db, sql);
    assert!(!lines.is_empty(), "query must write a header line");
    lines.remove(0);
    lines
}
