//! End-to-end DDL and DML lifecycle tests: catalog round-trips, renames,
//! alters, constraints, and the insert-count law.

mod common;

use common::{exec, exec_err, open_test_db, query, query_rows};
use shaledb::db::EngineError;
use shaledb::session::{Outcome, Session};
use shaledb::sql::Parser;

#[test]
fn test_catalog_roundtrip_preserves_table_order() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut session = Session::new(dir.path(), None).unwrap();
        for sql in [
            "CREATE DATABASE d",
            "USE d",
            "CREATE TABLE gamma(a INT)",
            "CREATE TABLE alpha(a INT)",
            "CREATE TABLE beta(a INT)",
        ] {
            let stmt = Parser::parse_sql(sql).unwrap();
            session.execute(&stmt).unwrap();
        }
        session.close().unwrap();
    }

    let mut session = Session::new(dir.path(), None).unwrap();
    let stmt = Parser::parse_sql("USE d").unwrap();
    session.execute(&stmt).unwrap();
    assert_eq!(session.current_database(), Some("d"));

    let out = dir.path().join("show.txt");
    let stmt = Parser::parse_sql(&format!("OUTPUT TO '{}'", out.display())).unwrap();
    session.execute(&stmt).unwrap();
    let stmt = Parser::parse_sql("SHOW DATABASE d").unwrap();
    session.execute(&stmt).unwrap();

    let shown = std::fs::read_to_string(&out).unwrap();
    let tables: Vec<&str> = shown
        .lines()
        .filter_map(|l| l.trim().strip_prefix("[table] name = "))
        .collect();
    assert_eq!(tables, vec!["gamma", "alpha", "beta"]);
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut session = Session::new(dir.path(), None).unwrap();
        for sql in [
            "CREATE DATABASE d",
            "USE d",
            "CREATE TABLE t(a INT, s VARCHAR(8))",
            "INSERT INTO t VALUES (1,'x'),(2,'y')",
            "CREATE INDEX ON t(a)",
        ] {
            session.execute(&Parser::parse_sql(sql).unwrap()).unwrap();
        }
        session.close().unwrap();
    }

    let mut db = common::TestDb {
        session: Session::new(dir.path(), None).unwrap(),
        dir,
    };
    exec(&mut db.session, "USE d");
    let rows = query_rows(&mut db, "SELECT a, s FROM t WHERE a = 2");
    assert_eq!(rows, vec!["2,y"]);
}

#[test]
fn test_rename_reversibility() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut session = Session::new(dir.path(), None).unwrap();
        for sql in [
            "CREATE DATABASE d",
            "USE d",
            "CREATE TABLE t(a INT PRIMARY KEY, b INT)",
            "INSERT INTO t VALUES (1,10),(2,20)",
        ] {
            session.execute(&Parser::parse_sql(sql).unwrap()).unwrap();
        }
        session.close().unwrap();
    }

    // Settled on-disk state before the rename pair
    let paths = ["d.database", "t.thead", "t.tdata", "t.a.tindex"]
        .map(|name| dir.path().join(name));
    let before: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).unwrap()).collect();

    {
        let mut session = Session::new(dir.path(), None).unwrap();
        session.execute(&Parser::parse_sql("USE d").unwrap()).unwrap();
        session
            .execute(&Parser::parse_sql("RENAME TABLE t TO u").unwrap())
            .unwrap();
        assert!(!paths[1].exists());
        assert!(dir.path().join("u.thead").exists());
        assert!(dir.path().join("u.a.tindex").exists());
        session
            .execute(&Parser::parse_sql("RENAME TABLE u TO t").unwrap())
            .unwrap();
        session.close().unwrap();
    }

    let after: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).unwrap()).collect();
    assert_eq!(before, after);

    let mut db = common::TestDb {
        session: Session::new(dir.path(), None).unwrap(),
        dir,
    };
    exec(&mut db.session, "USE d");
    let rows = query_rows(&mut db, "SELECT a FROM t WHERE a = 2");
    assert_eq!(rows, vec!["2"]);
}

#[test]
fn test_rename_to_existing_table_fails_cleanly() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(&mut db.session, "CREATE TABLE a(x INT)");
    exec(&mut db.session, "CREATE TABLE b(x INT)");
    exec(&mut db.session, "INSERT INTO a VALUES (1)");

    let err = exec_err(&mut db.session, "RENAME TABLE a TO b");
    assert!(matches!(err, EngineError::AlreadyExists { .. }));
    // Both tables remain intact and queryable
    assert_eq!(query_rows(&mut db, "SELECT x FROM a"), vec!["1"]);
    assert!(query_rows(&mut db, "SELECT x FROM b").is_empty());
}

#[test]
fn test_alter_table_lifecycle() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(&mut db.session, "CREATE TABLE t(a INT)");
    exec(&mut db.session, "INSERT INTO t VALUES (1),(2)");

    exec(
        &mut db.session,
        "ALTER TABLE t ADD COLUMN note VARCHAR(16) DEFAULT 'none'",
    );
    let rows = query_rows(&mut db, "SELECT a, note FROM t");
    assert_eq!(rows, vec!["1,none", "2,none"]);

    exec(&mut db.session, "ALTER TABLE t RENAME COLUMN note TO label");
    let rows = query_rows(&mut db, "SELECT label FROM t WHERE a = 1");
    assert_eq!(rows, vec!["none"]);

    exec(&mut db.session, "ALTER TABLE t MODIFY COLUMN a FLOAT");
    let rows = query_rows(&mut db, "SELECT a FROM t ORDER BY a");
    assert_eq!(rows, vec!["1.0", "2.0"]);

    exec(&mut db.session, "ALTER TABLE t DROP COLUMN label");
    let (lines, _) = query(&mut db, "SELECT * FROM t");
    assert_eq!(lines[0], "t.a");
}

#[test]
fn test_insert_count_law() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(
        &mut db.session,
        "CREATE TABLE t(a INT PRIMARY KEY, b INT NOT NULL)",
    );

    // 5 tuples: ok, duplicate key, NULL into NOT NULL, arity mismatch, ok
    let outcome = exec(
        &mut db.session,
        "INSERT INTO t VALUES (1,10),(1,11),(2,NULL),(3),(4,40)",
    );
    assert_eq!(
        outcome,
        Outcome::Info("2 row(s) inserted, 3 row(s) failed.".to_string())
    );
    let rows = query_rows(&mut db, "SELECT a FROM t ORDER BY a");
    assert_eq!(rows, vec!["1", "4"]);
}

#[test]
fn test_insert_with_column_list_and_defaults() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(
        &mut db.session,
        "CREATE TABLE t(a INT, b INT DEFAULT 7, c VARCHAR(8))",
    );
    exec(&mut db.session, "INSERT INTO t (c, a) VALUES ('x', 1)");
    let rows = query_rows(&mut db, "SELECT a, b, c FROM t");
    assert_eq!(rows, vec!["1,7,x"]);
}

#[test]
fn test_insert_widening() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(
        &mut db.session,
        "CREATE TABLE t(f FLOAT, i INT, d DATE)",
    );
    // INT widens into FLOAT, BOOL into INT, a date literal into DATE
    exec(
        &mut db.session,
        "INSERT INTO t VALUES (3, TRUE, '2024-02-29')",
    );
    let rows = query_rows(&mut db, "SELECT f, i, d FROM t");
    assert_eq!(rows, vec!["3.0,1,2024-02-29"]);
}

#[test]
fn test_update_constraint_failures_are_counted() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(&mut db.session, "CREATE TABLE t(a INT UNIQUE, b INT)");
    exec(&mut db.session, "INSERT INTO t VALUES (1,1),(2,2)");

    // Setting every a to 9 collides on the second row
    let outcome = exec(&mut db.session, "UPDATE t SET a = 9");
    assert_eq!(
        outcome,
        Outcome::Info("1 row(s) updated, 1 row(s) failed.".to_string())
    );
}

#[test]
fn test_unique_constraint_via_index_and_scan() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    // UNIQUE without PRIMARY KEY: enforced by scan until indexed
    exec(&mut db.session, "CREATE TABLE t(a INT UNIQUE)");
    exec(&mut db.session, "INSERT INTO t VALUES (1),(1),(2)");
    let rows = query_rows(&mut db, "SELECT a FROM t ORDER BY a");
    assert_eq!(rows, vec!["1", "2"]);

    exec(&mut db.session, "CREATE INDEX ON t(a)");
    let outcome = exec(&mut db.session, "INSERT INTO t VALUES (2),(3)");
    assert_eq!(
        outcome,
        Outcome::Info("1 row(s) inserted, 1 row(s) failed.".to_string())
    );
}

#[test]
fn test_drop_index_falls_back_to_scan() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(&mut db.session, "CREATE TABLE t(a INT)");
    exec(&mut db.session, "INSERT INTO t VALUES (1),(2)");
    exec(&mut db.session, "CREATE INDEX ON t(a)");
    assert!(db.dir.path().join("t.a.tindex").exists());

    exec(&mut db.session, "DROP INDEX ON t(a)");
    assert!(!db.dir.path().join("t.a.tindex").exists());
    let rows = query_rows(&mut db, "SELECT a FROM t WHERE a = 2");
    assert_eq!(rows, vec!["2"]);
}

#[test]
fn test_index_walk_matches_sorted_heap() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut session = Session::new(dir.path(), None).unwrap();
        for sql in [
            "CREATE DATABASE d",
            "USE d",
            "CREATE TABLE t(a INT)",
            "INSERT INTO t VALUES (5),(3),(9),(3),(1)",
            "CREATE INDEX ON t(a)",
            "DELETE FROM t WHERE a = 9",
        ] {
            session.execute(&shaledb::sql::Parser::parse_sql(sql).unwrap()).unwrap();
        }
        session.close().unwrap();
    }

    let index = shaledb::index::Index::open(dir.path().join("t.a.tindex")).unwrap();
    let keys: Vec<i64> = index
        .iter()
        .map(|e| match e.key.0 {
            shaledb::datum::Value::Int(n) => n,
            ref other => panic!("unexpected key {:?}", other),
        })
        .collect();
    // The walk yields the sorted heap projection, deleted keys excluded
    assert_eq!(keys, vec![1, 3, 3, 5]);

    // No ghost keys: every entry's rid resolves to a live row holding it
    let mut table = shaledb::table::Table::open(dir.path(), "t").unwrap();
    for entry in index.iter() {
        let record = table.get(entry.rid).unwrap();
        assert_eq!(record.values[0], entry.key.0);
    }
}

#[test]
fn test_drop_database_removes_everything() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(&mut db.session, "CREATE TABLE t(a INT PRIMARY KEY)");
    exec(&mut db.session, "INSERT INTO t VALUES (1)");

    exec(&mut db.session, "DROP DATABASE d");
    assert_eq!(db.session.current_database(), None);
    assert!(!db.dir.path().join("d.database").exists());
    assert!(!db.dir.path().join("t.thead").exists());
    assert!(!db.dir.path().join("t.tdata").exists());
    assert!(!db.dir.path().join("t.a.tindex").exists());

    let err = exec_err(&mut db.session, "USE d");
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn test_use_switches_databases() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE first");
    exec(&mut db.session, "CREATE DATABASE second");
    exec(&mut db.session, "USE first");
    exec(&mut db.session, "CREATE TABLE t(a INT)");
    exec(&mut db.session, "USE second");
    assert_eq!(db.session.current_database(), Some("second"));
    // `t` lives in `first`
    let err = exec_err(&mut db.session, "SELECT a FROM t");
    assert!(matches!(err, EngineError::NotFound { .. }));
    exec(&mut db.session, "USE first");
    assert!(query_rows(&mut db, "SELECT a FROM t").is_empty());
}

#[test]
fn test_create_database_twice_fails() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    let err = exec_err(&mut db.session, "CREATE DATABASE d");
    assert!(matches!(err, EngineError::AlreadyExists { .. }));
}

#[test]
fn test_show_table_lists_columns_in_declaration_order() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(
        &mut db.session,
        "CREATE TABLE t(z INT PRIMARY KEY, a VARCHAR(4), m FLOAT)",
    );

    let out = db.dir.path().join("show.txt");
    exec(
        &mut db.session,
        &format!("OUTPUT TO '{}'", out.display()),
    );
    exec(&mut db.session, "SHOW TABLE t");
    let shown = std::fs::read_to_string(&out).unwrap();
    let columns: Vec<&str> = shown
        .lines()
        .filter(|l| l.trim_start().starts_with("[column]"))
        .collect();
    assert_eq!(columns.len(), 3);
    assert!(columns[0].contains("z INT"));
    assert!(columns[0].contains("PRIMARY KEY"));
    assert!(columns[0].contains("INDEXED"));
    assert!(columns[1].contains("a VARCHAR(4)"));
    assert!(columns[2].contains("m FLOAT"));
}

#[test]
fn test_operation_log_written() {
    let mut db = open_test_db();
    exec(&mut db.session, "CREATE DATABASE d");
    exec(&mut db.session, "USE d");
    exec(&mut db.session, "CREATE TABLE t(a INT)");
    let _ = exec_err(&mut db.session, "CREATE TABLE t(a INT)");

    let log = std::fs::read_to_string(db.dir.path().join("shaledb.log")).unwrap();
    assert!(log.contains("TABLE_CREATE"));
    assert!(log.contains("[tester]"));
    assert!(log.contains("Status: FAILED"));

    let errors = std::fs::read_to_string(db.dir.path().join("shaledb_error.log")).unwrap();
    assert!(errors.contains("TABLE_CREATE"));
    assert!(!errors.contains("Status: SUCCESS"));
}
