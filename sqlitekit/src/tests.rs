//! Unit tests for the wrapper.

use std::sync::mpsc;
use std::time::Duration;

use super::*;

fn scratch() -> Connection {
    Connection::open_in_memory().expect("open in-memory db")
}

// ── Error taxonomy ──────────────────────────────────────────────────────

#[test]
fn test_error_code_canonical_text() {
    let mapped = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 14, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
        100, 101,
    ];
    for raw in mapped {
        let code = ErrorCode::from_raw(raw);
        assert_eq!(code.raw(), raw);
        let text = code.to_string();
        assert!(!text.is_empty());
        assert!(!text.starts_with("errno"), "code {raw} fell back: {text}");
    }
    // The two unused gaps and anything unmapped fall back to the numeral.
    for raw in [12, 15, 0, 27, 999] {
        assert_eq!(ErrorCode::from_raw(raw).to_string(), format!("errno {raw}"));
    }
}

#[test]
fn test_misuse_renders_without_diagnostic() {
    let conn = scratch();
    let misuse = conn.error_for(21);
    assert_eq!(misuse, Error::Status(ErrorCode::Misuse));
    assert!(!misuse.to_string().contains(": "));

    let other = conn.error_for(1);
    assert!(matches!(other, Error::Engine { code: ErrorCode::Error, .. }));
    assert!(other.to_string().contains(": "));
}

#[test]
fn test_error_rendering_on_closed_connection() {
    let mut conn = scratch();
    conn.close().expect("close");
    assert_eq!(conn.error_for(1), Error::Closed);
}

// ── Connection lifecycle ────────────────────────────────────────────────

#[test]
fn test_version() {
    let v = version();
    assert!(!v.is_empty());
    assert!(v.starts_with('3'));
}

#[test]
fn test_open_creates_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fresh.db");
    let conn = Connection::open(&path).expect("open creates the file");
    conn.exec("CREATE TABLE t (v INT)", &[]).expect("create table");
    assert!(path.exists());
}

#[test]
fn test_open_fails_without_containing_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("db.sqlite");
    let err = Connection::open(&path).expect_err("open must fail");
    assert!(matches!(err, Error::Engine { code: ErrorCode::CantOpen, .. }));
}

#[test]
fn test_closed_connection_fails_fast() {
    let mut conn = scratch();
    conn.close().expect("first close");
    assert_eq!(conn.close(), Err(Error::Closed));
    assert!(matches!(conn.prepare("SELECT 1"), Err(Error::Closed)));
    assert!(matches!(conn.exec("SELECT 1", &[]), Err(Error::Closed)));
    assert!(matches!(
        conn.busy_timeout(Duration::from_millis(10)),
        Err(Error::Closed)
    ));
    assert!(matches!(conn.changes(), Err(Error::Closed)));
    assert!(matches!(conn.last_insert_rowid(), Err(Error::Closed)));
}

#[test]
fn test_busy_timeout() {
    let conn = scratch();
    conn.busy_timeout(Duration::from_millis(250)).expect("set timeout");
}

#[test]
fn test_exec_rejects_result_rows() {
    let conn = scratch();
    let err = conn.exec("SELECT 1", &[]).expect_err("a query is not exec-able");
    assert!(matches!(err, Error::Engine { code: ErrorCode::Row, .. }));
}

#[test]
fn test_exec_bookkeeping() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", &[])
        .expect("create table");
    conn.exec("INSERT INTO t (v) VALUES (?1)", params!["hello"])
        .expect("insert");
    assert_eq!(conn.changes().expect("changes"), 1);
    assert_eq!(conn.last_insert_rowid().expect("rowid"), 1);
}

// ── Binding ─────────────────────────────────────────────────────────────

#[test]
fn test_bind_argument_count_mismatch() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (a INT, b TEXT)", &[]).expect("create table");
    let mut stmt = conn
        .prepare("INSERT INTO t (a, b) VALUES (?1, ?2)")
        .expect("prepare");
    assert_eq!(
        stmt.bind(params![1]),
        Err(Error::ArgumentCount { have: 1, want: 2 })
    );
    assert_eq!(
        stmt.bind(params![1, "x", 3]),
        Err(Error::ArgumentCount { have: 3, want: 2 })
    );
}

#[test]
fn test_bool_round_trip() {
    let conn = scratch();
    conn.exec("CREATE TABLE flags (v TEXT)", &[]).expect("create table");

    for (bound, expected) in [(Value::Bool(true), true), (Value::Bool(false), false)] {
        conn.exec("DELETE FROM flags", &[]).expect("clear");
        conn.exec("INSERT INTO flags (v) VALUES (?1)", &[bound])
            .expect("insert");
        let mut stmt = conn.prepare("SELECT v FROM flags").expect("prepare");
        assert!(stmt.next());
        let mut flag = !expected;
        stmt.scan(targets![&mut flag]).expect("scan");
        assert_eq!(flag, expected);
    }

    // The literal text "0" is falsy as well.
    conn.exec("DELETE FROM flags", &[]).expect("clear");
    conn.exec("INSERT INTO flags (v) VALUES (?1)", params!["0"])
        .expect("insert");
    let mut stmt = conn.prepare("SELECT v FROM flags").expect("prepare");
    assert!(stmt.next());
    let mut flag = true;
    stmt.scan(targets![&mut flag]).expect("scan");
    assert!(!flag);
}

#[test]
fn test_empty_blob_round_trip() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (data BLOB)", &[]).expect("create table");
    conn.exec("INSERT INTO t (data) VALUES (?1)", params![Vec::<u8>::new()])
        .expect("insert");
    let mut stmt = conn.prepare("SELECT data FROM t").expect("prepare");
    assert!(stmt.next());
    let mut data = vec![0xFF];
    stmt.scan(targets![&mut data]).expect("scan");
    assert!(data.is_empty());
}

#[test]
fn test_blob_round_trip() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (data BLOB)", &[]).expect("create table");
    let payload = vec![0xDE, 0xAD, 0xBE, 0xEF];
    conn.exec("INSERT INTO t (data) VALUES (?1)", params![payload.as_slice()])
        .expect("insert");
    let mut stmt = conn.prepare("SELECT data FROM t").expect("prepare");
    assert!(stmt.next());
    let mut data = Vec::new();
    stmt.scan(targets![&mut data]).expect("scan");
    assert_eq!(data, payload);
}

// ── Stepping and scanning ───────────────────────────────────────────────

#[test]
fn test_next_done_records_no_error() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (v INT)", &[]).expect("create table");
    let mut stmt = conn.prepare("SELECT v FROM t").expect("prepare");
    assert!(!stmt.next());
    assert!(stmt.error().is_none());
}

#[test]
fn test_next_failure_records_error() {
    let conn = scratch();
    conn.exec("CREATE TABLE u (v TEXT UNIQUE)", &[]).expect("create table");
    conn.exec("INSERT INTO u (v) VALUES (?1)", params!["dup"])
        .expect("first insert");

    let mut stmt = conn.prepare("INSERT INTO u (v) VALUES (?1)").expect("prepare");
    stmt.bind(params!["dup"]).expect("bind");
    assert!(!stmt.next());
    let err = stmt.error().expect("constraint violation must be recorded");
    assert!(matches!(err, Error::Engine { code: ErrorCode::Constraint, .. }));
}

#[test]
fn test_reset_rewinds_cursor() {
    let conn = scratch();
    conn.exec("CREATE TABLE n (v INT)", &[]).expect("create table");
    conn.exec("INSERT INTO n (v) VALUES (?1)", params![1]).expect("insert");
    conn.exec("INSERT INTO n (v) VALUES (?1)", params![2]).expect("insert");

    let mut stmt = conn.prepare("SELECT v FROM n ORDER BY v").expect("prepare");
    assert!(stmt.next());
    assert!(stmt.next());
    assert!(!stmt.next());
    assert!(stmt.error().is_none());

    stmt.reset().expect("reset");
    assert!(stmt.next());
    let mut v = 0_i32;
    stmt.scan(targets![&mut v]).expect("scan");
    assert_eq!(v, 1);
}

#[test]
fn test_scan_argument_count_mismatch() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (a INT, b TEXT)", &[]).expect("create table");
    conn.exec("INSERT INTO t (a, b) VALUES (?1, ?2)", params![1, "x"])
        .expect("insert");
    let mut stmt = conn.prepare("SELECT a, b FROM t").expect("prepare");
    assert!(stmt.next());
    let mut a = 0_i32;
    assert_eq!(
        stmt.scan(targets![&mut a]),
        Err(Error::ArgumentCount { have: 1, want: 2 })
    );
}

#[test]
fn test_scan_conversion_failure_names_column_and_target() {
    let conn = scratch();
    let mut stmt = conn.prepare("SELECT 'abc'").expect("prepare");
    assert!(stmt.next());
    let mut v = 0_i32;
    let err = stmt.scan(targets![&mut v]).expect_err("parse must fail");
    assert!(matches!(
        err,
        Error::Conversion { column: 0, target: "i32", .. }
    ));
}

#[test]
fn test_column_value_follows_affinity() {
    let conn = scratch();
    conn.exec("CREATE TABLE vals (a INT, b TEXT, c REAL, d BLOB)", &[])
        .expect("create table");
    conn.exec(
        "INSERT INTO vals (a, b, c, d) VALUES (?1, ?2, ?3, ?4)",
        params![7, "x", 1.5, vec![0xDE_u8, 0xAD]],
    )
    .expect("insert");

    let mut stmt = conn.prepare("SELECT a, b, c, d FROM vals").expect("prepare");
    assert!(stmt.next());
    // Bound as text, but column affinity restores the storage classes.
    assert_eq!(stmt.column_value(0).expect("a"), Value::Integer(7));
    assert_eq!(stmt.column_value(1).expect("b"), Value::Text("x".to_string()));
    assert_eq!(stmt.column_value(2).expect("c"), Value::Float(1.5));
    assert_eq!(stmt.column_value(3).expect("d"), Value::Blob(vec![0xDE, 0xAD]));
}

#[test]
fn test_insert_and_scan_round_trip() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (a INT, b TEXT)", &[]).expect("create table");
    conn.exec("INSERT INTO t (a, b) VALUES (?1, ?2)", params![1, "x"])
        .expect("insert");

    let mut stmt = conn.prepare("SELECT a, b FROM t").expect("prepare");
    assert!(stmt.next());
    let (mut a, mut b) = (0_i32, String::new());
    stmt.scan(targets![&mut a, &mut b]).expect("scan");
    assert_eq!((a, b.as_str()), (1, "x"));
    assert!(!stmt.next());
    assert!(stmt.error().is_none());
}

// ── Diagnostics ─────────────────────────────────────────────────────────

#[test]
fn test_sql_and_elapsed_diagnostics() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (a INT, b TEXT)", &[]).expect("create table");
    let mut stmt = conn
        .prepare("INSERT INTO t (a, b) VALUES (?1, ?2)")
        .expect("prepare");
    assert_eq!(stmt.sql(), "INSERT INTO t (a, b) VALUES (?1, ?2)");

    stmt.bind(params![42, "answer"]).expect("bind");
    let rendered = stmt.sql();
    assert!(rendered.contains("INSERT INTO t"));
    assert!(rendered.contains("[42, answer]"));

    std::thread::sleep(Duration::from_millis(2));
    assert!(stmt.elapsed() >= Duration::from_millis(2));
}

#[test]
fn test_finalize() {
    let conn = scratch();
    let stmt = conn.prepare("SELECT 1").expect("prepare");
    stmt.finalize().expect("finalize");
}

// ── Transactions ────────────────────────────────────────────────────────

#[test]
fn test_transaction_commit() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
        .expect("create table");
    {
        let tx = conn.transaction().expect("begin tx");
        tx.exec("INSERT INTO t (id) VALUES (?1)", params![42]).expect("insert");
        tx.commit().expect("commit");
    }
    let mut stmt = conn.prepare("SELECT id FROM t").expect("prepare");
    assert!(stmt.next());
    let mut id = 0_i64;
    stmt.scan(targets![&mut id]).expect("scan");
    assert_eq!(id, 42);
}

#[test]
fn test_transaction_rollback_on_drop() {
    let conn = scratch();
    conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
        .expect("create table");
    {
        let tx = conn.transaction().expect("begin tx");
        tx.exec("INSERT INTO t (id) VALUES (?1)", params![99]).expect("insert");
        // Drop without commit -> rollback
    }
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM t").expect("prepare");
    assert!(stmt.next());
    let mut count = 0_i64;
    stmt.scan(targets![&mut count]).expect("scan");
    assert_eq!(count, 0);
}

// ── Backup ──────────────────────────────────────────────────────────────

fn populated_source(rows: i32) -> Connection {
    let src = scratch();
    src.exec("CREATE TABLE t (v INT)", &[]).expect("create table");
    for i in 0..rows {
        src.exec("INSERT INTO t (v) VALUES (?1)", params![i]).expect("insert");
    }
    src
}

#[test]
fn test_backup_run_copies_everything() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = Connection::open(&dir.path().join("src.db")).expect("open src");
    src.exec("CREATE TABLE t (v INT)", &[]).expect("create table");
    for i in 0..64 {
        src.exec("INSERT INTO t (v) VALUES (?1)", params![i]).expect("insert");
    }
    let dst = Connection::open(&dir.path().join("dst.db")).expect("open dst");

    let mut backup = Backup::new(&dst, "main", &src, "main").expect("init backup");
    let (tx, rx) = mpsc::channel();
    backup
        .run(2, Duration::from_millis(1), Some(&tx), None)
        .expect("run to completion");
    backup.close().expect("close backup");

    let snapshots: Vec<BackupProgress> = rx.try_iter().collect();
    let last = snapshots.last().expect("at least one progress snapshot");
    assert_eq!(last.remaining, 0);
    assert!(last.page_count > 0);

    let mut stmt = dst.prepare("SELECT COUNT(*) FROM t").expect("prepare");
    assert!(stmt.next());
    let mut count = 0_i64;
    stmt.scan(targets![&mut count]).expect("scan");
    assert_eq!(count, 64);
}

#[test]
fn test_backup_stepwise() {
    let src = populated_source(16);
    let dst = scratch();
    let mut backup = Backup::new(&dst, "main", &src, "main").expect("init backup");

    loop {
        match backup.step(1).expect("step") {
            BackupStep::Done => break,
            BackupStep::More | BackupStep::Busy => {}
        }
    }
    let progress = backup.status().expect("status");
    assert_eq!(progress.remaining, 0);
    assert!(progress.page_count > 0);
}

#[test]
fn test_backup_step_busy_is_transient() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dst_path = dir.path().join("dst.db");
    let dst = Connection::open(&dst_path).expect("open dst");
    let locker = Connection::open(&dst_path).expect("open second handle");
    locker
        .exec("CREATE TABLE lock_holder (v INT)", &[])
        .expect("create table");

    // A write transaction through the second handle locks the destination
    // file, so stepping reports busy instead of copying.
    let tx = locker.transaction_immediate().expect("begin immediate");
    tx.exec("INSERT INTO lock_holder (v) VALUES (?1)", params![1])
        .expect("insert");

    let src = populated_source(4);
    let mut backup = Backup::new(&dst, "main", &src, "main").expect("init backup");
    assert_eq!(backup.step(-1).expect("busy is not an error"), BackupStep::Busy);
    assert_eq!(backup.step(1).expect("busy is not an error"), BackupStep::Busy);

    // Releasing the lock lets the copy finish.
    drop(tx);
    loop {
        match backup.step(-1).expect("step") {
            BackupStep::Done => break,
            BackupStep::More | BackupStep::Busy => {}
        }
    }
}

#[test]
fn test_backup_double_close() {
    let src = populated_source(1);
    let dst = scratch();
    let mut backup = Backup::new(&dst, "main", &src, "main").expect("init backup");
    backup.close().expect("first close");
    assert_eq!(backup.close(), Err(Error::BackupClosed));
    assert_eq!(backup.step(1), Err(Error::BackupClosed));
    assert!(matches!(backup.status(), Err(Error::BackupClosed)));
}

#[test]
fn test_backup_init_rejects_same_connection() {
    let conn = populated_source(1);
    let err = Backup::new(&conn, "main", &conn, "main").expect_err("must fail");
    assert!(matches!(err, Error::Engine { .. }));
}

#[test]
fn test_backup_init_rejects_closed_connection() {
    let mut src = scratch();
    let dst = scratch();
    src.close().expect("close src");
    assert!(matches!(
        Backup::new(&dst, "main", &src, "main"),
        Err(Error::Closed)
    ));
}

#[test]
fn test_backup_run_cancelled() {
    let src = populated_source(4);
    let dst = scratch();
    let mut backup = Backup::new(&dst, "main", &src, "main").expect("init backup");

    let token = CancelToken::new();
    token.cancel();
    let err = backup
        .run(1, Duration::ZERO, None, Some(&token))
        .expect_err("cancelled before the first step");
    assert_eq!(err, Error::Cancelled);
}
