//! End-to-end tests of the fluent layer over the SQLite native client

use tempfile::{NamedTempFile, TempDir};

use fluentdb::{CommonOptions, Connection, FluentError, Value};

fn memory_connection() -> Connection {
    let mut conn = Connection::for_engine("sqlite", ":memory:").unwrap();
    assert!(conn.connect(), "{:?}", conn.error_message());
    conn
}

fn create_users(conn: &Connection) {
    let response = conn
        .query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, active BOOLEAN, note TEXT)")
        .unwrap()
        .exec();
    assert!(response.succeeded());
    assert_eq!(response.write().unwrap().affected_rows(), 0);

    for (name, active) in [("ann", true), ("bob", false), ("cy", true)] {
        let response = conn
            .query("INSERT INTO users (name, active, note) VALUES (:name, :active, :note)")
            .unwrap()
            .bind_string("name", name)
            .bind_boolean("active", active)
            .bind_string("note", "")
            .exec();
        assert!(response.succeeded(), "{:?}", response.error_message());
        assert_eq!(response.write().unwrap().affected_rows(), 1);
    }
}

#[test]
fn test_write_then_read() {
    let conn = memory_connection();
    create_users(&conn);

    let response = conn
        .query("SELECT id, name, active FROM users WHERE id = :id")
        .unwrap()
        .bind_integer("id", 1)
        .get();
    assert!(response.succeeded());

    let rows = response.read().unwrap();
    assert_eq!(rows.field("name").unwrap(), &Value::from("ann"));
    assert_eq!(rows.field("active").unwrap(), &Value::Integer(1));
    insta::assert_snapshot!(rows.to_json().unwrap(), @r###"[{"id":1,"name":"ann","active":1}]"###);
}

#[test]
fn test_update_reports_affected_rows() {
    let conn = memory_connection();
    create_users(&conn);

    let response = conn
        .query("UPDATE  users  SET active = :active WHERE active = 1")
        .unwrap()
        .bind_boolean("active", false)
        .exec();
    assert_eq!(response.sql(), "UPDATE users SET active = :active WHERE active = 1");
    assert_eq!(response.write().unwrap().affected_rows(), 2);

    let response = conn.query("SELECT name FROM users WHERE active = 0 ORDER BY id").unwrap().get();
    let rows = response.read().unwrap();
    assert_eq!(rows.row_count().unwrap(), 3);
    assert_eq!(rows.last().unwrap().get("name").unwrap(), &Value::from("cy"));
    assert!(matches!(rows.field("name"), Err(FluentError::InvalidRowIndex(_))));
}

#[test]
fn test_fetch_options_shape_rows() {
    let mut conn = Connection::for_engine("sqlite", ":memory:").unwrap();
    conn.uppercase().stringify(true).empty_string_to_null();
    assert!(conn.connect());
    create_users(&conn);

    let response = conn.query("SELECT id, note FROM users ORDER BY id").unwrap().get();
    let rows = response.read().unwrap();
    assert_eq!(rows.column_names().unwrap(), vec!["ID", "NOTE"]);
    assert_eq!(rows.first().unwrap().get("ID").unwrap(), &Value::from("1"));
    assert_eq!(rows.first().unwrap().get("NOTE").unwrap(), &Value::Null);
}

#[test]
fn test_null_to_empty_string() {
    let mut conn = Connection::for_engine("sqlite", ":memory:").unwrap();
    conn.null_to_empty_string();
    assert!(conn.connect());

    let response = conn.query("SELECT NULL AS nothing").unwrap().get();
    assert_eq!(response.read().unwrap().field("nothing").unwrap(), &Value::from(""));
}

#[test]
fn test_prepare_failure_is_a_failed_query() {
    let conn = memory_connection();

    let response = conn.query("SELECT * FROM missing").unwrap().get();
    assert!(!response.succeeded());
    assert!(response.error_message().unwrap().contains("no such table"));
    assert!(response.read().unwrap().is_empty().unwrap());
}

#[test]
fn test_failed_execution_keeps_connection_usable() {
    let conn = memory_connection();
    create_users(&conn);

    let response = conn
        .query("INSERT INTO users (id, name) VALUES (:id, :name)")
        .unwrap()
        .bind_integer("id", 1)
        .bind_string("name", "dup")
        .exec();
    assert!(!response.succeeded());
    assert!(response.error_message().unwrap().contains("UNIQUE"));
    assert_eq!(response.write().unwrap().affected_rows(), 0);

    let response = conn.query("SELECT count(*) AS total FROM users").unwrap().get();
    assert_eq!(response.read().unwrap().field("total").unwrap(), &Value::Integer(3));
}

#[test]
fn test_query_before_connect() {
    let conn = Connection::for_engine("sqlite", ":memory:").unwrap();
    assert!(matches!(conn.query("SELECT 1"), Err(FluentError::NotConnected(_))));
}

#[test]
fn test_file_database_with_pragmas() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let mut conn = Connection::for_engine("sqlite", &path).unwrap();
    conn.sqlite_options()
        .unwrap()
        .foreign_keys(true)
        .journal_mode("wal")
        .busy_timeout(1);
    assert!(conn.connect(), "{:?}", conn.error_message());
    assert_eq!(conn.dsn(), Some(format!("sqlite:dbname={}", path).as_str()));

    for sql in [
        "CREATE TABLE teams (id INTEGER PRIMARY KEY)",
        "CREATE TABLE members (id INTEGER PRIMARY KEY, team_id INTEGER REFERENCES teams(id))",
    ] {
        assert!(conn.query(sql).unwrap().exec().succeeded());
    }

    let response = conn
        .query("INSERT INTO members (team_id) VALUES (:team)")
        .unwrap()
        .bind_integer("team", 42)
        .exec();
    assert!(!response.succeeded());
    assert!(response.error_message().unwrap().contains("FOREIGN KEY"));

    let response = conn.query("PRAGMA journal_mode").unwrap().get();
    assert_eq!(
        response.read().unwrap().field("journal_mode").unwrap(),
        &Value::from("wal")
    );
}

#[test]
fn test_close_and_reconnect() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.db");

    let mut conn = Connection::for_engine("sqlite", path.to_str().unwrap()).unwrap();
    assert!(conn.connect());
    assert!(conn.query("CREATE TABLE t (x INTEGER)").unwrap().exec().succeeded());
    assert!(conn.query("INSERT INTO t VALUES (7)").unwrap().exec().succeeded());

    conn.close();
    assert!(!conn.is_connected());
    assert!(conn.native_handle().is_none());
    assert!(matches!(conn.query("SELECT x FROM t"), Err(FluentError::NotConnected(_))));

    assert!(conn.connect());
    let response = conn.query("SELECT x FROM t").unwrap().get();
    assert_eq!(response.read().unwrap().pluck("x").unwrap(), vec![&Value::Integer(7)]);
}

#[test]
fn test_explicit_dsn_wins() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("explicit.db");

    let mut conn = Connection::for_engine("sqlite", "ignored.db").unwrap();
    conn.set_dsn(format!("sqlite:dbname={}", path.display()));
    assert!(conn.connect());
    assert!(conn.dsn_segments().is_empty());
    assert!(path.exists());
}

#[test]
fn test_unopenable_database() {
    let mut conn = Connection::for_engine("sqlite", "/nonexistent/dir/app.db").unwrap();
    assert!(!conn.connect());
    assert!(!conn.is_connected());
    assert!(conn.error_message().is_some());

    // a second attempt tries again
    assert!(!conn.connect());
}

#[test]
fn test_mismatched_option_surface() {
    let mut conn = Connection::for_engine("sqlite", ":memory:").unwrap();
    match conn.mysql_options().err().unwrap() {
        FluentError::UnknownDriverMethod { engine, .. } => assert_eq!(engine, "sqlite"),
        other => panic!("Expected UnknownDriverMethod, got {:?}", other),
    }
}

#[test]
fn test_insert_returning_reports_affected_rows() {
    let conn = memory_connection();
    create_users(&conn);

    let response = conn
        .query("INSERT INTO users (name) VALUES (:a), (:b) RETURNING id")
        .unwrap()
        .bind_string("a", "di")
        .bind_string("b", "ed")
        .exec();
    assert!(response.succeeded());
    assert_eq!(response.write().unwrap().affected_rows(), 2);

    let response = conn.query("SELECT count(*) AS total FROM users").unwrap().get();
    assert_eq!(response.read().unwrap().field("total").unwrap(), &Value::Integer(5));
}

#[test]
fn test_blank_statement_reports_empty_statement() {
    let conn = memory_connection();

    let response = conn.query("   ").unwrap().get();
    assert!(!response.succeeded());
    assert_eq!(response.error_message(), Some("empty statement"));
}

#[test]
fn test_database_path_with_semicolon() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("team;archive.db");

    let mut conn = Connection::for_engine("sqlite", path.to_str().unwrap()).unwrap();
    assert!(conn.connect(), "{:?}", conn.error_message());
    assert!(conn.query("CREATE TABLE t (x INTEGER)").unwrap().exec().succeeded());
    assert!(path.exists());
}
