use customer_store_core::db::migrations::latest_version;
use customer_store_core::db::schema::{
    ADDRESS_CUSTOMER_ID_INDEX, CUSTOMER_FIRST_NAME_INDEX, TABLES,
};
use customer_store_core::db::{open_db, open_db_in_memory, open_with_config, DbError};
use customer_store_core::{DatabaseTarget, RepoError, StoreConfig};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_object_exists(&conn, "table", "customer");
    assert_object_exists(&conn, "table", "address");
    assert_object_exists(&conn, "index", CUSTOMER_FIRST_NAME_INDEX);
    assert_object_exists(&conn, "index", ADDRESS_CUSTOMER_ID_INDEX);
    assert_object_exists(&conn, "trigger", "customer_immutable_columns");
    assert_object_exists(&conn, "trigger", "address_immutable_columns");
}

#[test]
fn open_db_enables_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn schema_declarations_match_migrated_tables() {
    let conn = open_db_in_memory().unwrap();

    for table in TABLES {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({});", table.name))
            .unwrap();
        let migrated: Vec<(String, bool)> = stmt
            .query_map([], |row| Ok((row.get(1)?, row.get::<_, i64>(3)? == 1)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let declared: Vec<(String, bool)> = table
            .columns
            .iter()
            .map(|column| (column.name.to_string(), !column.nullable))
            .collect();
        assert_eq!(migrated, declared, "table {} drifted", table.name);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("customers.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_object_exists(&conn_second, "table", "customer");
}

#[test]
fn open_with_config_uses_configured_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");
    let config = StoreConfig {
        database: DatabaseTarget::File(path.clone()),
        ..StoreConfig::default()
    };

    let conn = open_with_config(&config).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert!(path.exists());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unreachable_database_is_a_connectivity_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("customers.db");

    let err = RepoError::from(open_db(&path).unwrap_err());
    assert!(matches!(err, RepoError::Connectivity(_)), "unexpected error: {err}");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_object_exists(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
