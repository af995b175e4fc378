use wadkeeper_db::schema::{CURRENT_VERSION, get_schema_version};
use wadkeeper_db::*;

#[test]
fn memory_database_has_current_version() {
    let conn = open_memory().unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
}

#[test]
fn reopening_a_file_database_keeps_data() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("wadkeeper.db");
    {
        let conn = open_database(&path).unwrap();
        conn.execute(
            "INSERT INTO configuration (name, value) VALUES ('DefaultSkill', '4')",
            [],
        )
        .unwrap();
    }
    let conn = open_database(&path).unwrap();
    let value: String = conn
        .query_row(
            "SELECT value FROM configuration WHERE name = 'DefaultSkill'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, "4");
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
}

#[test]
fn newer_schema_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("wadkeeper.db");
    {
        let conn = open_database(&path).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (99)", [])
            .unwrap();
    }
    assert!(matches!(
        open_database(&path),
        Err(SchemaError::VersionMismatch { found: 99, .. })
    ));
}
