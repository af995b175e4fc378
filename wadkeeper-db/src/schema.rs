//! SQLite schema creation and migration.

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: expected version {expected}, found {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Current schema version. Increment when adding migrations.
pub const CURRENT_VERSION: i32 = 1;

/// Create all tables and indexes if they don't exist.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Open or create a library database at the given path.
pub fn open_database(path: &Path) -> Result<Connection, SchemaError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let version = get_schema_version(&conn)?;
    if version == 0 {
        log::debug!("Creating library schema in {}", path.display());
        create_schema(&conn)?;
    } else if version != CURRENT_VERSION {
        return Err(SchemaError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: version,
        });
    }

    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the current schema version, or 0 if no schema exists.
pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Engine executables
CREATE TABLE IF NOT EXISTS source_ports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    executable TEXT NOT NULL,
    supported_extensions TEXT NOT NULL DEFAULT '',
    extra_parameters TEXT
);

-- Library archives, one row per <base>.zip
CREATE TABLE IF NOT EXISTS game_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    title TEXT,
    description TEXT,
    source_port_id INTEGER REFERENCES source_ports(id) ON DELETE SET NULL,
    iwad_id INTEGER,
    map TEXT,
    skill TEXT,
    extra_parameters TEXT,
    files TEXT NOT NULL DEFAULT '',
    files_iwad TEXT NOT NULL DEFAULT '',
    files_source_port TEXT NOT NULL DEFAULT '',
    specific_files TEXT NOT NULL DEFAULT '',
    minutes_played INTEGER NOT NULL DEFAULT 0,
    last_played TEXT
);

CREATE TABLE IF NOT EXISTS iwads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_file_id INTEGER NOT NULL REFERENCES game_files(id),
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_iwads_game_file ON iwads(game_file_id);

CREATE TABLE IF NOT EXISTS stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_file_id INTEGER REFERENCES game_files(id),
    source_port_id INTEGER REFERENCES source_ports(id) ON DELETE SET NULL,
    map_name TEXT NOT NULL,
    kills INTEGER NOT NULL,
    total_kills INTEGER NOT NULL,
    items INTEGER NOT NULL,
    total_items INTEGER NOT NULL,
    secrets INTEGER NOT NULL,
    total_secrets INTEGER NOT NULL,
    level_time REAL NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stats_game_file ON stats(game_file_id);

-- Managed screenshots, save games and demos
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_file_id INTEGER NOT NULL REFERENCES game_files(id),
    source_port_id INTEGER REFERENCES source_ports(id) ON DELETE SET NULL,
    file_type TEXT NOT NULL,
    file_name TEXT NOT NULL,
    original_file_name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_game_file ON files(game_file_id, file_type);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS tag_mappings (
    tag_id INTEGER NOT NULL REFERENCES tags(id),
    game_file_id INTEGER NOT NULL REFERENCES game_files(id),
    PRIMARY KEY (tag_id, game_file_id)
);

CREATE TABLE IF NOT EXISTS configuration (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
