//! CRUD operations for every library table.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use wadkeeper_core::util::{join_list, split_list};
use wadkeeper_core::{
    ConfigEntry, FileData, FileType, GameFile, IwadData, LaunchSettings, SourcePortData,
    StatRecord, Tag, TagMapping,
};

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
}

impl OperationError {
    fn not_found(entity_type: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

fn expect_changed(changed: usize, entity_type: &str, id: i64) -> Result<(), OperationError> {
    if changed == 0 {
        return Err(OperationError::not_found(entity_type, id));
    }
    Ok(())
}

fn time_to_sql(time: &DateTime<Local>) -> String {
    time.to_rfc3339()
}

fn time_from_sql(idx: usize, text: &str) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Local))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ── Game File Operations ────────────────────────────────────────────────────

const GAME_FILE_COLUMNS: &str = "id, file_name, title, description, source_port_id, iwad_id, map, skill, extra_parameters, files, files_iwad, files_source_port, specific_files, minutes_played, last_played";

fn game_file_from_row(row: &Row<'_>) -> rusqlite::Result<GameFile> {
    let last_played: Option<String> = row.get(14)?;
    Ok(GameFile {
        id: Some(row.get(0)?),
        file_name: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        source_port_id: row.get(4)?,
        iwad_id: row.get(5)?,
        settings: LaunchSettings {
            map: row.get(6)?,
            skill: row.get(7)?,
            extra_parameters: row.get(8)?,
            files: split_list(&row.get::<_, String>(9)?),
            files_iwad: split_list(&row.get::<_, String>(10)?),
            files_source_port: split_list(&row.get::<_, String>(11)?),
            specific_files: split_list(&row.get::<_, String>(12)?),
        },
        minutes_played: row.get(13)?,
        last_played: last_played
            .as_deref()
            .map(|t| time_from_sql(14, t))
            .transpose()?,
    })
}

/// Insert a game file. Returns the generated ID.
pub fn insert_game_file(conn: &Connection, file: &GameFile) -> Result<i64, OperationError> {
    let s = &file.settings;
    conn.execute(
        "INSERT INTO game_files (file_name, title, description, source_port_id, iwad_id, map, skill, extra_parameters, files, files_iwad, files_source_port, specific_files, minutes_played, last_played)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            file.file_name,
            file.title,
            file.description,
            file.source_port_id,
            file.iwad_id,
            s.map,
            s.skill,
            s.extra_parameters,
            join_list(&s.files),
            join_list(&s.files_iwad),
            join_list(&s.files_source_port),
            join_list(&s.specific_files),
            file.minutes_played,
            file.last_played.as_ref().map(time_to_sql),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite every column of an existing game file.
pub fn update_game_file(conn: &Connection, id: i64, file: &GameFile) -> Result<(), OperationError> {
    let s = &file.settings;
    let changed = conn.execute(
        "UPDATE game_files SET
             file_name = ?2, title = ?3, description = ?4, source_port_id = ?5, iwad_id = ?6,
             map = ?7, skill = ?8, extra_parameters = ?9, files = ?10, files_iwad = ?11,
             files_source_port = ?12, specific_files = ?13, minutes_played = ?14, last_played = ?15
         WHERE id = ?1",
        params![
            id,
            file.file_name,
            file.title,
            file.description,
            file.source_port_id,
            file.iwad_id,
            s.map,
            s.skill,
            s.extra_parameters,
            join_list(&s.files),
            join_list(&s.files_iwad),
            join_list(&s.files_source_port),
            join_list(&s.specific_files),
            file.minutes_played,
            file.last_played.as_ref().map(time_to_sql),
        ],
    )?;
    expect_changed(changed, "game file", id)
}

pub fn delete_game_file(conn: &Connection, id: i64) -> Result<(), OperationError> {
    let changed = conn.execute("DELETE FROM game_files WHERE id = ?1", params![id])?;
    expect_changed(changed, "game file", id)
}

/// Find a game file by library name (case-insensitive).
pub fn find_game_file_by_name(
    conn: &Connection,
    file_name: &str,
) -> Result<Option<GameFile>, OperationError> {
    let sql = format!("SELECT {GAME_FILE_COLUMNS} FROM game_files WHERE file_name = ?1");
    Ok(conn
        .query_row(&sql, params![file_name], game_file_from_row)
        .optional()?)
}

pub fn find_game_file(conn: &Connection, id: i64) -> Result<Option<GameFile>, OperationError> {
    let sql = format!("SELECT {GAME_FILE_COLUMNS} FROM game_files WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id], game_file_from_row)
        .optional()?)
}

pub fn list_game_files(conn: &Connection) -> Result<Vec<GameFile>, OperationError> {
    let sql = format!("SELECT {GAME_FILE_COLUMNS} FROM game_files ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], game_file_from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

// ── Source Port Operations ──────────────────────────────────────────────────

fn source_port_from_row(row: &Row<'_>) -> rusqlite::Result<SourcePortData> {
    Ok(SourcePortData {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        executable: PathBuf::from(row.get::<_, String>(2)?),
        supported_extensions: split_list(&row.get::<_, String>(3)?),
        extra_parameters: row.get(4)?,
    })
}

/// Insert a source port. Returns the generated ID.
pub fn insert_source_port(conn: &Connection, port: &SourcePortData) -> Result<i64, OperationError> {
    conn.execute(
        "INSERT INTO source_ports (name, executable, supported_extensions, extra_parameters)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            port.name,
            port.executable.to_string_lossy().into_owned(),
            join_list(&port.supported_extensions),
            port.extra_parameters,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_source_port(
    conn: &Connection,
    id: i64,
    port: &SourcePortData,
) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE source_ports SET name = ?2, executable = ?3, supported_extensions = ?4, extra_parameters = ?5
         WHERE id = ?1",
        params![
            id,
            port.name,
            port.executable.to_string_lossy().into_owned(),
            join_list(&port.supported_extensions),
            port.extra_parameters,
        ],
    )?;
    expect_changed(changed, "source port", id)
}

pub fn delete_source_port(conn: &Connection, id: i64) -> Result<(), OperationError> {
    let changed = conn.execute("DELETE FROM source_ports WHERE id = ?1", params![id])?;
    expect_changed(changed, "source port", id)
}

pub fn find_source_port(
    conn: &Connection,
    id: i64,
) -> Result<Option<SourcePortData>, OperationError> {
    Ok(conn
        .query_row(
            "SELECT id, name, executable, supported_extensions, extra_parameters
             FROM source_ports WHERE id = ?1",
            params![id],
            source_port_from_row,
        )
        .optional()?)
}

pub fn list_source_ports(conn: &Connection) -> Result<Vec<SourcePortData>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, executable, supported_extensions, extra_parameters
         FROM source_ports ORDER BY id",
    )?;
    let rows = stmt.query_map([], source_port_from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

// ── IWAD Operations ─────────────────────────────────────────────────────────

fn iwad_from_row(row: &Row<'_>) -> rusqlite::Result<IwadData> {
    Ok(IwadData {
        id: Some(row.get(0)?),
        game_file_id: row.get(1)?,
        name: row.get(2)?,
    })
}

pub fn insert_iwad(conn: &Connection, iwad: &IwadData) -> Result<i64, OperationError> {
    conn.execute(
        "INSERT INTO iwads (game_file_id, name) VALUES (?1, ?2)",
        params![iwad.game_file_id, iwad.name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_iwad(conn: &Connection, id: i64) -> Result<(), OperationError> {
    let changed = conn.execute("DELETE FROM iwads WHERE id = ?1", params![id])?;
    expect_changed(changed, "iwad", id)
}

pub fn find_iwad(conn: &Connection, id: i64) -> Result<Option<IwadData>, OperationError> {
    Ok(conn
        .query_row(
            "SELECT id, game_file_id, name FROM iwads WHERE id = ?1",
            params![id],
            iwad_from_row,
        )
        .optional()?)
}

pub fn list_iwads(conn: &Connection) -> Result<Vec<IwadData>, OperationError> {
    let mut stmt = conn.prepare("SELECT id, game_file_id, name FROM iwads ORDER BY id")?;
    let rows = stmt.query_map([], iwad_from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

// ── Stats Operations ────────────────────────────────────────────────────────

fn stat_from_row(row: &Row<'_>) -> rusqlite::Result<StatRecord> {
    Ok(StatRecord {
        id: Some(row.get(0)?),
        game_file_id: row.get(1)?,
        source_port_id: row.get(2)?,
        map_name: row.get(3)?,
        kills: row.get(4)?,
        total_kills: row.get(5)?,
        items: row.get(6)?,
        total_items: row.get(7)?,
        secrets: row.get(8)?,
        total_secrets: row.get(9)?,
        level_time: row.get::<_, f64>(10)? as f32,
        recorded_at: time_from_sql(11, &row.get::<_, String>(11)?)?,
    })
}

pub fn insert_stats(conn: &Connection, stats: &StatRecord) -> Result<i64, OperationError> {
    conn.execute(
        "INSERT INTO stats (game_file_id, source_port_id, map_name, kills, total_kills, items, total_items, secrets, total_secrets, level_time, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            stats.game_file_id,
            stats.source_port_id,
            stats.map_name,
            stats.kills,
            stats.total_kills,
            stats.items,
            stats.total_items,
            stats.secrets,
            stats.total_secrets,
            f64::from(stats.level_time),
            time_to_sql(&stats.recorded_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_stats(conn: &Connection, id: i64) -> Result<(), OperationError> {
    let changed = conn.execute("DELETE FROM stats WHERE id = ?1", params![id])?;
    expect_changed(changed, "stats", id)
}

/// Stats for one game file in insertion order.
pub fn stats_for_game_file(
    conn: &Connection,
    game_file_id: i64,
) -> Result<Vec<StatRecord>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT id, game_file_id, source_port_id, map_name, kills, total_kills, items, total_items, secrets, total_secrets, level_time, recorded_at
         FROM stats WHERE game_file_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![game_file_id], stat_from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

// ── Managed File Operations ─────────────────────────────────────────────────

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileData> {
    let file_type: String = row.get(3)?;
    Ok(FileData {
        id: Some(row.get(0)?),
        game_file_id: row.get(1)?,
        source_port_id: row.get(2)?,
        file_type: file_type.parse::<FileType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
        })?,
        file_name: row.get(4)?,
        original_file_name: row.get(5)?,
        description: row.get(6)?,
        created_at: time_from_sql(7, &row.get::<_, String>(7)?)?,
    })
}

pub fn insert_file(conn: &Connection, file: &FileData) -> Result<i64, OperationError> {
    conn.execute(
        "INSERT INTO files (game_file_id, source_port_id, file_type, file_name, original_file_name, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            file.game_file_id,
            file.source_port_id,
            file.file_type.as_str(),
            file.file_name,
            file.original_file_name,
            file.description,
            time_to_sql(&file.created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_file(conn: &Connection, id: i64, file: &FileData) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE files SET game_file_id = ?2, source_port_id = ?3, file_type = ?4, file_name = ?5,
             original_file_name = ?6, description = ?7, created_at = ?8
         WHERE id = ?1",
        params![
            id,
            file.game_file_id,
            file.source_port_id,
            file.file_type.as_str(),
            file.file_name,
            file.original_file_name,
            file.description,
            time_to_sql(&file.created_at),
        ],
    )?;
    expect_changed(changed, "file", id)
}

pub fn delete_file(conn: &Connection, id: i64) -> Result<(), OperationError> {
    let changed = conn.execute("DELETE FROM files WHERE id = ?1", params![id])?;
    expect_changed(changed, "file", id)
}

/// Managed files for one game file, optionally of one type.
pub fn files_for_game_file(
    conn: &Connection,
    game_file_id: i64,
    file_type: Option<FileType>,
) -> Result<Vec<FileData>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT id, game_file_id, source_port_id, file_type, file_name, original_file_name, description, created_at
         FROM files WHERE game_file_id = ?1 AND (?2 IS NULL OR file_type = ?2) ORDER BY id",
    )?;
    let rows = stmt.query_map(
        params![game_file_id, file_type.map(|t| t.as_str())],
        file_from_row,
    )?;
    Ok(rows.collect::<Result<_, _>>()?)
}

// ── Tag Operations ──────────────────────────────────────────────────────────

pub fn insert_tag(conn: &Connection, tag: &Tag) -> Result<i64, OperationError> {
    conn.execute("INSERT INTO tags (name) VALUES (?1)", params![tag.name])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>, OperationError> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Tag {
            id: Some(row.get(0)?),
            name: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

pub fn insert_tag_mapping(conn: &Connection, mapping: &TagMapping) -> Result<(), OperationError> {
    conn.execute(
        "INSERT OR IGNORE INTO tag_mappings (tag_id, game_file_id) VALUES (?1, ?2)",
        params![mapping.tag_id, mapping.game_file_id],
    )?;
    Ok(())
}

pub fn delete_tag_mapping(conn: &Connection, mapping: &TagMapping) -> Result<(), OperationError> {
    conn.execute(
        "DELETE FROM tag_mappings WHERE tag_id = ?1 AND game_file_id = ?2",
        params![mapping.tag_id, mapping.game_file_id],
    )?;
    Ok(())
}

pub fn tag_mappings_for_game_file(
    conn: &Connection,
    game_file_id: i64,
) -> Result<Vec<TagMapping>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT tag_id, game_file_id FROM tag_mappings WHERE game_file_id = ?1 ORDER BY tag_id",
    )?;
    let rows = stmt.query_map(params![game_file_id], |row| {
        Ok(TagMapping {
            tag_id: row.get(0)?,
            game_file_id: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

// ── Configuration Operations ────────────────────────────────────────────────

pub fn list_configuration(conn: &Connection) -> Result<Vec<ConfigEntry>, OperationError> {
    let mut stmt = conn.prepare("SELECT name, value FROM configuration ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(ConfigEntry {
            name: row.get(0)?,
            value: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

/// Insert or update one configuration value.
pub fn set_config_value(conn: &Connection, name: &str, value: &str) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO configuration (name, value) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value",
        params![name, value],
    )?;
    Ok(())
}
