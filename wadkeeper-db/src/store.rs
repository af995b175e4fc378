//! [`MetadataStore`] on top of a SQLite connection.

use std::path::Path;

use rusqlite::{Connection, ErrorCode};
use wadkeeper_core::store::StoreResult;
use wadkeeper_core::{
    ConfigEntry, FileData, FileType, GameFile, IwadData, MetadataStore, SourcePortData,
    StatRecord, StoreError, Tag, TagMapping,
};

use crate::operations::{self as ops, OperationError};
use crate::schema::{SchemaError, open_database, open_memory};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, SchemaError> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    pub fn in_memory() -> Result<Self, SchemaError> {
        Ok(Self {
            conn: open_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn store_error(entity: &'static str, err: OperationError) -> StoreError {
    match err {
        OperationError::NotFound { id, .. } => StoreError::not_found(entity, id),
        OperationError::Sqlite(rusqlite::Error::SqliteFailure(e, msg))
            if e.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::invalid(entity, msg.unwrap_or_else(|| e.to_string()))
        }
        other => StoreError::backend(other.to_string()),
    }
}

fn require_id(entity: &'static str, id: Option<i64>) -> StoreResult<i64> {
    id.ok_or_else(|| StoreError::invalid(entity, "record has no id"))
}

impl MetadataStore for SqliteStore {
    // ── Game files ──────────────────────────────────────────────────────
    fn game_files(&self) -> StoreResult<Vec<GameFile>> {
        ops::list_game_files(&self.conn).map_err(|e| store_error("game file", e))
    }

    fn game_file(&self, file_name: &str) -> StoreResult<Option<GameFile>> {
        ops::find_game_file_by_name(&self.conn, file_name).map_err(|e| store_error("game file", e))
    }

    fn game_file_by_id(&self, id: i64) -> StoreResult<Option<GameFile>> {
        ops::find_game_file(&self.conn, id).map_err(|e| store_error("game file", e))
    }

    fn insert_game_file(&mut self, file: &GameFile) -> StoreResult<i64> {
        ops::insert_game_file(&self.conn, file).map_err(|e| store_error("game file", e))
    }

    fn update_game_file(&mut self, file: &GameFile) -> StoreResult<()> {
        let id = require_id("game file", file.id)?;
        ops::update_game_file(&self.conn, id, file).map_err(|e| store_error("game file", e))
    }

    fn delete_game_file(&mut self, id: i64) -> StoreResult<()> {
        ops::delete_game_file(&self.conn, id).map_err(|e| store_error("game file", e))
    }

    // ── Source ports ────────────────────────────────────────────────────
    fn source_ports(&self) -> StoreResult<Vec<SourcePortData>> {
        ops::list_source_ports(&self.conn).map_err(|e| store_error("source port", e))
    }

    fn source_port(&self, id: i64) -> StoreResult<Option<SourcePortData>> {
        ops::find_source_port(&self.conn, id).map_err(|e| store_error("source port", e))
    }

    fn insert_source_port(&mut self, port: &SourcePortData) -> StoreResult<i64> {
        ops::insert_source_port(&self.conn, port).map_err(|e| store_error("source port", e))
    }

    fn update_source_port(&mut self, port: &SourcePortData) -> StoreResult<()> {
        let id = require_id("source port", port.id)?;
        ops::update_source_port(&self.conn, id, port).map_err(|e| store_error("source port", e))
    }

    fn delete_source_port(&mut self, id: i64) -> StoreResult<()> {
        ops::delete_source_port(&self.conn, id).map_err(|e| store_error("source port", e))
    }

    // ── IWADs ───────────────────────────────────────────────────────────
    fn iwads(&self) -> StoreResult<Vec<IwadData>> {
        ops::list_iwads(&self.conn).map_err(|e| store_error("iwad", e))
    }

    fn iwad(&self, id: i64) -> StoreResult<Option<IwadData>> {
        ops::find_iwad(&self.conn, id).map_err(|e| store_error("iwad", e))
    }

    fn insert_iwad(&mut self, iwad: &IwadData) -> StoreResult<i64> {
        ops::insert_iwad(&self.conn, iwad).map_err(|e| store_error("iwad", e))
    }

    fn delete_iwad(&mut self, id: i64) -> StoreResult<()> {
        ops::delete_iwad(&self.conn, id).map_err(|e| store_error("iwad", e))
    }

    // ── Stats ───────────────────────────────────────────────────────────
    fn stats(&self, game_file_id: i64) -> StoreResult<Vec<StatRecord>> {
        ops::stats_for_game_file(&self.conn, game_file_id).map_err(|e| store_error("stats", e))
    }

    fn insert_stats(&mut self, stats: &StatRecord) -> StoreResult<i64> {
        ops::insert_stats(&self.conn, stats).map_err(|e| store_error("stats", e))
    }

    fn delete_stats(&mut self, id: i64) -> StoreResult<()> {
        ops::delete_stats(&self.conn, id).map_err(|e| store_error("stats", e))
    }

    // ── Managed files ───────────────────────────────────────────────────
    fn files(&self, game_file_id: i64, file_type: Option<FileType>) -> StoreResult<Vec<FileData>> {
        ops::files_for_game_file(&self.conn, game_file_id, file_type)
            .map_err(|e| store_error("file", e))
    }

    fn insert_file(&mut self, file: &FileData) -> StoreResult<i64> {
        ops::insert_file(&self.conn, file).map_err(|e| store_error("file", e))
    }

    fn update_file(&mut self, file: &FileData) -> StoreResult<()> {
        let id = require_id("file", file.id)?;
        ops::update_file(&self.conn, id, file).map_err(|e| store_error("file", e))
    }

    fn delete_file(&mut self, id: i64) -> StoreResult<()> {
        ops::delete_file(&self.conn, id).map_err(|e| store_error("file", e))
    }

    // ── Tags ────────────────────────────────────────────────────────────
    fn tags(&self) -> StoreResult<Vec<Tag>> {
        ops::list_tags(&self.conn).map_err(|e| store_error("tag", e))
    }

    fn insert_tag(&mut self, tag: &Tag) -> StoreResult<i64> {
        ops::insert_tag(&self.conn, tag).map_err(|e| store_error("tag", e))
    }

    fn tag_mappings(&self, game_file_id: i64) -> StoreResult<Vec<TagMapping>> {
        ops::tag_mappings_for_game_file(&self.conn, game_file_id)
            .map_err(|e| store_error("tag mapping", e))
    }

    fn insert_tag_mapping(&mut self, mapping: &TagMapping) -> StoreResult<()> {
        ops::insert_tag_mapping(&self.conn, mapping).map_err(|e| store_error("tag mapping", e))
    }

    fn delete_tag_mapping(&mut self, mapping: &TagMapping) -> StoreResult<()> {
        ops::delete_tag_mapping(&self.conn, mapping).map_err(|e| store_error("tag mapping", e))
    }

    // ── Configuration ───────────────────────────────────────────────────
    fn configuration(&self) -> StoreResult<Vec<ConfigEntry>> {
        ops::list_configuration(&self.conn).map_err(|e| store_error("configuration", e))
    }

    fn set_config_value(&mut self, name: &str, value: &str) -> StoreResult<()> {
        ops::set_config_value(&self.conn, name, value).map_err(|e| store_error("configuration", e))
    }
}
