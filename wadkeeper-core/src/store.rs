//! The metadata store collaborator.
//!
//! The launcher never talks to a database directly. Everything it needs
//! from persistent metadata goes through [`MetadataStore`], keyed by
//! numeric ids. `wadkeeper-db` provides the SQLite implementation and
//! [`crate::MemoryStore`] backs tests and dry runs.

use crate::error::StoreError;
use crate::types::{
    ConfigEntry, FileData, FileType, GameFile, IwadData, SourcePortData, StatRecord, Tag,
    TagMapping,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD access to game files, source ports, IWADs, stats, managed files,
/// tags and configuration.
pub trait MetadataStore {
    // ── Game files ──────────────────────────────────────────────────────
    fn game_files(&self) -> StoreResult<Vec<GameFile>>;
    /// Fully populated record for a library file name (`<base>.zip`).
    fn game_file(&self, file_name: &str) -> StoreResult<Option<GameFile>>;
    fn game_file_by_id(&self, id: i64) -> StoreResult<Option<GameFile>>;
    /// Insert and return the new id.
    fn insert_game_file(&mut self, file: &GameFile) -> StoreResult<i64>;
    fn update_game_file(&mut self, file: &GameFile) -> StoreResult<()>;
    fn delete_game_file(&mut self, id: i64) -> StoreResult<()>;

    // ── Source ports ────────────────────────────────────────────────────
    fn source_ports(&self) -> StoreResult<Vec<SourcePortData>>;
    fn source_port(&self, id: i64) -> StoreResult<Option<SourcePortData>>;
    fn insert_source_port(&mut self, port: &SourcePortData) -> StoreResult<i64>;
    fn update_source_port(&mut self, port: &SourcePortData) -> StoreResult<()>;
    fn delete_source_port(&mut self, id: i64) -> StoreResult<()>;

    // ── IWADs ───────────────────────────────────────────────────────────
    fn iwads(&self) -> StoreResult<Vec<IwadData>>;
    fn iwad(&self, id: i64) -> StoreResult<Option<IwadData>>;
    fn insert_iwad(&mut self, iwad: &IwadData) -> StoreResult<i64>;
    fn delete_iwad(&mut self, id: i64) -> StoreResult<()>;

    // ── Stats ───────────────────────────────────────────────────────────
    /// Stats for one game file in insertion order.
    fn stats(&self, game_file_id: i64) -> StoreResult<Vec<StatRecord>>;
    fn insert_stats(&mut self, stats: &StatRecord) -> StoreResult<i64>;
    fn delete_stats(&mut self, id: i64) -> StoreResult<()>;

    // ── Managed files ───────────────────────────────────────────────────
    fn files(&self, game_file_id: i64, file_type: Option<FileType>)
    -> StoreResult<Vec<FileData>>;
    fn insert_file(&mut self, file: &FileData) -> StoreResult<i64>;
    fn update_file(&mut self, file: &FileData) -> StoreResult<()>;
    fn delete_file(&mut self, id: i64) -> StoreResult<()>;

    // ── Tags ────────────────────────────────────────────────────────────
    fn tags(&self) -> StoreResult<Vec<Tag>>;
    fn insert_tag(&mut self, tag: &Tag) -> StoreResult<i64>;
    fn tag_mappings(&self, game_file_id: i64) -> StoreResult<Vec<TagMapping>>;
    fn insert_tag_mapping(&mut self, mapping: &TagMapping) -> StoreResult<()>;
    fn delete_tag_mapping(&mut self, mapping: &TagMapping) -> StoreResult<()>;

    // ── Configuration ───────────────────────────────────────────────────
    fn configuration(&self) -> StoreResult<Vec<ConfigEntry>>;
    fn set_config_value(&mut self, name: &str, value: &str) -> StoreResult<()>;

    /// A single configuration value, if set.
    fn config_value(&self, name: &str) -> StoreResult<Option<String>> {
        Ok(self
            .configuration()?
            .into_iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value))
    }

    /// The IWAD record whose game file is `game_file_id`, if any.
    fn iwad_for_game_file(&self, game_file_id: i64) -> StoreResult<Option<IwadData>> {
        Ok(self
            .iwads()?
            .into_iter()
            .find(|iwad| iwad.game_file_id == game_file_id))
    }

    /// The game file behind an IWAD id.
    fn iwad_game_file(&self, iwad_id: i64) -> StoreResult<Option<GameFile>> {
        match self.iwad(iwad_id)? {
            Some(iwad) => self.game_file_by_id(iwad.game_file_id),
            None => Ok(None),
        }
    }
}

/// Configuration key for the default source port id.
pub const CONFIG_DEFAULT_SOURCE_PORT: &str = "DefaultSourcePort";
/// Configuration key for the default IWAD id.
pub const CONFIG_DEFAULT_IWAD: &str = "DefaultIWad";
/// Configuration key for the default skill.
pub const CONFIG_DEFAULT_SKILL: &str = "DefaultSkill";
