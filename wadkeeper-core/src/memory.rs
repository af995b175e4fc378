//! In-memory [`MetadataStore`] used by tests and dry runs.

use crate::error::StoreError;
use crate::store::{MetadataStore, StoreResult};
use crate::types::{
    ConfigEntry, FileData, FileType, GameFile, IwadData, SourcePortData, StatRecord, Tag,
    TagMapping,
};

/// Keeps every table in a `Vec` and hands out sequential ids.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: i64,
    game_files: Vec<GameFile>,
    source_ports: Vec<SourcePortData>,
    iwads: Vec<IwadData>,
    stats: Vec<StatRecord>,
    files: Vec<FileData>,
    tags: Vec<Tag>,
    tag_mappings: Vec<TagMapping>,
    config: Vec<ConfigEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

fn require_id(entity: &'static str, id: Option<i64>) -> StoreResult<i64> {
    id.ok_or_else(|| StoreError::invalid(entity, "record has no id"))
}

fn remove_by<T>(
    items: &mut Vec<T>,
    entity: &'static str,
    id: i64,
    key: impl Fn(&T) -> Option<i64>,
) -> StoreResult<()> {
    let before = items.len();
    items.retain(|item| key(item) != Some(id));
    if items.len() == before {
        return Err(StoreError::not_found(entity, id));
    }
    Ok(())
}

impl MetadataStore for MemoryStore {
    fn game_files(&self) -> StoreResult<Vec<GameFile>> {
        Ok(self.game_files.clone())
    }

    fn game_file(&self, file_name: &str) -> StoreResult<Option<GameFile>> {
        Ok(self
            .game_files
            .iter()
            .find(|f| f.file_name.eq_ignore_ascii_case(file_name))
            .cloned())
    }

    fn game_file_by_id(&self, id: i64) -> StoreResult<Option<GameFile>> {
        Ok(self.game_files.iter().find(|f| f.id == Some(id)).cloned())
    }

    fn insert_game_file(&mut self, file: &GameFile) -> StoreResult<i64> {
        if self.game_file(&file.file_name)?.is_some() {
            return Err(StoreError::invalid(
                "game file",
                format!("'{}' already exists", file.file_name),
            ));
        }
        let id = self.allocate_id();
        let mut stored = file.clone();
        stored.id = Some(id);
        self.game_files.push(stored);
        Ok(id)
    }

    fn update_game_file(&mut self, file: &GameFile) -> StoreResult<()> {
        let id = require_id("game file", file.id)?;
        let slot = self
            .game_files
            .iter_mut()
            .find(|f| f.id == Some(id))
            .ok_or_else(|| StoreError::not_found("game file", id))?;
        *slot = file.clone();
        Ok(())
    }

    fn delete_game_file(&mut self, id: i64) -> StoreResult<()> {
        remove_by(&mut self.game_files, "game file", id, |f| f.id)
    }

    fn source_ports(&self) -> StoreResult<Vec<SourcePortData>> {
        Ok(self.source_ports.clone())
    }

    fn source_port(&self, id: i64) -> StoreResult<Option<SourcePortData>> {
        Ok(self.source_ports.iter().find(|p| p.id == Some(id)).cloned())
    }

    fn insert_source_port(&mut self, port: &SourcePortData) -> StoreResult<i64> {
        let id = self.allocate_id();
        let mut stored = port.clone();
        stored.id = Some(id);
        self.source_ports.push(stored);
        Ok(id)
    }

    fn update_source_port(&mut self, port: &SourcePortData) -> StoreResult<()> {
        let id = require_id("source port", port.id)?;
        let slot = self
            .source_ports
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| StoreError::not_found("source port", id))?;
        *slot = port.clone();
        Ok(())
    }

    fn delete_source_port(&mut self, id: i64) -> StoreResult<()> {
        remove_by(&mut self.source_ports, "source port", id, |p| p.id)
    }

    fn iwads(&self) -> StoreResult<Vec<IwadData>> {
        Ok(self.iwads.clone())
    }

    fn iwad(&self, id: i64) -> StoreResult<Option<IwadData>> {
        Ok(self.iwads.iter().find(|i| i.id == Some(id)).cloned())
    }

    fn insert_iwad(&mut self, iwad: &IwadData) -> StoreResult<i64> {
        let id = self.allocate_id();
        let mut stored = iwad.clone();
        stored.id = Some(id);
        self.iwads.push(stored);
        Ok(id)
    }

    fn delete_iwad(&mut self, id: i64) -> StoreResult<()> {
        remove_by(&mut self.iwads, "iwad", id, |i| i.id)
    }

    fn stats(&self, game_file_id: i64) -> StoreResult<Vec<StatRecord>> {
        Ok(self
            .stats
            .iter()
            .filter(|s| s.game_file_id == Some(game_file_id))
            .cloned()
            .collect())
    }

    fn insert_stats(&mut self, stats: &StatRecord) -> StoreResult<i64> {
        let id = self.allocate_id();
        let mut stored = stats.clone();
        stored.id = Some(id);
        self.stats.push(stored);
        Ok(id)
    }

    fn delete_stats(&mut self, id: i64) -> StoreResult<()> {
        remove_by(&mut self.stats, "stats", id, |s| s.id)
    }

    fn files(
        &self,
        game_file_id: i64,
        file_type: Option<FileType>,
    ) -> StoreResult<Vec<FileData>> {
        Ok(self
            .files
            .iter()
            .filter(|f| f.game_file_id == game_file_id)
            .filter(|f| file_type.is_none_or(|t| f.file_type == t))
            .cloned()
            .collect())
    }

    fn insert_file(&mut self, file: &FileData) -> StoreResult<i64> {
        let id = self.allocate_id();
        let mut stored = file.clone();
        stored.id = Some(id);
        self.files.push(stored);
        Ok(id)
    }

    fn update_file(&mut self, file: &FileData) -> StoreResult<()> {
        let id = require_id("file", file.id)?;
        let slot = self
            .files
            .iter_mut()
            .find(|f| f.id == Some(id))
            .ok_or_else(|| StoreError::not_found("file", id))?;
        *slot = file.clone();
        Ok(())
    }

    fn delete_file(&mut self, id: i64) -> StoreResult<()> {
        remove_by(&mut self.files, "file", id, |f| f.id)
    }

    fn tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(self.tags.clone())
    }

    fn insert_tag(&mut self, tag: &Tag) -> StoreResult<i64> {
        let id = self.allocate_id();
        let mut stored = tag.clone();
        stored.id = Some(id);
        self.tags.push(stored);
        Ok(id)
    }

    fn tag_mappings(&self, game_file_id: i64) -> StoreResult<Vec<TagMapping>> {
        Ok(self
            .tag_mappings
            .iter()
            .filter(|m| m.game_file_id == game_file_id)
            .copied()
            .collect())
    }

    fn insert_tag_mapping(&mut self, mapping: &TagMapping) -> StoreResult<()> {
        if !self.tag_mappings.contains(mapping) {
            self.tag_mappings.push(*mapping);
        }
        Ok(())
    }

    fn delete_tag_mapping(&mut self, mapping: &TagMapping) -> StoreResult<()> {
        self.tag_mappings.retain(|m| m != mapping);
        Ok(())
    }

    fn configuration(&self) -> StoreResult<Vec<ConfigEntry>> {
        Ok(self.config.clone())
    }

    fn set_config_value(&mut self, name: &str, value: &str) -> StoreResult<()> {
        match self.config.iter_mut().find(|c| c.name == name) {
            Some(entry) => entry.value = value.to_string(),
            None => self.config.push(ConfigEntry {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_file_lookup_by_name_ignores_case() {
        let mut store = MemoryStore::new();
        let id = store.insert_game_file(&GameFile::new("Scythe.wad")).unwrap();
        let found = store.game_file("scythe.zip").unwrap().unwrap();
        assert_eq!(found.id, Some(id));
    }

    #[test]
    fn duplicate_game_file_is_rejected() {
        let mut store = MemoryStore::new();
        store.insert_game_file(&GameFile::new("a.zip")).unwrap();
        assert!(store.insert_game_file(&GameFile::new("a.wad")).is_err());
    }

    #[test]
    fn deleting_missing_record_reports_not_found() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.delete_stats(42),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn config_values_are_upserted() {
        let mut store = MemoryStore::new();
        store.set_config_value("DefaultSkill", "3").unwrap();
        store.set_config_value("DefaultSkill", "4").unwrap();
        assert_eq!(store.configuration().unwrap().len(), 1);
        assert_eq!(
            store.config_value("DefaultSkill").unwrap().as_deref(),
            Some("4")
        );
    }

    #[test]
    fn iwad_game_file_follows_reference() {
        let mut store = MemoryStore::new();
        let gf = store.insert_game_file(&GameFile::new("DOOM2.WAD")).unwrap();
        let iwad = store
            .insert_iwad(&IwadData {
                id: None,
                game_file_id: gf,
                name: "DOOM2".into(),
            })
            .unwrap();
        let resolved = store.iwad_game_file(iwad).unwrap().unwrap();
        assert_eq!(resolved.file_name, "DOOM2.zip");
        assert_eq!(store.iwad_for_game_file(gf).unwrap().unwrap().id, Some(iwad));
    }
}
