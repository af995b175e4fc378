use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::util;

/// Per-file launch settings remembered between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSettings {
    /// Map to warp to (e.g. `MAP01`, `E1M1`).
    pub map: Option<String>,
    /// Skill level as the engine expects it (usually `1`..`5`).
    pub skill: Option<String>,
    /// Extra parameters appended verbatim after everything else.
    pub extra_parameters: Option<String>,
    /// Companion archives loaded with this file (library `.zip` names).
    pub files: Vec<String>,
    /// Companion archives pulled in by the selected IWAD.
    pub files_iwad: Vec<String>,
    /// Companion archives pulled in by the selected source port.
    pub files_source_port: Vec<String>,
    /// Entry names inside the archives to load. Empty means "everything the
    /// port supports".
    pub specific_files: Vec<String>,
}

/// A file in the managed library.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameFile {
    /// Store id, `None` until imported.
    pub id: Option<i64>,
    /// Archive-relative name, always ending in `.zip`.
    pub file_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub source_port_id: Option<i64>,
    pub iwad_id: Option<i64>,
    pub settings: LaunchSettings,
    pub minutes_played: i64,
    pub last_played: Option<DateTime<Local>>,
}

impl GameFile {
    /// A new, not-yet-stored file. The name is normalized to `.zip`.
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: util::zip_file_name(file_name),
            ..Self::default()
        }
    }

    /// File name without the `.zip` extension.
    pub fn base_name(&self) -> &str {
        util::base_name(&self.file_name)
    }

    /// Title if one is set, otherwise the file name.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.file_name)
    }
}

/// A configured source port executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePortData {
    pub id: Option<i64>,
    /// Free-text name shown to the user.
    pub name: String,
    /// Full path to the engine executable.
    pub executable: PathBuf,
    /// Extensions (with leading dot, lowercase) of archive entries this
    /// port can load.
    pub supported_extensions: Vec<String>,
    pub extra_parameters: Option<String>,
}

/// Extensions most Doom engines accept.
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &[".wad", ".pk3", ".deh", ".bex"];

impl SourcePortData {
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            id: None,
            name: name.into(),
            executable: executable.into(),
            supported_extensions: DEFAULT_SUPPORTED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            extra_parameters: None,
        }
    }

    /// Directory containing the executable. Engines write their logs,
    /// screenshots and saves here.
    pub fn directory(&self) -> PathBuf {
        match self.executable.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Executable file name without its extension.
    pub fn executable_stem(&self) -> Option<&str> {
        self.executable.file_stem().and_then(|s| s.to_str())
    }

    /// Whether an entry named `name` has an extension this port loads.
    pub fn supports_file(&self, name: &str) -> bool {
        let Some(ext) = util::extension_of(name) else {
            return false;
        };
        self.supported_extensions
            .iter()
            .any(|e| util::normalize_extension(e) == ext)
    }
}

/// Links a game file to its role as base game data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IwadData {
    pub id: Option<i64>,
    pub game_file_id: i64,
    pub name: String,
}

/// Per-map play statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub id: Option<i64>,
    pub game_file_id: Option<i64>,
    pub source_port_id: Option<i64>,
    pub map_name: String,
    pub kills: i32,
    pub total_kills: i32,
    pub items: i32,
    pub total_items: i32,
    pub secrets: i32,
    pub total_secrets: i32,
    /// Level time in seconds.
    pub level_time: f32,
    pub recorded_at: DateTime<Local>,
}

impl StatRecord {
    pub fn new(map_name: impl Into<String>) -> Self {
        Self {
            id: None,
            game_file_id: None,
            source_port_id: None,
            map_name: map_name.into(),
            kills: 0,
            total_kills: 0,
            items: 0,
            total_items: 0,
            secrets: 0,
            total_secrets: 0,
            level_time: 0.0,
            recorded_at: Local::now(),
        }
    }

    /// Counters and time are equal, ignoring ids and timestamps.
    pub fn same_values(&self, other: &StatRecord) -> bool {
        self.map_name == other.map_name
            && self.kills == other.kills
            && self.total_kills == other.total_kills
            && self.items == other.items
            && self.total_items == other.total_items
            && self.secrets == other.secrets
            && self.total_secrets == other.total_secrets
            && (self.level_time - other.level_time).abs() < 0.005
    }
}

/// Kind of managed file attached to a game file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Screenshot,
    SaveGame,
    Demo,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::SaveGame => "savegame",
            Self::Demo => "demo",
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "screenshot" => Ok(Self::Screenshot),
            "savegame" => Ok(Self::SaveGame),
            "demo" => Ok(Self::Demo),
            other => Err(format!("Unknown file type: '{other}'")),
        }
    }
}

/// A screenshot, save game or demo copied into a managed directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileData {
    pub id: Option<i64>,
    pub game_file_id: i64,
    pub source_port_id: Option<i64>,
    pub file_type: FileType,
    /// Name inside the managed directory for this file type.
    pub file_name: String,
    /// Name the engine wrote the file as.
    pub original_file_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Local>,
}

impl FileData {
    /// Full path of the managed copy.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMapping {
    pub tag_id: i64,
    pub game_file_id: i64,
}

/// One named configuration value kept in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_file_name_is_normalized_to_zip() {
        assert_eq!(GameFile::new("DOOM2.WAD").file_name, "DOOM2.zip");
        assert_eq!(GameFile::new("scythe.zip").file_name, "scythe.zip");
        assert_eq!(GameFile::new("/tmp/wads/av.pk3").base_name(), "av");
    }

    #[test]
    fn port_directory_is_executable_parent() {
        let port = SourcePortData::new("GZDoom", "/opt/gzdoom/gzdoom");
        assert_eq!(port.directory(), PathBuf::from("/opt/gzdoom"));
        assert_eq!(port.executable_stem(), Some("gzdoom"));

        let bare = SourcePortData::new("Bare", "gzdoom");
        assert_eq!(bare.directory(), PathBuf::from("."));
    }

    #[test]
    fn supports_file_ignores_case() {
        let port = SourcePortData::new("Choco", "chocolate-doom");
        assert!(port.supports_file("MAP01.WAD"));
        assert!(port.supports_file("fix.Deh"));
        assert!(!port.supports_file("readme.txt"));
        assert!(!port.supports_file("noext"));
    }

    #[test]
    fn file_type_parses_its_own_names() {
        for ft in [FileType::Screenshot, FileType::SaveGame, FileType::Demo] {
            assert_eq!(ft.as_str().parse::<FileType>(), Ok(ft));
        }
    }
}
