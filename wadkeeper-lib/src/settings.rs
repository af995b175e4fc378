//! Launcher settings (library layout, detection filters, statistics).
//!
//! Settings live in `~/.config/wadkeeper/settings.toml`. Every field has a
//! default, so a missing or partial file is fine. Stored paths may be
//! relative; they are resolved against the data directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Canonical path to the settings file: `~/.config/wadkeeper/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("wadkeeper").join("settings.toml")
}

/// Base directory for relative paths and defaults:
/// `~/.local/share/wadkeeper` (platform equivalent elsewhere).
pub fn data_dir() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("wadkeeper")
}

/// A path as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LauncherPath(String);

impl LauncherPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Store `path` relative to `base` when it lives under it, absolute
    /// otherwise.
    pub fn from_absolute(path: &Path, base: &Path) -> Self {
        let relative = pathdiff::diff_paths(path, base)
            .filter(|p| !p.components().any(|c| c == Component::ParentDir))
            .filter(|p| !p.as_os_str().is_empty());
        let chosen = relative.as_deref().unwrap_or(path);
        Self(chosen.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_relative(&self) -> bool {
        Path::new(&self.0).is_relative()
    }

    pub fn resolve(&self, base: &Path) -> PathBuf {
        let path = Path::new(&self.0);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub library: LibrarySettings,
    pub detection: DetectionSettings,
    pub statistics: StatisticsSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory holding the managed `.zip` archives.
    pub root: Option<LauncherPath>,
    /// Scratch directory for extracted files and recorded demos.
    pub temp: Option<LauncherPath>,
    pub screenshots: Option<LauncherPath>,
    pub save_games: Option<LauncherPath>,
    pub demos: Option<LauncherPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Extra directories watched for screenshots besides the port directory.
    pub capture_directories: Vec<LauncherPath>,
    pub screenshot_extensions: Vec<String>,
    pub save_game_extensions: Vec<String>,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            capture_directories: Vec::new(),
            screenshot_extensions: vec![".png".into(), ".jpg".into(), ".bmp".into()],
            save_game_extensions: vec![".zds".into(), ".dsg".into(), ".esg".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsSettings {
    /// Record statistics for ports that support it.
    pub enabled: bool,
    /// Delay between ticks while a session runs.
    pub poll_interval_ms: u64,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: Option<LauncherPath>,
}

/// Resolved managed directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDirs {
    pub root: PathBuf,
    pub temp: PathBuf,
    pub screenshots: PathBuf,
    pub save_games: PathBuf,
    pub demos: PathBuf,
}

impl LibraryDirs {
    /// The default layout under one base directory.
    pub fn under(base: &Path) -> Self {
        Self {
            root: base.join("library"),
            temp: base.join("temp"),
            screenshots: base.join("screenshots"),
            save_games: base.join("savegames"),
            demos: base.join("demos"),
        }
    }

    pub fn ensure_exist(&self) -> io::Result<()> {
        for dir in [
            &self.root,
            &self.temp,
            &self.screenshots,
            &self.save_games,
            &self.demos,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl LauncherSettings {
    /// Managed directories. The library root uses a priority chain:
    ///
    /// 1. `root_override` (CLI flag)
    /// 2. `library.root` from settings
    /// 3. `<base>/library`
    pub fn library_dirs(&self, base: &Path, root_override: Option<PathBuf>) -> LibraryDirs {
        let defaults = LibraryDirs::under(base);
        let pick = |stored: &Option<LauncherPath>, default: PathBuf| {
            stored.as_ref().map(|p| p.resolve(base)).unwrap_or(default)
        };
        LibraryDirs {
            root: root_override.unwrap_or_else(|| pick(&self.library.root, defaults.root)),
            temp: pick(&self.library.temp, defaults.temp),
            screenshots: pick(&self.library.screenshots, defaults.screenshots),
            save_games: pick(&self.library.save_games, defaults.save_games),
            demos: pick(&self.library.demos, defaults.demos),
        }
    }

    pub fn capture_directories(&self, base: &Path) -> Vec<PathBuf> {
        self.detection
            .capture_directories
            .iter()
            .map(|p| p.resolve(base))
            .collect()
    }

    pub fn database_path(&self, base: &Path) -> PathBuf {
        self.database
            .path
            .as_ref()
            .map(|p| p.resolve(base))
            .unwrap_or_else(|| base.join("wadkeeper.db"))
    }
}

/// Load settings from the canonical path. A missing file yields defaults.
pub fn load_settings() -> Result<LauncherSettings, SettingsError> {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Result<LauncherSettings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LauncherSettings::default()),
        Err(e) => Err(e.into()),
    }
}

pub fn save_settings(settings: &LauncherSettings) -> Result<(), SettingsError> {
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &LauncherSettings) -> Result<(), SettingsError> {
    let serialized = toml::to_string_pretty(settings)?;
    write_atomic(path, &serialized)?;
    Ok(())
}

/// The settings file as pretty-printed TOML, for display.
pub fn load_settings_string() -> Option<String> {
    let contents = fs::read_to_string(settings_path()).ok()?;
    let doc: toml::Value = contents.parse().ok()?;
    toml::to_string_pretty(&doc).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingKind {
    Path,
    PathList,
    List,
    Integer,
    Bool,
}

const SETTING_KEYS: &[(&str, SettingKind)] = &[
    ("library.root", SettingKind::Path),
    ("library.temp", SettingKind::Path),
    ("library.screenshots", SettingKind::Path),
    ("library.save_games", SettingKind::Path),
    ("library.demos", SettingKind::Path),
    ("detection.capture_directories", SettingKind::PathList),
    ("detection.screenshot_extensions", SettingKind::List),
    ("detection.save_game_extensions", SettingKind::List),
    ("statistics.enabled", SettingKind::Bool),
    ("statistics.poll_interval_ms", SettingKind::Integer),
    ("database.path", SettingKind::Path),
];

/// Dotted keys accepted by [`set_setting`].
pub fn setting_keys() -> impl Iterator<Item = &'static str> {
    SETTING_KEYS.iter().map(|(key, _)| *key)
}

/// Set one dotted key (e.g. `library.root`) in the settings file at `path`.
///
/// Uses `toml::Value` for a surgical update so unrelated fields and
/// unknown tables are preserved. Lists are comma separated. An empty value
/// removes the key.
pub fn set_setting(path: &Path, key: &str, value: &str) -> Result<(), SettingsError> {
    let kind = SETTING_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
    let (section, field) = key
        .split_once('.')
        .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

    let mut doc: toml::Value = match fs::read_to_string(path) {
        Ok(contents) => contents.parse()?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => toml::Value::Table(Default::default()),
        Err(e) => return Err(e.into()),
    };

    let table = doc
        .as_table_mut()
        .ok_or_else(|| io::Error::other("settings.toml root is not a table"))?;
    let section_value = table
        .entry(section)
        .or_insert_with(|| toml::Value::Table(Default::default()));
    let section_table = section_value
        .as_table_mut()
        .ok_or_else(|| io::Error::other(format!("[{section}] is not a table")))?;

    let value = value.trim();
    if value.is_empty() {
        section_table.remove(field);
    } else {
        section_table.insert(field.to_string(), parse_setting(kind, value)?);
    }

    // Reject values the typed settings would not load.
    let serialized = toml::to_string_pretty(&doc)?;
    toml::from_str::<LauncherSettings>(&serialized)?;
    write_atomic(path, &serialized)?;
    log::debug!("Set {} in '{}'", key, path.display());
    Ok(())
}

fn parse_setting(kind: SettingKind, value: &str) -> Result<toml::Value, SettingsError> {
    let list = || {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| toml::Value::String(s.to_string()))
            .collect::<Vec<_>>()
    };
    Ok(match kind {
        SettingKind::Path => toml::Value::String(value.to_string()),
        SettingKind::PathList | SettingKind::List => toml::Value::Array(list()),
        SettingKind::Integer => {
            let n: i64 = value
                .parse()
                .map_err(|_| io::Error::other(format!("'{value}' is not a number")))?;
            toml::Value::Integer(n)
        }
        SettingKind::Bool => {
            let b: bool = value
                .parse()
                .map_err(|_| io::Error::other(format!("'{value}' is not true or false")))?;
            toml::Value::Boolean(b)
        }
    })
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&tmp.path().join("settings.toml")).unwrap();
        assert_eq!(settings, LauncherSettings::default());
        assert_eq!(
            settings.detection.screenshot_extensions,
            vec![".png", ".jpg", ".bmp"]
        );
        assert_eq!(settings.statistics.poll_interval_ms, 1000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "[library]\nroot = \"wads\"\n").unwrap();
        let settings = load_settings_from(&path).unwrap();

        let base = Path::new("/data/wk");
        let dirs = settings.library_dirs(base, None);
        assert_eq!(dirs.root, base.join("wads"));
        assert_eq!(dirs.temp, base.join("temp"));
        assert_eq!(settings.database_path(base), base.join("wadkeeper.db"));
    }

    #[test]
    fn override_beats_stored_root() {
        let mut settings = LauncherSettings::default();
        settings.library.root = Some(LauncherPath::new("/stored"));
        let dirs = settings.library_dirs(Path::new("/base"), Some(PathBuf::from("/cli")));
        assert_eq!(dirs.root, PathBuf::from("/cli"));
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("settings.toml");
        let mut settings = LauncherSettings::default();
        settings.library.demos = Some(LauncherPath::new("/srv/demos"));
        settings.statistics.enabled = false;
        save_settings_to(&path, &settings).unwrap();
        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(load_settings_from(&path).unwrap(), settings);
    }

    #[test]
    fn launcher_path_prefers_relative_under_base() {
        let base = Path::new("/home/u/.local/share/wadkeeper");
        let inside = LauncherPath::from_absolute(&base.join("library"), base);
        assert_eq!(inside.as_str(), "library");
        assert!(inside.is_relative());
        assert_eq!(inside.resolve(base), base.join("library"));

        let outside = LauncherPath::from_absolute(Path::new("/mnt/wads"), base);
        assert_eq!(outside.as_str(), "/mnt/wads");
        assert_eq!(outside.resolve(base), PathBuf::from("/mnt/wads"));
    }

    #[test]
    fn set_setting_updates_one_key_and_preserves_others() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "[library]\nroot = \"/wads\"\n\n[window]\nwidth = 800\n").unwrap();

        set_setting(&path, "detection.screenshot_extensions", ".png, .tga").unwrap();
        set_setting(&path, "statistics.poll_interval_ms", "250").unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.library.root, Some(LauncherPath::new("/wads")));
        assert_eq!(settings.detection.screenshot_extensions, vec![".png", ".tga"]);
        assert_eq!(settings.statistics.poll_interval_ms, 250);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("width = 800"));

        set_setting(&path, "library.root", "").unwrap();
        assert_eq!(load_settings_from(&path).unwrap().library.root, None);
    }

    #[test]
    fn set_setting_rejects_unknown_keys_and_bad_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.toml");
        assert!(matches!(
            set_setting(&path, "library.colour", "red"),
            Err(SettingsError::UnknownKey(_))
        ));
        assert!(set_setting(&path, "statistics.enabled", "maybe").is_err());
        assert!(!path.exists());
    }
}
