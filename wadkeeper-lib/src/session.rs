//! One play session: preconditions, side-effect detection and collection.
//!
//! The order of a session is:
//!
//! 1. [`check_launch_preconditions`] and [`resolve_launch_target`]
//! 2. [`PlaySession::prepare`] copies stored saves into the port directory
//!    and takes the detector and statistics baselines
//! 3. the caller builds the plan and launches the process
//! 4. [`PlaySession::begin`], then [`PlaySession::tick`] on every timer tick
//! 5. [`PlaySession::finish`] once the exit has been observed

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use chrono::{DateTime, Local};
use wadkeeper_core::store::{
    CONFIG_DEFAULT_IWAD, CONFIG_DEFAULT_SKILL, CONFIG_DEFAULT_SOURCE_PORT, StoreResult,
};
use wadkeeper_core::{FileData, FileType, GameFile, MetadataStore, StoreError};

use crate::error::LaunchError;
use crate::process::ExitReport;
use crate::profile::SourcePortProfile;
use crate::settings::LibraryDirs;
use crate::stats::{NewStatistics, StatisticsIngestor};
use crate::watcher::{DetectorSet, reconcile_save_files};

/// Shown when a recorded demo is not where the engine was told to write it.
pub const DEMO_NOT_FOUND: &str =
    "Could not find the demo file. Does this source port support recording?";

/// Fail fast, in order: a session is running, no ports, no IWADs.
pub fn check_launch_preconditions(
    session_running: bool,
    store: &dyn MetadataStore,
) -> Result<(), LaunchError> {
    if session_running {
        return Err(LaunchError::AlreadyPlaying);
    }
    if store.source_ports()?.is_empty() {
        return Err(LaunchError::NoSourcePorts);
    }
    if store.iwads()?.is_empty() {
        return Err(LaunchError::NoIwads);
    }
    Ok(())
}

/// What a launch of one library file resolves to.
#[derive(Debug, Clone)]
pub struct LaunchTarget {
    /// Fully populated record, with the default skill filled in.
    pub game_file: GameFile,
    pub profile: SourcePortProfile,
    /// `None` when `game_file_is_iwad` or nothing could be resolved.
    pub iwad: Option<GameFile>,
    pub game_file_is_iwad: bool,
}

/// Resolve the port and IWAD for `file_name`: explicit choice, then the
/// file's own setting, then the store's configured default. The first
/// configured port is the last resort.
pub fn resolve_launch_target(
    store: &dyn MetadataStore,
    file_name: &str,
    port_id: Option<i64>,
    iwad_id: Option<i64>,
) -> Result<LaunchTarget, LaunchError> {
    let mut game_file = store
        .game_file(file_name)?
        .ok_or_else(|| StoreError::not_found("game file", file_name))?;
    let id = require_id(&game_file)?;

    let port = match port_id
        .or(game_file.source_port_id)
        .or(config_id(store, CONFIG_DEFAULT_SOURCE_PORT)?)
    {
        Some(id) => store
            .source_port(id)?
            .ok_or_else(|| StoreError::not_found("source port", id))?,
        None => store
            .source_ports()?
            .into_iter()
            .next()
            .ok_or(LaunchError::NoSourcePorts)?,
    };

    let game_file_is_iwad = store.iwad_for_game_file(id)?.is_some();
    let iwad = if game_file_is_iwad {
        None
    } else {
        match iwad_id
            .or(game_file.iwad_id)
            .or(config_id(store, CONFIG_DEFAULT_IWAD)?)
        {
            Some(iwad_id) => store.iwad_game_file(iwad_id)?,
            None => None,
        }
    };

    if game_file.settings.skill.is_none() {
        game_file.settings.skill = store.config_value(CONFIG_DEFAULT_SKILL)?;
    }

    Ok(LaunchTarget {
        game_file,
        profile: SourcePortProfile::resolve(port),
        iwad,
        game_file_is_iwad,
    })
}

fn config_id(store: &dyn MetadataStore, key: &str) -> StoreResult<Option<i64>> {
    Ok(store.config_value(key)?.and_then(|v| v.trim().parse().ok()))
}

fn require_id(game_file: &GameFile) -> Result<i64, StoreError> {
    game_file.id.ok_or_else(|| {
        StoreError::invalid("game file", format!("{} is not stored", game_file.file_name))
    })
}

/// Directories and filters a session works with.
#[derive(Debug, Clone)]
pub struct SessionEnvironment {
    pub dirs: LibraryDirs,
    /// Screenshot directories watched besides the port directory.
    pub capture_dirs: Vec<PathBuf>,
    pub screenshot_extensions: Vec<String>,
    pub save_extensions: Vec<String>,
    pub save_statistics: bool,
}

/// What a finished session produced.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub minutes_played: i64,
    pub new_screenshots: Vec<FileData>,
    pub new_save_games: Vec<FileData>,
    pub updated_save_games: Vec<FileData>,
    pub demo: Option<FileData>,
    pub stats_recorded: usize,
    /// Side-effect failures. None of them stop the rest of the collection.
    pub errors: Vec<String>,
}

pub struct PlaySession {
    game_file_id: i64,
    source_port_id: Option<i64>,
    port_dir: PathBuf,
    env: SessionEnvironment,
    recorded_demo: Option<PathBuf>,
    started_at: Option<DateTime<Local>>,
    existing_saves: Vec<FileData>,
    screenshots: DetectorSet,
    saves: DetectorSet,
    statistics: Option<(StatisticsIngestor, mpsc::Receiver<NewStatistics>)>,
    stats_recorded: usize,
    errors: Vec<String>,
}

impl PlaySession {
    /// Ready a session for `game_file` on `profile`. Must run before the
    /// process is started.
    ///
    /// When the played file is itself an IWAD, pass its own record:
    /// saves, screenshots and statistics attach to it.
    pub fn prepare(
        store: &dyn MetadataStore,
        game_file: &GameFile,
        profile: &SourcePortProfile,
        env: &SessionEnvironment,
        recorded_demo: Option<PathBuf>,
    ) -> Result<Self, LaunchError> {
        let game_file_id = require_id(game_file)?;
        let port_dir = profile.directory();
        let mut errors = Vec::new();

        let existing_saves = store.files(game_file_id, Some(FileType::SaveGame))?;
        for save in &existing_saves {
            let source = save.path_in(&env.dirs.save_games);
            let target = port_dir.join(&save.original_file_name);
            if let Err(e) = fs::copy(&source, &target) {
                let msg = format!(
                    "Could not restore save game '{}': {}",
                    save.original_file_name, e
                );
                log::warn!("{}", msg);
                errors.push(msg);
            }
        }

        let mut screenshot_dirs = env.capture_dirs.clone();
        screenshot_dirs.push(port_dir.clone());
        let mut screenshots = DetectorSet::new(&screenshot_dirs, &env.screenshot_extensions);
        let mut saves = DetectorSet::new(std::slice::from_ref(&port_dir), &env.save_extensions);
        screenshots.start_all();
        saves.start_all();

        let statistics = if env.save_statistics {
            StatisticsIngestor::for_profile(profile).map(|(mut ingestor, rx)| {
                ingestor.start();
                (ingestor, rx)
            })
        } else {
            None
        };

        log::debug!(
            "Prepared session for {} on {} ({} stored saves, statistics: {})",
            game_file.file_name,
            profile.name(),
            existing_saves.len(),
            statistics.is_some()
        );

        Ok(Self {
            game_file_id,
            source_port_id: profile.id(),
            port_dir,
            env: env.clone(),
            recorded_demo,
            started_at: None,
            existing_saves,
            screenshots,
            saves,
            statistics,
            stats_recorded: 0,
            errors,
        })
    }

    pub fn game_file_id(&self) -> i64 {
        self.game_file_id
    }

    pub fn statistics_enabled(&self) -> bool {
        self.statistics.is_some()
    }

    /// The process is running: stamp the start time and last-played.
    pub fn begin(&mut self, store: &mut dyn MetadataStore) -> Result<(), LaunchError> {
        let now = Local::now();
        self.started_at = Some(now);
        if let Some(mut game_file) = store.game_file_by_id(self.game_file_id)? {
            game_file.last_played = Some(now);
            store.update_game_file(&game_file)?;
        }
        Ok(())
    }

    /// One polling step while the process runs.
    pub fn tick(&mut self, store: &mut dyn MetadataStore) {
        self.screenshots.tick_all();
        self.saves.tick_all();
        if let Some((ingestor, _)) = self.statistics.as_mut() {
            ingestor.tick();
        }
        self.drain_statistics(store);
    }

    fn drain_statistics(&mut self, store: &mut dyn MetadataStore) {
        let Some((_, rx)) = self.statistics.as_ref() else {
            return;
        };
        let events: Vec<NewStatistics> = rx.try_iter().collect();
        for event in events {
            match record_statistics(store, self.game_file_id, self.source_port_id, event) {
                Ok(()) => self.stats_recorded += 1,
                Err(e) => self.error(format!("Could not save statistics: {e}")),
            }
        }
    }

    /// Collect everything the session left behind. Consumes the session.
    pub fn finish(mut self, store: &mut dyn MetadataStore, exit: &ExitReport) -> SessionReport {
        let mut report = SessionReport::default();

        let started = self.started_at.unwrap_or(exit.exited_at);
        let seconds = (exit.exited_at - started).num_seconds().max(0);
        report.minutes_played = (seconds as f64 / 60.0).round() as i64;
        if let Err(e) = self.add_minutes(store, report.minutes_played) {
            self.error(format!("Could not update minutes played: {e}"));
        }

        if let Some(demo) = self.recorded_demo.clone() {
            match find_recorded_demo(&self.env.dirs.temp, &demo) {
                Some(path) => match self.import(store, &path, FileType::Demo) {
                    Ok(data) => report.demo = Some(data),
                    Err(e) => self.error(format!("Could not import demo: {e}")),
                },
                None => self.error(DEMO_NOT_FOUND.to_string()),
            }
        }

        self.screenshots.tick_all();
        self.saves.tick_all();

        for path in self.screenshots.new_files() {
            match self.import(store, &path, FileType::Screenshot) {
                Ok(data) => report.new_screenshots.push(data),
                Err(e) => self.error(format!("Could not import screenshot: {e}")),
            }
        }

        let existing_names: Vec<String> = self
            .existing_saves
            .iter()
            .map(|s| s.original_file_name.clone())
            .collect();
        let new_saves = reconcile_save_files(
            &self.saves.new_files(),
            &self.saves.modified_files(),
            &existing_names,
        );
        for path in new_saves {
            match self.import(store, &path, FileType::SaveGame) {
                Ok(data) => report.new_save_games.push(data),
                Err(e) => self.error(format!("Could not import save game: {e}")),
            }
        }
        for save in std::mem::take(&mut self.existing_saves) {
            match self.refresh_save(store, &save) {
                Ok(Some(data)) => report.updated_save_games.push(data),
                Ok(None) => {}
                Err(e) => self.error(format!(
                    "Could not update save game '{}': {e}",
                    save.original_file_name
                )),
            }
        }

        self.stop_statistics(store);

        report.stats_recorded = self.stats_recorded;
        report.errors = self.errors;
        log::info!(
            "Session ended: {} min, {} screenshot(s), {} new save(s), {} stat record(s)",
            report.minutes_played,
            report.new_screenshots.len(),
            report.new_save_games.len(),
            report.stats_recorded
        );
        report
    }

    fn stop_statistics(&mut self, store: &mut dyn MetadataStore) {
        let Some((mut ingestor, rx)) = self.statistics.take() else {
            return;
        };
        ingestor.stop();
        for event in rx.try_iter() {
            match record_statistics(store, self.game_file_id, self.source_port_id, event) {
                Ok(()) => self.stats_recorded += 1,
                Err(e) => self.error(format!("Could not save statistics: {e}")),
            }
        }
        self.errors.extend(ingestor.errors().iter().cloned());
    }

    fn add_minutes(&self, store: &mut dyn MetadataStore, minutes: i64) -> StoreResult<()> {
        if let Some(mut game_file) = store.game_file_by_id(self.game_file_id)? {
            game_file.minutes_played += minutes;
            store.update_game_file(&game_file)?;
        }
        Ok(())
    }

    /// Copy `source` into the managed directory for `file_type` and record it.
    fn import(
        &self,
        store: &mut dyn MetadataStore,
        source: &Path,
        file_type: FileType,
    ) -> Result<FileData, LaunchError> {
        let dir = match file_type {
            FileType::Screenshot => &self.env.dirs.screenshots,
            FileType::SaveGame => &self.env.dirs.save_games,
            FileType::Demo => &self.env.dirs.demos,
        };
        fs::create_dir_all(dir)?;
        let original = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let managed = managed_file_name(dir, &original);
        fs::copy(source, dir.join(&managed))?;

        let mut data = FileData {
            id: None,
            game_file_id: self.game_file_id,
            source_port_id: self.source_port_id,
            file_type,
            file_name: managed,
            original_file_name: original,
            description: None,
            created_at: Local::now(),
        };
        data.id = Some(store.insert_file(&data)?);
        log::debug!(
            "Imported {} '{}' as '{}'",
            file_type.as_str(),
            data.original_file_name,
            data.file_name
        );
        Ok(data)
    }

    /// Copy a stored save back from the port directory if the session
    /// changed it.
    fn refresh_save(
        &self,
        store: &mut dyn MetadataStore,
        save: &FileData,
    ) -> Result<Option<FileData>, LaunchError> {
        let source = self.port_dir.join(&save.original_file_name);
        let modified = self.saves.modified_files();
        if !modified.contains(&source) {
            return Ok(None);
        }
        fs::copy(&source, save.path_in(&self.env.dirs.save_games))?;
        let mut updated = save.clone();
        updated.created_at = Local::now();
        store.update_file(&updated)?;
        Ok(Some(updated))
    }

    fn error(&mut self, msg: String) {
        log::warn!("{}", msg);
        self.errors.push(msg);
    }
}

/// Store one statistics event for the played file. An update replaces the
/// last stored record for the same map.
pub fn record_statistics(
    store: &mut dyn MetadataStore,
    game_file_id: i64,
    source_port_id: Option<i64>,
    event: NewStatistics,
) -> StoreResult<()> {
    let mut record = event.record;
    record.map_name = record.map_name.to_uppercase();
    record.game_file_id = Some(game_file_id);
    record.source_port_id = source_port_id;

    if event.is_update {
        let previous = store
            .stats(game_file_id)?
            .into_iter()
            .rev()
            .find(|s| s.map_name == record.map_name);
        if let Some(id) = previous.and_then(|s| s.id) {
            store.delete_stats(id)?;
        }
    }
    store.insert_stats(&record)?;
    Ok(())
}

/// A file in `temp` whose name contains the recorded demo's name.
fn find_recorded_demo(temp: &Path, recorded: &Path) -> Option<PathBuf> {
    let wanted = recorded.file_name()?.to_string_lossy().to_lowercase();
    let mut matches: Vec<PathBuf> = fs::read_dir(temp)
        .ok()?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter(|e| e.file_name().to_string_lossy().to_lowercase().contains(&wanted))
        .map(|e| e.path())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// `<timestamp>_<original>`, with a counter when that name is taken.
fn managed_file_name(dir: &Path, original: &str) -> String {
    let stamp = Local::now().format("%Y%m%d%H%M%S%3f");
    let name = format!("{stamp}_{original}");
    if !dir.join(&name).exists() {
        return name;
    }
    (1..)
        .map(|n| format!("{stamp}_{n}_{original}"))
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or(name)
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
