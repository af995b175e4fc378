//! Library maintenance: syncing imported archives into the store, renaming,
//! deleting and cleaning the temp directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use wadkeeper_core::{FileType, GameFile, IwadData, MetadataStore, StoreError, util};
use wadkeeper_lib::LibraryDirs;

use crate::copy::is_in_use;
use crate::zdl::GameFileDraft;

const INVALID_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Error)]
pub enum LibraryError {
    /// The requested change is not allowed
    #[error("{0}")]
    Invalid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What [`sync_library`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
}

/// Record freshly copied archives, applying ZDL drafts whose names match.
///
/// Archives already in the store are only touched when a draft matches.
pub fn sync_library(
    store: &mut dyn MetadataStore,
    archive_names: &[String],
    drafts: &[GameFileDraft],
) -> Result<SyncReport, LibraryError> {
    let mut report = SyncReport::default();
    for name in archive_names {
        let draft = drafts
            .iter()
            .find(|d| d.game_file.file_name.eq_ignore_ascii_case(name));

        match store.game_file(name)? {
            Some(mut existing) => {
                let Some(draft) = draft else { continue };
                apply_draft(&mut existing, &draft.game_file);
                store.update_game_file(&existing)?;
                report.updated.push(existing.file_name);
            }
            None => {
                let mut game_file = match draft {
                    Some(d) => d.game_file.clone(),
                    None => GameFile::new(name),
                };
                game_file.file_name = name.clone();
                store.insert_game_file(&game_file)?;
                report.added.push(name.clone());
            }
        }
    }
    log::debug!(
        "Library sync: {} added, {} updated",
        report.added.len(),
        report.updated.len()
    );
    Ok(report)
}

fn apply_draft(target: &mut GameFile, draft: &GameFile) {
    if draft.source_port_id.is_some() {
        target.source_port_id = draft.source_port_id;
    }
    if draft.iwad_id.is_some() {
        target.iwad_id = draft.iwad_id;
    }
    let settings = &draft.settings;
    if settings.map.is_some() {
        target.settings.map = settings.map.clone();
    }
    if settings.skill.is_some() {
        target.settings.skill = settings.skill.clone();
    }
    if settings.extra_parameters.is_some() {
        target.settings.extra_parameters = settings.extra_parameters.clone();
    }
    if !settings.files.is_empty() {
        target.settings.files = settings.files.clone();
    }
}

/// Make sure each archive has a GameFile and an IWAD record. Returns the
/// IWAD records that were created.
pub fn register_iwads(
    store: &mut dyn MetadataStore,
    archive_names: &[String],
) -> Result<Vec<IwadData>, LibraryError> {
    let mut created = Vec::new();
    for name in archive_names {
        let game_file_id = match store.game_file(name)? {
            Some(GameFile { id: Some(id), .. }) => id,
            Some(_) => return Err(StoreError::invalid("game file", "missing id").into()),
            None => store.insert_game_file(&GameFile::new(name))?,
        };
        if store.iwad_for_game_file(game_file_id)?.is_some() {
            log::debug!("{} is already an IWAD", name);
            continue;
        }
        let mut iwad = IwadData {
            id: None,
            game_file_id,
            name: util::base_name(name).to_string(),
        };
        iwad.id = Some(store.insert_iwad(&iwad)?);
        log::info!("Registered IWAD {}", iwad.name);
        created.push(iwad);
    }
    Ok(created)
}

/// Rename a library archive. `new_name` may be given with or without the
/// `.zip` extension.
pub fn rename_game_file(
    store: &mut dyn MetadataStore,
    library_dir: &Path,
    old_name: &str,
    new_name: &str,
) -> Result<GameFile, LibraryError> {
    let requested = new_name.trim();
    if requested.contains(INVALID_NAME_CHARS) {
        return Err(LibraryError::Invalid(format!(
            "A file name cannot contain any of the following characters: {}",
            INVALID_NAME_CHARS.iter().collect::<String>()
        )));
    }
    let base = util::base_name(requested);
    if base.trim().is_empty() {
        return Err(LibraryError::Invalid("The file name cannot be empty.".into()));
    }
    let new_file_name = util::zip_file_name(requested);
    if new_file_name == old_name {
        return Err(LibraryError::Invalid("The file name is unchanged.".into()));
    }
    // Case-only renames are allowed; the existing record is the source itself.
    if !new_file_name.eq_ignore_ascii_case(old_name) && store.game_file(&new_file_name)?.is_some()
    {
        return Err(LibraryError::Invalid(format!(
            "{} already exists in the library.",
            new_file_name
        )));
    }
    let Some(mut game_file) = store.game_file(old_name)? else {
        return Err(LibraryError::NotFound(old_name.to_string()));
    };
    let source = library_dir.join(old_name);
    if !source.is_file() {
        return Err(LibraryError::NotFound(source.display().to_string()));
    }

    fs::rename(&source, library_dir.join(&new_file_name))?;
    for entry in &mut game_file.settings.files {
        if entry.eq_ignore_ascii_case(old_name) {
            *entry = new_file_name.clone();
        }
    }
    game_file.file_name = new_file_name;
    store.update_game_file(&game_file)?;
    log::info!("Renamed {} to {}", old_name, game_file.file_name);
    Ok(game_file)
}

/// Per-step failures while deleting a game file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub removed_files: usize,
    pub errors: Vec<String>,
}

/// Delete a game file and everything attached to it.
///
/// File removal failures are collected and do not stop the rest of the
/// deletion. Store failures do.
pub fn delete_game_file(
    store: &mut dyn MetadataStore,
    dirs: &LibraryDirs,
    game_file_id: i64,
) -> Result<DeleteReport, LibraryError> {
    let Some(game_file) = store.game_file_by_id(game_file_id)? else {
        return Err(LibraryError::NotFound(format!("game file {game_file_id}")));
    };
    let mut report = DeleteReport::default();

    remove_file(&dirs.root.join(&game_file.file_name), &mut report);

    for file in store.files(game_file_id, None)? {
        let dir = match file.file_type {
            FileType::Screenshot => &dirs.screenshots,
            FileType::SaveGame => &dirs.save_games,
            FileType::Demo => &dirs.demos,
        };
        remove_file(&file.path_in(dir), &mut report);
        if let Some(id) = file.id {
            store.delete_file(id)?;
        }
    }

    for stat in store.stats(game_file_id)? {
        if let Some(id) = stat.id {
            store.delete_stats(id)?;
        }
    }

    for mapping in store.tag_mappings(game_file_id)? {
        store.delete_tag_mapping(&mapping)?;
    }

    if let Some(IwadData { id: Some(id), .. }) = store.iwad_for_game_file(game_file_id)? {
        store.delete_iwad(id)?;
    }

    store.delete_game_file(game_file_id)?;
    log::info!("Deleted {}", game_file.file_name);
    Ok(report)
}

fn remove_file(path: &Path, report: &mut DeleteReport) {
    match fs::remove_file(path) {
        Ok(()) => report.removed_files += 1,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} was already gone", path.display());
        }
        Err(e) => report
            .errors
            .push(format!("Could not delete {}: {}", path.display(), e)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: usize,
    /// Paths left behind because something still holds them.
    pub in_use: Vec<PathBuf>,
}

/// Empty the temp directory. Entries that cannot be removed because they
/// are in use are reported and left in place.
pub fn clean_temp_directory(temp: &Path) -> Result<CleanReport, LibraryError> {
    let mut report = CleanReport::default();
    if !temp.is_dir() {
        return Ok(report);
    }
    for entry in fs::read_dir(temp)? {
        let path = entry?.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => report.removed += 1,
            Err(e) if is_in_use(&e) => {
                log::warn!("{} is in use, leaving it", path.display());
                report.in_use.push(path);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(report)
}
