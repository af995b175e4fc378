//! Copy loose files and archives into the managed library.
//!
//! Inputs are grouped by base name (file name without extension) and each
//! group becomes one `<base>.zip` in the library. Groups are processed in
//! lexicographic order so overwrite prompts come in a reproducible order.
//! Every group yields exactly one [`CopyOutcome`].

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::NamedTempFile;
use thiserror::Error;
use wadkeeper_core::util;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::progress::{ImportProgress, SilentProgress};

/// Message recorded for inputs that do not exist.
pub const FILE_NOT_FOUND: &str = "File not found.";
/// Message recorded when the OS refuses access to a file.
pub const FILE_IN_USE: &str = "File is in use.";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ImportError {
    /// Short message for the per-file error list.
    pub fn describe(&self) -> String {
        let io = match self {
            Self::Io(e) => Some(e),
            Self::Zip(zip::result::ZipError::Io(e)) => Some(e),
            Self::Zip(_) => None,
        };
        match io {
            Some(e) if is_in_use(e) => FILE_IN_USE.to_string(),
            _ => format!("Unknown error: {self}"),
        }
    }
}

pub(crate) fn is_in_use(e: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION
    matches!(
        e.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy
    ) || (cfg!(windows) && e.raw_os_error() == Some(32))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyKind {
    /// The archive did not exist before this batch.
    New,
    /// The archive existed and the user chose to overwrite.
    Replaced,
    /// The archive existed and the user declined, or the batch was cancelled.
    Skipped,
    Errored(String),
}

/// Result for one archive (one base name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    /// `<base>.zip`
    pub archive_name: String,
    /// Inputs that contributed to this archive, sorted.
    pub sources: Vec<PathBuf>,
    pub kind: CopyKind,
}

/// One failure, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyError {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct CopyResults {
    pub outcomes: Vec<CopyOutcome>,
    pub errors: Vec<CopyError>,
    pub cancelled: bool,
}

impl CopyResults {
    fn archives(&self, kind: &CopyKind) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| &o.kind == kind)
            .map(|o| o.archive_name.clone())
            .collect()
    }

    pub fn new_files(&self) -> Vec<String> {
        self.archives(&CopyKind::New)
    }

    pub fn replaced_files(&self) -> Vec<String> {
        self.archives(&CopyKind::Replaced)
    }

    /// Archives that were created or replaced, in batch order.
    pub fn imported_files(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.kind, CopyKind::New | CopyKind::Replaced))
            .map(|o| o.archive_name.clone())
            .collect()
    }
}

/// Answer to one overwrite prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverwriteDecision {
    pub overwrite: bool,
    /// Use this answer for every remaining conflict in the batch.
    pub apply_to_all: bool,
}

/// Asked once per conflicting archive, strictly in batch order.
pub trait OverwritePrompt {
    fn confirm_overwrite(&mut self, archive_name: &str) -> OverwriteDecision;
}

impl<F: FnMut(&str) -> OverwriteDecision> OverwritePrompt for F {
    fn confirm_overwrite(&mut self, archive_name: &str) -> OverwriteDecision {
        self(archive_name)
    }
}

/// Fixed answer for every conflict.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl OverwritePrompt for FixedAnswer {
    fn confirm_overwrite(&mut self, _archive_name: &str) -> OverwriteDecision {
        OverwriteDecision {
            overwrite: self.0,
            apply_to_all: true,
        }
    }
}

pub struct ArchiveImportPipeline<'a> {
    library_dir: PathBuf,
    progress: &'a dyn ImportProgress,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> ArchiveImportPipeline<'a> {
    pub fn new(library_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            progress: &SilentProgress,
            cancel: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ImportProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Checked between archives. Once set, the rest of the batch is skipped.
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    /// Copy `files` into the library.
    pub fn copy_files(&self, files: &[PathBuf], prompt: &mut dyn OverwritePrompt) -> CopyResults {
        let groups = group_by_base_name(files);
        let total = groups.len();
        let mut results = CopyResults::default();
        let mut standing: Option<bool> = None;

        self.progress.on_start(total);
        if let Err(e) = fs::create_dir_all(&self.library_dir) {
            log::warn!(
                "Could not create library directory '{}': {}",
                self.library_dir.display(),
                e
            );
        }

        for (idx, group) in groups.into_values().enumerate() {
            let archive_name = format!("{}.zip", group.name);
            let sources = group.paths;
            if !results.cancelled && self.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                log::info!("Copy cancelled before '{}'", archive_name);
                results.cancelled = true;
            }
            let kind = if results.cancelled {
                CopyKind::Skipped
            } else {
                self.copy_group(&archive_name, &sources, prompt, &mut standing, &mut results)
            };
            if let CopyKind::Errored(error) = &kind {
                results.errors.push(CopyError {
                    file_name: archive_name.clone(),
                    error: error.clone(),
                });
            }
            results.outcomes.push(CopyOutcome {
                archive_name: archive_name.clone(),
                sources,
                kind,
            });
            self.progress.on_file(idx + 1, total, &archive_name);
        }

        self.progress.on_complete(&format!(
            "Copied {} new, {} replaced, {} error(s)",
            results.new_files().len(),
            results.replaced_files().len(),
            results.errors.len()
        ));
        results
    }

    fn copy_group(
        &self,
        archive_name: &str,
        sources: &[PathBuf],
        prompt: &mut dyn OverwritePrompt,
        standing: &mut Option<bool>,
        results: &mut CopyResults,
    ) -> CopyKind {
        let (present, missing): (Vec<&Path>, Vec<&Path>) = sources
            .iter()
            .map(PathBuf::as_path)
            .partition(|p| p.is_file());
        if present.is_empty() {
            return CopyKind::Errored(FILE_NOT_FOUND.to_string());
        }
        for source in missing {
            results.errors.push(CopyError {
                file_name: display_name(source),
                error: FILE_NOT_FOUND.to_string(),
            });
        }

        let target = self.library_dir.join(archive_name);
        let (zips, loose): (Vec<&Path>, Vec<&Path>) =
            present.into_iter().partition(|p| is_zip(p));
        for extra in zips.iter().skip(1) {
            results.errors.push(CopyError {
                file_name: display_name(extra),
                error: format!("Another archive named {archive_name} is in this batch."),
            });
        }
        let lead_zip = zips.first().copied();

        let outcome = if target.exists() {
            let overwrite = match *standing {
                Some(answer) => answer,
                None => {
                    let decision = prompt.confirm_overwrite(archive_name);
                    if decision.apply_to_all {
                        *standing = Some(decision.overwrite);
                    }
                    decision.overwrite
                }
            };
            if !overwrite {
                log::debug!("Keeping existing {}", archive_name);
                return CopyKind::Skipped;
            }
            self.replace(&target, lead_zip, &loose)
                .map(|()| CopyKind::Replaced)
        } else {
            self.create(&target, lead_zip, &loose).map(|()| CopyKind::New)
        };

        outcome.unwrap_or_else(|e| {
            log::warn!("Could not copy {}: {}", archive_name, e);
            CopyKind::Errored(e.describe())
        })
    }

    /// A fresh archive: the lead zip as-is (or a one-entry zip), then any
    /// companions appended.
    fn create(
        &self,
        target: &Path,
        lead_zip: Option<&Path>,
        loose: &[&Path],
    ) -> Result<(), ImportError> {
        let mut companions = loose.iter();
        match lead_zip {
            Some(zip) => {
                fs::copy(zip, target)?;
            }
            None => {
                let Some(first) = companions.next() else {
                    return Ok(());
                };
                create_single_entry_zip(target, first)?;
            }
        }
        for companion in companions {
            append_entry(target, companion)?;
        }
        log::debug!("Created {}", target.display());
        Ok(())
    }

    /// Overwrite an archive that existed before the batch.
    fn replace(
        &self,
        target: &Path,
        lead_zip: Option<&Path>,
        loose: &[&Path],
    ) -> Result<(), ImportError> {
        if let Some(zip) = lead_zip {
            fs::copy(zip, target)?;
        }
        for file in loose {
            replace_entry(target, file)?;
        }
        log::debug!("Replaced {}", target.display());
        Ok(())
    }
}

/// Inputs sharing one base name. Stems are compared ignoring ASCII case and
/// `name` keeps the first spelling in sorted order.
#[derive(Debug)]
struct BaseGroup {
    name: String,
    paths: Vec<PathBuf>,
}

/// Inputs keyed by lowercased base name, each group's paths sorted.
fn group_by_base_name(files: &[PathBuf]) -> BTreeMap<String, BaseGroup> {
    let mut sorted = files.to_vec();
    sorted.sort();
    sorted.dedup();
    let mut groups: BTreeMap<String, BaseGroup> = BTreeMap::new();
    for path in sorted {
        let base = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        groups
            .entry(base.to_ascii_lowercase())
            .or_insert_with(|| BaseGroup {
                name: base,
                paths: Vec::new(),
            })
            .paths
            .push(path);
    }
    groups
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn write_entry<W: Write + io::Seek>(
    writer: &mut ZipWriter<W>,
    entry_name: &str,
    source: &Path,
) -> Result<(), ImportError> {
    writer.start_file(entry_name, entry_options())?;
    let mut input = File::open(source)?;
    io::copy(&mut input, writer)?;
    Ok(())
}

fn create_single_entry_zip(target: &Path, source: &Path) -> Result<(), ImportError> {
    let mut writer = ZipWriter::new(File::create(target)?);
    write_entry(&mut writer, &display_name(source), source)?;
    writer.finish()?;
    Ok(())
}

/// Add `source` as a new entry. An entry of exactly that name is left alone.
fn append_entry(target: &Path, source: &Path) -> Result<(), ImportError> {
    let entry_name = display_name(source);
    {
        let archive = ZipArchive::new(File::open(target)?)?;
        if archive.index_for_name(&entry_name).is_some() {
            log::debug!("{} already has {}", target.display(), entry_name);
            return Ok(());
        }
    }
    let file = fs::OpenOptions::new().read(true).write(true).open(target)?;
    let mut writer = ZipWriter::new_append(file)?;
    write_entry(&mut writer, &entry_name, source)?;
    writer.finish()?;
    Ok(())
}

/// Rewrite `target` without any entry named like `source` (ignoring case
/// and directory), then add `source` in its place.
fn replace_entry(target: &Path, source: &Path) -> Result<(), ImportError> {
    let entry_name = display_name(source);
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut archive = ZipArchive::new(File::open(target)?)?;
    let mut writer = ZipWriter::new(NamedTempFile::new_in(dir)?);
    let mut prefix = String::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();
        if util::file_name_of(&name).eq_ignore_ascii_case(&entry_name) {
            prefix = name[..name.len() - util::file_name_of(&name).len()].to_string();
            continue;
        }
        writer.raw_copy_file(entry)?;
    }
    write_entry(&mut writer, &format!("{prefix}{entry_name}"), source)?;
    let rewritten = writer.finish()?;
    drop(archive);
    rewritten.persist(target).map_err(|e| e.error)?;
    Ok(())
}
