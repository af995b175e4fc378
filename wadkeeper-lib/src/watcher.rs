//! Polling directory watcher.
//!
//! A [`NewFileDetector`] takes a baseline listing of one directory, then on
//! every [`NewFileDetector::tick`] compares a fresh listing against it. The
//! sets of new and modified names accumulate across ticks, so asking for
//! them at the end of a session returns everything seen since the baseline.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use wadkeeper_core::util;

/// Size and modification time of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl FileStamp {
    /// Stamp of `path`, or `None` if it is not a readable file.
    pub fn of(path: &Path) -> Option<FileStamp> {
        let meta = fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(FileStamp {
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// Point-in-time listing of one directory: file name to stamp.
#[derive(Debug, Clone, Default)]
pub struct FileSnapshot {
    pub entries: HashMap<String, FileStamp>,
}

impl FileSnapshot {
    /// List regular files in `dir` whose extension is in `extensions`
    /// (lowercase, with dot). An empty filter accepts every file. A missing
    /// directory yields an empty snapshot.
    pub fn capture(dir: &Path, extensions: &HashSet<String>) -> io::Result<FileSnapshot> {
        let mut entries = HashMap::new();
        let read = match fs::read_dir(dir) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FileSnapshot::default()),
            Err(e) => return Err(e),
        };
        for entry in read {
            // Entries can vanish between readdir and stat.
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !extensions.is_empty()
                && !util::extension_of(&name).is_some_and(|ext| extensions.contains(&ext))
            {
                continue;
            }
            if let Some(stamp) = FileStamp::of(&entry.path()) {
                entries.insert(name, stamp);
            }
        }
        Ok(FileSnapshot { entries })
    }
}

/// Detects files created or changed in one directory since a baseline.
#[derive(Debug)]
pub struct NewFileDetector {
    dir: PathBuf,
    extensions: HashSet<String>,
    baseline: Option<FileSnapshot>,
    new_files: BTreeSet<String>,
    modified_files: BTreeSet<String>,
}

impl NewFileDetector {
    pub fn new<S: AsRef<str>>(dir: impl Into<PathBuf>, extensions: &[S]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions
                .iter()
                .map(|e| util::normalize_extension(e.as_ref()))
                .collect(),
            baseline: None,
            new_files: BTreeSet::new(),
            modified_files: BTreeSet::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Take the baseline and clear anything accumulated so far.
    pub fn start_detection(&mut self) -> io::Result<()> {
        self.baseline = Some(FileSnapshot::capture(&self.dir, &self.extensions)?);
        self.new_files.clear();
        self.modified_files.clear();
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.baseline.is_some()
    }

    /// Compare the directory against the baseline and fold the differences
    /// into the accumulated sets. No-op before `start_detection`.
    pub fn tick(&mut self) -> io::Result<()> {
        let Some(baseline) = &self.baseline else {
            return Ok(());
        };
        let current = FileSnapshot::capture(&self.dir, &self.extensions)?;

        self.new_files.retain(|name| current.entries.contains_key(name));
        self.modified_files
            .retain(|name| current.entries.contains_key(name));

        for (name, stamp) in &current.entries {
            match baseline.entries.get(name) {
                None => {
                    self.new_files.insert(name.clone());
                }
                Some(before) if before != stamp => {
                    self.modified_files.insert(name.clone());
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Full paths of files absent from the baseline.
    pub fn new_files(&self) -> Vec<PathBuf> {
        self.new_files.iter().map(|n| self.dir.join(n)).collect()
    }

    /// Full paths of baseline files whose size or time changed.
    pub fn modified_files(&self) -> Vec<PathBuf> {
        self.modified_files.iter().map(|n| self.dir.join(n)).collect()
    }
}

/// Several detectors sharing one extension filter, driven together.
#[derive(Debug, Default)]
pub struct DetectorSet {
    detectors: Vec<NewFileDetector>,
}

impl DetectorSet {
    /// One detector per distinct directory.
    pub fn new<S: AsRef<str>>(dirs: &[PathBuf], extensions: &[S]) -> Self {
        let mut seen = HashSet::new();
        let detectors = dirs
            .iter()
            .filter(|d| seen.insert((*d).clone()))
            .map(|d| NewFileDetector::new(d.clone(), extensions))
            .collect();
        Self { detectors }
    }

    /// Baseline every directory. A directory that cannot be listed is logged
    /// and left unstarted.
    pub fn start_all(&mut self) {
        for detector in &mut self.detectors {
            if let Err(e) = detector.start_detection() {
                log::warn!(
                    "Could not watch '{}': {}",
                    detector.directory().display(),
                    e
                );
            }
        }
    }

    pub fn tick_all(&mut self) {
        for detector in &mut self.detectors {
            if let Err(e) = detector.tick() {
                log::warn!(
                    "Could not poll '{}': {}",
                    detector.directory().display(),
                    e
                );
            }
        }
    }

    pub fn new_files(&self) -> Vec<PathBuf> {
        self.detectors.iter().flat_map(|d| d.new_files()).collect()
    }

    pub fn modified_files(&self) -> Vec<PathBuf> {
        self.detectors
            .iter()
            .flat_map(|d| d.modified_files())
            .collect()
    }
}

/// The authoritative set of save files produced by a session: every new
/// file, plus modified files that were not among the saves known before the
/// session started.
pub fn reconcile_save_files(
    new_files: &[PathBuf],
    modified_files: &[PathBuf],
    existing_save_names: &[String],
) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = new_files.to_vec();
    for path in modified_files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let known = existing_save_names
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&name));
        if !known && !result.contains(path) {
            result.push(path.clone());
        }
    }
    result
}
