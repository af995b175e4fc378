//! Reading library archives: listing entries and staging them for a launch.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::LaunchError;

/// Lists the entries of library archives.
///
/// The launch builder only needs entry names, so tests and previews can
/// supply them without touching disk.
pub trait ArchiveIndex {
    /// Whether the archive exists.
    fn exists(&self, archive: &Path) -> bool;

    /// Names of the file entries in `archive`, in archive order. Directory
    /// entries are skipped.
    fn entries(&self, archive: &Path) -> Result<Vec<String>, LaunchError>;
}

/// Reads entry names from zip files on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveIndex;

impl ArchiveIndex for ZipArchiveIndex {
    fn exists(&self, archive: &Path) -> bool {
        archive.is_file()
    }

    fn entries(&self, archive: &Path) -> Result<Vec<String>, LaunchError> {
        let label = archive.display().to_string();
        let file = File::open(archive)?;
        let mut zip =
            zip::ZipArchive::new(file).map_err(|e| LaunchError::invalid_archive(&label, e))?;
        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let entry = zip
                .by_index(i)
                .map_err(|e| LaunchError::invalid_archive(&label, e))?;
            if !entry.is_dir() {
                names.push(entry.name().to_string());
            }
        }
        Ok(names)
    }
}

/// Fixed entry lists keyed by archive path.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchiveIndex {
    archives: HashMap<PathBuf, Vec<String>>,
}

impl MemoryArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(
        &mut self,
        archive: impl Into<PathBuf>,
        entries: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.archives
            .insert(archive.into(), entries.into_iter().map(Into::into).collect());
        self
    }
}

impl ArchiveIndex for MemoryArchiveIndex {
    fn exists(&self, archive: &Path) -> bool {
        self.archives.contains_key(archive)
    }

    fn entries(&self, archive: &Path) -> Result<Vec<String>, LaunchError> {
        self.archives
            .get(archive)
            .cloned()
            .ok_or_else(|| {
                LaunchError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found", archive.display()),
                ))
            })
    }
}

/// One archive entry to extract before launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub archive: PathBuf,
    /// Full entry name inside the archive.
    pub entry: String,
    /// Where the engine will find the file.
    pub target: PathBuf,
}

/// Extract every staged entry. Entries from the same archive share one
/// open handle.
pub fn stage_entries(entries: &[StagedEntry]) -> Result<(), LaunchError> {
    let mut open: HashMap<&Path, zip::ZipArchive<File>> = HashMap::new();
    for staged in entries {
        let label = staged.archive.display().to_string();
        if !open.contains_key(staged.archive.as_path()) {
            let file = File::open(&staged.archive)?;
            let zip =
                zip::ZipArchive::new(file).map_err(|e| LaunchError::invalid_archive(&label, e))?;
            open.insert(staged.archive.as_path(), zip);
        }
        let Some(zip) = open.get_mut(staged.archive.as_path()) else {
            continue;
        };
        let mut entry = zip
            .by_name(&staged.entry)
            .map_err(|e| LaunchError::invalid_archive(&label, e))?;
        if let Some(parent) = staged.target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&staged.target)?;
        io::copy(&mut entry, &mut out)?;
        log::debug!("Staged {} -> {}", staged.entry, staged.target.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn make_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn zip_index_lists_files_in_order_and_skips_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("av.zip");
        make_zip(
            &archive,
            &[("AV.WAD", b"w"), ("docs/", b""), ("docs/AV.TXT", b"t")],
        );
        let names = ZipArchiveIndex.entries(&archive).unwrap();
        assert_eq!(names, vec!["AV.WAD", "docs/AV.TXT"]);
        assert!(ZipArchiveIndex.exists(&archive));
        assert!(!ZipArchiveIndex.exists(&tmp.path().join("nope.zip")));
    }

    #[test]
    fn invalid_zip_is_reported_with_archive_name() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("broken.zip");
        fs::write(&archive, b"not a zip").unwrap();
        let err = ZipArchiveIndex.entries(&archive).unwrap_err();
        assert!(matches!(err, LaunchError::InvalidArchive { .. }));
        assert!(err.to_string().contains("broken.zip"));
    }

    #[test]
    fn stage_entries_extracts_to_targets() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("scythe.zip");
        make_zip(&archive, &[("maps/SCYTHE.WAD", b"PWAD"), ("SCYTHE.DEH", b"patch")]);
        let temp = tmp.path().join("temp");
        let staged = vec![
            StagedEntry {
                archive: archive.clone(),
                entry: "maps/SCYTHE.WAD".into(),
                target: temp.join("SCYTHE.WAD"),
            },
            StagedEntry {
                archive,
                entry: "SCYTHE.DEH".into(),
                target: temp.join("SCYTHE.DEH"),
            },
        ];
        stage_entries(&staged).unwrap();

        let mut contents = String::new();
        File::open(temp.join("SCYTHE.WAD"))
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "PWAD");
        assert!(temp.join("SCYTHE.DEH").is_file());
    }
}
