use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::TempDir;
use wadkeeper_import::{
    ArchiveImportPipeline, CopyKind, FILE_NOT_FOUND, FixedAnswer, ImportProgress,
    OverwriteDecision,
};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

struct Fixture {
    _tmp: TempDir,
    input: PathBuf,
    library: PathBuf,
}

fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("downloads");
    let library = tmp.path().join("library");
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&library).unwrap();
    Fixture {
        _tmp: tmp,
        input,
        library,
    }
}

fn write_input(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let mut w = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        w.start_file(*name, SimpleFileOptions::default()).unwrap();
        w.write_all(content.as_bytes()).unwrap();
    }
    w.finish().unwrap();
}

fn entries(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn entry_text(path: &Path, name: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut text = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    text
}

#[test]
fn loose_wad_becomes_single_entry_archive() {
    let f = fixture();
    let wad = write_input(&f.input, "DOOM2.WAD", "IWAD");

    let results = ArchiveImportPipeline::new(&f.library).copy_files(&[wad], &mut FixedAnswer(true));

    assert_eq!(results.new_files(), vec!["DOOM2.zip"]);
    assert!(results.errors.is_empty());
    let archive = f.library.join("DOOM2.zip");
    assert_eq!(entries(&archive), vec!["DOOM2.WAD"]);
    assert_eq!(entry_text(&archive, "DOOM2.WAD"), "IWAD");
}

#[test]
fn companions_differing_in_case_share_one_archive() {
    let f = fixture();
    let files = vec![
        write_input(&f.input, "map01.txt", "notes"),
        write_input(&f.input, "MAP01.WAD", "level"),
    ];

    let results = ArchiveImportPipeline::new(&f.library).copy_files(&files, &mut FixedAnswer(true));

    assert_eq!(results.outcomes.len(), 1);
    assert_eq!(results.new_files(), vec!["MAP01.zip"]);
    assert_eq!(
        entries(&f.library.join("MAP01.zip")),
        vec!["MAP01.WAD", "map01.txt"]
    );
}

#[test]
fn companions_share_one_archive() {
    let f = fixture();
    let files = vec![
        write_input(&f.input, "scythe.wad", "maps"),
        write_input(&f.input, "scythe.deh", "patch"),
        write_input(&f.input, "scythe.txt", "readme"),
    ];

    let results = ArchiveImportPipeline::new(&f.library).copy_files(&files, &mut FixedAnswer(true));

    assert_eq!(results.outcomes.len(), 1);
    assert_eq!(results.new_files(), vec!["scythe.zip"]);
    assert_eq!(
        entries(&f.library.join("scythe.zip")),
        vec!["scythe.deh", "scythe.txt", "scythe.wad"]
    );
}

#[test]
fn loose_file_replaces_matching_entry_in_existing_archive() {
    let f = fixture();
    let archive = f.library.join("MAP01.zip");
    write_zip(&archive, &[("MAP01.WAD", "level"), ("MAP01.TXT", "old notes")]);
    let txt = write_input(&f.input, "MAP01.txt", "new notes");

    let mut asked = Vec::new();
    let mut prompt = |name: &str| {
        asked.push(name.to_string());
        OverwriteDecision {
            overwrite: true,
            apply_to_all: false,
        }
    };
    let results = ArchiveImportPipeline::new(&f.library).copy_files(&[txt], &mut prompt);

    assert_eq!(asked, vec!["MAP01.zip"]);
    assert_eq!(results.replaced_files(), vec!["MAP01.zip"]);
    assert_eq!(entries(&archive), vec!["MAP01.WAD", "MAP01.txt"]);
    assert_eq!(entry_text(&archive, "MAP01.WAD"), "level");
    assert_eq!(entry_text(&archive, "MAP01.txt"), "new notes");
}

#[test]
fn apply_to_all_stops_further_prompts() {
    let f = fixture();
    let mut files = Vec::new();
    for name in ["a", "b", "c"] {
        write_zip(&f.library.join(format!("{name}.zip")), &[("OLD.WAD", "old")]);
        files.push(write_input(&f.input, &format!("{name}.wad"), "new"));
    }

    let mut prompts = 0;
    let mut prompt = |_: &str| {
        prompts += 1;
        OverwriteDecision {
            overwrite: false,
            apply_to_all: true,
        }
    };
    let results = ArchiveImportPipeline::new(&f.library).copy_files(&files, &mut prompt);

    assert_eq!(prompts, 1);
    assert!(results.outcomes.iter().all(|o| o.kind == CopyKind::Skipped));
    assert_eq!(entries(&f.library.join("c.zip")), vec!["OLD.WAD"]);
}

#[test]
fn answers_without_apply_to_all_are_asked_in_order() {
    let f = fixture();
    let mut files = Vec::new();
    for name in ["a", "b"] {
        write_zip(&f.library.join(format!("{name}.zip")), &[("OLD.WAD", "old")]);
        files.push(write_input(&f.input, &format!("{name}.wad"), "new"));
    }

    let mut asked = Vec::new();
    let mut prompt = |name: &str| {
        asked.push(name.to_string());
        OverwriteDecision {
            overwrite: name == "b.zip",
            apply_to_all: false,
        }
    };
    let results = ArchiveImportPipeline::new(&f.library).copy_files(&files, &mut prompt);

    assert_eq!(asked, vec!["a.zip", "b.zip"]);
    assert_eq!(results.outcomes[0].kind, CopyKind::Skipped);
    assert_eq!(results.replaced_files(), vec!["b.zip"]);
}

#[test]
fn declining_everything_makes_a_second_import_a_no_op() {
    let f = fixture();
    let files = vec![
        write_input(&f.input, "av.wad", "alien vendetta"),
        write_input(&f.input, "hr.wad", "hell revealed"),
    ];
    let pipeline = ArchiveImportPipeline::new(&f.library);
    let first = pipeline.copy_files(&files, &mut FixedAnswer(false));
    assert_eq!(first.new_files().len(), 2);
    let before = fs::read(f.library.join("av.zip")).unwrap();

    let second = pipeline.copy_files(&files, &mut FixedAnswer(false));

    assert!(second.imported_files().is_empty());
    assert!(second.errors.is_empty());
    assert_eq!(fs::read(f.library.join("av.zip")).unwrap(), before);
}

#[test]
fn every_group_gets_exactly_one_outcome() {
    let f = fixture();
    let files = vec![
        write_input(&f.input, "one.wad", "1"),
        write_input(&f.input, "one.txt", "1"),
        write_input(&f.input, "two.pk3", "2"),
        f.input.join("three.wad"),
    ];

    let results = ArchiveImportPipeline::new(&f.library).copy_files(&files, &mut FixedAnswer(true));

    let names: Vec<&str> = results
        .outcomes
        .iter()
        .map(|o| o.archive_name.as_str())
        .collect();
    assert_eq!(names, vec!["one.zip", "three.zip", "two.zip"]);
    assert_eq!(
        results.outcomes[1].kind,
        CopyKind::Errored(FILE_NOT_FOUND.to_string())
    );
    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].file_name, "three.zip");
    assert_eq!(results.errors[0].error, FILE_NOT_FOUND);
}

#[test]
fn missing_companion_is_reported_but_group_still_imports() {
    let f = fixture();
    let files = vec![
        write_input(&f.input, "eviternity.wad", "maps"),
        f.input.join("eviternity.deh"),
    ];

    let results = ArchiveImportPipeline::new(&f.library).copy_files(&files, &mut FixedAnswer(true));

    assert_eq!(results.new_files(), vec!["eviternity.zip"]);
    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].file_name, "eviternity.deh");
}

#[test]
fn zip_inputs_are_copied_as_is() {
    let f = fixture();
    let source = f.input.join("sunlust.zip");
    write_zip(&source, &[("sunlust.wad", "maps"), ("sunlust.txt", "readme")]);
    let results =
        ArchiveImportPipeline::new(&f.library).copy_files(&[source.clone()], &mut FixedAnswer(true));

    assert_eq!(results.new_files(), vec!["sunlust.zip"]);
    assert_eq!(
        fs::read(f.library.join("sunlust.zip")).unwrap(),
        fs::read(source).unwrap()
    );
}

/// Flips the cancel flag once the first archive is done.
struct CancelAfterFirst<'a> {
    cancel: &'a AtomicBool,
    seen: Mutex<Vec<(usize, usize, String)>>,
}

impl ImportProgress for CancelAfterFirst<'_> {
    fn on_start(&self, _total: usize) {}

    fn on_file(&self, current: usize, total: usize, name: &str) {
        self.seen
            .lock()
            .unwrap()
            .push((current, total, name.to_string()));
        self.cancel.store(true, Ordering::Relaxed);
    }

    fn on_complete(&self, _message: &str) {}
}

#[test]
fn cancellation_skips_the_rest_of_the_batch() {
    let f = fixture();
    let files = vec![
        write_input(&f.input, "a.wad", "a"),
        write_input(&f.input, "b.wad", "b"),
        write_input(&f.input, "c.wad", "c"),
    ];
    let cancel = AtomicBool::new(false);
    let progress = CancelAfterFirst {
        cancel: &cancel,
        seen: Mutex::new(Vec::new()),
    };

    let results = ArchiveImportPipeline::new(&f.library)
        .with_progress(&progress)
        .with_cancel(&cancel)
        .copy_files(&files, &mut FixedAnswer(true));

    assert!(results.cancelled);
    assert_eq!(results.new_files(), vec!["a.zip"]);
    assert_eq!(results.outcomes.len(), 3);
    assert!(!f.library.join("b.zip").exists());

    let seen = progress.seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2], (3, 3, "c.zip".to_string()));
}
