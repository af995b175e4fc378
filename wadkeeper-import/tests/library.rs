use std::fs;
use std::path::Path;

use chrono::Local;
use wadkeeper_core::{
    FileData, FileType, GameFile, MemoryStore, MetadataStore, SourcePortData, StatRecord, Tag,
    TagMapping,
};
use wadkeeper_import::{
    ArchiveImportPipeline, FixedAnswer, LegacyConfigParser, LibraryError, clean_temp_directory,
    delete_game_file, expand_zdl_files, register_iwads, rename_game_file, sync_library,
};
use wadkeeper_lib::LibraryDirs;

fn library(base: &Path) -> LibraryDirs {
    let dirs = LibraryDirs::under(base);
    dirs.ensure_exist().unwrap();
    dirs
}

#[test]
fn zdl_import_applies_settings_to_the_primary_file() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = library(tmp.path());
    let input = tmp.path().join("in");
    fs::create_dir_all(&input).unwrap();
    for name in ["scythe2.wad", "scythe2.deh", "music.pk3"] {
        fs::write(input.join(name), name).unwrap();
    }
    let zdl = input.join("scythe2.zdl");
    fs::write(
        &zdl,
        format!(
            "[zdl.save]\nport=gzdoom\nskill=3\nwarp=MAP07\nfile0={}\nfile1={}\nfile2={}\n",
            input.join("scythe2.wad").display(),
            input.join("scythe2.deh").display(),
            input.join("music.pk3").display(),
        ),
    )
    .unwrap();

    let mut store = MemoryStore::new();
    let port_id = store
        .insert_source_port(&SourcePortData::new("GZDoom", "/ports/gzdoom"))
        .unwrap();
    let parser = LegacyConfigParser::new(store.source_ports().unwrap(), store.iwads().unwrap());

    let batch = expand_zdl_files(&parser, &[zdl]);
    assert!(batch.invalid.is_empty(), "{:?}", batch.invalid);
    let results = ArchiveImportPipeline::new(&dirs.root)
        .copy_files(&batch.library_files, &mut FixedAnswer(true));
    let report = sync_library(&mut store, &results.imported_files(), &batch.drafts).unwrap();

    assert_eq!(report.added, vec!["music.zip", "scythe2.zip"]);
    let primary = store.game_file("scythe2.zip").unwrap().unwrap();
    assert_eq!(primary.source_port_id, Some(port_id));
    assert_eq!(primary.settings.map.as_deref(), Some("MAP07"));
    assert_eq!(primary.settings.skill.as_deref(), Some("3"));
    assert_eq!(primary.settings.files, vec!["scythe2.zip", "music.zip"]);
    let music = store.game_file("music.zip").unwrap().unwrap();
    assert!(music.settings.files.is_empty());
}

#[test]
fn sync_only_touches_existing_files_with_a_draft() {
    let mut store = MemoryStore::new();
    let mut existing = GameFile::new("av.zip");
    existing.title = Some("Alien Vendetta".into());
    store.insert_game_file(&existing).unwrap();

    let report = sync_library(&mut store, &["av.zip".to_string()], &[]).unwrap();

    assert!(report.added.is_empty());
    assert!(report.updated.is_empty());
    assert_eq!(
        store.game_file("av.zip").unwrap().unwrap().title.as_deref(),
        Some("Alien Vendetta")
    );
}

#[test]
fn registering_iwads_is_idempotent() {
    let mut store = MemoryStore::new();
    let names = vec!["DOOM2.zip".to_string(), "TNT.zip".to_string()];

    let created = register_iwads(&mut store, &names).unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].name, "DOOM2");
    assert!(register_iwads(&mut store, &names).unwrap().is_empty());
    assert_eq!(store.iwads().unwrap().len(), 2);
    assert_eq!(store.game_files().unwrap().len(), 2);
}

#[test]
fn rename_checks_run_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = library(tmp.path());
    let mut store = MemoryStore::new();
    let mut gf = GameFile::new("av.zip");
    gf.settings.files = vec!["av.zip".into(), "avmusic.zip".into()];
    store.insert_game_file(&gf).unwrap();
    store.insert_game_file(&GameFile::new("hr.zip")).unwrap();

    let err = |r: Result<GameFile, LibraryError>| r.unwrap_err().to_string();
    assert!(err(rename_game_file(&mut store, &dirs.root, "av.zip", "a/v")).contains("characters"));
    assert!(err(rename_game_file(&mut store, &dirs.root, "av.zip", "  ")).contains("empty"));
    assert!(err(rename_game_file(&mut store, &dirs.root, "av.zip", "av")).contains("unchanged"));
    assert!(err(rename_game_file(&mut store, &dirs.root, "av.zip", "hr.zip")).contains("exists"));
    assert!(matches!(
        rename_game_file(&mut store, &dirs.root, "av.zip", "vendetta"),
        Err(LibraryError::NotFound(_))
    ));

    fs::write(dirs.root.join("av.zip"), "zip").unwrap();
    let renamed = rename_game_file(&mut store, &dirs.root, "av.zip", "vendetta").unwrap();
    assert_eq!(renamed.file_name, "vendetta.zip");
    assert_eq!(renamed.settings.files, vec!["vendetta.zip", "avmusic.zip"]);
    assert!(dirs.root.join("vendetta.zip").is_file());
    assert!(!dirs.root.join("av.zip").exists());
    assert!(store.game_file("av.zip").unwrap().is_none());
}

#[test]
fn delete_removes_everything_attached() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = library(tmp.path());
    let mut store = MemoryStore::new();
    let id = store.insert_game_file(&GameFile::new("DOOM2.zip")).unwrap();
    register_iwads(&mut store, &["DOOM2.zip".to_string()]).unwrap();
    fs::write(dirs.root.join("DOOM2.zip"), "zip").unwrap();

    fs::write(dirs.screenshots.join("shot.png"), "png").unwrap();
    store
        .insert_file(&FileData {
            id: None,
            game_file_id: id,
            source_port_id: None,
            file_type: FileType::Screenshot,
            file_name: "shot.png".into(),
            original_file_name: "SHOT0000.png".into(),
            description: None,
            created_at: Local::now(),
        })
        .unwrap();
    let mut stat = StatRecord::new("MAP01");
    stat.game_file_id = Some(id);
    store.insert_stats(&stat).unwrap();
    let tag_id = store
        .insert_tag(&Tag {
            id: None,
            name: "classic".into(),
        })
        .unwrap();
    store
        .insert_tag_mapping(&TagMapping {
            tag_id,
            game_file_id: id,
        })
        .unwrap();

    let report = delete_game_file(&mut store, &dirs, id).unwrap();

    assert_eq!(report.removed_files, 2);
    assert!(report.errors.is_empty());
    assert!(!dirs.root.join("DOOM2.zip").exists());
    assert!(!dirs.screenshots.join("shot.png").exists());
    assert!(store.files(id, None).unwrap().is_empty());
    assert!(store.stats(id).unwrap().is_empty());
    assert!(store.tag_mappings(id).unwrap().is_empty());
    assert!(store.iwads().unwrap().is_empty());
    assert!(store.game_file_by_id(id).unwrap().is_none());
    assert_eq!(store.tags().unwrap().len(), 1);
}

#[test]
fn clean_temp_removes_files_and_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = library(tmp.path());
    fs::write(dirs.temp.join("SCYTHE.WAD"), "x").unwrap();
    fs::create_dir_all(dirs.temp.join("music")).unwrap();
    fs::write(dirs.temp.join("music/MUSIC.WAD"), "x").unwrap();

    let report = clean_temp_directory(&dirs.temp).unwrap();

    assert_eq!(report.removed, 2);
    assert!(report.in_use.is_empty());
    assert_eq!(fs::read_dir(&dirs.temp).unwrap().count(), 0);
    assert_eq!(
        clean_temp_directory(&tmp.path().join("nowhere")).unwrap(),
        Default::default()
    );
}
