use chrono::{Local, TimeZone};
use wadkeeper_core::{
    FileData, FileType, GameFile, IwadData, SourcePortData, StatRecord, Tag, TagMapping,
};
use wadkeeper_db::operations::*;
use wadkeeper_db::*;

fn scythe() -> GameFile {
    let mut gf = GameFile::new("Scythe.wad");
    gf.title = Some("Scythe".into());
    gf.settings.map = Some("MAP07".into());
    gf.settings.skill = Some("4".into());
    gf.settings.files = vec!["Scythe.zip".into(), "music.zip".into()];
    gf.settings.specific_files = vec!["SCYTHE.WAD".into()];
    gf.minutes_played = 12;
    gf.last_played = Some(Local.with_ymd_and_hms(2024, 3, 1, 20, 15, 0).unwrap());
    gf
}

#[test]
fn game_file_round_trips_every_column() {
    let conn = open_memory().unwrap();
    let id = insert_game_file(&conn, &scythe()).unwrap();

    let stored = find_game_file(&conn, id).unwrap().unwrap();
    let mut expected = scythe();
    expected.id = Some(id);
    assert_eq!(stored, expected);
}

#[test]
fn game_file_lookup_by_name_ignores_case() {
    let conn = open_memory().unwrap();
    let id = insert_game_file(&conn, &scythe()).unwrap();
    let found = find_game_file_by_name(&conn, "SCYTHE.ZIP").unwrap().unwrap();
    assert_eq!(found.id, Some(id));
    assert!(find_game_file_by_name(&conn, "av.zip").unwrap().is_none());
}

#[test]
fn duplicate_file_names_are_rejected() {
    let conn = open_memory().unwrap();
    insert_game_file(&conn, &scythe()).unwrap();
    assert!(insert_game_file(&conn, &GameFile::new("scythe.zip")).is_err());
}

#[test]
fn update_of_missing_row_is_not_found() {
    let conn = open_memory().unwrap();
    let err = update_game_file(&conn, 42, &scythe()).unwrap_err();
    assert!(matches!(err, OperationError::NotFound { .. }));
}

#[test]
fn source_port_lists_survive_storage() {
    let conn = open_memory().unwrap();
    let mut port = SourcePortData::new("PrBoom+", "/usr/games/prboom-plus");
    port.extra_parameters = Some("-nomonsters".into());
    let id = insert_source_port(&conn, &port).unwrap();

    let stored = find_source_port(&conn, id).unwrap().unwrap();
    assert_eq!(stored.supported_extensions, vec![".wad", ".pk3", ".deh", ".bex"]);
    assert_eq!(stored.extra_parameters.as_deref(), Some("-nomonsters"));

    port.name = "PrBoom".into();
    update_source_port(&conn, id, &port).unwrap();
    assert_eq!(list_source_ports(&conn).unwrap()[0].name, "PrBoom");
    delete_source_port(&conn, id).unwrap();
    assert!(list_source_ports(&conn).unwrap().is_empty());
}

#[test]
fn deleting_a_port_clears_references() {
    let conn = open_memory().unwrap();
    let port = insert_source_port(&conn, &SourcePortData::new("GZDoom", "/ports/gzdoom")).unwrap();
    let mut gf = scythe();
    gf.source_port_id = Some(port);
    let id = insert_game_file(&conn, &gf).unwrap();

    delete_source_port(&conn, port).unwrap();
    assert_eq!(find_game_file(&conn, id).unwrap().unwrap().source_port_id, None);
}

#[test]
fn stats_keep_insertion_order() {
    let conn = open_memory().unwrap();
    let id = insert_game_file(&conn, &scythe()).unwrap();
    for (map, kills) in [("MAP02", 10), ("MAP01", 20)] {
        let mut stat = StatRecord::new(map);
        stat.game_file_id = Some(id);
        stat.kills = kills;
        stat.total_kills = 30;
        stat.level_time = 95.5;
        insert_stats(&conn, &stat).unwrap();
    }

    let stats = stats_for_game_file(&conn, id).unwrap();
    let maps: Vec<&str> = stats.iter().map(|s| s.map_name.as_str()).collect();
    assert_eq!(maps, vec!["MAP02", "MAP01"]);
    assert_eq!(stats[1].kills, 20);
    assert!((stats[0].level_time - 95.5).abs() < f32::EPSILON);

    delete_stats(&conn, stats[0].id.unwrap()).unwrap();
    assert_eq!(stats_for_game_file(&conn, id).unwrap().len(), 1);
}

#[test]
fn files_filter_by_type() {
    let conn = open_memory().unwrap();
    let id = insert_game_file(&conn, &scythe()).unwrap();
    for (file_type, name) in [
        (FileType::Screenshot, "shot.png"),
        (FileType::SaveGame, "save0.zds"),
        (FileType::Demo, "run.lmp"),
    ] {
        insert_file(
            &conn,
            &FileData {
                id: None,
                game_file_id: id,
                source_port_id: None,
                file_type,
                file_name: name.into(),
                original_file_name: name.into(),
                description: None,
                created_at: Local::now(),
            },
        )
        .unwrap();
    }

    assert_eq!(files_for_game_file(&conn, id, None).unwrap().len(), 3);
    let saves = files_for_game_file(&conn, id, Some(FileType::SaveGame)).unwrap();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].file_name, "save0.zds");

    let mut save = saves[0].clone();
    save.description = Some("before the cyberdemon".into());
    update_file(&conn, save.id.unwrap(), &save).unwrap();
    let saves = files_for_game_file(&conn, id, Some(FileType::SaveGame)).unwrap();
    assert_eq!(saves[0].description.as_deref(), Some("before the cyberdemon"));
}

#[test]
fn iwads_tags_and_configuration() {
    let conn = open_memory().unwrap();
    let gf = insert_game_file(&conn, &GameFile::new("DOOM2.WAD")).unwrap();
    let iwad = insert_iwad(
        &conn,
        &IwadData {
            id: None,
            game_file_id: gf,
            name: "DOOM2".into(),
        },
    )
    .unwrap();
    assert_eq!(find_iwad(&conn, iwad).unwrap().unwrap().game_file_id, gf);

    let tag = insert_tag(
        &conn,
        &Tag {
            id: None,
            name: "megawad".into(),
        },
    )
    .unwrap();
    let mapping = TagMapping {
        tag_id: tag,
        game_file_id: gf,
    };
    insert_tag_mapping(&conn, &mapping).unwrap();
    insert_tag_mapping(&conn, &mapping).unwrap();
    assert_eq!(tag_mappings_for_game_file(&conn, gf).unwrap(), vec![mapping]);
    delete_tag_mapping(&conn, &mapping).unwrap();
    assert!(tag_mappings_for_game_file(&conn, gf).unwrap().is_empty());

    set_config_value(&conn, "DefaultSkill", "3").unwrap();
    set_config_value(&conn, "DefaultSkill", "4").unwrap();
    let config = list_configuration(&conn).unwrap();
    assert_eq!(config.len(), 1);
    assert_eq!(config[0].value, "4");
}
