use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use wadkeeper_core::MetadataStore;
use wadkeeper_import::{clean_temp_directory, delete_game_file, rename_game_file};

use super::{find_game_file, format_minutes};
use crate::context::AppContext;
use crate::error::CliError;

pub(crate) fn run_library_list(ctx: &AppContext) -> Result<(), CliError> {
    let files = ctx.store.game_files()?;
    if files.is_empty() {
        log::info!("The library is empty. Add files with 'wadkeeper import'.");
        return Ok(());
    }
    for file in &files {
        let last = file
            .last_played
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string());
        let missing = !ctx.dirs.root.join(&file.file_name).is_file();
        log::info!(
            "{:>4}  {:<24} {:>8}  {:<10} {}{}",
            file.id.unwrap_or_default(),
            file.file_name.if_supports_color(Stdout, |t| t.bold()),
            format_minutes(file.minutes_played),
            last.if_supports_color(Stdout, |t| t.dimmed()),
            file.title.as_deref().unwrap_or(""),
            if missing {
                format!(" {}", "(missing)".if_supports_color(Stdout, |t| t.red()))
            } else {
                String::new()
            },
        );
    }
    log::info!("{} file(s)", files.len());
    Ok(())
}

pub(crate) fn run_library_rename(
    ctx: &mut AppContext,
    file: String,
    new_name: String,
) -> Result<(), CliError> {
    let game_file = find_game_file(&ctx.store, &file)?;
    let renamed = rename_game_file(&mut ctx.store, &ctx.dirs.root, &game_file.file_name, &new_name)?;
    log::info!(
        "{} Renamed {} to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        game_file.file_name,
        renamed.file_name.if_supports_color(Stdout, |t| t.bold()),
    );
    Ok(())
}

pub(crate) fn run_library_delete(ctx: &mut AppContext, file: String) -> Result<(), CliError> {
    let game_file = find_game_file(&ctx.store, &file)?;
    let id = game_file
        .id
        .ok_or_else(|| CliError::other("library record has no id"))?;
    let report = delete_game_file(&mut ctx.store, &ctx.dirs, id)?;
    for error in &report.errors {
        log::warn!("{}", error);
    }
    log::info!(
        "{} Deleted {} ({} file(s) removed)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        game_file.file_name,
        report.removed_files
    );
    Ok(())
}

pub(crate) fn run_library_clean_temp(ctx: &AppContext) -> Result<(), CliError> {
    let report = clean_temp_directory(&ctx.dirs.temp)?;
    for path in &report.in_use {
        log::warn!("{} is in use", path.display());
    }
    log::info!(
        "Removed {} item(s) from {}",
        report.removed,
        ctx.dirs.temp.display()
    );
    Ok(())
}
