use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use wadkeeper_core::MetadataStore;
use wadkeeper_core::store::CONFIG_DEFAULT_IWAD;
use wadkeeper_import::{ArchiveImportPipeline, CopyKind, FixedAnswer, register_iwads};

use crate::context::AppContext;
use crate::error::CliError;

pub(crate) fn run_iwads_list(ctx: &AppContext) -> Result<(), CliError> {
    let iwads = ctx.store.iwads()?;
    if iwads.is_empty() {
        log::info!("No IWADs registered. Add one with 'wadkeeper iwads add'.");
        return Ok(());
    }
    let default_id = ctx
        .store
        .config_value(CONFIG_DEFAULT_IWAD)?
        .and_then(|v| v.parse::<i64>().ok());

    log::info!("{}", "IWADs".if_supports_color(Stdout, |t| t.bold()));
    for iwad in iwads {
        let file = ctx
            .store
            .game_file_by_id(iwad.game_file_id)?
            .map(|f| f.file_name)
            .unwrap_or_else(|| "?".to_string());
        let marker = if iwad.id == default_id { "*" } else { " " };
        log::info!(
            " {} {:>3}  {:<12} {}",
            marker.if_supports_color(Stdout, |t| t.green()),
            iwad.id.unwrap_or_default(),
            iwad.name,
            file.if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}

/// Copy IWAD files into the library and register them. Archives already in
/// the library are kept as they are.
pub(crate) fn run_iwads_add(
    ctx: &mut AppContext,
    files: Vec<PathBuf>,
    make_default: bool,
) -> Result<(), CliError> {
    let results = ArchiveImportPipeline::new(&ctx.dirs.root).copy_files(&files, &mut FixedAnswer(false));
    for error in &results.errors {
        log::warn!("{}: {}", error.file_name, error.error);
    }
    let names: Vec<String> = results
        .outcomes
        .iter()
        .filter(|o| !matches!(o.kind, CopyKind::Errored(_)))
        .map(|o| o.archive_name.clone())
        .collect();

    let created = register_iwads(&mut ctx.store, &names)?;
    for iwad in &created {
        log::info!(
            "{} Registered IWAD {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            iwad.name.if_supports_color(Stdout, |t| t.bold()),
        );
    }
    if created.is_empty() {
        log::info!("No new IWADs registered.");
    }

    let first = created.first().and_then(|i| i.id);
    if let Some(id) = first {
        if make_default || ctx.store.config_value(CONFIG_DEFAULT_IWAD)?.is_none() {
            ctx.store.set_config_value(CONFIG_DEFAULT_IWAD, &id.to_string())?;
            log::info!("  Default IWAD id is now {}", id);
        }
    }
    Ok(())
}
