use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use wadkeeper_core::store::CONFIG_DEFAULT_SOURCE_PORT;
use wadkeeper_core::{MetadataStore, SourcePortData, util};
use wadkeeper_lib::SourcePortProfile;

use crate::context::AppContext;
use crate::error::CliError;

/// List configured source ports with their resolved engine family.
pub(crate) fn run_ports_list(ctx: &AppContext) -> Result<(), CliError> {
    let ports = ctx.store.source_ports()?;
    if ports.is_empty() {
        log::info!("No source ports configured. Add one with 'wadkeeper ports add'.");
        return Ok(());
    }
    let default_id = ctx
        .store
        .config_value(CONFIG_DEFAULT_SOURCE_PORT)?
        .and_then(|v| v.parse::<i64>().ok());

    log::info!("{}", "Source ports".if_supports_color(Stdout, |t| t.bold()));
    for port in ports {
        let profile = SourcePortProfile::resolve(port);
        let marker = if profile.id() == default_id { "*" } else { " " };
        let exists = profile.executable().is_file();
        log::info!(
            " {} {:>3}  {:<20} {:<20} {}{}",
            marker.if_supports_color(Stdout, |t| t.green()),
            profile.id().unwrap_or_default(),
            profile.name(),
            profile
                .family()
                .display_name()
                .if_supports_color(Stdout, |t| t.cyan()),
            profile.executable().display(),
            if exists {
                String::new()
            } else {
                format!(" {}", "(missing)".if_supports_color(Stdout, |t| t.red()))
            },
        );
        log::debug!(
            "      extensions: {}",
            profile.supported_extensions().join(", ")
        );
    }
    Ok(())
}

pub(crate) fn run_ports_add(
    ctx: &mut AppContext,
    name: String,
    executable: PathBuf,
    extensions: Option<Vec<String>>,
    extra: Option<String>,
    make_default: bool,
) -> Result<(), CliError> {
    let executable = executable.canonicalize().unwrap_or(executable);
    if !executable.is_file() {
        log::warn!("{} does not exist yet", executable.display());
    }
    let mut port = SourcePortData::new(name, executable);
    if let Some(extensions) = extensions {
        port.supported_extensions = extensions
            .iter()
            .map(|e| util::normalize_extension(e))
            .collect();
    }
    port.extra_parameters = extra.filter(|e| !e.trim().is_empty());

    let id = ctx.store.insert_source_port(&port)?;
    let profile = SourcePortProfile::resolve(SourcePortData {
        id: Some(id),
        ..port
    });
    log::info!(
        "{} Added source port {} ({}, id {})",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        profile.name().if_supports_color(Stdout, |t| t.bold()),
        profile.family().display_name(),
        id
    );

    if make_default || ctx.store.config_value(CONFIG_DEFAULT_SOURCE_PORT)?.is_none() {
        ctx.store
            .set_config_value(CONFIG_DEFAULT_SOURCE_PORT, &id.to_string())?;
        log::info!("  Default source port is now {}", profile.name());
    }
    Ok(())
}

pub(crate) fn run_ports_remove(ctx: &mut AppContext, id: i64) -> Result<(), CliError> {
    let port = ctx
        .store
        .source_port(id)?
        .ok_or_else(|| CliError::other(format!("No source port with id {id}")))?;
    ctx.store.delete_source_port(id)?;
    log::info!(
        "{} Removed source port {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        port.name
    );
    Ok(())
}
