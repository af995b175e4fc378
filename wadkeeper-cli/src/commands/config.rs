use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use wadkeeper_core::MetadataStore;
use wadkeeper_core::store::{CONFIG_DEFAULT_IWAD, CONFIG_DEFAULT_SKILL, CONFIG_DEFAULT_SOURCE_PORT};
use wadkeeper_lib::SettingsError;
use wadkeeper_lib::settings::{load_settings_string, set_setting, setting_keys, settings_path};

use crate::context::AppContext;
use crate::error::CliError;

const STORE_DEFAULTS: &[&str] = &[
    CONFIG_DEFAULT_SOURCE_PORT,
    CONFIG_DEFAULT_IWAD,
    CONFIG_DEFAULT_SKILL,
];

pub(crate) fn run_config_show(ctx: &AppContext) -> Result<(), CliError> {
    let path = settings_path();
    log::info!(
        "{} {}",
        "Settings file:".if_supports_color(Stdout, |t| t.bold()),
        path.display()
    );
    match load_settings_string() {
        Some(contents) => log::info!("{}", contents.trim_end()),
        None => log::info!(
            "{}",
            "(not created yet, using defaults)".if_supports_color(Stdout, |t| t.dimmed())
        ),
    }

    log::info!("");
    log::info!("{}", "Directories:".if_supports_color(Stdout, |t| t.bold()));
    log::info!("  library      {}", ctx.dirs.root.display());
    log::info!("  temp         {}", ctx.dirs.temp.display());
    log::info!("  screenshots  {}", ctx.dirs.screenshots.display());
    log::info!("  save games   {}", ctx.dirs.save_games.display());
    log::info!("  demos        {}", ctx.dirs.demos.display());
    log::info!("  database     {}", ctx.settings.database_path(&ctx.base).display());

    let entries = ctx.store.configuration()?;
    if !entries.is_empty() {
        log::info!("");
        log::info!("{}", "Launch defaults:".if_supports_color(Stdout, |t| t.bold()));
        for entry in entries {
            log::info!("  {:<18} {}", entry.name, entry.value);
        }
    }
    Ok(())
}

pub(crate) fn run_config_path() -> Result<(), CliError> {
    log::info!("{}", settings_path().display());
    Ok(())
}

pub(crate) fn run_config_set(key: String, value: String) -> Result<(), CliError> {
    match set_setting(&settings_path(), &key, &value) {
        Ok(()) => {
            if value.is_empty() {
                log::info!("Removed {}", key);
            } else {
                log::info!("Set {} = {}", key, value);
            }
            Ok(())
        }
        Err(SettingsError::UnknownKey(k)) => {
            let known: Vec<&str> = setting_keys().collect();
            Err(CliError::other(format!(
                "Unknown setting '{}'. Known settings: {}",
                k,
                known.join(", ")
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn run_config_default(
    ctx: &mut AppContext,
    name: String,
    value: String,
) -> Result<(), CliError> {
    let Some(name) = STORE_DEFAULTS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(&name))
    else {
        return Err(CliError::other(format!(
            "Unknown launch default '{}'. Expected one of: {}",
            name,
            STORE_DEFAULTS.join(", ")
        )));
    };

    let value = value.trim();
    if *name == CONFIG_DEFAULT_SOURCE_PORT || *name == CONFIG_DEFAULT_IWAD {
        let id: i64 = value
            .parse()
            .map_err(|_| CliError::other(format!("{} expects an id, got '{}'", name, value)))?;
        let exists = if *name == CONFIG_DEFAULT_SOURCE_PORT {
            ctx.store.source_port(id)?.is_some()
        } else {
            ctx.store.iwad(id)?.is_some()
        };
        if !exists {
            return Err(CliError::other(format!("No record with id {} for {}", id, name)));
        }
    }

    ctx.store.set_config_value(name, value)?;
    log::info!("Set {} = {}", name, value);
    Ok(())
}
