use std::collections::HashMap;
use std::io;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use serde::Serialize;
use wadkeeper_core::{GameFile, MetadataStore};

use super::find_game_file;
use crate::context::AppContext;
use crate::error::CliError;

/// One statistics line as printed or exported.
#[derive(Debug, Serialize)]
struct StatRow {
    file: String,
    map: String,
    kills: i32,
    total_kills: i32,
    items: i32,
    total_items: i32,
    secrets: i32,
    total_secrets: i32,
    level_time: f32,
    source_port: Option<String>,
    recorded_at: String,
}

fn collect_rows(ctx: &AppContext, file: Option<&str>) -> Result<Vec<StatRow>, CliError> {
    let files: Vec<GameFile> = match file {
        Some(name) => vec![find_game_file(&ctx.store, name)?],
        None => ctx.store.game_files()?,
    };
    let port_names: HashMap<i64, String> = ctx
        .store
        .source_ports()?
        .into_iter()
        .filter_map(|p| p.id.map(|id| (id, p.name)))
        .collect();

    let mut rows = Vec::new();
    for game_file in files {
        let Some(id) = game_file.id else { continue };
        for stat in ctx.store.stats(id)? {
            rows.push(StatRow {
                file: game_file.file_name.clone(),
                map: stat.map_name,
                kills: stat.kills,
                total_kills: stat.total_kills,
                items: stat.items,
                total_items: stat.total_items,
                secrets: stat.secrets,
                total_secrets: stat.total_secrets,
                level_time: stat.level_time,
                source_port: stat
                    .source_port_id
                    .and_then(|pid| port_names.get(&pid).cloned()),
                recorded_at: stat.recorded_at.to_rfc3339(),
            });
        }
    }
    Ok(rows)
}

/// `mm:ss.cc`
fn format_level_time(seconds: f32) -> String {
    let total = seconds.max(0.0);
    let minutes = (total / 60.0).floor() as u32;
    format!("{}:{:05.2}", minutes, total - minutes as f32 * 60.0)
}

pub(crate) fn run_stats(
    ctx: &AppContext,
    file: Option<String>,
    csv: bool,
    json: bool,
) -> Result<(), CliError> {
    let rows = collect_rows(ctx, file.as_deref())?;

    if json {
        let text = serde_json::to_string_pretty(&rows).map_err(|e| CliError::output(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }
    if csv {
        let mut writer = csv::Writer::from_writer(io::stdout());
        for row in &rows {
            writer
                .serialize(row)
                .map_err(|e| CliError::output(e.to_string()))?;
        }
        writer.flush()?;
        return Ok(());
    }

    if rows.is_empty() {
        log::info!("No statistics recorded.");
        return Ok(());
    }
    log::info!(
        "{}",
        format!(
            "{:<20} {:<8} {:>9} {:>9} {:>9} {:>10}  {}",
            "File", "Map", "Kills", "Items", "Secrets", "Time", "Port"
        )
        .if_supports_color(Stdout, |t| t.bold())
    );
    for row in &rows {
        log::info!(
            "{:<20} {:<8} {:>9} {:>9} {:>9} {:>10}  {}",
            row.file,
            row.map,
            format!("{}/{}", row.kills, row.total_kills),
            format!("{}/{}", row.items, row.total_items),
            format!("{}/{}", row.secrets, row.total_secrets),
            format_level_time(row.level_time),
            row.source_port.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
