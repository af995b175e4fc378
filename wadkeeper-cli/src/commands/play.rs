use std::time::Duration;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use wadkeeper_core::util;
use wadkeeper_import::clean_temp_directory;
use wadkeeper_lib::{
    DemoMode, FileMode, LaunchCommandBuilder, LaunchPlan, LaunchRequest, LaunchTarget,
    PlaySession, ProcessOrchestrator, SessionEnvironment, SessionLock, SessionOptions,
    SessionReport, ZipArchiveIndex, check_launch_preconditions, resolve_launch_target,
    stage_entries,
};

use super::{find_game_file, format_minutes};
use crate::cli_types::LaunchArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::spinner::spinner;

fn session_options(args: &LaunchArgs, save_statistics: bool) -> SessionOptions {
    SessionOptions {
        map: args.map.clone(),
        skill: args.skill.clone(),
        extra_parameters: args.extra.clone(),
        files: args
            .files
            .as_ref()
            .map(|files| files.iter().map(|f| util::zip_file_name(f)).collect()),
        specific_files: args.only.clone(),
        file_mode: if args.in_place {
            FileMode::InPlace
        } else {
            FileMode::Extract
        },
        demo: match (&args.record, &args.playdemo) {
            (Some(name), _) => Some(DemoMode::Record(name.clone())),
            (None, Some(path)) => Some(DemoMode::Play(path.clone())),
            (None, None) => None,
        },
        load_save_game: args.loadgame.clone(),
        save_statistics,
    }
}

/// Preconditions, target resolution and the launch plan.
fn plan_launch(
    ctx: &AppContext,
    args: &LaunchArgs,
    save_statistics: bool,
) -> Result<(LaunchTarget, SessionOptions, LaunchPlan), CliError> {
    check_launch_preconditions(SessionLock::global().is_held(), &ctx.store)?;
    let game_file = find_game_file(&ctx.store, &args.file)?;
    let target = resolve_launch_target(&ctx.store, &game_file.file_name, args.port, args.iwad)?;

    let save_statistics = save_statistics && target.profile.statistics_supported();
    let options = session_options(args, save_statistics);
    let index = ZipArchiveIndex;
    let plan = LaunchCommandBuilder::new(&index).build(&LaunchRequest {
        game_file: &target.game_file,
        profile: &target.profile,
        iwad: target.iwad.as_ref(),
        game_file_is_iwad: target.game_file_is_iwad,
        library_dir: &ctx.dirs.root,
        temp_dir: &ctx.dirs.temp,
        options: &options,
    })?;
    Ok((target, options, plan))
}

/// Print the command line a session would use.
pub(crate) fn run_params(ctx: &AppContext, args: LaunchArgs) -> Result<(), CliError> {
    let (target, _, plan) = plan_launch(ctx, &args, ctx.settings.statistics.enabled)?;
    log::info!(
        "{} {}",
        target.profile.executable().display(),
        format!("({})", target.profile.family().display_name())
            .if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!("{}", plan.preview());
    if !plan.staged.is_empty() {
        log::info!(
            "{}",
            format!("{} file(s) would be extracted to {}", plan.staged.len(), ctx.dirs.temp.display())
                .if_supports_color(Stdout, |t| t.dimmed())
        );
    }
    Ok(())
}

/// Launch a library file and collect what the session leaves behind.
pub(crate) fn run_play(ctx: &mut AppContext, args: LaunchArgs, no_stats: bool) -> Result<(), CliError> {
    let want_stats = ctx.settings.statistics.enabled && !no_stats;
    let (target, options, plan) = plan_launch(ctx, &args, want_stats)?;

    let env = SessionEnvironment {
        dirs: ctx.dirs.clone(),
        capture_dirs: ctx.settings.capture_directories(&ctx.base),
        screenshot_extensions: ctx.settings.detection.screenshot_extensions.clone(),
        save_extensions: ctx.settings.detection.save_game_extensions.clone(),
        save_statistics: options.save_statistics,
    };

    let cleaned = clean_temp_directory(&ctx.dirs.temp)?;
    for path in &cleaned.in_use {
        log::warn!("{} is still in use", path.display());
    }
    stage_entries(&plan.staged)?;

    let mut session = PlaySession::prepare(
        &ctx.store,
        &target.game_file,
        &target.profile,
        &env,
        plan.recorded_demo.clone(),
    )?;

    let mut orchestrator = ProcessOrchestrator::new();
    orchestrator.launch(&target.profile, &target.game_file, &plan)?;
    session.begin(&mut ctx.store)?;

    let pb = spinner(
        format!(
            "Playing {} on {}",
            target.game_file.display_title(),
            target.profile.name()
        ),
        ctx.quiet,
    );
    let poll = Duration::from_millis(ctx.settings.statistics.poll_interval_ms.max(100));
    let exit = loop {
        if let Some(exit) = orchestrator.wait_exit(poll) {
            break exit;
        }
        session.tick(&mut ctx.store);
    };
    pb.finish_and_clear();

    if !exit.success {
        log::warn!(
            "{} exited with {}",
            target.profile.name(),
            exit.code
                .map(|c| format!("code {c}"))
                .unwrap_or_else(|| "no exit code".to_string())
        );
    }

    let report = session.finish(&mut ctx.store, &exit);
    print_report(&report);
    Ok(())
}

fn print_report(report: &SessionReport) {
    log::info!(
        "{} Played for {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        format_minutes(report.minutes_played)
    );
    if !report.new_screenshots.is_empty() {
        log::info!("  {} new screenshot(s)", report.new_screenshots.len());
    }
    if !report.new_save_games.is_empty() || !report.updated_save_games.is_empty() {
        log::info!(
            "  {} new, {} updated save game(s)",
            report.new_save_games.len(),
            report.updated_save_games.len()
        );
    }
    if let Some(demo) = &report.demo {
        log::info!("  Recorded demo {}", demo.file_name);
    }
    if report.stats_recorded > 0 {
        log::info!("  {} level statistic(s) recorded", report.stats_recorded);
    }
    for error in &report.errors {
        log::warn!("{}", error);
    }
}
