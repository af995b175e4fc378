use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use tokio::sync::mpsc;
use wadkeeper_core::MetadataStore;
use wadkeeper_import::{
    ArchiveImportPipeline, CopyResults, FixedAnswer, ImportProgress, LegacyConfigParser,
    OverwriteDecision, OverwritePrompt, expand_zdl_files, is_zdl_file, sync_library,
};
use wadkeeper_lib::async_util::run_with_events;

use crate::cli_types::OverwriteArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::spinner::CopyBar;

enum ImportEvent {
    Start(usize),
    File { current: usize, name: String },
    Complete(String),
}

/// Forwards pipeline progress to the async side.
struct ChannelProgress {
    tx: mpsc::UnboundedSender<ImportEvent>,
}

impl ImportProgress for ChannelProgress {
    fn on_start(&self, total: usize) {
        let _ = self.tx.send(ImportEvent::Start(total));
    }

    fn on_file(&self, current: usize, _total: usize, name: &str) {
        let _ = self.tx.send(ImportEvent::File {
            current,
            name: name.to_string(),
        });
    }

    fn on_complete(&self, message: &str) {
        let _ = self.tx.send(ImportEvent::Complete(message.to_string()));
    }
}

/// Asks on the terminal, hiding the progress bar while waiting.
struct TerminalPrompt {
    bar: CopyBar,
}

impl OverwritePrompt for TerminalPrompt {
    fn confirm_overwrite(&mut self, archive_name: &str) -> OverwriteDecision {
        self.bar.suspend(|| ask_overwrite(archive_name))
    }
}

fn ask_overwrite(archive_name: &str) -> OverwriteDecision {
    let mut stdout = io::stdout();
    let _ = write!(
        stdout,
        "{} already exists. Overwrite? [y]es / [n]o / [a]ll / n[o]ne: ",
        archive_name
    );
    let _ = stdout.flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return OverwriteDecision {
            overwrite: false,
            apply_to_all: true,
        };
    }
    let (overwrite, apply_to_all) = match line.trim().to_lowercase().as_str() {
        "y" | "yes" => (true, false),
        "a" | "all" => (true, true),
        "o" | "none" => (false, true),
        _ => (false, false),
    };
    OverwriteDecision {
        overwrite,
        apply_to_all,
    }
}

/// Import loose files, archives and ZDL files into the library.
pub(crate) fn run_import(
    ctx: &mut AppContext,
    files: Vec<PathBuf>,
    overwrite: OverwriteArgs,
) -> Result<(), CliError> {
    let (zdl_files, mut inputs): (Vec<PathBuf>, Vec<PathBuf>) =
        files.into_iter().partition(|p| is_zdl_file(p));

    let parser = LegacyConfigParser::new(ctx.store.source_ports()?, ctx.store.iwads()?);
    let batch = expand_zdl_files(&parser, &zdl_files);
    for invalid in &batch.invalid {
        log::warn!("{}: {}", invalid.path.display(), invalid.errors);
    }
    if batch.should_report_errors() && inputs.is_empty() {
        return Err(CliError::other("No importable files were found in the ZDL files."));
    }
    inputs.extend(batch.library_files.iter().cloned());

    let results = copy_with_progress(ctx, inputs, overwrite)?;

    if results.cancelled {
        log::warn!("Import was cancelled");
    }
    let imported = results.imported_files();
    let report = sync_library(&mut ctx.store, &imported, &batch.drafts)?;

    for name in &report.added {
        log::info!(
            "  {} {}",
            "+".if_supports_color(Stdout, |t| t.green()),
            name
        );
    }
    for name in results.replaced_files() {
        log::info!(
            "  {} {}",
            "~".if_supports_color(Stdout, |t| t.yellow()),
            name
        );
    }
    for error in &results.errors {
        log::warn!("{}: {}", error.file_name, error.error);
    }
    log::info!(
        "{} {} new, {} replaced, {} skipped, {} error(s)",
        "Imported".if_supports_color(Stdout, |t| t.bold()),
        results.new_files().len(),
        results.replaced_files().len(),
        results
            .outcomes
            .len()
            .saturating_sub(imported.len() + errored_count(&results)),
        results.errors.len()
    );
    Ok(())
}

fn errored_count(results: &CopyResults) -> usize {
    results
        .outcomes
        .iter()
        .filter(|o| matches!(o.kind, wadkeeper_import::CopyKind::Errored(_)))
        .count()
}

/// Run the copy on a blocking task and drive the progress bar from its
/// events.
fn copy_with_progress(
    ctx: &AppContext,
    inputs: Vec<PathBuf>,
    overwrite: OverwriteArgs,
) -> Result<CopyResults, CliError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {e}")))?;
    let bar = CopyBar::new(ctx.quiet);
    let library_dir = ctx.dirs.root.clone();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut prompt: Box<dyn OverwritePrompt + Send> = if overwrite.overwrite {
        Box::new(FixedAnswer(true))
    } else if overwrite.keep_existing {
        Box::new(FixedAnswer(false))
    } else {
        Box::new(TerminalPrompt { bar: bar.clone() })
    };

    let task = rt.spawn_blocking(move || {
        let progress = ChannelProgress { tx };
        ArchiveImportPipeline::new(library_dir)
            .with_progress(&progress)
            .copy_files(&inputs, prompt.as_mut())
    });

    let joined = rt.block_on(run_with_events(task, rx, |event| match event {
        ImportEvent::Start(total) => bar.start(total),
        ImportEvent::File { current, name } => bar.file(current, &name),
        ImportEvent::Complete(message) => log::debug!("{}", message),
    }));
    bar.finish();
    joined.map_err(|e| CliError::runtime(format!("Import task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wadkeeper_db::SqliteStore;
    use wadkeeper_import::CopyKind;
    use wadkeeper_lib::{LauncherSettings, LibraryDirs};

    fn context(base: &std::path::Path) -> AppContext {
        let dirs = LibraryDirs::under(base);
        dirs.ensure_exist().unwrap();
        AppContext {
            settings: LauncherSettings::default(),
            base: base.to_path_buf(),
            dirs,
            store: SqliteStore::in_memory().unwrap(),
            quiet: true,
        }
    }

    #[test]
    fn copy_runs_on_its_own_runtime() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let wad = tmp.path().join("DOOM2.WAD");
        std::fs::write(&wad, "IWAD").unwrap();
        let keep = OverwriteArgs {
            overwrite: false,
            keep_existing: true,
        };

        let first = copy_with_progress(&ctx, vec![wad.clone()], keep).unwrap();
        assert_eq!(first.new_files(), vec!["DOOM2.zip"]);
        assert!(first.errors.is_empty());
        assert!(ctx.dirs.root.join("DOOM2.zip").is_file());

        let second = copy_with_progress(&ctx, vec![wad], keep).unwrap();
        assert_eq!(second.outcomes.len(), 1);
        assert!(matches!(second.outcomes[0].kind, CopyKind::Skipped));
        assert!(second.imported_files().is_empty());
    }
}
