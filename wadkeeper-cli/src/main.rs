mod cli_types;
mod commands;
mod context;
mod error;
mod logger;
mod spinner;

use clap::Parser;

use cli_types::{Cli, Commands, ConfigAction, IwadsAction, LibraryAction, PortsAction};
use commands::{config, import, iwads, library, play, ports, stats};
use context::AppContext;
use error::CliError;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init(cli.quiet, cli.verbose, cli.logfile.as_deref()) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        root,
        quiet,
        command,
        ..
    } = cli;

    // Settings file commands work without a library.
    match command {
        Commands::Config {
            action: ConfigAction::Path,
        } => config::run_config_path(),
        Commands::Config {
            action: ConfigAction::Set { key, value },
        } => config::run_config_set(key, value),
        command => {
            let mut ctx = AppContext::open(root, quiet)?;
            dispatch(&mut ctx, command)
        }
    }
}

fn dispatch(ctx: &mut AppContext, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Ports { action } => match action {
            PortsAction::List => ports::run_ports_list(ctx),
            PortsAction::Add {
                name,
                executable,
                extensions,
                extra,
                default,
            } => ports::run_ports_add(ctx, name, executable, extensions, extra, default),
            PortsAction::Remove { id } => ports::run_ports_remove(ctx, id),
        },
        Commands::Iwads { action } => match action {
            IwadsAction::List => iwads::run_iwads_list(ctx),
            IwadsAction::Add { files, default } => iwads::run_iwads_add(ctx, files, default),
        },
        Commands::Import { files, overwrite } => import::run_import(ctx, files, overwrite),
        Commands::Play { launch, no_stats } => play::run_play(ctx, launch, no_stats),
        Commands::Params { launch } => play::run_params(ctx, launch),
        Commands::Stats { file, csv, json } => stats::run_stats(ctx, file, csv, json),
        Commands::Library { action } => match action {
            LibraryAction::List => library::run_library_list(ctx),
            LibraryAction::Rename { file, new_name } => {
                library::run_library_rename(ctx, file, new_name)
            }
            LibraryAction::Delete { file } => library::run_library_delete(ctx, file),
            LibraryAction::CleanTemp => library::run_library_clean_temp(ctx),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => config::run_config_show(ctx),
            ConfigAction::Path => config::run_config_path(),
            ConfigAction::Set { key, value } => config::run_config_set(key, value),
            ConfigAction::Default { name, value } => config::run_config_default(ctx, name, value),
        },
    }
}
