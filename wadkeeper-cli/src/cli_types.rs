//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wadkeeper")]
#[command(about = "Manage a Doom WAD library and launch it with any source port", long_about = None)]
pub(crate) struct Cli {
    /// Library directory holding the managed archives (overrides settings)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log output to a file (ANSI codes stripped)
    #[arg(long, global = true)]
    pub logfile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Manage configured source ports
    Ports {
        #[command(subcommand)]
        action: PortsAction,
    },

    /// Manage registered IWADs
    Iwads {
        #[command(subcommand)]
        action: IwadsAction,
    },

    /// Copy WADs, patches, archives or ZDL files into the library
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        overwrite: OverwriteArgs,
    },

    /// Play a library file
    Play {
        #[command(flatten)]
        launch: LaunchArgs,

        /// Do not record statistics for this session
        #[arg(long)]
        no_stats: bool,
    },

    /// Show the command line a play session would use, without launching
    Params {
        #[command(flatten)]
        launch: LaunchArgs,
    },

    /// Show recorded level statistics
    Stats {
        /// Library file (e.g. scythe.zip); all files when omitted
        file: Option<String>,

        /// Output as CSV
        #[arg(long, conflicts_with = "json")]
        csv: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Maintain the library
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// Show or change launcher settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum PortsAction {
    /// List configured source ports
    List,

    /// Add a source port
    Add {
        /// Display name
        name: String,

        /// Path to the engine executable
        executable: PathBuf,

        /// Loadable extensions (e.g. .wad,.pk3,.deh)
        #[arg(long, value_delimiter = ',')]
        extensions: Option<Vec<String>>,

        /// Parameters appended to every launch
        #[arg(long, allow_hyphen_values = true)]
        extra: Option<String>,

        /// Make this the default source port
        #[arg(long)]
        default: bool,
    },

    /// Remove a source port by id
    Remove { id: i64 },
}

#[derive(Subcommand)]
pub(crate) enum IwadsAction {
    /// List registered IWADs
    List,

    /// Import IWAD files and register them
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Make the first added IWAD the default
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum LibraryAction {
    /// List library files
    List,

    /// Rename a library file
    Rename {
        /// Current name (e.g. scythe.zip)
        file: String,

        /// New name, with or without .zip
        new_name: String,
    },

    /// Delete a library file with its screenshots, saves, demos and stats
    Delete { file: String },

    /// Remove staged files left in the temp directory
    CleanTemp,
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show the current settings and their file
    Show,

    /// Print the settings file path
    Path,

    /// Set one setting (an empty value removes it)
    Set {
        /// Dotted key, e.g. library.root
        key: String,

        /// New value; lists are comma separated
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Set a store-level launch default (DefaultSourcePort, DefaultIWad, DefaultSkill)
    Default { name: String, value: String },
}

/// How overwrite conflicts are answered.
#[derive(Args, Clone, Copy)]
pub(crate) struct OverwriteArgs {
    /// Overwrite existing archives without asking
    #[arg(long, conflicts_with = "keep_existing")]
    pub overwrite: bool,

    /// Keep existing archives without asking
    #[arg(long)]
    pub keep_existing: bool,
}

/// Common arguments for commands that build a launch.
#[derive(Args, Clone)]
pub(crate) struct LaunchArgs {
    /// Library file to play (e.g. scythe.zip)
    pub file: String,

    /// Source port id (defaults to the file's port, then the configured default)
    #[arg(short, long)]
    pub port: Option<i64>,

    /// IWAD id (defaults to the file's IWAD, then the configured default)
    #[arg(short, long)]
    pub iwad: Option<i64>,

    /// Skill level
    #[arg(short, long)]
    pub skill: Option<String>,

    /// Map to warp to (e.g. MAP07, E1M1)
    #[arg(short, long)]
    pub map: Option<String>,

    /// Extra parameters for this session only
    #[arg(long, allow_hyphen_values = true)]
    pub extra: Option<String>,

    /// Companion library files, replacing the stored list
    #[arg(long, value_delimiter = ',')]
    pub files: Option<Vec<String>>,

    /// Load only these archive entries
    #[arg(long, value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Pass the archives directly instead of extracting them
    #[arg(long)]
    pub in_place: bool,

    /// Record a demo with this name
    #[arg(long, conflicts_with = "playdemo")]
    pub record: Option<String>,

    /// Play back a demo file
    #[arg(long)]
    pub playdemo: Option<PathBuf>,

    /// Load a save game slot or file
    #[arg(long)]
    pub loadgame: Option<String>,
}
