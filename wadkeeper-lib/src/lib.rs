//! Launch engine for the wadkeeper library.
//!
//! Resolves source port behavior, builds launch commands, runs the engine
//! process and collects what a session leaves behind (screenshots, saves,
//! demos, statistics).

pub mod archive;
pub mod async_util;
pub mod error;
pub mod launch;
pub mod process;
pub mod profile;
pub mod session;
pub mod settings;
pub mod stats;
pub mod watcher;

pub use archive::{ArchiveIndex, MemoryArchiveIndex, StagedEntry, ZipArchiveIndex, stage_entries};
pub use error::{LaunchError, SettingsError};
pub use launch::{
    DemoMode, FileMode, LaunchCommandBuilder, LaunchPlan, LaunchRequest, SessionOptions,
    format_launch_parameters, split_parameters,
};
pub use process::{ExitReport, LaunchState, ProcessOrchestrator, SessionHandle, SessionLock};
pub use profile::{SourcePortProfile, resolve_family};
pub use session::{
    LaunchTarget, PlaySession, SessionEnvironment, SessionReport, check_launch_preconditions,
    resolve_launch_target,
};
pub use settings::{LauncherPath, LauncherSettings, LibraryDirs};
pub use stats::{IngestorState, NewStatistics, StatisticsIngestor};
pub use watcher::{DetectorSet, FileSnapshot, NewFileDetector};
