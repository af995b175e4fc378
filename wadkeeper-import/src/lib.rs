//! Importing files into the wadkeeper library.
//!
//! Loose WADs, patches and archives are grouped by base name and copied
//! into one `<base>.zip` per group. ZDL launcher files expand into the
//! files they reference plus per-file launch settings.

pub mod copy;
pub mod library;
pub mod progress;
pub mod zdl;

pub use copy::{
    ArchiveImportPipeline, CopyError, CopyKind, CopyOutcome, CopyResults, FILE_IN_USE,
    FILE_NOT_FOUND, FixedAnswer, ImportError, OverwriteDecision, OverwritePrompt,
};
pub use library::{
    CleanReport, DeleteReport, LibraryError, SyncReport, clean_temp_directory, delete_game_file,
    register_iwads, rename_game_file, sync_library,
};
pub use progress::{ImportProgress, LogProgress, SilentProgress};
pub use zdl::{
    GameFileDraft, InvalidFile, LegacyConfigParser, ZdlBatch, ZdlEntry, ZdlParse,
    expand_zdl_files, is_zdl_file,
};
