//! Everything a command needs: settings, resolved directories and the store.

use std::path::PathBuf;

use wadkeeper_db::SqliteStore;
use wadkeeper_lib::settings::{data_dir, load_settings};
use wadkeeper_lib::{LauncherSettings, LibraryDirs};

use crate::error::CliError;

pub(crate) struct AppContext {
    pub settings: LauncherSettings,
    /// Directory relative settings paths resolve against.
    pub base: PathBuf,
    pub dirs: LibraryDirs,
    pub store: SqliteStore,
    pub quiet: bool,
}

impl AppContext {
    /// Load settings, create the managed directories and open the database.
    pub(crate) fn open(root: Option<PathBuf>, quiet: bool) -> Result<Self, CliError> {
        let settings = load_settings()?;
        let base = data_dir();
        let dirs = settings.library_dirs(&base, root);
        dirs.ensure_exist()?;

        let db_path = settings.database_path(&base);
        log::debug!("Opening library database {}", db_path.display());
        let store = SqliteStore::open(&db_path).map_err(|e| {
            CliError::database(format!("could not open {}: {}", db_path.display(), e))
        })?;

        Ok(Self {
            settings,
            base,
            dirs,
            store,
            quiet,
        })
    }
}
