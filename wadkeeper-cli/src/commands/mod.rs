pub(crate) mod config;
pub(crate) mod import;
pub(crate) mod iwads;
pub(crate) mod library;
pub(crate) mod play;
pub(crate) mod ports;
pub(crate) mod stats;

use wadkeeper_core::{GameFile, MetadataStore, util};

use crate::error::CliError;

/// Look up a library file by the name the user typed (`scythe`,
/// `scythe.wad` and `scythe.zip` all match).
pub(crate) fn find_game_file(store: &dyn MetadataStore, name: &str) -> Result<GameFile, CliError> {
    let file_name = util::zip_file_name(name.trim());
    store
        .game_file(&file_name)?
        .ok_or_else(|| CliError::other(format!("'{}' is not in the library", file_name)))
}

/// Minutes as `1h 05m` or `12m`.
pub(crate) fn format_minutes(minutes: i64) -> String {
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wadkeeper_core::MemoryStore;

    #[test]
    fn library_lookup_accepts_loose_names() {
        let mut store = MemoryStore::new();
        store.insert_game_file(&GameFile::new("scythe.zip")).unwrap();

        for name in ["scythe", "scythe.wad", "SCYTHE.zip", " scythe.zip "] {
            assert_eq!(find_game_file(&store, name).unwrap().file_name, "scythe.zip");
        }
        assert!(find_game_file(&store, "av").is_err());
    }

    #[test]
    fn minutes_format_with_hours() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(59), "59m");
        assert_eq!(format_minutes(65), "1h 05m");
    }
}
