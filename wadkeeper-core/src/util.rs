//! Small string helpers for file names and stored lists.

/// Separator used when a list of file names is stored as one string.
pub const LIST_SEPARATOR: char = ';';

/// Split a `;`-joined list, dropping empty items.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join names into a `;`-separated list.
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

/// Last path component of `name`, accepting both `/` and `\` separators.
pub fn file_name_of(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// File name without directory or extension.
pub fn base_name(name: &str) -> &str {
    let file = file_name_of(name);
    match file.rfind('.') {
        Some(0) | None => file,
        Some(idx) => &file[..idx],
    }
}

/// Lowercase extension including the dot, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let file = file_name_of(name);
    match file.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(file[idx..].to_lowercase()),
    }
}

/// Whether `name` ends with `ext` (with or without leading dot), ignoring case.
pub fn has_extension(name: &str, ext: &str) -> bool {
    extension_of(name).is_some_and(|e| e == normalize_extension(ext))
}

/// Lowercase an extension and make sure it starts with a dot.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    if trimmed.starts_with('.') {
        trimmed.to_lowercase()
    } else {
        format!(".{}", trimmed.to_lowercase())
    }
}

/// The managed-library name for `name`: `<base>.zip`.
pub fn zip_file_name(name: &str) -> String {
    format!("{}.zip", base_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join_lists() {
        assert_eq!(
            split_list("a.zip; b.zip;;c.zip;"),
            vec!["a.zip", "b.zip", "c.zip"]
        );
        assert!(split_list("").is_empty());
        assert_eq!(join_list(&["a.zip", "b.zip"]), "a.zip;b.zip");
    }

    #[test]
    fn base_name_handles_both_separators() {
        assert_eq!(base_name(r"C:\wads\scythe2.wad"), "scythe2");
        assert_eq!(base_name("/home/me/av.pk3"), "av");
        assert_eq!(base_name("archive.tar.gz"), "archive.tar");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[test]
    fn extensions_are_lowercased() {
        assert_eq!(extension_of("MAP01.WAD").as_deref(), Some(".wad"));
        assert_eq!(extension_of("README"), None);
        assert!(has_extension("x.ZIP", "zip"));
        assert!(has_extension("x.zip", ".zip"));
        assert_eq!(normalize_extension("PNG"), ".png");
    }

    #[test]
    fn zip_file_name_replaces_extension() {
        assert_eq!(zip_file_name("DOOM2.WAD"), "DOOM2.zip");
        assert_eq!(zip_file_name(r"D:\x\foo.deh"), "foo.zip");
        assert_eq!(zip_file_name("bar.zip"), "bar.zip");
    }
}
