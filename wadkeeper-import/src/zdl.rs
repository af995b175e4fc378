//! ZDL launcher save files.
//!
//! A ZDL file is an INI-style document:
//!
//! ```text
//! [zdl.save]
//! port=GZDoom
//! iwad=DOOM2
//! skill=4
//! warp=MAP07
//! extra=-fast
//! file0=C:\wads\scythe2.wad
//! file1=C:\wads\scythe2.deh
//! ```
//!
//! Port and IWAD are free-text names and are matched against the configured
//! ones loosely. Unknown keys are ignored; malformed lines are reported and
//! skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use wadkeeper_core::{GameFile, IwadData, SourcePortData, util};

static FILE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^file(\d+)$").expect("static regex"));

const SAVE_SECTION: &str = "zdl.save";

/// One parsed ZDL record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZdlEntry {
    pub source_port: Option<SourcePortData>,
    pub iwad: Option<IwadData>,
    /// Original on-disk paths, in file-index order.
    pub files: Vec<String>,
    pub map: Option<String>,
    pub skill: Option<String>,
    pub extra_parameters: Option<String>,
}

/// A library record to create, plus where its content currently lives.
#[derive(Debug, Clone, PartialEq)]
pub struct GameFileDraft {
    /// `file_name` already uses the `.zip` convention.
    pub game_file: GameFile,
    pub source_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ZdlParse {
    pub entry: ZdlEntry,
    /// First draft is the primary file, the rest are its companions.
    pub drafts: Vec<GameFileDraft>,
    pub errors: Vec<String>,
}

/// Matches ZDL names against the configured ports and IWADs.
pub struct LegacyConfigParser {
    ports: Vec<SourcePortData>,
    iwads: Vec<IwadData>,
}

impl LegacyConfigParser {
    pub fn new(ports: Vec<SourcePortData>, iwads: Vec<IwadData>) -> Self {
        Self { ports, iwads }
    }

    pub fn parse(&self, text: &str) -> ZdlParse {
        let mut out = ZdlParse::default();
        let mut section: Option<String> = None;
        let mut files: BTreeMap<u32, String> = BTreeMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = Some(name.trim().to_lowercase());
                continue;
            }
            if section.as_deref().is_some_and(|s| s != SAVE_SECTION) {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                out.errors
                    .push(format!("Line {line_no}: expected key=value, found '{line}'"));
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            if let Some(caps) = FILE_KEY.captures(key) {
                if value.is_empty() {
                    out.errors
                        .push(format!("Line {line_no}: '{key}' has no value"));
                    continue;
                }
                match caps[1].parse::<u32>() {
                    Ok(n) if !files.contains_key(&n) => {
                        files.insert(n, value.to_string());
                    }
                    Ok(_) => out
                        .errors
                        .push(format!("Line {line_no}: '{key}' is listed twice")),
                    Err(_) => out
                        .errors
                        .push(format!("Line {line_no}: bad file index in '{key}'")),
                }
                continue;
            }

            if value.is_empty() {
                log::debug!("ZDL key '{}' is blank", key);
                continue;
            }
            match key.to_lowercase().as_str() {
                "port" => match self.find_port(value) {
                    Some(port) => out.entry.source_port = Some(port.clone()),
                    None => out.errors.push(format!(
                        "Line {line_no}: could not find a source port matching '{value}'"
                    )),
                },
                "iwad" => match self.find_iwad(value) {
                    Some(iwad) => out.entry.iwad = Some(iwad.clone()),
                    None => out.errors.push(format!(
                        "Line {line_no}: could not find an IWAD matching '{value}'"
                    )),
                },
                "skill" => out.entry.skill = Some(value.to_string()),
                "warp" | "map" => out.entry.map = Some(value.to_string()),
                "extra" => out.entry.extra_parameters = Some(value.to_string()),
                other => log::debug!("Ignoring ZDL key '{}'", other),
            }
        }

        out.entry.files = files.into_values().collect();
        if out.entry.files.is_empty() {
            out.errors.push("No files are listed.".to_string());
        } else {
            out.drafts = self.drafts(&out.entry);
        }
        out
    }

    /// One draft per library archive. Files sharing a base name end up in
    /// the same archive, so only the first of them gets a draft.
    fn drafts(&self, entry: &ZdlEntry) -> Vec<GameFileDraft> {
        let mut drafts: Vec<GameFileDraft> = Vec::new();
        for path in &entry.files {
            let game_file = GameFile::new(util::file_name_of(path));
            if drafts
                .iter()
                .any(|d| d.game_file.file_name.eq_ignore_ascii_case(&game_file.file_name))
            {
                continue;
            }
            drafts.push(GameFileDraft {
                game_file,
                source_path: PathBuf::from(path),
            });
        }
        let names: Vec<String> = drafts
            .iter()
            .map(|d| d.game_file.file_name.clone())
            .collect();

        if let Some(primary) = drafts.first_mut() {
            let gf = &mut primary.game_file;
            gf.source_port_id = entry.source_port.as_ref().and_then(|p| p.id);
            gf.iwad_id = entry.iwad.as_ref().and_then(|i| i.id);
            gf.settings.map = entry.map.clone();
            gf.settings.skill = entry.skill.clone();
            gf.settings.extra_parameters = entry.extra_parameters.clone();
            gf.settings.files = names;
        }
        drafts
    }

    fn find_port(&self, name: &str) -> Option<&SourcePortData> {
        let wanted = normalize(name);
        self.ports.iter().find(|p| {
            loose_match(&wanted, &normalize(&p.name))
                || p.executable_stem()
                    .is_some_and(|stem| loose_match(&wanted, &normalize(stem)))
        })
    }

    fn find_iwad(&self, name: &str) -> Option<&IwadData> {
        let wanted = normalize(util::base_name(util::file_name_of(name)));
        self.iwads
            .iter()
            .find(|i| loose_match(&wanted, &normalize(&i.name)))
    }
}

/// Lowercase alphanumerics only.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn loose_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a == b || a.contains(b) || b.contains(a))
}

/// A ZDL file that produced errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFile {
    pub path: PathBuf,
    pub errors: String,
}

/// Result of expanding a batch of ZDL files.
#[derive(Debug, Clone, Default)]
pub struct ZdlBatch {
    /// Real files to hand to the copy pipeline.
    pub library_files: Vec<PathBuf>,
    pub drafts: Vec<GameFileDraft>,
    pub invalid: Vec<InvalidFile>,
}

impl ZdlBatch {
    /// The errors need to be shown: something was invalid and nothing
    /// importable came out.
    pub fn should_report_errors(&self) -> bool {
        !self.invalid.is_empty() && self.library_files.is_empty()
    }
}

pub fn is_zdl_file(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("zdl"))
}

/// Parse every ZDL file in `paths`.
pub fn expand_zdl_files(parser: &LegacyConfigParser, paths: &[PathBuf]) -> ZdlBatch {
    let mut batch = ZdlBatch::default();
    for path in paths {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                batch.invalid.push(InvalidFile {
                    path: path.clone(),
                    errors: e.to_string(),
                });
                continue;
            }
        };
        let parsed = parser.parse(&text);
        if !parsed.errors.is_empty() {
            log::warn!(
                "{}: {} problem(s) in ZDL file",
                path.display(),
                parsed.errors.len()
            );
            batch.invalid.push(InvalidFile {
                path: path.clone(),
                errors: parsed.errors.join(", "),
            });
        }
        batch
            .library_files
            .extend(parsed.entry.files.iter().map(PathBuf::from));
        batch.drafts.extend(parsed.drafts);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> LegacyConfigParser {
        let mut gz = SourcePortData::new("GZDoom 4.11", r"C:\Ports\gzdoom.exe");
        gz.id = Some(3);
        let mut choco = SourcePortData::new("Chocolate", "/usr/games/chocolate-doom");
        choco.id = Some(4);
        LegacyConfigParser::new(
            vec![gz, choco],
            vec![IwadData {
                id: Some(9),
                game_file_id: 1,
                name: "DOOM2".into(),
            }],
        )
    }

    const SCYTHE: &str = "\
[zdl.save]
port=GZDoom
iwad=C:\\iwads\\doom2.wad
skill=4
warp=MAP07
extra=-fast
file0=C:\\wads\\scythe2.wad
file1=C:\\wads\\scythe2.deh
file2=C:\\wads\\music.pk3
";

    #[test]
    fn primary_lists_itself_and_companions_in_order() {
        let parsed = parser().parse(SCYTHE);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.drafts.len(), 2);

        let primary = &parsed.drafts[0].game_file;
        assert_eq!(primary.file_name, "scythe2.zip");
        assert_eq!(
            primary.settings.files,
            vec!["scythe2.zip", "music.zip"]
        );
        assert_eq!(primary.source_port_id, Some(3));
        assert_eq!(primary.iwad_id, Some(9));
        assert_eq!(primary.settings.map.as_deref(), Some("MAP07"));
        assert_eq!(primary.settings.skill.as_deref(), Some("4"));
        assert_eq!(primary.settings.extra_parameters.as_deref(), Some("-fast"));
        assert_eq!(
            parsed.drafts[1].source_path,
            PathBuf::from(r"C:\wads\music.pk3")
        );
        assert_eq!(parsed.entry.files.len(), 3);
        assert!(parsed.drafts[1].game_file.settings.files.is_empty());
    }

    #[test]
    fn file_indices_order_files_not_line_order() {
        let parsed = parser().parse("file2=c.wad\nfile0=a.wad\nfile1=b.wad\n");
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.entry.files, vec!["a.wad", "b.wad", "c.wad"]);
    }

    #[test]
    fn bad_lines_are_reported_and_parsing_continues() {
        let text = "\
[zdl.save]
this is not a pair
port=Eternity
skill=
fileX=oops.wad
file0=kept.wad
file0=dupe.wad
dmflags=1
";
        let parsed = parser().parse(text);
        assert_eq!(parsed.errors.len(), 3, "{:?}", parsed.errors);
        assert!(parsed.errors[0].starts_with("Line 2:"));
        assert!(parsed.errors[1].contains("Eternity"));
        assert!(parsed.errors[2].contains("listed twice"));
        assert_eq!(parsed.entry.files, vec!["kept.wad"]);
        assert_eq!(parsed.drafts.len(), 1);
    }

    #[test]
    fn blank_optional_values_are_absent() {
        let text = "\
[zdl.save]
port=
iwad=
skill=
warp=
extra=
dmflags=
file0=scythe.wad
";
        let parsed = parser().parse(text);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert!(parsed.entry.source_port.is_none());
        assert!(parsed.entry.skill.is_none());
        assert!(parsed.entry.map.is_none());
        assert_eq!(parsed.drafts[0].game_file.settings.skill, None);
    }

    #[test]
    fn blank_file_entry_is_an_error() {
        let parsed = parser().parse("file0=\nfile1=a.wad\n");
        assert_eq!(parsed.errors.len(), 1, "{:?}", parsed.errors);
        assert!(parsed.errors[0].contains("'file0' has no value"));
        assert_eq!(parsed.entry.files, vec!["a.wad"]);
    }

    #[test]
    fn other_sections_are_ignored() {
        let parsed = parser().parse("[zdl.general]\nfoo=bar\n[zdl.save]\nfile0=a.wad\n");
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.drafts.len(), 1);
    }

    #[test]
    fn no_files_is_an_error() {
        let parsed = parser().parse("[zdl.save]\nport=gzdoom\n");
        assert_eq!(parsed.errors, vec!["No files are listed."]);
        assert!(parsed.drafts.is_empty());
    }

    #[test]
    fn port_matches_executable_stem() {
        let parsed = parser().parse("port=chocolate-doom\nfile0=a.wad\n");
        assert_eq!(parsed.entry.source_port.unwrap().id, Some(4));
    }

    #[test]
    fn batch_reports_errors_only_when_nothing_imports() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.zdl");
        let bad = tmp.path().join("bad.zdl");
        fs::write(&good, SCYTHE).unwrap();
        fs::write(&bad, "[zdl.save]\nport=nothing\n").unwrap();
        let p = parser();

        let batch = expand_zdl_files(&p, &[bad.clone()]);
        assert!(batch.should_report_errors());

        let batch = expand_zdl_files(&p, &[good, bad]);
        assert_eq!(batch.library_files.len(), 3);
        assert_eq!(batch.invalid.len(), 1);
        assert!(!batch.should_report_errors());
        assert!(is_zdl_file(Path::new("x.ZDL")));
    }
}
