//! Launch command construction.
//!
//! [`LaunchCommandBuilder::build`] turns a game file, its resolved port and
//! IWAD, and the session options into a [`LaunchPlan`]. It never writes to
//! disk; extraction of the files the plan references happens later through
//! [`crate::archive::stage_entries`].
//!
//! Argument order is fixed for every profile:
//!
//! 1. `-iwad <file>`
//! 2. `-file <files...>`
//! 3. `-deh <patches...>` (ports without a patch flag get them in `-file`)
//! 4. `-skill <n>`
//! 5. warp: `-warp e m`, `-warp n` or `+map NAME` depending on the profile
//! 6. `-record <temp>/<name>.lmp` or `-playdemo <file>`
//! 7. `-loadgame <slot>`
//! 8. statistics arguments of the profile's log format
//! 9. the source port's extra parameters
//! 10. the session's extra parameters

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use wadkeeper_core::{GameFile, util};

use crate::archive::{ArchiveIndex, StagedEntry};
use crate::error::LaunchError;
use crate::profile::{SourcePortProfile, WarpStyle};

/// How library archives reach the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileMode {
    /// Extract the loadable entries into the temp directory.
    #[default]
    Extract,
    /// Pass the archives themselves (for ports that read zips).
    InPlace,
}

/// Demo handling for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoMode {
    /// Record to `<temp>/<name>.lmp`.
    Record(String),
    /// Play back an existing demo file.
    Play(PathBuf),
}

/// Per-session overrides. Unset values fall back to the game file's stored
/// launch settings.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub map: Option<String>,
    pub skill: Option<String>,
    pub extra_parameters: Option<String>,
    /// Replaces the stored companion list.
    pub files: Option<Vec<String>>,
    /// Replaces the stored specific-files subset.
    pub specific_files: Option<Vec<String>>,
    pub file_mode: FileMode,
    pub demo: Option<DemoMode>,
    pub load_save_game: Option<String>,
    pub save_statistics: bool,
}

/// Everything the builder needs for one launch.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub game_file: &'a GameFile,
    pub profile: &'a SourcePortProfile,
    /// The IWAD's game file. Ignored when `game_file_is_iwad` is set.
    pub iwad: Option<&'a GameFile>,
    pub game_file_is_iwad: bool,
    pub library_dir: &'a Path,
    pub temp_dir: &'a Path,
    pub options: &'a SessionOptions,
}

/// Output of the builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchPlan {
    pub args: Vec<String>,
    /// Entries to extract before spawning (empty in `InPlace` mode).
    pub staged: Vec<StagedEntry>,
    /// Where the engine will write the demo being recorded.
    pub recorded_demo: Option<PathBuf>,
}

impl LaunchPlan {
    /// Argument list as preview text, one flag group per line.
    pub fn preview(&self) -> String {
        format_launch_parameters(&self.args)
    }
}

/// Builds launch plans. Archive contents come from the injected index.
pub struct LaunchCommandBuilder<'a> {
    index: &'a dyn ArchiveIndex,
}

impl<'a> LaunchCommandBuilder<'a> {
    pub fn new(index: &'a dyn ArchiveIndex) -> Self {
        Self { index }
    }

    pub fn build(&self, req: &LaunchRequest<'_>) -> Result<LaunchPlan, LaunchError> {
        let settings = &req.game_file.settings;
        let options = req.options;
        let flags = req.profile.flags();

        let iwad = if req.game_file_is_iwad {
            req.game_file
        } else {
            req.iwad
                .ok_or_else(|| LaunchError::MissingIwad(req.game_file.file_name.clone()))?
        };

        let archives = self.archive_list(req, &iwad.file_name);
        self.check_missing(req.library_dir, &iwad.file_name, &archives)?;

        let specific = options
            .specific_files
            .as_ref()
            .unwrap_or(&settings.specific_files);

        let mut plan = LaunchPlan::default();
        let mut files = Vec::new();
        let mut patches = Vec::new();

        match options.file_mode {
            FileMode::InPlace => {
                plan.args.push(flags.iwad.to_string());
                plan.args.push(path_arg(&req.library_dir.join(&iwad.file_name)));
                files.extend(
                    archives
                        .iter()
                        .map(|name| path_arg(&req.library_dir.join(name))),
                );
            }
            FileMode::Extract => {
                let mut targets = HashSet::new();
                let iwad_archive = req.library_dir.join(&iwad.file_name);
                let iwad_entry = self.iwad_entry(&iwad_archive, &iwad.file_name)?;
                let iwad_target = req.temp_dir.join(util::file_name_of(&iwad_entry));
                targets.insert(iwad_target.clone());
                plan.staged.push(StagedEntry {
                    archive: iwad_archive,
                    entry: iwad_entry,
                    target: iwad_target.clone(),
                });
                plan.args.push(flags.iwad.to_string());
                plan.args.push(path_arg(&iwad_target));

                for name in &archives {
                    let archive = req.library_dir.join(name);
                    for entry in self.index.entries(&archive)? {
                        let entry_file = util::file_name_of(&entry);
                        let wanted = if specific.is_empty() {
                            req.profile.data().supports_file(entry_file)
                        } else {
                            specific
                                .iter()
                                .any(|s| util::file_name_of(s).eq_ignore_ascii_case(entry_file))
                        };
                        if !wanted {
                            continue;
                        }
                        let target = req.temp_dir.join(entry_file);
                        if !targets.insert(target.clone()) {
                            log::debug!("Skipping duplicate entry {} in {}", entry, name);
                            continue;
                        }
                        let is_patch = flags.deh.is_some() && is_dehacked(entry_file);
                        plan.staged.push(StagedEntry {
                            archive: archive.clone(),
                            entry: entry.clone(),
                            target: target.clone(),
                        });
                        if is_patch {
                            patches.push(path_arg(&target));
                        } else {
                            files.push(path_arg(&target));
                        }
                    }
                }
            }
        }

        if !files.is_empty() {
            plan.args.push(flags.file.to_string());
            plan.args.extend(files);
        }
        if let Some(deh) = flags.deh {
            if !patches.is_empty() {
                plan.args.push(deh.to_string());
                plan.args.extend(patches);
            }
        }

        if let Some(skill) = options.skill.as_ref().or(settings.skill.as_ref()) {
            plan.args.push(flags.skill.to_string());
            plan.args.push(skill.clone());
        }
        if let Some(map) = options.map.as_ref().or(settings.map.as_ref()) {
            plan.args.extend(warp_args(flags.warp, map));
        }

        match &options.demo {
            Some(DemoMode::Record(name)) => {
                let file = if util::has_extension(name, ".lmp") {
                    name.clone()
                } else {
                    format!("{name}.lmp")
                };
                let target = req.temp_dir.join(file);
                plan.args.push(flags.record.to_string());
                plan.args.push(path_arg(&target));
                plan.recorded_demo = Some(target);
            }
            Some(DemoMode::Play(path)) => {
                plan.args.push(flags.playdemo.to_string());
                plan.args.push(path_arg(path));
            }
            None => {}
        }

        if let Some(slot) = &options.load_save_game {
            if !req.profile.load_save_supported() {
                return Err(LaunchError::unsupported(format!(
                    "{} does not support loading save games",
                    req.profile.name()
                )));
            }
            plan.args.push(flags.loadgame.to_string());
            plan.args.push(slot.clone());
        }

        if options.save_statistics {
            if let Some(format) = req.profile.statistics_format() {
                plan.args
                    .extend(format.launch_args.iter().map(|a| a.to_string()));
            }
        }

        if let Some(extra) = req.profile.extra_parameters() {
            plan.args.extend(split_parameters(extra));
        }
        if let Some(extra) = options
            .extra_parameters
            .as_ref()
            .or(settings.extra_parameters.as_ref())
        {
            plan.args.extend(split_parameters(extra));
        }

        Ok(plan)
    }

    /// Archives to load: the primary file (unless it is the IWAD), then its
    /// companions, then IWAD companions, then source port companions.
    /// Duplicates and the IWAD itself are dropped.
    fn archive_list(&self, req: &LaunchRequest<'_>, iwad_name: &str) -> Vec<String> {
        let settings = &req.game_file.settings;
        let companions = req.options.files.as_ref().unwrap_or(&settings.files);

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(iwad_name.to_lowercase());
        let mut list = Vec::new();
        let primary = std::iter::once(&req.game_file.file_name).filter(|_| !req.game_file_is_iwad);
        for name in primary
            .chain(companions)
            .chain(&settings.files_iwad)
            .chain(&settings.files_source_port)
        {
            let name = util::zip_file_name(name);
            if seen.insert(name.to_lowercase()) {
                list.push(name);
            }
        }
        list
    }

    fn check_missing(
        &self,
        library_dir: &Path,
        iwad_name: &str,
        archives: &[String],
    ) -> Result<(), LaunchError> {
        let missing: Vec<String> = std::iter::once(iwad_name)
            .chain(archives.iter().map(String::as_str))
            .filter(|name| !self.index.exists(&library_dir.join(name)))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LaunchError::MissingFiles(missing))
        }
    }

    /// The entry to pass as the IWAD: the first `.wad` entry, else the first
    /// entry.
    fn iwad_entry(&self, archive: &Path, name: &str) -> Result<String, LaunchError> {
        let entries = self.index.entries(archive)?;
        entries
            .iter()
            .find(|e| util::has_extension(e, ".wad"))
            .or_else(|| entries.first())
            .cloned()
            .ok_or_else(|| LaunchError::invalid_archive(name, "archive is empty"))
    }
}

fn is_dehacked(name: &str) -> bool {
    util::has_extension(name, ".deh") || util::has_extension(name, ".bex")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Warp arguments for `map` under `style`.
///
/// `Numeric` understands `ExMy` and `MAPnn` (and bare numbers); anything
/// else falls back to `+map NAME`.
pub fn warp_args(style: WarpStyle, map: &str) -> Vec<String> {
    let map = map.trim();
    if style == WarpStyle::Numeric {
        let upper = map.to_uppercase();
        if let Some((episode, mission)) = parse_episode_map(&upper) {
            return vec!["-warp".into(), episode.to_string(), mission.to_string()];
        }
        if let Some(level) = upper.strip_prefix("MAP").and_then(|n| n.parse::<u32>().ok()) {
            return vec!["-warp".into(), level.to_string()];
        }
        if !map.is_empty() && map.chars().all(|c| c.is_ascii_digit()) {
            return vec!["-warp".into(), map.to_string()];
        }
    }
    vec!["+map".into(), map.to_string()]
}

fn parse_episode_map(upper: &str) -> Option<(u32, u32)> {
    let rest = upper.strip_prefix('E')?;
    let (episode, mission) = rest.split_once('M')?;
    Some((episode.parse().ok()?, mission.parse().ok()?))
}

/// Split a parameter string on whitespace, keeping double-quoted runs
/// together (quotes removed).
pub fn split_parameters(params: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    for c in params.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    out.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        out.push(current);
    }
    out
}

/// Render arguments with each flag starting a new line. Arguments with
/// whitespace are quoted.
pub fn format_launch_parameters(args: &[String]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for arg in args {
        let rendered = if arg.chars().any(char::is_whitespace) || arg.is_empty() {
            format!("\"{arg}\"")
        } else {
            arg.clone()
        };
        let starts_flag = (arg.starts_with('-') || arg.starts_with('+'))
            && !arg[1..].starts_with(|c: char| c.is_ascii_digit());
        match lines.last_mut() {
            Some(line) if !starts_flag => {
                line.push(' ');
                line.push_str(&rendered);
            }
            _ => lines.push(rendered),
        }
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "tests/launch_tests.rs"]
mod tests;
