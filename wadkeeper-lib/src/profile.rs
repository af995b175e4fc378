//! Source port variant resolution.
//!
//! Every engine family has one row in [`CAPABILITIES`]. A row declares
//! which executables it claims and may leave any capability unset, in which
//! case the value is taken from the family named in `inherits` (and so on up
//! the chain), falling back to the generic defaults. Resolution walks the
//! table in order and picks the first row whose predicate matches, so more
//! specific families are listed before the families they build on.

use std::path::{Path, PathBuf};

use wadkeeper_core::{PortFamily, SourcePortData};

use crate::stats::formats::{self, StatsFormat};

/// How a port selects the starting map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarpStyle {
    /// `-warp E M` for `ExMy`, `-warp N` for `MAPnn`, `+map NAME` otherwise.
    Numeric,
    /// `+map NAME` always.
    MapCommand,
}

/// Command-line flag names for one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchFlags {
    pub iwad: &'static str,
    pub file: &'static str,
    /// Flag for DeHackEd patches. `None` sends them through `file`.
    pub deh: Option<&'static str>,
    pub skill: &'static str,
    pub warp: WarpStyle,
    pub record: &'static str,
    pub playdemo: &'static str,
    pub loadgame: &'static str,
}

/// Flags understood by every vanilla-derived engine.
pub const VANILLA_FLAGS: LaunchFlags = LaunchFlags {
    iwad: "-iwad",
    file: "-file",
    deh: Some("-deh"),
    skill: "-skill",
    warp: WarpStyle::Numeric,
    record: "-record",
    playdemo: "-playdemo",
    loadgame: "-loadgame",
};

/// ZDoom-derived engines take map lumps by name.
pub const ZDOOM_FLAGS: LaunchFlags = LaunchFlags {
    warp: WarpStyle::MapCommand,
    ..VANILLA_FLAGS
};

/// Flags for unknown executables: raw file list, no patch flag.
pub const GENERIC_FLAGS: LaunchFlags = LaunchFlags {
    deh: None,
    ..VANILLA_FLAGS
};

/// One row of the capability table.
#[derive(Debug)]
pub struct Capabilities {
    pub family: PortFamily,
    /// Executable file names (without extension) this family claims.
    pub executables: &'static [&'static str],
    /// Family to take unset capabilities from.
    pub inherits: Option<PortFamily>,
    pub flags: Option<LaunchFlags>,
    pub statistics: Option<&'static StatsFormat>,
    pub load_save: Option<bool>,
}

impl Capabilities {
    /// Whether this family handles `port`: the executable's file name,
    /// minus extension, equals one of `executables` ignoring case.
    pub fn supports(&self, port: &SourcePortData) -> bool {
        port.executable_stem().is_some_and(|stem| {
            self.executables
                .iter()
                .any(|exe| exe.eq_ignore_ascii_case(stem))
        })
    }
}

/// Capability table in resolution order. `Generic` is last and matches
/// nothing by name; it is the fallback.
pub static CAPABILITIES: &[Capabilities] = &[
    Capabilities {
        family: PortFamily::DsdaDoom,
        executables: &["dsda-doom"],
        inherits: Some(PortFamily::ChocolateDoom),
        flags: None,
        statistics: None,
        load_save: None,
    },
    Capabilities {
        family: PortFamily::CrispyDoom,
        executables: &["crispy-doom"],
        inherits: Some(PortFamily::ChocolateDoom),
        flags: None,
        statistics: None,
        load_save: None,
    },
    Capabilities {
        family: PortFamily::CnDoom,
        executables: &["cndoom"],
        inherits: Some(PortFamily::ChocolateDoom),
        flags: None,
        statistics: Some(&formats::CNDOOM_STATS),
        load_save: None,
    },
    Capabilities {
        family: PortFamily::ChocolateDoom,
        executables: &["chocolate-doom"],
        inherits: None,
        flags: Some(VANILLA_FLAGS),
        statistics: Some(&formats::STATDUMP),
        load_save: Some(true),
    },
    Capabilities {
        family: PortFamily::PrBoomPlus,
        executables: &["prboom-plus", "glboom-plus"],
        inherits: None,
        flags: Some(VANILLA_FLAGS),
        statistics: Some(&formats::LEVELSTAT),
        load_save: Some(true),
    },
    Capabilities {
        family: PortFamily::GzDoom,
        executables: &["gzdoom", "vkdoom", "lzdoom"],
        inherits: Some(PortFamily::ZDoom),
        flags: None,
        statistics: None,
        load_save: None,
    },
    Capabilities {
        family: PortFamily::ZDoom,
        executables: &["zdoom"],
        inherits: None,
        flags: Some(ZDOOM_FLAGS),
        statistics: None,
        load_save: Some(true),
    },
    Capabilities {
        family: PortFamily::Generic,
        executables: &[],
        inherits: None,
        flags: Some(GENERIC_FLAGS),
        statistics: None,
        load_save: Some(false),
    },
];

/// Table row for `family`. Every family has exactly one row.
pub fn capabilities(family: PortFamily) -> &'static Capabilities {
    CAPABILITIES
        .iter()
        .find(|c| c.family == family)
        .unwrap_or(&CAPABILITIES[CAPABILITIES.len() - 1])
}

/// Walk the inheritance chain of `family` until `pick` yields a value.
fn inherited<T>(family: PortFamily, pick: impl Fn(&Capabilities) -> Option<T>) -> Option<T> {
    let mut current = Some(family);
    // The chain can never be longer than the table.
    for _ in 0..CAPABILITIES.len() {
        let Some(f) = current else { break };
        let caps = capabilities(f);
        if let Some(value) = pick(caps) {
            return Some(value);
        }
        current = caps.inherits;
    }
    None
}

/// Pick the family for a configured port. Total: unknown executables
/// resolve to [`PortFamily::Generic`].
pub fn resolve_family(port: &SourcePortData) -> PortFamily {
    CAPABILITIES
        .iter()
        .find(|caps| caps.supports(port))
        .map(|caps| caps.family)
        .unwrap_or(PortFamily::Generic)
}

/// A configured port together with its resolved behavior.
#[derive(Debug, Clone)]
pub struct SourcePortProfile {
    data: SourcePortData,
    family: PortFamily,
}

impl SourcePortProfile {
    /// Resolve the family of `data` and bind it.
    pub fn resolve(data: SourcePortData) -> Self {
        let family = resolve_family(&data);
        log::debug!(
            "Resolved source port '{}' ({}) as {}",
            data.name,
            data.executable.display(),
            family.short_name()
        );
        Self { data, family }
    }

    pub fn data(&self) -> &SourcePortData {
        &self.data
    }

    pub fn family(&self) -> PortFamily {
        self.family
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn id(&self) -> Option<i64> {
        self.data.id
    }

    pub fn executable(&self) -> &Path {
        &self.data.executable
    }

    /// Working directory for the engine process.
    pub fn directory(&self) -> PathBuf {
        self.data.directory()
    }

    pub fn supported_extensions(&self) -> &[String] {
        &self.data.supported_extensions
    }

    pub fn extra_parameters(&self) -> Option<&str> {
        self.data.extra_parameters.as_deref()
    }

    pub fn flags(&self) -> LaunchFlags {
        inherited(self.family, |c| c.flags).unwrap_or(GENERIC_FLAGS)
    }

    pub fn statistics_format(&self) -> Option<&'static StatsFormat> {
        inherited(self.family, |c| c.statistics)
    }

    pub fn statistics_supported(&self) -> bool {
        self.statistics_format().is_some()
    }

    pub fn load_save_supported(&self) -> bool {
        inherited(self.family, |c| c.load_save).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(exe: &str) -> SourcePortData {
        SourcePortData::new("test", exe)
    }

    #[test]
    fn every_family_has_one_row() {
        for family in PortFamily::all() {
            let rows = CAPABILITIES.iter().filter(|c| c.family == *family).count();
            assert_eq!(rows, 1, "{} has {} rows", family.short_name(), rows);
        }
    }

    #[test]
    fn resolves_by_executable_stem_ignoring_case() {
        assert_eq!(
            resolve_family(&port("/usr/games/chocolate-doom")),
            PortFamily::ChocolateDoom
        );
        assert_eq!(
            resolve_family(&port(r"C:\Ports\GZDoom.exe")),
            PortFamily::GzDoom
        );
        assert_eq!(
            resolve_family(&port("/opt/dsda/DSDA-Doom")),
            PortFamily::DsdaDoom
        );
        assert_eq!(
            resolve_family(&port("/opt/glboom-plus")),
            PortFamily::PrBoomPlus
        );
    }

    #[test]
    fn unknown_executables_fall_back_to_generic() {
        let profile = SourcePortProfile::resolve(port("/opt/eternity/eternity"));
        assert_eq!(profile.family(), PortFamily::Generic);
        assert!(!profile.statistics_supported());
        assert!(!profile.load_save_supported());
        assert_eq!(profile.flags(), GENERIC_FLAGS);
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = resolve_family(&port("crispy-doom"));
        let b = resolve_family(&port("crispy-doom"));
        assert_eq!(a, b);
        assert_eq!(a, PortFamily::CrispyDoom);
    }

    #[test]
    fn specializations_inherit_statistics_format() {
        let dsda = SourcePortProfile::resolve(port("dsda-doom"));
        let choco = SourcePortProfile::resolve(port("chocolate-doom"));
        assert!(dsda.statistics_supported());
        assert_eq!(
            dsda.statistics_format().map(|f| f.name),
            choco.statistics_format().map(|f| f.name)
        );
        assert!(dsda.load_save_supported());
        assert_eq!(dsda.flags(), VANILLA_FLAGS);
    }

    #[test]
    fn overrides_win_over_inherited_values() {
        let cndoom = SourcePortProfile::resolve(port("cndoom"));
        assert_eq!(
            cndoom.statistics_format().map(|f| f.name),
            Some(formats::CNDOOM_STATS.name)
        );
        // flags still come from Chocolate Doom
        assert_eq!(cndoom.flags(), VANILLA_FLAGS);
    }

    #[test]
    fn zdoom_family_uses_map_command_without_statistics() {
        let gz = SourcePortProfile::resolve(port("gzdoom"));
        assert_eq!(gz.flags().warp, WarpStyle::MapCommand);
        assert!(!gz.statistics_supported());
        assert!(gz.load_save_supported());
    }
}
