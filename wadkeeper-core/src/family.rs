use serde::{Deserialize, Serialize};

/// Engine family identifiers for every known source port.
///
/// A family groups executables that share command-line conventions and a
/// statistics log format. Resolution from a configured executable to a
/// family lives in `wadkeeper-lib`; this enum only carries identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortFamily {
    /// Fallback for executables no other family recognizes.
    Generic,
    ChocolateDoom,
    CrispyDoom,
    CnDoom,
    DsdaDoom,
    PrBoomPlus,
    ZDoom,
    GzDoom,
}

/// All families in declaration order.
const ALL_FAMILIES: &[PortFamily] = &[
    PortFamily::Generic,
    PortFamily::ChocolateDoom,
    PortFamily::CrispyDoom,
    PortFamily::CnDoom,
    PortFamily::DsdaDoom,
    PortFamily::PrBoomPlus,
    PortFamily::ZDoom,
    PortFamily::GzDoom,
];

impl PortFamily {
    /// Canonical short name used on the command line and in logs.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::ChocolateDoom => "chocolate-doom",
            Self::CrispyDoom => "crispy-doom",
            Self::CnDoom => "cndoom",
            Self::DsdaDoom => "dsda-doom",
            Self::PrBoomPlus => "prboom-plus",
            Self::ZDoom => "zdoom",
            Self::GzDoom => "gzdoom",
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Generic => "Generic source port",
            Self::ChocolateDoom => "Chocolate Doom",
            Self::CrispyDoom => "Crispy Doom",
            Self::CnDoom => "CnDoom",
            Self::DsdaDoom => "DSDA-Doom",
            Self::PrBoomPlus => "PrBoom+",
            Self::ZDoom => "ZDoom",
            Self::GzDoom => "GZDoom",
        }
    }

    /// All accepted names for this family (case-insensitive matching).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Generic => &["generic", "other"],
            Self::ChocolateDoom => &["chocolate-doom", "chocolate", "chocolatedoom"],
            Self::CrispyDoom => &["crispy-doom", "crispy", "crispydoom"],
            Self::CnDoom => &["cndoom", "cn-doom"],
            Self::DsdaDoom => &["dsda-doom", "dsda", "dsdadoom"],
            Self::PrBoomPlus => &["prboom-plus", "prboom+", "prboomplus", "glboom-plus"],
            Self::ZDoom => &["zdoom"],
            Self::GzDoom => &["gzdoom", "vkdoom", "lzdoom"],
        }
    }

    /// Whether `name` matches any alias (case-insensitive).
    pub fn matches_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.aliases().iter().any(|a| *a == lower)
    }

    /// Look up a family by any accepted alias.
    pub fn from_alias(name: &str) -> Option<PortFamily> {
        ALL_FAMILIES.iter().copied().find(|f| f.matches_name(name))
    }

    /// All families in declaration order.
    pub fn all() -> &'static [PortFamily] {
        ALL_FAMILIES
    }
}

impl std::fmt::Display for PortFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for PortFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| format!("Unknown source port family: '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_roundtrips_through_from_alias() {
        for family in PortFamily::all() {
            assert_eq!(
                PortFamily::from_alias(family.short_name()),
                Some(*family),
                "short_name '{}' did not roundtrip",
                family.short_name()
            );
        }
    }

    #[test]
    fn aliases_are_unique_across_families() {
        let mut seen = std::collections::HashSet::new();
        for family in PortFamily::all() {
            for alias in family.aliases() {
                assert!(seen.insert(*alias), "duplicate alias '{}'", alias);
            }
        }
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("GZDoom".parse::<PortFamily>(), Ok(PortFamily::GzDoom));
        assert_eq!("PrBoom+".parse::<PortFamily>(), Ok(PortFamily::PrBoomPlus));
        assert!("doomsday".parse::<PortFamily>().is_err());
    }
}
