//! Plugin configuration and region/platform selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storefront region; selects which client/parser pair is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StoreRegion {
    #[default]
    Usa,
    Europe,
    Japan,
    Asia,
}

impl fmt::Display for StoreRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRegion::Usa => write!(f, "North America"),
            StoreRegion::Europe => write!(f, "Europe"),
            StoreRegion::Japan => write!(f, "Japan"),
            StoreRegion::Asia => write!(f, "Asia"),
        }
    }
}

impl FromStr for StoreRegion {
    type Err = ();

    /// Accepts current names plus the legacy `US`/`UK` spellings used by an
    /// earlier settings format.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "usa" | "us" | "north america" => Ok(StoreRegion::Usa),
            "europe" | "uk" | "eu" => Ok(StoreRegion::Europe),
            "japan" | "jp" => Ok(StoreRegion::Japan),
            "asia" | "sg" => Ok(StoreRegion::Asia),
            _ => Err(()),
        }
    }
}

/// Physical/portable Nintendo hardware family, inferred from the host's
/// declared platform name. Narrows region endpoints that index multiple
/// hardware families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NintendoPlatform {
    #[default]
    Switch,
    Nintendo3ds,
}

impl NintendoPlatform {
    pub fn from_platform_name(name: &str) -> Self {
        let normalized = name.to_lowercase();
        if normalized.contains("3ds") {
            NintendoPlatform::Nintendo3ds
        } else {
            NintendoPlatform::Switch
        }
    }

    /// Hardware code used by the Europe search facet (`playable_on_txt`).
    pub fn playable_on_code(&self) -> &'static str {
        match self {
            NintendoPlatform::Switch => "HAC",
            NintendoPlatform::Nintendo3ds => "CTR",
        }
    }
}

/// Rating board the host prefers for the age-rating field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgeRatingOrg {
    #[default]
    Esrb,
    Pegi,
}

/// Persisted plugin settings; the host owns load/save.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Region whose storefront is queried.
    pub store_region: StoreRegion,
    /// Prefer the game's own declared region over `store_region` when it
    /// parses to a known storefront.
    pub prefer_game_region: bool,
}
