// Strict data model shared by every component.
//
// Records arrive from the remote service through `crate::wire`, which is the
// only place that tolerates missing or mistyped fields. Everything here is
// already coerced.

use serde::{Deserialize, Serialize};

use crate::level::LevelLabel;

/// Card rarity as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Champion,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Champion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Champion => "champion",
        }
    }

    /// Case-insensitive parse of a rarity name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Rarity::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
    }

    /// Whether a free-form rarity string names this rarity.
    pub fn matches(&self, raw: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(raw.trim())
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The account's current arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub id: Option<u64>,
    pub name: String,
}

/// One card owned by the account, as reported by the account fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub id: Option<u64>,
    pub name: String,
    /// Raw level on the card's own rarity-dependent scale.
    pub level: u32,
    pub max_level: u32,
    /// 0 means not evolved.
    pub evolution_tier: u32,
    pub icon_url: Option<String>,
    /// Possibly stale; the catalog value wins when both exist.
    pub rarity: Option<String>,
    pub elixir_cost: Option<u32>,
    /// Number of spare copies held.
    pub count: Option<u32>,
}

/// A loaded account. Replaced wholesale by every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub tag: String,
    pub name: String,
    /// King / experience level.
    pub leadership_level: Option<u32>,
    pub trophies: Option<u32>,
    pub best_trophies: Option<u32>,
    pub arena: Arena,
    pub cards: Vec<OwnedItem>,
    pub current_deck: Vec<OwnedItem>,
}

/// One entry of the game-wide card catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Option<u64>,
    pub name: String,
    pub rarity: Option<String>,
    pub elixir_cost: Option<u32>,
    pub max_level: Option<u32>,
    pub icon_url: Option<String>,
}

/// Display-ready card: one `OwnedItem` enriched with its unified level and
/// canonical catalog metadata. Never mutated; recomputed on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub id: Option<u64>,
    pub name: String,
    pub unified_level: u8,
    pub label: LevelLabel,
    pub rarity: Option<String>,
    pub elixir_cost: Option<u32>,
    pub evolution_tier: u32,
    /// Empty for non-evolved cards.
    pub evolution_tag: String,
    pub icon_url: Option<String>,
    /// Raw values kept for display and for the assistant.
    pub raw_level: u32,
    pub raw_max_level: u32,
}

impl NormalizedItem {
    /// Name with the evolution suffix appended, e.g. `"Knight [Evo 1]"`.
    pub fn display_name(&self) -> String {
        format!("{}{}", self.name, self.evolution_tag)
    }
}
