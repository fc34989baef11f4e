// Collection view: rarity filter + sort over the normalized card list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::level::LevelLabel;
use crate::model::{NormalizedItem, Rarity};

/// Sort sentinel for a missing cost in ascending order. Above any real cost.
const MISSING_COST_ASC: i64 = i64::MAX;
/// Sort sentinel for a missing cost in descending order. Below any real cost.
const MISSING_COST_DESC: i64 = -1;

// ---------------------------------------------------------------------------
// Selection parameters
// ---------------------------------------------------------------------------

/// Which rarity to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RarityFilter {
    #[default]
    All,
    Only(Rarity),
}

impl RarityFilter {
    /// Parse `"all"` or a rarity name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Some(RarityFilter::All)
        } else {
            Rarity::parse(s).map(RarityFilter::Only)
        }
    }

    pub fn accepts(&self, item: &NormalizedItem) -> bool {
        match self {
            RarityFilter::All => true,
            RarityFilter::Only(rarity) => item.rarity.as_deref().is_some_and(|r| rarity.matches(r)),
        }
    }
}

impl std::fmt::Display for RarityFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RarityFilter::All => f.write_str("all"),
            RarityFilter::Only(r) => f.write_str(r.as_str()),
        }
    }
}

/// Active sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    LevelAsc,
    #[default]
    LevelDesc,
    CostAsc,
    CostDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::LevelAsc,
        SortKey::LevelDesc,
        SortKey::CostAsc,
        SortKey::CostDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::LevelAsc => "level_asc",
            SortKey::LevelDesc => "level_desc",
            SortKey::CostAsc => "cost_asc",
            SortKey::CostDesc => "cost_desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Per-label counts over the full (unfiltered) collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub total: usize,
    pub by_label: BTreeMap<LevelLabel, usize>,
    /// Mean unified level, `None` for an empty collection.
    pub average_level: Option<f64>,
}

// ---------------------------------------------------------------------------
// CollectionView
// ---------------------------------------------------------------------------

/// Filter/sort engine over one account's normalized cards.
#[derive(Debug, Clone, Default)]
pub struct CollectionView {
    items: Vec<NormalizedItem>,
    rarity: RarityFilter,
    sort: SortKey,
}

impl CollectionView {
    pub fn new(rarity: RarityFilter, sort: SortKey) -> Self {
        Self {
            items: Vec::new(),
            rarity,
            sort,
        }
    }

    /// Replace the underlying collection (once per account load).
    pub fn set_items(&mut self, items: Vec<NormalizedItem>) {
        self.items = items;
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[NormalizedItem] {
        &self.items
    }

    pub fn rarity(&self) -> RarityFilter {
        self.rarity
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    /// Returns `true` if the selection changed.
    pub fn set_rarity(&mut self, rarity: RarityFilter) -> bool {
        let changed = self.rarity != rarity;
        self.rarity = rarity;
        changed
    }

    /// Returns `true` if the selection changed.
    pub fn set_sort(&mut self, sort: SortKey) -> bool {
        let changed = self.sort != sort;
        self.sort = sort;
        changed
    }

    /// Derive the filtered, sorted list. Pure: repeated calls with unchanged
    /// parameters return identical sequences.
    pub fn recompute(&self) -> Vec<NormalizedItem> {
        let mut out: Vec<NormalizedItem> = self
            .items
            .iter()
            .filter(|item| self.rarity.accepts(item))
            .cloned()
            .collect();

        // `sort_by_key` is stable, so equal keys keep collection order.
        match self.sort {
            SortKey::LevelAsc => out.sort_by_key(|i| i.unified_level),
            SortKey::LevelDesc => out.sort_by_key(|i| std::cmp::Reverse(i.unified_level)),
            SortKey::CostAsc => {
                out.sort_by_key(|i| i.elixir_cost.map_or(MISSING_COST_ASC, i64::from))
            }
            SortKey::CostDesc => out.sort_by_key(|i| {
                std::cmp::Reverse(i.elixir_cost.map_or(MISSING_COST_DESC, i64::from))
            }),
        }

        out
    }

    pub fn summary(&self) -> CollectionSummary {
        let mut by_label = BTreeMap::new();
        for label in LevelLabel::ALL {
            by_label.insert(label, 0);
        }
        let mut level_sum: u64 = 0;
        for item in &self.items {
            *by_label.entry(item.label).or_insert(0) += 1;
            level_sum += u64::from(item.unified_level);
        }
        let total = self.items.len();
        CollectionSummary {
            total,
            by_label,
            average_level: (total > 0).then(|| level_sum as f64 / total as f64),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
