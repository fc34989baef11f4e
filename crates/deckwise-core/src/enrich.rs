// Card enrichment: owned card + catalog -> display-ready `NormalizedItem`.

use tracing::debug;

use crate::catalog::CatalogIndex;
use crate::level;
use crate::model::{NormalizedItem, OwnedItem};

/// Suffix appended to evolved card names. Empty for tier 0.
pub fn evolution_tag(tier: u32) -> String {
    if tier == 0 {
        String::new()
    } else {
        format!(" [Evo {tier}]")
    }
}

/// Build the normalized view of one owned card.
///
/// Rarity and cost come from the catalog when the card resolves there and
/// the catalog has a value; otherwise the card's own (possibly stale) fields
/// are kept. The input is never modified.
pub fn enrich(item: &OwnedItem, catalog: Option<&CatalogIndex>) -> NormalizedItem {
    let unified = level::normalize(
        i64::from(item.level),
        i64::from(item.max_level),
        i64::from(item.evolution_tier),
    );

    let entry = catalog.and_then(|c| c.lookup(item));
    if entry.is_none() && catalog.is_some() {
        debug!(card = %item.name, "card not found in catalog, keeping account fields");
    }

    let rarity = entry
        .and_then(|e| e.rarity.clone())
        .or_else(|| item.rarity.clone());
    let elixir_cost = entry.and_then(|e| e.elixir_cost).or(item.elixir_cost);
    let icon_url = item
        .icon_url
        .clone()
        .or_else(|| entry.and_then(|e| e.icon_url.clone()));

    NormalizedItem {
        id: item.id.or_else(|| entry.and_then(|e| e.id)),
        name: item.name.clone(),
        unified_level: unified.level,
        label: unified.label,
        rarity,
        elixir_cost,
        evolution_tier: item.evolution_tier,
        evolution_tag: evolution_tag(item.evolution_tier),
        icon_url,
        raw_level: item.level,
        raw_max_level: item.max_level,
    }
}

/// Enrich a whole card list, preserving order.
pub fn enrich_all(items: &[OwnedItem], catalog: Option<&CatalogIndex>) -> Vec<NormalizedItem> {
    items.iter().map(|item| enrich(item, catalog)).collect()
}
