// Wire boundary: lenient raw shapes from the remote service and their
// coercion into the strict model.
//
// Every field is optional and numbers are accepted as integers, floats or
// numeric strings. Anything unusable is treated as absent and replaced by
// the documented default here, so the rest of the crate never has to check.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::level::{coerce_evolution_tier, coerce_raw_level, coerce_raw_max};
use crate::model::{AccountSnapshot, Arena, CatalogEntry, OwnedItem};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_ARENA: &str = "Unknown arena";

// ---------------------------------------------------------------------------
// Raw serde shapes (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccount {
    #[serde(default, deserialize_with = "lenient_string")]
    tag: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    exp_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    trophies: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    best_trophies: Option<f64>,
    #[serde(default)]
    arena: Option<Value>,
    #[serde(default)]
    cards: Option<Value>,
    #[serde(default)]
    current_deck: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawArena {
    #[serde(default, deserialize_with = "lenient_number")]
    id: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCard {
    #[serde(default, deserialize_with = "lenient_number")]
    id: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    max_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    evolution_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    rarity: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    elixir_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    count: Option<f64>,
    #[serde(default)]
    icon_urls: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIconUrls {
    #[serde(default)]
    medium: Option<String>,
    #[serde(default)]
    small: Option<String>,
    #[serde(default)]
    evolution_medium: Option<String>,
}

/// Accept a number, a numeric string, or anything else as `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Accept a string or a number rendered as text; anything else is `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Parse a nested object, falling back to its default shape when the value
/// is absent or not the expected object.
fn lenient_object<T>(value: Option<Value>) -> T
where
    T: Default + serde::de::DeserializeOwned,
{
    value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn non_negative_u32(value: Option<f64>) -> Option<u32> {
    value
        .filter(|v| *v >= 0.0)
        .map(|v| v.round().min(u32::MAX as f64) as u32)
}

fn non_negative_u64(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| *v >= 0.0)
        .map(|v| v.round().min(u64::MAX as f64) as u64)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Failure detection
// ---------------------------------------------------------------------------

/// Extract the service-provided message from a structured failure body
/// (`{"error": "..."}`). Returns `None` for anything else.
pub fn service_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::String(_) => None,
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(Value::Object(obj.clone()).to_string())),
        Value::Null | Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

fn owned_item_from_value(value: Value) -> Option<OwnedItem> {
    let raw: RawCard = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("skipping malformed card record: {}", e);
            return None;
        }
    };
    Some(owned_item_from_raw(raw))
}

fn owned_item_from_raw(raw: RawCard) -> OwnedItem {
    let evolution_tier = coerce_evolution_tier(raw.evolution_level);
    let icons = lenient_object::<RawIconUrls>(raw.icon_urls);
    let evolution_icon = if evolution_tier > 0 {
        non_empty(icons.evolution_medium)
    } else {
        None
    };
    let icon_url = evolution_icon
        .or_else(|| non_empty(icons.medium))
        .or_else(|| non_empty(icons.small));

    let name = non_empty(raw.name).unwrap_or_else(|| {
        debug!("card record without a name, using placeholder");
        UNKNOWN_NAME.to_string()
    });

    OwnedItem {
        id: non_negative_u64(raw.id),
        name,
        level: coerce_raw_level(raw.level),
        max_level: coerce_raw_max(raw.max_level),
        evolution_tier,
        icon_url,
        rarity: non_empty(raw.rarity),
        elixir_cost: non_negative_u32(raw.elixir_cost),
        count: non_negative_u32(raw.count),
    }
}

fn items_from_values(values: Option<Value>) -> Vec<OwnedItem> {
    match values {
        Some(Value::Array(items)) => items.into_iter().filter_map(owned_item_from_value).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!("expected a card list, got {}; treating as empty", type_name(&other));
            Vec::new()
        }
    }
}

/// Coerce a raw account body into an `AccountSnapshot`.
///
/// `requested_tag` is used when the body does not echo the tag back. Returns
/// `Err` with the service message when the body is a structured failure, and
/// with a parse description when it is not an object at all.
pub fn account_from_value(value: Value, requested_tag: &str) -> Result<AccountSnapshot, String> {
    if let Some(message) = service_error(&value) {
        return Err(message);
    }
    if !value.is_object() {
        return Err(format!("expected an account object, got {}", type_name(&value)));
    }

    let raw: RawAccount = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let arena = lenient_object::<RawArena>(raw.arena);

    Ok(AccountSnapshot {
        tag: non_empty(raw.tag).unwrap_or_else(|| requested_tag.to_string()),
        name: non_empty(raw.name).unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        leadership_level: non_negative_u32(raw.exp_level),
        trophies: non_negative_u32(raw.trophies),
        best_trophies: non_negative_u32(raw.best_trophies),
        arena: Arena {
            id: non_negative_u64(arena.id),
            name: non_empty(arena.name).unwrap_or_else(|| UNKNOWN_ARENA.to_string()),
        },
        cards: items_from_values(raw.cards),
        current_deck: items_from_values(raw.current_deck),
    })
}

/// Coerce a raw catalog body into catalog entries.
///
/// Accepts a bare array or an object with an `items` array. Entries with
/// neither an identifier nor a name are dropped.
pub fn catalog_from_value(value: Value) -> Result<Vec<CatalogEntry>, String> {
    if let Some(message) = service_error(&value) {
        return Err(message);
    }

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => items,
            _ => return Err("catalog object has no `items` array".to_string()),
        },
        other => {
            return Err(format!("expected a catalog array, got {}", type_name(&other)));
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let raw: RawCard = match serde_json::from_value(item) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed catalog entry: {}", e);
                continue;
            }
        };
        let id = non_negative_u64(raw.id);
        let name = non_empty(raw.name);
        if id.is_none() && name.is_none() {
            warn!("skipping catalog entry with neither id nor name");
            continue;
        }
        let icons = lenient_object::<RawIconUrls>(raw.icon_urls);
        entries.push(CatalogEntry {
            id,
            name: name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            rarity: non_empty(raw.rarity),
            elixir_cost: non_negative_u32(raw.elixir_cost),
            max_level: non_negative_u32(raw.max_level),
            icon_url: non_empty(icons.medium).or_else(|| non_empty(icons.small)),
        });
    }

    Ok(entries)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_account_is_coerced() {
        let body = json!({
            "tag": "#2PP",
            "name": "Ana",
            "expLevel": 13,
            "trophies": 6120,
            "bestTrophies": 6400,
            "arena": { "id": 54000016, "name": "Legendary Arena" },
            "cards": [
                {
                    "name": "Knight", "id": 26000000, "level": 9, "maxLevel": 14,
                    "evolutionLevel": 1, "count": 120, "rarity": "common", "elixirCost": 3,
                    "iconUrls": { "medium": "knight.png", "evolutionMedium": "knight-evo.png" }
                },
                { "name": "Balloon", "id": 26000006, "level": 5, "maxLevel": 8 }
            ],
            "currentDeck": [ { "name": "Knight", "id": 26000000, "level": 9, "maxLevel": 14 } ]
        });

        let account = account_from_value(body, "#2PP").unwrap();
        assert_eq!(account.name, "Ana");
        assert_eq!(account.leadership_level, Some(13));
        assert_eq!(account.trophies, Some(6120));
        assert_eq!(account.best_trophies, Some(6400));
        assert_eq!(account.arena.name, "Legendary Arena");
        assert_eq!(account.cards.len(), 2);
        assert_eq!(account.current_deck.len(), 1);

        let knight = &account.cards[0];
        assert_eq!(knight.evolution_tier, 1);
        assert_eq!(knight.icon_url.as_deref(), Some("knight-evo.png"));
        assert_eq!(knight.elixir_cost, Some(3));

        let balloon = &account.cards[1];
        assert_eq!(balloon.rarity, None);
        assert_eq!(balloon.elixir_cost, None);
        assert_eq!(balloon.evolution_tier, 0);
    }

    #[test]
    fn missing_fields_degrade_to_defaults() {
        let body = json!({ "cards": [ { "level": "abc", "maxLevel": null } ] });
        let account = account_from_value(body, "#XYZ").unwrap();
        assert_eq!(account.tag, "#XYZ");
        assert_eq!(account.name, UNKNOWN_NAME);
        assert_eq!(account.arena.name, UNKNOWN_ARENA);
        assert!(account.current_deck.is_empty());

        let card = &account.cards[0];
        assert_eq!(card.name, UNKNOWN_NAME);
        assert_eq!(card.level, 1);
        assert_eq!(card.max_level, 14);
        assert_eq!(card.icon_url, None);
    }

    #[test]
    fn numeric_strings_and_floats_are_accepted() {
        let body = json!({ "cards": [ { "name": "Archers", "level": "7", "maxLevel": 11.0 } ] });
        let account = account_from_value(body, "#A").unwrap();
        assert_eq!(account.cards[0].level, 7);
        assert_eq!(account.cards[0].max_level, 11);
    }

    #[test]
    fn non_object_card_is_skipped() {
        let body = json!({ "cards": [ 42, { "name": "Archers" } ] });
        let account = account_from_value(body, "#A").unwrap();
        assert_eq!(account.cards.len(), 1);
        assert_eq!(account.cards[0].name, "Archers");
    }

    #[test]
    fn structured_failure_is_reported() {
        let err = account_from_value(json!({ "error": "Player not found" }), "#A").unwrap_err();
        assert_eq!(err, "Player not found");

        let err = account_from_value(json!({ "error": { "message": "quota" } }), "#A").unwrap_err();
        assert_eq!(err, "quota");
    }

    #[test]
    fn null_error_field_is_not_a_failure() {
        let account = account_from_value(json!({ "error": null, "name": "Bo" }), "#A").unwrap();
        assert_eq!(account.name, "Bo");
    }

    #[test]
    fn non_object_account_is_rejected() {
        let err = account_from_value(json!([1, 2]), "#A").unwrap_err();
        assert!(err.contains("an array"));
    }

    #[test]
    fn catalog_accepts_array_and_items_object() {
        let array = json!([{ "id": 1, "name": "Knight", "rarity": "Common", "elixirCost": 3 }]);
        let wrapped = json!({ "items": [{ "id": 1, "name": "Knight", "rarity": "Common", "elixirCost": 3 }] });

        let a = catalog_from_value(array).unwrap();
        let b = catalog_from_value(wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].rarity.as_deref(), Some("Common"));
        assert_eq!(a[0].elixir_cost, Some(3));
    }

    #[test]
    fn catalog_drops_anonymous_entries() {
        let body = json!([{ "rarity": "rare" }, { "name": "Mirror" }, { "id": 7 }]);
        let entries = catalog_from_value(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Mirror");
        assert_eq!(entries[1].id, Some(7));
    }

    #[test]
    fn catalog_failure_and_bad_shape() {
        assert_eq!(
            catalog_from_value(json!({ "error": "down" })).unwrap_err(),
            "down"
        );
        assert!(catalog_from_value(json!("nope")).is_err());
        assert!(catalog_from_value(json!({ "cards": [] })).is_err());
    }
}
