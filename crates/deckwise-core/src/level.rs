// Level normalization: per-rarity card levels onto one comparable 1..=15 scale.
//
// The remote service reports a card's level on a scale whose ceiling depends
// on rarity (rarer cards cap lower). Shifting by `(MAX_BASE_LEVEL - max)`
// lines every ceiling up at 14. Evolved cards sit above that in a band of
// their own.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Highest level reachable through the linear mapping.
pub const MAX_BASE_LEVEL: i64 = 14;

/// Level reserved for cards with a non-zero evolution tier.
pub const EVOLVED_LEVEL: u8 = 15;

/// Fallback for a missing or non-positive raw level.
pub const DEFAULT_RAW_LEVEL: i64 = 1;

/// Fallback for a missing or non-positive raw maximum.
pub const DEFAULT_RAW_MAX: i64 = MAX_BASE_LEVEL;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Qualitative band for a unified level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LevelLabel {
    Weak,
    Ok,
    Good,
    Excellent,
    Max,
    Elite,
}

impl LevelLabel {
    /// All labels from weakest to strongest.
    pub const ALL: [LevelLabel; 6] = [
        LevelLabel::Weak,
        LevelLabel::Ok,
        LevelLabel::Good,
        LevelLabel::Excellent,
        LevelLabel::Max,
        LevelLabel::Elite,
    ];

    /// Band for a unified level. Out-of-range values fall into the nearest band.
    pub fn for_level(unified: u8) -> Self {
        match unified {
            15..=u8::MAX => LevelLabel::Elite,
            14 => LevelLabel::Max,
            13 => LevelLabel::Excellent,
            12 => LevelLabel::Good,
            10..=11 => LevelLabel::Ok,
            _ => LevelLabel::Weak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LevelLabel::Elite => "Elite",
            LevelLabel::Max => "Max",
            LevelLabel::Excellent => "Excellent",
            LevelLabel::Good => "Good",
            LevelLabel::Ok => "OK",
            LevelLabel::Weak => "Weak",
        }
    }
}

impl std::fmt::Display for LevelLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of normalizing one card's raw level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedLevel {
    /// Rarity-independent level in `1..=15`.
    pub level: u8,
    pub label: LevelLabel,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Map a raw `(level, max_level, evolution_tier)` triple onto the unified scale.
///
/// Never fails: non-positive levels fall back to 1, non-positive maxima to 14,
/// negative tiers to 0.
pub fn normalize(raw_level: i64, raw_max: i64, evolution_tier: i64) -> UnifiedLevel {
    let raw_level = if raw_level > 0 { raw_level } else { DEFAULT_RAW_LEVEL };
    let raw_max = if raw_max > 0 { raw_max } else { DEFAULT_RAW_MAX };

    let linear = raw_level
        .saturating_add(MAX_BASE_LEVEL - raw_max)
        .clamp(1, MAX_BASE_LEVEL) as u8;

    let level = if evolution_tier > 0 { EVOLVED_LEVEL } else { linear };

    UnifiedLevel {
        level,
        label: LevelLabel::for_level(level),
    }
}

/// Coerce a loosely-typed raw level. Absent, non-finite and non-positive
/// values become `DEFAULT_RAW_LEVEL`; fractions are rounded.
pub fn coerce_raw_level(value: Option<f64>) -> u32 {
    coerce_positive(value).unwrap_or(DEFAULT_RAW_LEVEL as u32)
}

/// Coerce a loosely-typed raw maximum level (default `DEFAULT_RAW_MAX`).
pub fn coerce_raw_max(value: Option<f64>) -> u32 {
    coerce_positive(value).unwrap_or(DEFAULT_RAW_MAX as u32)
}

/// Coerce a loosely-typed evolution tier. Absent, non-finite and negative
/// values mean "not evolved".
pub fn coerce_evolution_tier(value: Option<f64>) -> u32 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

fn coerce_positive(value: Option<f64>) -> Option<u32> {
    let v = value.filter(|v| v.is_finite())?.round();
    if v >= 1.0 {
        Some(v.min(u32::MAX as f64) as u32)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
