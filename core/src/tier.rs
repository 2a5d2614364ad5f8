//! Tier bands and localized tier labels.
//!
//! Tiers 1..=30 are grouped into five contiguous bands, each with a target
//! share of the population. Labels use Chinese numerals (`二十四档` = 24),
//! which is how previous tiers arrive in uploaded tables and how new tiers
//! are written back out.

use crate::types::{Tier, TIER_MAX, TIER_MIN};
use serde::Serialize;

/// One contiguous range of tiers with a target population share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub label:        char,
    pub top:          Tier,
    pub bottom:       Tier,
    pub target_share: f64,
}

impl Band {
    /// Tiers in allocation order: highest first.
    pub fn tiers(&self) -> impl Iterator<Item = Tier> {
        (self.bottom..=self.top).rev()
    }

    pub fn width(&self) -> usize {
        (self.top - self.bottom + 1) as usize
    }

    pub fn contains(&self, tier: Tier) -> bool {
        (self.bottom..=self.top).contains(&tier)
    }
}

/// Bands ordered best to worst. Shares sum to 1.
pub const BANDS: [Band; 5] = [
    Band { label: 'A', top: 30, bottom: 26, target_share: 0.09 },
    Band { label: 'B', top: 25, bottom: 21, target_share: 0.18 },
    Band { label: 'C', top: 20, bottom: 16, target_share: 0.23 },
    Band { label: 'D', top: 15, bottom: 11, target_share: 0.23 },
    Band { label: 'E', top: 10, bottom: 1,  target_share: 0.27 },
];

/// Cumulative population fractions closing bands A..D.
/// Band E always runs to the end of the population.
pub const BASE_CUTPOINTS: [f64; 4] = [0.09, 0.27, 0.50, 0.73];

/// All assignable tiers, best first.
pub fn tiers_descending() -> impl Iterator<Item = Tier> {
    (TIER_MIN..=TIER_MAX).rev()
}

const DIGITS: [char; 10] = ['一', '二', '三', '四', '五', '六', '七', '八', '九', '十'];

fn digit_value(c: char) -> Option<Tier> {
    DIGITS.iter().position(|d| *d == c).map(|i| i as Tier + 1)
}

/// Parse a localized tier label such as `二十四档`, `十档` or `7`.
/// Anything unrecognised yields 0.
pub fn parse_tier_label(raw: &str) -> Tier {
    let label = raw.replace('档', "");
    let label = label.trim();
    let chars: Vec<char> = label.chars().collect();

    match chars.as_slice() {
        [] => 0,
        [c] => digit_value(*c).unwrap_or_else(|| numeric_label(label)),
        ['十', rest @ ..] => 10 + rest.first().and_then(|c| digit_value(*c)).unwrap_or(0),
        ['二', '十'] => 20,
        ['二', '十', c, ..] => 20 + digit_value(*c).unwrap_or(0),
        ['三', '十'] => 30,
        _ => numeric_label(label),
    }
}

fn numeric_label(label: &str) -> Tier {
    label
        .parse::<Tier>()
        .ok()
        .filter(|t| (TIER_MIN..=TIER_MAX).contains(t))
        .unwrap_or(0)
}

/// Render a tier as its localized label. Tiers outside 1..=30 fall back to
/// the plain number.
pub fn tier_label(tier: Tier) -> String {
    let digit = |n: Tier| DIGITS[(n - 1) as usize];
    match tier {
        1..=10 => format!("{}档", digit(tier)),
        11..=19 => format!("十{}档", digit(tier - 10)),
        20 => "二十档".to_string(),
        21..=29 => format!("二十{}档", digit(tier - 20)),
        30 => "三十档".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tier_label_parses_back() {
        for tier in TIER_MIN..=TIER_MAX {
            let label = tier_label(tier);
            assert_eq!(parse_tier_label(&label), tier, "label {label} did not round trip");
        }
    }

    #[test]
    fn parses_known_label_forms() {
        assert_eq!(parse_tier_label("二十四档"), 24);
        assert_eq!(parse_tier_label(" 十档 "), 10);
        assert_eq!(parse_tier_label("十三"), 13);
        assert_eq!(parse_tier_label("三十档"), 30);
        assert_eq!(parse_tier_label("17"), 17);
    }

    #[test]
    fn unrecognised_labels_parse_to_zero() {
        assert_eq!(parse_tier_label(""), 0);
        assert_eq!(parse_tier_label("unknown"), 0);
        assert_eq!(parse_tier_label("24.5"), 0);
        assert_eq!(parse_tier_label("45"), 0);
    }

    #[test]
    fn bands_cover_every_tier_once() {
        for tier in TIER_MIN..=TIER_MAX {
            let owners = BANDS.iter().filter(|b| b.contains(tier)).count();
            assert_eq!(owners, 1, "tier {tier} owned by {owners} bands");
        }
        let total: f64 = BANDS.iter().map(|b| b.target_share).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
