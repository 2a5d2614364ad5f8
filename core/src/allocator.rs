//! Tier allocator: percentile mode and threshold mode.
//!
//! Percentile mode orders the population by score, cuts it into the five
//! bands at the (shifted) cumulative cutpoints, and spreads each band over
//! its tiers with largest-remainder apportionment. Threshold mode ignores
//! order entirely and compares each total score against per-tier minimums.

use crate::{
    apportion::apportion,
    population::{ScoredPopulation, TieredPopulation},
    ranking::score_order,
    stats::tier_weight,
    tier::{tiers_descending, Band, BANDS, BASE_CUTPOINTS},
    types::{Tier, TIER_COUNT, TIER_MAX, TIER_MIN},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manual thresholds: tier → minimum total score. Keys outside 2..=30 are ignored.
pub type ThresholdMap = BTreeMap<i64, f64>;

/// Per-tier occupant counts, indexed by tier (slot 0 unused).
pub type TierCounts = [usize; TIER_COUNT + 1];

/// Signed offsets applied to the A/B/C/D cumulative cutpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftSet {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl ShiftSet {
    pub const ZERO: ShiftSet = ShiftSet { a: 0.0, b: 0.0, c: 0.0, d: 0.0 };

    pub fn from_array([a, b, c, d]: [f64; 4]) -> Self {
        Self { a, b, c, d }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.a, self.b, self.c, self.d]
    }
}

/// How a band's rows are spread across its tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationShape {
    Uniform,
    /// Weight each tier by the normal density at the tier number.
    Normal { mean: f64, std_dev: f64 },
}

impl AllocationShape {
    fn band_weights(&self, band: &Band) -> Vec<f64> {
        match *self {
            AllocationShape::Uniform => vec![1.0; band.width()],
            AllocationShape::Normal { mean, std_dev } => band
                .tiers()
                .map(|tier| tier_weight(tier, mean, std_dev))
                .collect(),
        }
    }
}

/// Boundary indices closing bands A..D for a population of `population`
/// rows. Never decreasing, never beyond `population`.
pub fn band_boundaries(population: usize, shifts: &ShiftSet) -> [usize; 4] {
    let n = population as f64;
    let mut boundaries = [0usize; 4];
    let mut floor = 0usize;
    for (slot, (base, shift)) in boundaries
        .iter_mut()
        .zip(BASE_CUTPOINTS.iter().zip(shifts.to_array()))
    {
        // Half-to-even, so x.5 boundaries land the same way on every platform.
        let raw = (n * (base + shift)).round_ties_even().clamp(0.0, n) as usize;
        floor = raw.max(floor);
        *slot = floor;
    }
    boundaries
}

/// Per-tier counts for precomputed band boundaries.
pub fn band_tier_counts(boundaries: &[usize; 4], population: usize, shape: AllocationShape) -> TierCounts {
    counts_for_bands(boundaries, population, &BANDS.map(|band| shape.band_weights(&band)))
}

fn counts_for_bands(boundaries: &[usize; 4], population: usize, band_weights: &[Vec<f64>; 5]) -> TierCounts {
    let [a, b, c, d] = *boundaries;
    let ranges = [(0, a), (a, b), (b, c), (c, d), (d, population)];
    let mut counts = [0usize; TIER_COUNT + 1];
    for ((band, weights), (start, end)) in BANDS.iter().zip(band_weights).zip(ranges) {
        let rows = end.saturating_sub(start);
        if rows == 0 {
            continue;
        }
        for (tier, count) in band.tiers().zip(apportion(weights, rows)) {
            counts[tier as usize] = count;
        }
    }
    counts
}

/// Allocates tiers over a fixed score order. Build once, then evaluate as
/// many shift sets as needed.
pub struct PercentileAllocator {
    order:        Vec<usize>,
    band_weights: [Vec<f64>; 5],
}

impl PercentileAllocator {
    pub fn new(scored: &ScoredPopulation, shape: AllocationShape) -> Self {
        Self {
            order:        score_order(scored.entities()),
            band_weights: BANDS.map(|band| shape.band_weights(&band)),
        }
    }

    pub fn population(&self) -> usize {
        self.order.len()
    }

    /// Tier occupancy produced by `shifts`.
    pub fn tier_counts(&self, shifts: &ShiftSet) -> TierCounts {
        let boundaries = band_boundaries(self.population(), shifts);
        counts_for_bands(&boundaries, self.population(), &self.band_weights)
    }

    /// One tier per entity, aligned with the scored population's input order.
    pub fn tiers(&self, shifts: &ShiftSet) -> Vec<Tier> {
        let counts = self.tier_counts(shifts);
        let mut tiers = vec![TIER_MIN; self.population()];
        let mut cursor = 0usize;
        for tier in tiers_descending() {
            for &idx in &self.order[cursor..cursor + counts[tier as usize]] {
                tiers[idx] = tier;
            }
            cursor += counts[tier as usize];
        }
        tiers
    }
}

/// Assign tiers by percentile cutpoints shifted by `shifts`.
pub fn assign_by_percentiles(
    scored: &ScoredPopulation,
    shifts: &ShiftSet,
    shape: AllocationShape,
) -> TieredPopulation {
    let tiers = PercentileAllocator::new(scored, shape).tiers(shifts);
    TieredPopulation::aligned(scored.clone(), tiers)
}

/// Assign tiers from explicit score thresholds.
///
/// Everyone starts at tier 1. Tiers 2..=30 are applied in increasing order,
/// each overwriting the tier of every entity at or above its threshold, so an
/// entity meeting several thresholds ends on the highest of them.
pub fn assign_by_thresholds(scored: &ScoredPopulation, thresholds: &ThresholdMap) -> TieredPopulation {
    for key in thresholds.keys() {
        if !(2..=TIER_MAX as i64).contains(key) {
            log::warn!("thresholds: ignoring tier {key}, only 2..={TIER_MAX} can be targeted");
        }
    }

    let mut tiers = vec![TIER_MIN; scored.len()];
    for tier in (TIER_MIN + 1)..=TIER_MAX {
        let Some(&min_score) = thresholds.get(&(tier as i64)) else {
            continue;
        };
        for (slot, entity) in tiers.iter_mut().zip(scored.entities()) {
            if entity.scores.total >= min_score {
                *slot = tier;
            }
        }
    }
    TieredPopulation::aligned(scored.clone(), tiers)
}
