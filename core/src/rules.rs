//! Rule metrics for one tiering.
//!
//! The optimizer scores candidates from these metrics and the reporter
//! re-derives them from the final population, so both always agree on which
//! rules pass.
//!
//! Mandatory: band shares on target, every tier occupied, upgrades ≥ downgrades.
//! Preferred: smallest occupied tier share ≥ floor, shape correlation > floor.
//! Reference: intra-tier purchase variance, weighted-indicator change rate.

use crate::{
    config::{GradingConfig, ObjectiveWeights},
    population::ScoredEntity,
    stats::{pearson, reference_shape, sample_variance},
    tier::BANDS,
    types::{Tier, TIER_COUNT, TIER_MIN},
};
use serde::{Deserialize, Serialize};

/// Pass/fail outcome of every rule for one tiering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFlags {
    pub bands_on_target:    bool,
    pub all_tiers_occupied: bool,
    pub net_upgrade:        bool,
    pub min_share_floor:    bool,
    pub shape_match:        bool,
    pub change_rate_within: bool,
}

impl RuleFlags {
    pub fn mandatory_met(&self) -> bool {
        self.bands_on_target && self.all_tiers_occupied && self.net_upgrade
    }

    pub fn preferred_met(&self) -> bool {
        self.min_share_floor && self.shape_match
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMetrics {
    pub population:        usize,
    /// Occupants per tier; index 0 is tier 1.
    pub tier_counts:       Vec<usize>,
    /// Smallest count over all 30 tiers; zero means some tier is empty.
    pub min_tier_count:    usize,
    /// Smallest share among occupied tiers only.
    pub min_tier_share:    f64,
    pub upgrades:          usize,
    pub downgrades:        usize,
    /// Realized share per band, A first.
    pub band_shares:       [f64; 5],
    pub band_on_target:    [bool; 5],
    pub shape_correlation: f64,
    pub change_rate:       f64,
    pub total_variance:    f64,
    pub flags:             RuleFlags,
}

impl RuleMetrics {
    pub fn net_upgrade_margin(&self) -> i64 {
        self.upgrades as i64 - self.downgrades as i64
    }

    /// Composite optimizer score. Mandatory failures sink the candidate below
    /// every feasible one without removing it from consideration.
    pub fn composite_score(&self, weights: &ObjectiveWeights) -> f64 {
        let flags = &self.flags;
        let mut score = 0.0;

        for passed in [flags.bands_on_target, flags.net_upgrade, flags.all_tiers_occupied] {
            if passed {
                score += weights.hard_bonus;
            }
        }
        for passed in [flags.min_share_floor, flags.shape_match] {
            if passed {
                score += weights.soft_bonus;
            }
        }

        score += self.shape_correlation * weights.correlation_weight;
        score += self.net_upgrade_margin() as f64 * weights.margin_weight;

        if !flags.mandatory_met() {
            score -= weights.infeasible_penalty;
        }
        score
    }
}

/// Evaluates tierings against one config. Holds the precomputed reference
/// histogram so repeated evaluation stays cheap.
pub struct RuleEvaluator {
    reference:         [f64; TIER_COUNT],
    band_tolerance:    f64,
    min_tier_share:    f64,
    correlation_floor: f64,
    change_rate_limit: f64,
}

impl RuleEvaluator {
    pub fn new(config: &GradingConfig) -> Self {
        Self {
            reference:         reference_shape(config.shape.mean, config.shape.std_dev),
            band_tolerance:    config.band_tolerance,
            min_tier_share:    config.min_tier_share,
            correlation_floor: config.correlation_floor,
            change_rate_limit: config.change_rate_limit,
        }
    }

    /// `tiers[i]` is the new tier of `entities[i]`.
    pub fn evaluate(&self, entities: &[ScoredEntity], tiers: &[Tier]) -> RuleMetrics {
        let population = entities.len();
        let n = population.max(1) as f64;

        let mut tier_counts = vec![0usize; TIER_COUNT];
        let mut purchases_by_tier: Vec<Vec<f64>> = vec![Vec::new(); TIER_COUNT];
        let (mut upgrades, mut downgrades) = (0usize, 0usize);
        let (mut weighted_old, mut weighted_new) = (0.0, 0.0);

        for (entity, &tier) in entities.iter().zip(tiers) {
            let slot = (tier - TIER_MIN) as usize;
            let purchase = entity.purchase_amount();
            tier_counts[slot] += 1;
            purchases_by_tier[slot].push(purchase);

            if tier > entity.previous_tier {
                upgrades += 1;
            } else if tier < entity.previous_tier {
                downgrades += 1;
            }
            weighted_old += entity.previous_tier as f64 * purchase;
            weighted_new += tier as f64 * purchase;
        }

        let mut band_shares = [0.0; 5];
        let mut band_on_target = [false; 5];
        for (i, band) in BANDS.iter().enumerate() {
            let members: usize = band
                .tiers()
                .map(|t| tier_counts[(t - TIER_MIN) as usize])
                .sum();
            let share = members as f64 / n;
            band_shares[i] = share;
            band_on_target[i] = band.target_share - self.band_tolerance <= share
                && share <= band.target_share + self.band_tolerance;
        }

        let min_tier_count = tier_counts.iter().copied().min().unwrap_or(0);
        let min_occupied = tier_counts.iter().copied().filter(|&c| c > 0).min().unwrap_or(0);
        let min_tier_share = min_occupied as f64 / n;

        let histogram: Vec<f64> = tier_counts.iter().map(|&c| c as f64).collect();
        let shape_correlation = pearson(&histogram, &self.reference);

        let change_rate = if weighted_old != 0.0 {
            (weighted_new - weighted_old) / weighted_old
        } else {
            0.0
        };

        let total_variance: f64 = purchases_by_tier
            .iter()
            .filter_map(|values| sample_variance(values))
            .sum();

        let flags = RuleFlags {
            bands_on_target:    band_on_target.iter().all(|&ok| ok),
            all_tiers_occupied: min_tier_count > 0,
            net_upgrade:        upgrades >= downgrades,
            min_share_floor:    min_tier_share >= self.min_tier_share,
            shape_match:        shape_correlation > self.correlation_floor,
            change_rate_within: change_rate.abs() <= self.change_rate_limit,
        };

        RuleMetrics {
            population,
            tier_counts,
            min_tier_count,
            min_tier_share,
            upgrades,
            downgrades,
            band_shares,
            band_on_target,
            shape_correlation,
            change_rate,
            total_variance,
            flags,
        }
    }
}
