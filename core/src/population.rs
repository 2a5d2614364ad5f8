//! Population tables flowing through the engine.
//!
//! raw [`LicenseRecord`]s → [`ScoredPopulation`] → [`TieredPopulation`].
//! A tiered population keeps the scored entities in input order and carries
//! one tier per entity at the same index.

use crate::{
    error::{GradingError, GradingResult},
    ranking::score_order,
    types::{DistrictKey, EntityId, Tier},
};
use serde::{Deserialize, Serialize};

/// One retail license holder as supplied by the importer.
/// Every indicator is optional; missing values count as 0 when scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub license_no:       EntityId,
    /// Localized previous tier label, e.g. `二十四档`.
    pub previous_grade:   String,
    pub marketing_route:  String,
    pub purchase_amount:  Option<f64>,
    pub credit_rating:    Option<String>,
    pub counter_display:  Option<f64>,
    pub placement_rule:   Option<f64>,
    pub damage_fading:    Option<f64>,
    pub theme_display:    Option<f64>,
    pub price_tagging:    Option<f64>,
    pub transaction_data: Option<f64>,
    pub consumption_env:  Option<f64>,
}

/// Derived scores for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub purchase_rank:      u32,
    pub purchase_score:     f64,
    pub credit_score:       f64,
    pub transaction_score:  f64,
    pub non_purchase_score: f64,
    pub total:              f64,
    pub total_rank:         u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntity {
    pub record:        LicenseRecord,
    pub previous_tier: Tier,
    pub district:      DistrictKey,
    pub scores:        ScoreCard,
}

impl ScoredEntity {
    /// Purchase amount with missing values substituted by 0.
    pub fn purchase_amount(&self) -> f64 {
        self.record.purchase_amount.unwrap_or(0.0)
    }
}

/// A non-empty scored population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPopulation {
    entities: Vec<ScoredEntity>,
}

impl ScoredPopulation {
    pub fn new(entities: Vec<ScoredEntity>) -> GradingResult<Self> {
        if entities.is_empty() {
            return Err(GradingError::EmptyPopulation);
        }
        Ok(Self { entities })
    }

    pub fn entities(&self) -> &[ScoredEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// A scored population with exactly one tier per entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredPopulation {
    scored: ScoredPopulation,
    tiers:  Vec<Tier>,
}

impl TieredPopulation {
    /// Pair a scored population with its tiers. `tiers[i]` belongs to entity `i`.
    pub fn new(scored: ScoredPopulation, tiers: Vec<Tier>) -> GradingResult<Self> {
        if scored.len() != tiers.len() {
            return Err(GradingError::TierMismatch {
                population: scored.len(),
                tiers:      tiers.len(),
            });
        }
        Ok(Self { scored, tiers })
    }

    /// Tiers produced by an allocator over this same population.
    pub(crate) fn aligned(scored: ScoredPopulation, tiers: Vec<Tier>) -> Self {
        debug_assert_eq!(scored.len(), tiers.len());
        Self { scored, tiers }
    }

    pub fn scored(&self) -> &ScoredPopulation {
        &self.scored
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Entities paired with their new tier, in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&ScoredEntity, Tier)> {
        self.scored.entities().iter().zip(self.tiers.iter().copied())
    }

    /// Entities paired with their new tier, best score first.
    pub fn ranked(&self) -> Vec<(&ScoredEntity, Tier)> {
        let entities = self.scored.entities();
        score_order(entities)
            .into_iter()
            .map(|idx| (&entities[idx], self.tiers[idx]))
            .collect()
    }

    pub fn into_parts(self) -> (ScoredPopulation, Vec<Tier>) {
        (self.scored, self.tiers)
    }
}
